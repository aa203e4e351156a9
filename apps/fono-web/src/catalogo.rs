//! Catálogo de atividades reais
//!
//! Tabela estática compilada no processo: 7 categorias e 23 jogos, cada um
//! com categoria, nome de exibição e URL do jogo. Deve se manter
//! sincronizada com as rotas de `routes/juegos.rs`.

use serde::Serialize;

/// Entrada imutável do catálogo de jogos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actividad {
    pub categoria: &'static str,
    pub actividad: &'static str,
    pub url: &'static str,
}

pub const ACTIVIDADES: &[Actividad] = &[
    // Respiración (2 jogos)
    Actividad { categoria: "Respiración", actividad: "Infla el globo", url: "/juegos/respiracion/globo" },
    Actividad { categoria: "Respiración", actividad: "El molino de Pepe", url: "/juegos/respiracion/molino" },
    // Fonación (2 jogos)
    Actividad { categoria: "Fonación", actividad: "¡Haz un gol!", url: "/juegos/fonacion/gol" },
    Actividad { categoria: "Fonación", actividad: "Escala musical", url: "/juegos/fonacion/escala" },
    // Resonancia (3 jogos)
    Actividad { categoria: "Resonancia", actividad: "Escaleras de tono", url: "/juegos/resonancia/escaleras" },
    Actividad { categoria: "Resonancia", actividad: "Piano - Estrellita", url: "/juegos/resonancia/piano" },
    Actividad { categoria: "Resonancia", actividad: "¡Veo, veo!", url: "/juegos/resonancia/veoveo" },
    // Articulación (6 jogos)
    Actividad { categoria: "Articulación", actividad: "Letra B", url: "/juegos/articulacion/letra-b" },
    Actividad { categoria: "Articulación", actividad: "Letra D", url: "/juegos/articulacion/letra-d" },
    Actividad { categoria: "Articulación", actividad: "Letra F", url: "/juegos/articulacion/letra-f" },
    Actividad { categoria: "Articulación", actividad: "Letra R", url: "/juegos/articulacion/letra-r" },
    Actividad { categoria: "Articulación", actividad: "Completa la palabra", url: "/juegos/articulacion/completa-palabra" },
    Actividad { categoria: "Articulación", actividad: "¡Acelera la moto!", url: "/juegos/articulacion/moto-voz" },
    // Prosodia (4 jogos)
    Actividad { categoria: "Prosodia", actividad: "Adivina el animal", url: "/juegos/prosodia/adivina-animal" },
    Actividad { categoria: "Prosodia", actividad: "Trabalenguas", url: "/juegos/prosodia/trabalenguas" },
    Actividad { categoria: "Prosodia", actividad: "Relaciona la adivinanza", url: "/juegos/prosodia/adivinanza-imagen" },
    Actividad { categoria: "Prosodia", actividad: "Completa la canción", url: "/juegos/prosodia/completa-cancion" },
    // Discriminación Auditiva (3 jogos)
    Actividad { categoria: "Discriminación Auditiva", actividad: "Sonidos de animales", url: "/juegos/discriminacion/sonidos-animales" },
    Actividad { categoria: "Discriminación Auditiva", actividad: "Sonidos de objetos", url: "/juegos/discriminacion/sonidos-objetos" },
    Actividad { categoria: "Discriminación Auditiva", actividad: "Arrastra al sonido", url: "/juegos/discriminacion/arrastra-sonido" },
    // Practica Conmigo (3 jogos)
    Actividad { categoria: "Practica Conmigo", actividad: "Rompecabezas", url: "/juegos/practica/rompecabezas" },
    Actividad { categoria: "Practica Conmigo", actividad: "Crea tu personaje", url: "/juegos/practica/cara" },
    Actividad { categoria: "Practica Conmigo", actividad: "Asociación de imágenes", url: "/juegos/practica/asociacion" },
];

/// Segmento de URL de cada categoria, usado no roteamento dos jogos
const SLUGS: &[(&str, &str)] = &[
    ("respiracion", "Respiración"),
    ("fonacion", "Fonación"),
    ("resonancia", "Resonancia"),
    ("articulacion", "Articulación"),
    ("prosodia", "Prosodia"),
    ("discriminacion", "Discriminación Auditiva"),
    ("practica", "Practica Conmigo"),
];

/// Categorias distintas de uma tabela de atividades, em ordem
/// lexicográfica.
///
/// A ordenação é obrigatória: a seleção diária amostra desta lista e
/// precisa ser determinística entre execuções.
pub fn categorias_de(actividades: &[Actividad]) -> Vec<&'static str> {
    let mut cats: Vec<&'static str> = Vec::new();
    for a in actividades {
        if !cats.contains(&a.categoria) {
            cats.push(a.categoria);
        }
    }
    cats.sort_unstable();
    cats
}

/// Categorias distintas do catálogo embutido
pub fn categorias() -> Vec<&'static str> {
    categorias_de(ACTIVIDADES)
}

/// Entradas de uma categoria ordenadas pelo nome da atividade
pub fn entradas_de<'a>(actividades: &'a [Actividad], categoria: &str) -> Vec<&'a Actividad> {
    let mut entradas: Vec<&'a Actividad> = actividades
        .iter()
        .filter(|a| a.categoria == categoria)
        .collect();
    entradas.sort_unstable_by_key(|a| a.actividad);
    entradas
}

/// Entradas de uma categoria do catálogo embutido
pub fn entradas_de_categoria(categoria: &str) -> Vec<&'static Actividad> {
    entradas_de(ACTIVIDADES, categoria)
}

/// Primeira entrada cuja categoria casa sem distinção de maiúsculas.
/// Usada para resolver prescrições do médico contra o catálogo.
pub fn buscar_por_categoria(categoria: &str) -> Option<&'static Actividad> {
    // Comparação Unicode: as categorias carregam acentos (Respiración,
    // Articulación) e precisam casar também em caixa alta
    let buscada = categoria.to_lowercase();
    ACTIVIDADES
        .iter()
        .find(|a| a.categoria.to_lowercase() == buscada)
}

/// Entrada do catálogo pela URL exata do jogo
pub fn buscar_por_url(url: &str) -> Option<&'static Actividad> {
    ACTIVIDADES.iter().find(|a| a.url == url)
}

/// Nome de exibição da categoria a partir do segmento de URL
pub fn categoria_por_slug(slug: &str) -> Option<&'static str> {
    SLUGS
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, categoria)| *categoria)
}

/// Catálogo agrupado por categoria, na ordem do catálogo
pub fn agrupado() -> Vec<(&'static str, Vec<&'static Actividad>)> {
    let mut grupos: Vec<(&'static str, Vec<&'static Actividad>)> = Vec::new();
    for a in ACTIVIDADES {
        match grupos.iter_mut().find(|(cat, _)| *cat == a.categoria) {
            Some((_, entradas)) => entradas.push(a),
            None => grupos.push((a.categoria, vec![a])),
        }
    }
    grupos
}
