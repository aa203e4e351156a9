//! Modelos de dados compartilhados entre aplicações
//!
//! Este módulo define as estruturas de dados principais da FonoApp.
//! Cada estrutura corresponde a uma tabela do banco.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Valor inválido para {}: {}", column, value),
        )),
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> sqlx::Result<T> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Papéis dos usuários do sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rol {
    /// Administrador com acesso completo
    Admin,
    /// Médico/terapeuta que avalia pacientes
    Medico,
    /// Paciente que realiza os jogos
    Paciente,
    /// Papel auxiliar (placeholder)
    Emisor,
}

impl Rol {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Rol::Admin),
            // "doctor" é um sinônimo legado usado por contas antigas
            "medico" | "doctor" => Some(Rol::Medico),
            "paciente" => Some(Rol::Paciente),
            "emisor" => Some(Rol::Emisor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rol::Admin => write!(f, "admin"),
            Rol::Medico => write!(f, "medico"),
            Rol::Paciente => write!(f, "paciente"),
            Rol::Emisor => write!(f, "emisor"),
        }
    }
}

/// Estados de disponibilidade de um médico
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoMedico {
    /// Disponível para receber atribuições
    Activo,
    /// Indisponível temporariamente
    Ocupado,
    /// Em sessão ativa com um paciente
    Consulta,
}

impl EstadoMedico {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "activo" => Some(EstadoMedico::Activo),
            "ocupado" => Some(EstadoMedico::Ocupado),
            "consulta" => Some(EstadoMedico::Consulta),
            _ => None,
        }
    }

    /// Médicos ocupados ou em consulta não recebem atribuições automáticas.
    pub fn disponible_para_asignacion(self) -> bool {
        matches!(self, EstadoMedico::Activo)
    }
}

impl std::fmt::Display for EstadoMedico {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstadoMedico::Activo => write!(f, "activo"),
            EstadoMedico::Ocupado => write!(f, "ocupado"),
            EstadoMedico::Consulta => write!(f, "consulta"),
        }
    }
}

/// Usuário do sistema (qualquer papel)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usuario {
    /// Identificador único
    pub id: Uuid,
    /// Data e hora de criação da conta
    pub creado_en: DateTime<Utc>,
    /// Nome completo
    pub nombre: String,
    /// E-mail (identidade no sistema inteiro)
    pub email: String,
    /// Hash argon2 da senha (ou texto plano em contas legadas)
    #[serde(skip_serializing)]
    pub password: String,
    /// Papel do usuário
    pub rol: Rol,
    /// Estado de disponibilidade (relevante para médicos)
    pub estado: EstadoMedico,
    /// Nível de gamificação
    pub nivel: i32,
    /// Pontos acumulados
    pub puntos: i32,
    /// Conta ativa
    pub activo: bool,
}

impl FromRow<'_, SqliteRow> for Usuario {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let rol_raw: String = row.try_get("rol")?;
        let estado_raw: String = row.try_get("estado")?;
        Ok(Self {
            id: row.try_get("id")?,
            creado_en: row.try_get("creado_en")?,
            nombre: row.try_get("nombre")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            rol: Rol::parse(&rol_raw).ok_or_else(|| decode_error("rol", &rol_raw))?,
            estado: EstadoMedico::parse(&estado_raw)
                .ok_or_else(|| decode_error("estado", &estado_raw))?,
            nivel: row.try_get("nivel")?,
            puntos: row.try_get("puntos")?,
            activo: row.try_get("activo")?,
        })
    }
}

/// Estados do ciclo de vida de uma atribuição
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoAsignacion {
    /// Criada pelo admin, aguardando o médico aceitar
    Pendiente,
    /// O médico aceitou e está atendendo o paciente
    Aceptada,
    /// O médico rejeitou ou a atribuição foi cancelada
    Cancelada,
}

impl EstadoAsignacion {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pendiente" => Some(EstadoAsignacion::Pendiente),
            "aceptada" => Some(EstadoAsignacion::Aceptada),
            "cancelada" => Some(EstadoAsignacion::Cancelada),
            _ => None,
        }
    }

    /// Guarda de transição do ciclo de vida.
    ///
    /// - `pendiente -> aceptada | cancelada`
    /// - `aceptada -> cancelada`
    /// - `aceptada -> aceptada` (aceitar é idempotente)
    /// - `cancelada` é terminal
    pub fn puede_transicionar_a(self, destino: EstadoAsignacion) -> bool {
        match (self, destino) {
            (EstadoAsignacion::Pendiente, EstadoAsignacion::Aceptada) => true,
            (EstadoAsignacion::Pendiente, EstadoAsignacion::Cancelada) => true,
            (EstadoAsignacion::Aceptada, EstadoAsignacion::Aceptada) => true,
            (EstadoAsignacion::Aceptada, EstadoAsignacion::Cancelada) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for EstadoAsignacion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstadoAsignacion::Pendiente => write!(f, "pendiente"),
            EstadoAsignacion::Aceptada => write!(f, "aceptada"),
            EstadoAsignacion::Cancelada => write!(f, "cancelada"),
        }
    }
}

/// Origem de uma atribuição
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoAsignacion {
    /// O sistema escolheu o médico ao acaso
    Automatica,
    /// O admin escolheu o médico específico
    Manual,
}

impl TipoAsignacion {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "automatica" => Some(TipoAsignacion::Automatica),
            "manual" => Some(TipoAsignacion::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for TipoAsignacion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TipoAsignacion::Automatica => write!(f, "automatica"),
            TipoAsignacion::Manual => write!(f, "manual"),
        }
    }
}

/// Níveis de dificuldade das atividades prescritas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dificultad {
    Facil,
    Media,
    Dificil,
}

impl Dificultad {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "facil" => Some(Dificultad::Facil),
            "media" => Some(Dificultad::Media),
            "dificil" => Some(Dificultad::Dificil),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dificultad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dificultad::Facil => write!(f, "facil"),
            Dificultad::Media => write!(f, "media"),
            Dificultad::Dificil => write!(f, "dificil"),
        }
    }
}

/// Um par {categoria, actividad} dentro da lista prescrita de uma atribuição
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescripcion {
    pub categoria: String,
    pub actividad: String,
}

/// Atribuição de um médico a um paciente
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asignacion {
    /// Identificador único
    pub id: Uuid,
    /// E-mail do paciente
    pub paciente_email: String,
    /// E-mail do médico responsável
    pub medico_email: String,
    /// Lista ordenada de prescrições {categoria, actividad}
    pub actividades_asignadas: Vec<Prescripcion>,
    /// Dificuldade prescrita
    pub dificultad: Dificultad,
    /// Data e hora de criação
    pub fecha_asignacion: DateTime<Utc>,
    /// Estado atual do ciclo de vida
    pub estado: EstadoAsignacion,
    /// Origem da atribuição
    pub tipo: TipoAsignacion,
}

impl FromRow<'_, SqliteRow> for Asignacion {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let actividades_raw: String = row.try_get("actividades_asignadas")?;
        let dificultad_raw: String = row.try_get("dificultad")?;
        let estado_raw: String = row.try_get("estado")?;
        let tipo_raw: String = row.try_get("tipo")?;
        Ok(Self {
            id: row.try_get("id")?,
            paciente_email: row.try_get("paciente_email")?,
            medico_email: row.try_get("medico_email")?,
            actividades_asignadas: decode_json("actividades_asignadas", &actividades_raw)?,
            dificultad: Dificultad::parse(&dificultad_raw)
                .ok_or_else(|| decode_error("dificultad", &dificultad_raw))?,
            fecha_asignacion: row.try_get("fecha_asignacion")?,
            estado: EstadoAsignacion::parse(&estado_raw)
                .ok_or_else(|| decode_error("estado", &estado_raw))?,
            tipo: TipoAsignacion::parse(&tipo_raw)
                .ok_or_else(|| decode_error("tipo", &tipo_raw))?,
        })
    }
}

/// Perfil estendido do paciente
///
/// Inclui dados do tutor/cuidador, já que os pacientes costumam ser menores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfilPaciente {
    pub id: Uuid,
    pub paciente_email: String,
    pub nombre: String,
    pub edad: i32,
    /// Preescolar, Primaria, Secundaria, Bachillerato, Universidad, Otro
    pub escolaridad: String,
    /// Masculino, Femenino, Otro
    pub genero: String,
    pub fecha_registro: DateTime<Utc>,
    pub tutor: String,
    /// Relação com o paciente (Madre, Padre, Abuelo, etc.)
    pub parentesco: String,
}

impl FromRow<'_, SqliteRow> for PerfilPaciente {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            paciente_email: row.try_get("paciente_email")?,
            nombre: row.try_get("nombre")?,
            edad: row.try_get("edad")?,
            escolaridad: row.try_get("escolaridad")?,
            genero: row.try_get("genero")?,
            fecha_registro: row.try_get("fecha_registro")?,
            tutor: row.try_get("tutor")?,
            parentesco: row.try_get("parentesco")?,
        })
    }
}

/// Registro de uma atividade completada por um paciente
///
/// Criado automaticamente quando o paciente completa um jogo.
/// `feedback` em NULL indica que está pendente de avaliação do médico.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorialActividad {
    pub id: Uuid,
    pub paciente_email: String,
    pub categoria: String,
    pub actividad: String,
    pub puntos_obtenidos: i32,
    pub nivel: i32,
    pub fecha: DateTime<Utc>,
    pub feedback: Option<String>,
}

impl FromRow<'_, SqliteRow> for HistorialActividad {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            paciente_email: row.try_get("paciente_email")?,
            categoria: row.try_get("categoria")?,
            actividad: row.try_get("actividad")?,
            puntos_obtenidos: row.try_get("puntos_obtenidos")?,
            nivel: row.try_get("nivel")?,
            fecha: row.try_get("fecha")?,
            feedback: row.try_get("feedback")?,
        })
    }
}

/// Resultado detalhado de um jogo (completado ou em progresso)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultadoJuego {
    pub id: Uuid,
    pub paciente_email: String,
    pub categoria: String,
    pub juego: String,
    /// Último passo completado (1-based)
    pub paso_completado: i32,
    pub total_pasos: i32,
    pub completado: bool,
    pub fecha: DateTime<Utc>,
    pub notas: Option<String>,
    pub puntos: i32,
    pub nivel: i32,
}

impl FromRow<'_, SqliteRow> for ResultadoJuego {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            paciente_email: row.try_get("paciente_email")?,
            categoria: row.try_get("categoria")?,
            juego: row.try_get("juego")?,
            paso_completado: row.try_get("paso_completado")?,
            total_pasos: row.try_get("total_pasos")?,
            completado: row.try_get("completado")?,
            fecha: row.try_get("fecha")?,
            notas: row.try_get("notas")?,
            puntos: row.try_get("puntos")?,
            nivel: row.try_get("nivel")?,
        })
    }
}

/// Registro de uso diário da aplicação por um paciente
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SesionApp {
    pub id: Uuid,
    pub paciente_email: String,
    pub fecha: NaiveDate,
    pub minutos_conectado: i32,
}

impl FromRow<'_, SqliteRow> for SesionApp {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            paciente_email: row.try_get("paciente_email")?,
            fecha: row.try_get("fecha")?,
            minutos_conectado: row.try_get("minutos_conectado")?,
        })
    }
}

/// Conteúdo multimídia do sistema (linha única, id fixo em 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContenidoAdmin {
    pub id: i64,
    pub imagenes: Vec<String>,
    pub videos: Vec<String>,
    pub audios_referencia: Vec<String>,
    pub textos_sistema: Vec<serde_json::Value>,
    pub instrucciones: Option<String>,
}

impl FromRow<'_, SqliteRow> for ContenidoAdmin {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let imagenes_raw: String = row.try_get("imagenes")?;
        let videos_raw: String = row.try_get("videos")?;
        let audios_raw: String = row.try_get("audios_referencia")?;
        let textos_raw: String = row.try_get("textos_sistema")?;
        Ok(Self {
            id: row.try_get("id")?,
            imagenes: decode_json("imagenes", &imagenes_raw)?,
            videos: decode_json("videos", &videos_raw)?,
            audios_referencia: decode_json("audios_referencia", &audios_raw)?,
            textos_sistema: decode_json("textos_sistema", &textos_raw)?,
            instrucciones: row.try_get("instrucciones")?,
        })
    }
}

/// Categoria do catálogo persistido de atividades
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriaActividades {
    pub id: Uuid,
    pub categoria: String,
    pub actividades: Vec<String>,
}

impl FromRow<'_, SqliteRow> for CategoriaActividades {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let actividades_raw: String = row.try_get("actividades")?;
        Ok(Self {
            id: row.try_get("id")?,
            categoria: row.try_get("categoria")?,
            actividades: decode_json("actividades", &actividades_raw)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip_enums() {
        for rol in [Rol::Admin, Rol::Medico, Rol::Paciente, Rol::Emisor] {
            assert_eq!(Rol::parse(&rol.to_string()), Some(rol));
        }
        // Sinônimo legado
        assert_eq!(Rol::parse("doctor"), Some(Rol::Medico));
        assert_eq!(Rol::parse("desconocido"), None);

        for estado in [
            EstadoAsignacion::Pendiente,
            EstadoAsignacion::Aceptada,
            EstadoAsignacion::Cancelada,
        ] {
            assert_eq!(EstadoAsignacion::parse(&estado.to_string()), Some(estado));
        }

        for dif in [Dificultad::Facil, Dificultad::Media, Dificultad::Dificil] {
            assert_eq!(Dificultad::parse(&dif.to_string()), Some(dif));
        }
    }

    #[test]
    fn test_transiciones_de_asignacion() {
        use EstadoAsignacion::*;

        assert!(Pendiente.puede_transicionar_a(Aceptada));
        assert!(Pendiente.puede_transicionar_a(Cancelada));
        assert!(Aceptada.puede_transicionar_a(Cancelada));
        // Aceitar novamente é idempotente
        assert!(Aceptada.puede_transicionar_a(Aceptada));
        // Cancelada é terminal
        assert!(!Cancelada.puede_transicionar_a(Aceptada));
        assert!(!Cancelada.puede_transicionar_a(Pendiente));
        assert!(!Cancelada.puede_transicionar_a(Cancelada));
        // Não existe retorno para pendente
        assert!(!Aceptada.puede_transicionar_a(Pendiente));
    }

    #[test]
    fn test_medico_disponible() {
        assert!(EstadoMedico::Activo.disponible_para_asignacion());
        assert!(!EstadoMedico::Ocupado.disponible_para_asignacion());
        assert!(!EstadoMedico::Consulta.disponible_para_asignacion());
    }
}
