//! Jogos de terapia
//!
//! Hub público de jogos, páginas por categoria e por jogo, registro de
//! resultados vindos do front e semeadura do catálogo no banco. As rotas
//! não exigem sessão: os jogos rodam no navegador do paciente e enviam o
//! e-mail gravado no cookie junto com cada resultado.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::catalogo;
use crate::error::AppError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/juegos/", get(vista_hub))
        .route("/juegos/resultado", post(registrar_resultado))
        .route("/juegos/seed-actividades", get(sembrar_actividades))
        .route("/juegos/:categoria", get(vista_categoria))
        .route("/juegos/:categoria/:juego", get(vista_juego))
}

async fn vista_hub() -> Json<serde_json::Value> {
    Json(json!({
        "titulo_pagina": "Juegos",
        "categorias": catalogo::agrupado(),
    }))
}

async fn vista_categoria(
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let categoria = catalogo::categoria_por_slug(&slug)
        .ok_or_else(|| AppError::NoEncontrado(format!("Categoría desconocida: {}", slug)))?;
    Ok(Json(json!({
        "titulo_pagina": categoria,
        "categoria": categoria,
        "juegos": catalogo::entradas_de_categoria(categoria),
    })))
}

async fn vista_juego(
    Path((categoria, juego)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let url = format!("/juegos/{}/{}", categoria, juego);
    let actividad = catalogo::buscar_por_url(&url)
        .ok_or_else(|| AppError::NoEncontrado(format!("Juego desconocido: {}", url)))?;
    Ok(Json(json!({
        "titulo_pagina": actividad.actividad,
        "categoria": actividad.categoria,
        "juego": actividad,
    })))
}

#[derive(Debug, Deserialize)]
struct ResultadoForm {
    paciente_email: String,
    categoria: String,
    juego: String,
    paso_completado: i32,
    total_pasos: i32,
    #[serde(default)]
    completado: bool,
    #[serde(default)]
    notas: String,
    #[serde(default)]
    puntos: Option<i64>,
    #[serde(default)]
    nivel: Option<i64>,
}

/// Registro de progresso enviado pelo jogo. Uma conclusão também entra no
/// histórico de atividades com feedback pendente para avaliação do médico.
async fn registrar_resultado(
    State(state): State<AppState>,
    Form(form): Form<ResultadoForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    if form.paciente_email.is_empty() {
        return Err(AppError::Validacion(
            "paciente_email es obligatorio".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO resultados_juegos
            (id, paciente_email, categoria, juego, paso_completado, total_pasos,
             completado, notas, puntos, nivel)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&form.paciente_email)
    .bind(&form.categoria)
    .bind(&form.juego)
    .bind(form.paso_completado)
    .bind(form.total_pasos)
    .bind(form.completado)
    .bind(&form.notas)
    .bind(form.puntos.unwrap_or(0))
    .bind(form.nivel.unwrap_or(1))
    .execute(&state.pool)
    .await?;

    if form.completado {
        sqlx::query(
            r#"
            INSERT INTO historial_actividades
                (id, paciente_email, actividad, categoria, puntos_obtenidos, nivel, feedback)
            VALUES (?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&form.paciente_email)
        .bind(&form.juego)
        .bind(&form.categoria)
        .bind(form.puntos.unwrap_or(0))
        .bind(form.nivel.unwrap_or(1))
        .execute(&state.pool)
        .await?;

        info!(
            paciente = %form.paciente_email,
            juego = %form.juego,
            "Juego completado"
        );
    }

    Ok(Json(json!({"status": "ok"})))
}

/// Regrava a tabela `actividades` a partir do catálogo embutido, uma linha
/// por categoria com a lista de nomes em JSON.
async fn sembrar_actividades(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut transaction = state
        .pool
        .begin()
        .await
        .map_err(fono_db::error::DbError::from)?;

    sqlx::query("DELETE FROM actividades")
        .execute(&mut *transaction)
        .await?;

    let categorias = catalogo::categorias();
    for &categoria in &categorias {
        let nombres: Vec<&str> = catalogo::entradas_de_categoria(categoria)
            .iter()
            .map(|a| a.actividad)
            .collect();
        sqlx::query("INSERT INTO actividades (id, categoria, actividades) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4())
            .bind(categoria)
            .bind(serde_json::to_string(&nombres).map_err(|e| {
                AppError::Interno(anyhow::anyhow!("Falha ao serializar catálogo: {}", e))
            })?)
            .execute(&mut *transaction)
            .await?;
    }

    transaction
        .commit()
        .await
        .map_err(fono_db::error::DbError::from)?;

    Ok(Json(json!({
        "status": "ok",
        "categorias": categorias.len(),
    })))
}
