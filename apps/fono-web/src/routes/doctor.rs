//! Área do médico
//!
//! Acompanhamento de pacientes, gestão do próprio estado de disponibilidade,
//! aceite e cancelamento de atribuições e avaliação de atividades concluídas.

use std::collections::BTreeMap;
use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::catalogo;
use crate::error::AppError;
use crate::security::SesionMedico;
use crate::AppState;
use fono_db::asignaciones;
use fono_db::models::{
    EstadoMedico, HistorialActividad, PerfilPaciente, ResultadoJuego, Usuario,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/doctor/home", get(vista_home))
        .route("/doctor/estado", post(cambiar_estado))
        .route("/doctor/pacientes", get(listar_pacientes))
        .route("/doctor/pacientes/:id", get(detalle_paciente))
        .route("/doctor/pacientes/:id/editar", post(editar_paciente))
        .route("/doctor/actividades", get(vista_actividades))
        .route("/doctor/asignaciones", get(vista_asignaciones))
        .route("/doctor/asignaciones/:id/aceptar", post(aceptar_asignacion))
        .route("/doctor/asignaciones/:id/cancelar", post(cancelar_asignacion))
        .route("/doctor/historial", get(vista_historial))
        .route("/doctor/resultados", get(vista_resultados))
        .route("/doctor/evaluaciones-pendientes", get(evaluaciones_pendientes))
        .route("/doctor/evaluaciones/:id/feedback", post(registrar_feedback))
}

async fn buscar_doctor(state: &AppState, email: &str) -> Result<Option<Usuario>, AppError> {
    let doctor =
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE email = ? AND rol = 'medico'")
            .bind(email)
            .fetch_optional(&state.pool)
            .await?;
    if doctor.is_some() {
        return Ok(doctor);
    }
    // Sessões antigas podem apontar para um médico removido; cai no primeiro
    // cadastro para a home não quebrar.
    Ok(
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE rol = 'medico' LIMIT 1")
            .fetch_optional(&state.pool)
            .await?,
    )
}

#[derive(Debug, Deserialize)]
struct HomeQuery {
    email: Option<String>,
}

async fn vista_home(
    sesion: SesionMedico,
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Prioridade: query param -> cookie de sessão (o login redireciona
    // para /doctor/home?email=...)
    let email = query
        .email
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| sesion.email.clone());
    let doctor = buscar_doctor(&state, &email).await?;
    let evaluaciones_pendientes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM historial_actividades WHERE feedback IS NULL OR feedback = ''",
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(json!({
        "titulo_pagina": "Inicio - Doctor",
        "doctor": doctor,
        "evaluaciones_pendientes": evaluaciones_pendientes,
    })))
}

#[derive(Debug, Deserialize)]
struct EstadoForm {
    estado: String,
}

/// Progresso de um paciente em uma categoria de jogos
#[derive(Debug, Default, serde::Serialize)]
struct StatsCategoria {
    completados: i64,
    en_progreso: i64,
    total: i64,
}

/// O médico alterna o próprio estado; `ocupado` e `consulta` o retiram do
/// sorteio de atribuições automáticas.
async fn cambiar_estado(
    sesion: SesionMedico,
    State(state): State<AppState>,
    Form(form): Form<EstadoForm>,
) -> Result<Redirect, AppError> {
    let estado = EstadoMedico::parse(&form.estado)
        .ok_or_else(|| AppError::Validacion(format!("Estado inválido: {}", form.estado)))?;
    sqlx::query("UPDATE usuarios SET estado = ? WHERE email = ? AND rol = 'medico'")
        .bind(estado.to_string())
        .bind(&sesion.email)
        .execute(&state.pool)
        .await?;
    Ok(Redirect::to("/doctor/home"))
}

/// Pacientes com contagem de jogos registrados e concluídos
async fn listar_pacientes(
    _sesion: SesionMedico,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pacientes =
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE rol = 'paciente'")
            .fetch_all(&state.pool)
            .await?;

    let mut listado = Vec::with_capacity(pacientes.len());
    for paciente in pacientes {
        let total_juegos: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM resultados_juegos WHERE paciente_email = ?",
        )
        .bind(&paciente.email)
        .fetch_one(&state.pool)
        .await?;
        let juegos_completados: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM resultados_juegos WHERE paciente_email = ? AND completado = 1",
        )
        .bind(&paciente.email)
        .fetch_one(&state.pool)
        .await?;

        let mut valor = serde_json::to_value(&paciente).unwrap_or_default();
        if let Some(objeto) = valor.as_object_mut() {
            objeto.insert("total_juegos".to_string(), json!(total_juegos));
            objeto.insert("juegos_completados".to_string(), json!(juegos_completados));
        }
        listado.push(valor);
    }

    Ok(Json(json!({
        "titulo_pagina": "Pacientes",
        "pacientes": listado,
    })))
}

/// Detalhe de um paciente: perfil, últimos resultados, progresso por
/// categoria e histórico recente. Paciente inexistente volta à lista.
async fn detalle_paciente(
    _sesion: SesionMedico,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    use axum::response::IntoResponse;

    let paciente = sqlx::query_as::<_, Usuario>(
        "SELECT * FROM usuarios WHERE id = ? AND rol = 'paciente'",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;
    let Some(paciente) = paciente else {
        return Ok(Redirect::to("/doctor/pacientes").into_response());
    };

    let perfil = sqlx::query_as::<_, PerfilPaciente>(
        "SELECT * FROM perfiles_pacientes WHERE paciente_email = ?",
    )
    .bind(&paciente.email)
    .fetch_optional(&state.pool)
    .await?;

    let resultados = sqlx::query_as::<_, ResultadoJuego>(
        "SELECT * FROM resultados_juegos WHERE paciente_email = ? ORDER BY fecha DESC LIMIT 10",
    )
    .bind(&paciente.email)
    .fetch_all(&state.pool)
    .await?;

    let todos = sqlx::query_as::<_, ResultadoJuego>(
        "SELECT * FROM resultados_juegos WHERE paciente_email = ?",
    )
    .bind(&paciente.email)
    .fetch_all(&state.pool)
    .await?;
    let mut stats_por_categoria: BTreeMap<String, StatsCategoria> = BTreeMap::new();
    for resultado in &todos {
        let stats = stats_por_categoria
            .entry(resultado.categoria.clone())
            .or_default();
        if resultado.completado {
            stats.completados += 1;
        } else {
            stats.en_progreso += 1;
        }
        stats.total += 1;
    }

    let historial = sqlx::query_as::<_, HistorialActividad>(
        "SELECT * FROM historial_actividades WHERE paciente_email = ? ORDER BY fecha DESC LIMIT 10",
    )
    .bind(&paciente.email)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({
        "titulo_pagina": format!("Paciente: {}", paciente.nombre),
        "paciente": paciente,
        "perfil": perfil,
        "resultados_recientes": resultados,
        "stats_por_categoria": stats_por_categoria,
        "historial": historial,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
struct EditarPacienteForm {
    nombre: String,
    email: String,
}

async fn editar_paciente(
    _sesion: SesionMedico,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<EditarPacienteForm>,
) -> Result<Redirect, AppError> {
    sqlx::query("UPDATE usuarios SET nombre = ?, email = ? WHERE id = ? AND rol = 'paciente'")
        .bind(&form.nombre)
        .bind(&form.email)
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(Redirect::to(&format!("/doctor/pacientes/{}", id)))
}

async fn vista_actividades(
    _sesion: SesionMedico,
) -> Json<serde_json::Value> {
    Json(json!({
        "titulo_pagina": "Juegos disponibles",
        "juegos_disponibles": catalogo::agrupado(),
    }))
}

/// Todas as atribuições mais os pacientes ainda sem nenhuma
async fn vista_asignaciones(
    _sesion: SesionMedico,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let lista = asignaciones::listar_todas(&state.pool).await?;
    let asignados: HashSet<&str> = lista
        .iter()
        .map(|a| a.paciente_email.as_str())
        .collect();

    let pacientes =
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE rol = 'paciente'")
            .fetch_all(&state.pool)
            .await?;
    let sin_asignar: Vec<&Usuario> = pacientes
        .iter()
        .filter(|p| !asignados.contains(p.email.as_str()))
        .collect();

    Ok(Json(json!({
        "titulo_pagina": "Asignaciones",
        "asignaciones": lista,
        "pacientes_sin_asignar": sin_asignar,
    })))
}

async fn aceptar_asignacion(
    sesion: SesionMedico,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    asignaciones::aceptar(&state.pool, id, &sesion.email).await?;
    Ok(Redirect::to("/doctor/asignaciones"))
}

async fn cancelar_asignacion(
    sesion: SesionMedico,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    asignaciones::cancelar(&state.pool, id, &sesion.email).await?;
    Ok(Redirect::to("/doctor/asignaciones"))
}

async fn vista_historial(
    _sesion: SesionMedico,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let historial = sqlx::query_as::<_, HistorialActividad>(
        "SELECT * FROM historial_actividades ORDER BY fecha DESC",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(json!({
        "titulo_pagina": "Historial de actividades",
        "historial": historial,
    })))
}

async fn vista_resultados(
    _sesion: SesionMedico,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let resultados = sqlx::query_as::<_, ResultadoJuego>(
        "SELECT * FROM resultados_juegos ORDER BY fecha DESC LIMIT 100",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(json!({
        "titulo_pagina": "Resultados de juegos",
        "resultados": resultados,
    })))
}

/// Atividades concluídas que ainda não receberam parecer do médico
async fn evaluaciones_pendientes(
    _sesion: SesionMedico,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pendientes = sqlx::query_as::<_, HistorialActividad>(
        r#"
        SELECT * FROM historial_actividades
        WHERE feedback IS NULL OR feedback = ''
        ORDER BY fecha DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(json!({
        "titulo_pagina": "Evaluaciones pendientes",
        "evaluaciones": pendientes,
    })))
}

#[derive(Debug, Deserialize)]
struct FeedbackForm {
    feedback: String,
}

async fn registrar_feedback(
    _sesion: SesionMedico,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<FeedbackForm>,
) -> Result<Redirect, AppError> {
    let resultado = sqlx::query("UPDATE historial_actividades SET feedback = ? WHERE id = ?")
        .bind(&form.feedback)
        .bind(id)
        .execute(&state.pool)
        .await?;
    if resultado.rows_affected() == 0 {
        return Err(AppError::NoEncontrado(
            "Actividad no encontrada".to_string(),
        ));
    }
    Ok(Redirect::to("/doctor/evaluaciones-pendientes"))
}
