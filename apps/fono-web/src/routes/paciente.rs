//! Dashboard e perfil do paciente
//!
//! O dashboard devolve:
//! 1. o perfil estendido (quando existe)
//! 2. o calendário de uso do mês corrente (minutos por dia)
//! 3. as 4 atividades do dia, determinísticas por (data, e-mail), ou as
//!    prescritas pela atribuição aceita do médico

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::{Form, Json, Router};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::security::Sesion;
use crate::{seleccion, AppState};
use fono_db::asignaciones;
use fono_db::models::{PerfilPaciente, SesionApp};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/paciente/perfil",
        get(vista_perfil_paciente).post(guardar_perfil_paciente),
    )
}

#[derive(Debug, Deserialize)]
struct PerfilQuery {
    email: Option<String>,
}

async fn vista_perfil_paciente(
    sesion: Sesion,
    State(state): State<AppState>,
    Query(query): Query<PerfilQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Prioridade: query param -> cookie de sessão
    let email = query
        .email
        .filter(|e| !e.is_empty())
        .unwrap_or(sesion.email);

    let perfil = sqlx::query_as::<_, PerfilPaciente>(
        "SELECT * FROM perfiles_pacientes WHERE paciente_email = ?",
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?;

    // Calendário do mês corrente: minutos somados por dia
    let hoy = Utc::now().date_naive();
    let primer_dia = NaiveDate::from_ymd_opt(hoy.year(), hoy.month(), 1)
        .expect("primeiro dia do mês sempre existe");
    let sesiones = sqlx::query_as::<_, SesionApp>(
        "SELECT * FROM sesiones_app WHERE paciente_email = ? AND fecha >= ?",
    )
    .bind(&email)
    .bind(primer_dia)
    .fetch_all(&state.pool)
    .await?;

    let mut sesiones_por_dia: BTreeMap<String, i32> = BTreeMap::new();
    for sesion_app in sesiones {
        let dia = sesion_app.fecha.format("%Y-%m-%d").to_string();
        *sesiones_por_dia.entry(dia).or_insert(0) += sesion_app.minutos_conectado;
    }

    // Atividades do dia: prescrições da atribuição aceita, ou seleção
    // determinística por (data, e-mail)
    let asignacion = asignaciones::asignacion_aceptada(&state.pool, &email).await?;
    let prescripciones = asignacion
        .as_ref()
        .map(|a| a.actividades_asignadas.as_slice());
    let actividades = seleccion::seleccion_diaria(hoy, &email, prescripciones);
    let actividades_disponibles = seleccion::agrupar_por_categoria(&actividades);

    Ok(Json(json!({
        "titulo_pagina": "Mi perfil",
        "perfil": perfil,
        "sesiones_por_dia": sesiones_por_dia,
        "email_paciente": email,
        "actividades_disponibles": actividades_disponibles,
    })))
}

#[derive(Debug, Deserialize)]
struct PerfilForm {
    paciente_email: String,
    nombre: String,
    edad: i32,
    /// Preescolar, Primaria, Secundaria, Bachillerato, Universidad, Otro
    escolaridad: String,
    /// Masculino, Femenino, Otro
    genero: String,
    tutor: String,
    /// Madre, Padre, Abuelo, etc.
    parentesco: String,
}

async fn guardar_perfil_paciente(
    _sesion: Sesion,
    State(state): State<AppState>,
    Form(form): Form<PerfilForm>,
) -> Result<Redirect, AppError> {
    // Upsert atômico: atualiza mantendo a fecha_registro original
    sqlx::query(
        r#"
        INSERT INTO perfiles_pacientes
            (id, paciente_email, nombre, edad, escolaridad, genero, fecha_registro,
             tutor, parentesco)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (paciente_email) DO UPDATE SET
            nombre = excluded.nombre,
            edad = excluded.edad,
            escolaridad = excluded.escolaridad,
            genero = excluded.genero,
            tutor = excluded.tutor,
            parentesco = excluded.parentesco
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&form.paciente_email)
    .bind(&form.nombre)
    .bind(form.edad)
    .bind(&form.escolaridad)
    .bind(&form.genero)
    .bind(Utc::now())
    .bind(&form.tutor)
    .bind(&form.parentesco)
    .execute(&state.pool)
    .await?;

    Ok(Redirect::to(&format!(
        "/paciente/perfil?email={}",
        form.paciente_email
    )))
}
