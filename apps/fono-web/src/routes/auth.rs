//! Autenticação: login e registro
//!
//! Fluxo do login:
//! 1. busca o usuário pelo e-mail
//! 2. verifica a senha (argon2, com fallback legado em texto plano;
//!    contas legadas são migradas para o hash neste momento)
//! 3. emite os cookies de sessão e redireciona conforme o papel:
//!    admin -> /admin/dashboard, medico -> /doctor/home,
//!    paciente -> /paciente/perfil, emisor -> /emisor/home
//!
//! Somente pacientes se registram sozinhos; médicos e admins são criados
//! pelo administrador.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::security::{cookies_de_sesion, es_hash_argon2, hash_password, verify_password};
use crate::AppState;
use fono_db::models::{Rol, Usuario};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(mostrar_login).post(procesar_login))
        .route("/auth/registro", get(mostrar_registro).post(procesar_registro))
}

async fn mostrar_login() -> Json<serde_json::Value> {
    Json(json!({ "titulo_pagina": "Iniciar sesión" }))
}

async fn mostrar_registro() -> Json<serde_json::Value> {
    Json(json!({ "titulo_pagina": "Crear cuenta" }))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

fn credenciales_invalidas(email: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "titulo_pagina": "Iniciar sesión",
            "error": "Credenciales inválidas. Verifica tu correo y contraseña.",
            "email": email,
        })),
    )
        .into_response()
}

async fn procesar_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let usuario = sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE email = ?")
        .bind(&form.email)
        .fetch_optional(&state.pool)
        .await?;

    let Some(usuario) = usuario else {
        return Ok(credenciales_invalidas(&form.email));
    };
    if !verify_password(&form.password, &usuario.password) {
        return Ok(credenciales_invalidas(&form.email));
    }

    // Migração automática: contas legadas com senha em texto plano
    // recebem o hash no primeiro login bem-sucedido
    if !es_hash_argon2(&usuario.password) {
        let nuevo_hash = hash_password(&form.password)?;
        sqlx::query("UPDATE usuarios SET password = ? WHERE id = ?")
            .bind(&nuevo_hash)
            .bind(usuario.id)
            .execute(&state.pool)
            .await?;
        info!(usuario = %usuario.email, "Senha legada migrada para argon2");
    }

    let destino = match usuario.rol {
        Rol::Admin => "/admin/dashboard".to_string(),
        Rol::Medico => format!("/doctor/home?email={}", usuario.email),
        Rol::Paciente => format!("/paciente/perfil?email={}", usuario.email),
        Rol::Emisor => "/emisor/home".to_string(),
    };

    let headers = cookies_de_sesion(&usuario.email, usuario.rol)?;
    Ok((headers, Redirect::to(&destino)).into_response())
}

#[derive(Debug, Deserialize, Validate)]
struct RegistroForm {
    nombre: String,
    #[validate(email(message = "Correo inválido"))]
    email: String,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    password: String,
    #[serde(default)]
    acepta_terminos: bool,
}

fn registro_invalido(form: &RegistroForm, error: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "titulo_pagina": "Crear cuenta",
            "error": error,
            "nombre": form.nombre,
            "email": form.email,
        })),
    )
        .into_response()
}

async fn procesar_registro(
    State(state): State<AppState>,
    Form(form): Form<RegistroForm>,
) -> Result<Response, AppError> {
    if !form.acepta_terminos {
        return Ok(registro_invalido(
            &form,
            "Debes aceptar los términos y condiciones.",
        ));
    }
    if let Err(errores) = form.validate() {
        return Ok(registro_invalido(&form, &errores.to_string()));
    }

    let existente: Option<i64> = sqlx::query_scalar("SELECT 1 FROM usuarios WHERE email = ?")
        .bind(&form.email)
        .fetch_optional(&state.pool)
        .await?;
    if existente.is_some() {
        return Ok(registro_invalido(
            &form,
            "Ya existe una cuenta con este correo.",
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO usuarios (id, nombre, email, password, rol, estado, nivel, puntos)
        VALUES (?, ?, ?, ?, 'paciente', 'activo', 1, 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&form.nombre)
    .bind(&form.email)
    .bind(hash_password(&form.password)?)
    .execute(&state.pool)
    .await?;

    info!(email = %form.email, "Novo paciente registrado");

    Ok(Redirect::to("/auth/login").into_response())
}
