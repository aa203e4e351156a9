//! Erros HTTP da aplicação
//!
//! Mapeia a taxonomia da biblioteca (`DbError`) e as falhas de validação
//! para respostas HTTP. Sem retry nem distinção entre falhas transitórias
//! e permanentes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use fono_db::error::DbError;

#[derive(Error, Debug)]
pub enum AppError {
    /// Sem sessão ativa: redireciona ao login
    #[error("sessão ausente")]
    SinSesion,

    /// Sessão presente, porém com papel não autorizado para a rota
    #[error("papel não autorizado: {0}")]
    RolNegado(String),

    /// Entrada de formulário inválida
    #[error("entrada inválida: {0}")]
    Validacion(String),

    /// Identificador inexistente
    #[error("não encontrado: {0}")]
    NoEncontrado(String),

    /// Transição de estado recusada (accept/cancel fora de ordem)
    #[error("conflito: {0}")]
    Conflicto(String),

    #[error(transparent)]
    Db(DbError),

    #[error(transparent)]
    Interno(#[from] anyhow::Error),
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => AppError::NoEncontrado(msg),
            DbError::InvalidTransition(msg) => AppError::Conflicto(msg),
            DbError::Forbidden(msg) => AppError::RolNegado(msg),
            other => AppError::Db(other),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::from(DbError::from(err))
    }
}

fn error_json(status: StatusCode, mensaje: &str) -> Response {
    (status, Json(json!({ "error": mensaje }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::SinSesion => Redirect::to("/auth/login").into_response(),
            AppError::RolNegado(msg) => error_json(StatusCode::FORBIDDEN, &msg),
            AppError::Validacion(msg) => error_json(StatusCode::BAD_REQUEST, &msg),
            AppError::NoEncontrado(msg) => error_json(StatusCode::NOT_FOUND, &msg),
            AppError::Conflicto(msg) => error_json(StatusCode::CONFLICT, &msg),
            AppError::Db(err) => {
                error!("Erro de banco de dados: {}", err);
                error_json(StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor")
            }
            AppError::Interno(err) => {
                error!("Erro interno: {:#}", err);
                error_json(StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor")
            }
        }
    }
}
