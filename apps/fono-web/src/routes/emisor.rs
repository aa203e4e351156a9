//! Área do emissor (perfil reservado, ainda sem funcionalidades próprias)

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::security::SesionEmisor;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/emisor/home", get(vista_home))
}

async fn vista_home(_sesion: SesionEmisor) -> Json<serde_json::Value> {
    Json(json!({
        "titulo_pagina": "Inicio - Emisor",
    }))
}
