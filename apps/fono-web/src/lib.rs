//! Fono Web - Plataforma web de fonoaudiologia interativa
//!
//! Arquitetura de rotas:
//! - `/auth/*`     - autenticação (login, registro)
//! - `/paciente/*` - dashboard do paciente (perfil, atividades do dia)
//! - `/emisor/*`   - painel do emissor (placeholder)
//! - `/admin/*`    - painel de administração (CRUD completo)
//! - `/doctor/*`   - painel do médico/terapeuta
//! - `/juegos/*`   - hub de jogos fonoaudiológicos (23 jogos, 7 categorias)
//! - `/`           - redireciona ao login
//!
//! Os handlers devolvem contextos de página em JSON e redirecionamentos
//! pós-formulário; a identidade de sessão viaja em dois cookies simples
//! (`usuario_email`, `usuario_rol`).

use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Limite global de requisições simultâneas
const MAX_CONCURRENT_REQUESTS: usize = 256;

pub mod catalogo;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;
pub mod seleccion;

/// Estado compartilhado entre handlers: pool injetado explicitamente
/// (aberto na inicialização, fechado no desligamento).
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// Diretório onde os uploads de conteúdo são gravados
    pub uploads_dir: PathBuf,
}

/// Monta o roteador completo da aplicação
pub fn build_router(state: AppState) -> Router {
    let uploads_dir = state.uploads_dir.clone();

    Router::new()
        .route("/", get(|| async { Redirect::to("/auth/login") }))
        .merge(routes::auth::router())
        .merge(routes::paciente::router())
        .merge(routes::admin::router())
        .merge(routes::doctor::router())
        .merge(routes::juegos::router())
        .merge(routes::emisor::router())
        .nest_service("/static/uploads", ServeDir::new(uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(GlobalConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn app_de_prueba() -> (Router, SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = fono_db::DbConfig {
            db_path: temp_dir
                .path()
                .join("test.db")
                .to_str()
                .unwrap()
                .to_string(),
            max_connections: 2,
        };
        let pool = fono_db::init_db_pool(&config).await.unwrap();
        let state = AppState {
            pool: pool.clone(),
            uploads_dir: temp_dir.path().join("uploads"),
        };
        (build_router(state), pool, temp_dir)
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_raiz_redirige_al_login() {
        let (app, _pool, _dir) = app_de_prueba().await;
        let respuesta = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::SEE_OTHER);
        assert_eq!(respuesta.headers()[LOCATION], "/auth/login");
    }

    #[tokio::test]
    async fn test_registro_y_login() {
        let (app, _pool, _dir) = app_de_prueba().await;

        let respuesta = app
            .clone()
            .oneshot(form_post(
                "/auth/registro",
                "nombre=Nino&email=nino%40fono.ec&password=secreto1&acepta_terminos=true",
            ))
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::SEE_OTHER);
        assert_eq!(respuesta.headers()[LOCATION], "/auth/login");

        let respuesta = app
            .oneshot(form_post(
                "/auth/login",
                "email=nino%40fono.ec&password=secreto1",
            ))
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::SEE_OTHER);

        let cookies: Vec<&str> = respuesta
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("usuario_email=")));
        assert!(cookies.iter().any(|c| c.starts_with("usuario_rol=paciente")));
    }

    #[tokio::test]
    async fn test_login_invalido() {
        let (app, _pool, _dir) = app_de_prueba().await;
        let respuesta = app
            .oneshot(form_post(
                "/auth/login",
                "email=nadie%40fono.ec&password=incorrecta",
            ))
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_exige_sesion() {
        let (app, _pool, _dir) = app_de_prueba().await;

        // Sem cookies: volta ao login
        let respuesta = app
            .clone()
            .oneshot(
                Request::get("/admin/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::SEE_OTHER);
        assert_eq!(respuesta.headers()[LOCATION], "/auth/login");

        // Sessão de paciente não passa pela guarda de admin
        let respuesta = app
            .oneshot(
                Request::get("/admin/dashboard")
                    .header(COOKIE, "usuario_email=nino@fono.ec; usuario_rol=paciente")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_doctor_home_prioriza_email_de_la_url() {
        let (app, pool, _dir) = app_de_prueba().await;

        for (nombre, email) in [("Dra", "dra@fono.ec"), ("Dr", "dr@fono.ec")] {
            sqlx::query(
                "INSERT INTO usuarios (id, nombre, email, password, rol) VALUES (?, ?, ?, 'x', 'medico')",
            )
            .bind(uuid::Uuid::new_v4())
            .bind(nombre)
            .bind(email)
            .execute(&pool)
            .await
            .unwrap();
        }

        // O login redireciona para /doctor/home?email=...; o parâmetro da
        // URL tem prioridade sobre o cookie
        let respuesta = app
            .oneshot(
                Request::get("/doctor/home?email=dr@fono.ec")
                    .header(COOKIE, "usuario_email=dra@fono.ec; usuario_rol=medico")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::OK);

        let cuerpo = hyper::body::to_bytes(respuesta.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&cuerpo).unwrap();
        assert_eq!(json["doctor"]["email"], "dr@fono.ec");
    }

    #[tokio::test]
    async fn test_juego_desconocido() {
        let (app, _pool, _dir) = app_de_prueba().await;
        let respuesta = app
            .oneshot(
                Request::get("/juegos/categoria-inexistente")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resultado_completado_genera_historial() {
        let (app, _pool, _dir) = app_de_prueba().await;
        let respuesta = app
            .clone()
            .oneshot(form_post(
                "/juegos/resultado",
                "paciente_email=nino%40fono.ec&categoria=Respiraci%C3%B3n&juego=El%20Globo%20M%C3%A1gico&paso_completado=5&total_pasos=5&completado=true&puntos=80",
            ))
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::OK);

        // A avaliação pendente aparece para o médico
        let respuesta = app
            .oneshot(
                Request::get("/doctor/evaluaciones-pendientes")
                    .header(COOKIE, "usuario_email=dra@fono.ec; usuario_rol=medico")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(respuesta.status(), StatusCode::OK);
        let cuerpo = hyper::body::to_bytes(respuesta.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&cuerpo).unwrap();
        assert_eq!(json["evaluaciones"].as_array().unwrap().len(), 1);
        assert_eq!(
            json["evaluaciones"][0]["actividad"],
            "El Globo Mágico"
        );
    }
}
