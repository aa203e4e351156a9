//! Binário do servidor web

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fono_db::init_db_pool;
use fono_web::config::AppConfig;
use fono_web::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    tokio::fs::create_dir_all(&config.uploads_dir)
        .await
        .with_context(|| {
            format!(
                "Falha ao criar o diretório de uploads {}",
                config.uploads_dir.display()
            )
        })?;

    let pool = init_db_pool(&config.db).await?;

    let state = AppState {
        pool: pool.clone(),
        uploads_dir: config.uploads_dir.clone(),
    };
    let app = build_router(state);

    info!(addr = %config.bind_addr, "Servidor iniciado");

    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Sinal de desligamento recebido");
        })
        .await
        .context("Falha no servidor HTTP")?;

    pool.close().await;
    info!("Pool de conexões encerrado");
    Ok(())
}
