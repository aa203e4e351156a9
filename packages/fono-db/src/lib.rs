//! Fono DB - Biblioteca compartilhada de acesso ao banco de dados da FonoApp
//!
//! Esta biblioteca fornece:
//! - Modelos de dados compartilhados (usuários, atribuições, resultados)
//! - Migrações automáticas do banco de dados
//! - Operações do ciclo de vida das atribuições médico-paciente
//! - Pool de conexão e funções de utilidades para SQLite
//!
//! O pool é construído explicitamente na inicialização e injetado nos
//! handlers; não existe handle global de conexão.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub mod asignaciones;
pub mod error;
pub mod migrations;
pub mod models;

/// Configuração da conexão com o banco de dados
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Caminho para o arquivo SQLite
    pub db_path: String,
    /// Número máximo de conexões no pool
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: "data/fono.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Inicializa o pool de conexões com o banco SQLite e aplica as migrações.
///
/// Chamado uma única vez na inicialização da aplicação; o pool resultante
/// é compartilhado via estado do servidor e fechado no desligamento.
pub async fn init_db_pool(config: &DbConfig) -> Result<SqlitePool> {
    let db_path = Path::new(&config.db_path);

    // Verifica se o diretório pai existe
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .context("Falha ao criar diretório para banco de dados")?;
        }
    }

    let connection_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true)
        .pragma("synchronous", "NORMAL");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connection_options)
        .await
        .context("Falha ao conectar ao banco de dados SQLite")?;

    // Aplica migrações automáticas
    migrations::run_migrations(&pool)
        .await
        .context("Falha ao aplicar migrações")?;

    info!("Banco de dados inicializado com sucesso: {}", config.db_path);
    Ok(pool)
}
