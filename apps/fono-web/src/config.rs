//! Configuração da aplicação
//!
//! Os valores vêm de variáveis de ambiente (carregadas com dotenvy a partir
//! de um `.env` opcional); os defaults servem ao desenvolvimento local.
//!
//! Variáveis reconhecidas:
//!   FONO_BIND_ADDR       - endereço de escuta (default 127.0.0.1:8080)
//!   FONO_DB_PATH         - caminho do arquivo SQLite
//!   FONO_MAX_CONNECTIONS - tamanho do pool
//!   FONO_UPLOADS_DIR     - diretório dos uploads de conteúdo

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use fono_db::DbConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub uploads_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().expect("endereço default válido"),
            db: DbConfig::default(),
            uploads_dir: PathBuf::from("data/uploads"),
        }
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Carrega a configuração a partir do ambiente
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        let bind_addr = match env::var("FONO_BIND_ADDR") {
            Ok(raw) => raw
                .parse::<SocketAddr>()
                .with_context(|| format!("FONO_BIND_ADDR inválido: {}", raw))?,
            Err(_) => defaults.bind_addr,
        };

        let db = DbConfig {
            db_path: env::var("FONO_DB_PATH").unwrap_or(defaults.db.db_path),
            max_connections: env_u32("FONO_MAX_CONNECTIONS", defaults.db.max_connections),
        };

        let uploads_dir = env::var("FONO_UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.uploads_dir);

        Ok(Self {
            bind_addr,
            db,
            uploads_dir,
        })
    }
}
