//! Sistema de migrações para banco de dados
//!
//! Este módulo gerencia as migrações do banco de dados SQLite da FonoApp.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{error, info};

/// Lista de migrações SQL a serem aplicadas
const MIGRATIONS: &[&str] = &[
    // 001_initial_schema.sql
    r#"
    -- Tabela de usuários: pacientes, médicos, admins e emissores
    CREATE TABLE IF NOT EXISTS usuarios (
        id TEXT PRIMARY KEY NOT NULL,
        creado_en TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        nombre TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        rol TEXT NOT NULL CHECK (rol IN ('admin', 'medico', 'paciente', 'emisor')),
        estado TEXT NOT NULL DEFAULT 'activo' CHECK (estado IN ('activo', 'ocupado', 'consulta')),
        nivel INTEGER NOT NULL DEFAULT 1,
        puntos INTEGER NOT NULL DEFAULT 0,
        activo BOOLEAN NOT NULL DEFAULT 1
    );

    -- Perfil estendido do paciente (um por e-mail)
    CREATE TABLE IF NOT EXISTS perfiles_pacientes (
        id TEXT PRIMARY KEY NOT NULL,
        paciente_email TEXT NOT NULL UNIQUE,
        nombre TEXT NOT NULL,
        edad INTEGER NOT NULL,
        escolaridad TEXT NOT NULL,
        genero TEXT NOT NULL,
        fecha_registro TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        tutor TEXT NOT NULL,
        parentesco TEXT NOT NULL
    );

    -- Atribuições médico-paciente
    CREATE TABLE IF NOT EXISTS asignaciones (
        id TEXT PRIMARY KEY NOT NULL,
        paciente_email TEXT NOT NULL,
        medico_email TEXT NOT NULL,
        actividades_asignadas TEXT NOT NULL DEFAULT '[]', -- JSON: lista de {categoria, actividad}
        dificultad TEXT NOT NULL DEFAULT 'media' CHECK (dificultad IN ('facil', 'media', 'dificil')),
        fecha_asignacion TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        estado TEXT NOT NULL DEFAULT 'pendiente' CHECK (estado IN ('pendiente', 'aceptada', 'cancelada')),
        tipo TEXT NOT NULL DEFAULT 'automatica' CHECK (tipo IN ('automatica', 'manual'))
    );

    -- Histórico de atividades completadas (avaliação do médico)
    CREATE TABLE IF NOT EXISTS historial_actividades (
        id TEXT PRIMARY KEY NOT NULL,
        paciente_email TEXT NOT NULL,
        categoria TEXT NOT NULL,
        actividad TEXT NOT NULL,
        puntos_obtenidos INTEGER NOT NULL DEFAULT 0,
        nivel INTEGER NOT NULL DEFAULT 1,
        fecha TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        feedback TEXT -- NULL = pendente de avaliação
    );

    -- Resultados detalhados de cada jogo
    CREATE TABLE IF NOT EXISTS resultados_juegos (
        id TEXT PRIMARY KEY NOT NULL,
        paciente_email TEXT NOT NULL,
        categoria TEXT NOT NULL,
        juego TEXT NOT NULL,
        paso_completado INTEGER NOT NULL,
        total_pasos INTEGER NOT NULL,
        completado BOOLEAN NOT NULL DEFAULT 0,
        fecha TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        notas TEXT,
        puntos INTEGER NOT NULL DEFAULT 0,
        nivel INTEGER NOT NULL DEFAULT 1
    );

    -- Sessões de uso diário (calendário do paciente); uma linha por dia
    CREATE TABLE IF NOT EXISTS sesiones_app (
        id TEXT PRIMARY KEY NOT NULL,
        paciente_email TEXT NOT NULL,
        fecha DATE NOT NULL,
        minutos_conectado INTEGER NOT NULL DEFAULT 0,
        UNIQUE (paciente_email, fecha)
    );

    -- Conteúdo multimídia do sistema; linha única com id fixo em 1
    CREATE TABLE IF NOT EXISTS contenido_admin (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        imagenes TEXT NOT NULL DEFAULT '[]',          -- JSON: rotas em /static/uploads/
        videos TEXT NOT NULL DEFAULT '[]',            -- JSON: rotas em /static/uploads/
        audios_referencia TEXT NOT NULL DEFAULT '[]', -- JSON: rotas de áudios de referência
        textos_sistema TEXT NOT NULL DEFAULT '[]',    -- JSON: lista de {texto, tipo, fecha}
        instrucciones TEXT
    );

    -- Espelho persistido do catálogo de atividades (uma linha por categoria)
    CREATE TABLE IF NOT EXISTS actividades (
        id TEXT PRIMARY KEY NOT NULL,
        categoria TEXT NOT NULL UNIQUE,
        actividades TEXT NOT NULL DEFAULT '[]' -- JSON: nomes das atividades
    );

    -- Índices para otimização
    CREATE INDEX IF NOT EXISTS idx_usuarios_rol ON usuarios (rol);
    CREATE INDEX IF NOT EXISTS idx_usuarios_rol_estado ON usuarios (rol, estado);
    CREATE INDEX IF NOT EXISTS idx_asignaciones_paciente ON asignaciones (paciente_email);
    CREATE INDEX IF NOT EXISTS idx_asignaciones_medico ON asignaciones (medico_email);
    CREATE INDEX IF NOT EXISTS idx_asignaciones_estado ON asignaciones (estado);
    CREATE INDEX IF NOT EXISTS idx_historial_paciente ON historial_actividades (paciente_email);
    CREATE INDEX IF NOT EXISTS idx_historial_fecha ON historial_actividades (fecha);
    CREATE INDEX IF NOT EXISTS idx_resultados_paciente ON resultados_juegos (paciente_email);
    CREATE INDEX IF NOT EXISTS idx_resultados_fecha ON resultados_juegos (fecha);
    CREATE INDEX IF NOT EXISTS idx_sesiones_paciente_fecha ON sesiones_app (paciente_email, fecha);
    "#,
];

/// Executa todas as migrações pendentes no banco de dados
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Aplicando migrações de banco de dados...");

    // Obter a versão atual do banco de dados
    let mut version: i64 = 0;
    match sqlx::query_scalar("PRAGMA user_version").fetch_one(pool).await {
        Ok(v) => version = v,
        Err(e) => {
            error!("Erro ao obter versão do banco: {}", e);
            // Continuar mesmo assim, pois pode ser a primeira execução
        }
    }

    info!("Versão atual do banco: {}", version);

    // Aplicar cada migração pendente sequencialmente
    for (i, migration_sql) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as i64;

        // Pular migrações já aplicadas
        if migration_version <= version {
            info!("Migração {} já aplicada", migration_version);
            continue;
        }

        info!("Aplicando migração {}...", migration_version);

        // Executar em uma transação para garantir atomicidade
        let mut transaction = pool.begin().await.context(format!(
            "Falha ao iniciar transação para migração {}",
            migration_version
        ))?;

        sqlx::query(migration_sql)
            .execute(&mut *transaction)
            .await
            .context(format!("Falha ao executar migração {}", migration_version))?;

        sqlx::query(&format!("PRAGMA user_version = {}", migration_version))
            .execute(&mut *transaction)
            .await
            .context(format!("Falha ao atualizar versão para {}", migration_version))?;

        transaction.commit().await.context(format!(
            "Falha ao confirmar transação para migração {}",
            migration_version
        ))?;

        info!("Migração {} aplicada com sucesso", migration_version);
    }

    info!("Migrações concluídas. Versão atual: {}", MIGRATIONS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use sqlx::SqlitePool;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_migrations() -> Result<()> {
        // Usar diretório temporário para testes
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test_migrations.db");

        let conn_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(conn_options).await?;

        // Aplicar migrações
        run_migrations(&pool).await?;

        // Verificar versão do banco
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&pool)
            .await?;

        assert_eq!(version, MIGRATIONS.len() as i64);

        // Verificar se tabelas foram criadas
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&pool)
        .await?;

        assert!(tables.contains(&"usuarios".to_string()));
        assert!(tables.contains(&"perfiles_pacientes".to_string()));
        assert!(tables.contains(&"asignaciones".to_string()));
        assert!(tables.contains(&"historial_actividades".to_string()));
        assert!(tables.contains(&"resultados_juegos".to_string()));
        assert!(tables.contains(&"sesiones_app".to_string()));
        assert!(tables.contains(&"contenido_admin".to_string()));
        assert!(tables.contains(&"actividades".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test_idem.db");

        let conn_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(conn_options).await?;

        run_migrations(&pool).await?;
        // Segunda execução não deve falhar nem reaplicar nada
        run_migrations(&pool).await?;

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&pool)
            .await?;
        assert_eq!(version, MIGRATIONS.len() as i64);

        Ok(())
    }
}
