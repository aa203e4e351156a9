//! Ciclo de vida das atribuições médico-paciente
//!
//! Estados: `pendiente -> aceptada | cancelada`; os estados terminais nunca
//! mudam. As transições são executadas como UPDATEs guardados por estado,
//! de modo que dois accept/cancel concorrentes se resolvem no próprio banco:
//! o perdedor afeta 0 linhas e recebe o erro de transição correspondente.

use chrono::Utc;
use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{
    Asignacion, Dificultad, EstadoAsignacion, Prescripcion, TipoAsignacion, Usuario,
};

/// Médicos elegíveis para atribuição automática: papel `medico` e estado
/// disponível segundo `EstadoMedico::disponible_para_asignacion`.
pub async fn medicos_disponibles(pool: &SqlitePool) -> Result<Vec<Usuario>, DbError> {
    let medicos = sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE rol = 'medico'")
        .fetch_all(pool)
        .await?;
    Ok(medicos
        .into_iter()
        .filter(|m| m.estado.disponible_para_asignacion())
        .collect())
}

async fn insertar(
    pool: &SqlitePool,
    paciente_email: &str,
    medico_email: &str,
    actividades: &[Prescripcion],
    dificultad: Dificultad,
    tipo: TipoAsignacion,
) -> Result<Asignacion, DbError> {
    let id = Uuid::new_v4();
    let actividades_json = serde_json::to_string(actividades)
        .map_err(|e| DbError::InternalError(format!("Falha ao serializar prescrições: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO asignaciones
            (id, paciente_email, medico_email, actividades_asignadas,
             dificultad, fecha_asignacion, estado, tipo)
        VALUES (?, ?, ?, ?, ?, ?, 'pendiente', ?)
        "#,
    )
    .bind(id)
    .bind(paciente_email)
    .bind(medico_email)
    .bind(&actividades_json)
    .bind(dificultad.to_string())
    .bind(Utc::now())
    .bind(tipo.to_string())
    .execute(pool)
    .await?;

    info!(
        paciente = paciente_email,
        medico = medico_email,
        tipo = %tipo,
        "Atribuição criada em estado pendente"
    );

    buscar(pool, id).await
}

/// Cria uma atribuição automática: sorteia um médico elegível de maneira
/// uniforme. Sem médicos elegíveis a operação é um no-op e retorna `None`
/// (nenhum registro é criado).
pub async fn crear_automatica(
    pool: &SqlitePool,
    paciente_email: &str,
    dificultad: Dificultad,
) -> Result<Option<Asignacion>, DbError> {
    let medicos = medicos_disponibles(pool).await?;

    let Some(medico) = medicos.choose(&mut rand::thread_rng()) else {
        info!(
            paciente = paciente_email,
            "Nenhum médico disponível; atribuição automática não criada"
        );
        return Ok(None);
    };

    let asignacion = insertar(
        pool,
        paciente_email,
        &medico.email,
        &[],
        dificultad,
        TipoAsignacion::Automatica,
    )
    .await?;
    Ok(Some(asignacion))
}

/// Cria uma atribuição manual: o admin escolhe o médico explicitamente.
pub async fn crear_manual(
    pool: &SqlitePool,
    paciente_email: &str,
    medico_email: &str,
    actividades: Vec<Prescripcion>,
    dificultad: Dificultad,
) -> Result<Asignacion, DbError> {
    insertar(
        pool,
        paciente_email,
        medico_email,
        &actividades,
        dificultad,
        TipoAsignacion::Manual,
    )
    .await
}

/// Busca uma atribuição pelo id
pub async fn buscar(pool: &SqlitePool, id: Uuid) -> Result<Asignacion, DbError> {
    let asignacion = sqlx::query_as::<_, Asignacion>("SELECT * FROM asignaciones WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Atribuição {} não encontrada", id)))?;
    Ok(asignacion)
}

/// Lista todas as atribuições (visão global do admin)
pub async fn listar_todas(pool: &SqlitePool) -> Result<Vec<Asignacion>, DbError> {
    let asignaciones =
        sqlx::query_as::<_, Asignacion>("SELECT * FROM asignaciones ORDER BY fecha_asignacion DESC")
            .fetch_all(pool)
            .await?;
    Ok(asignaciones)
}

/// Lista as atribuições de um médico
pub async fn listar_por_medico(
    pool: &SqlitePool,
    medico_email: &str,
) -> Result<Vec<Asignacion>, DbError> {
    let asignaciones = sqlx::query_as::<_, Asignacion>(
        "SELECT * FROM asignaciones WHERE medico_email = ? ORDER BY fecha_asignacion DESC",
    )
    .bind(medico_email)
    .fetch_all(pool)
    .await?;
    Ok(asignaciones)
}

/// Atribuição com autoridade sobre a seleção diária do paciente: a mais
/// recente em estado `aceptada`. Pendentes múltiplas podem coexistir.
pub async fn asignacion_aceptada(
    pool: &SqlitePool,
    paciente_email: &str,
) -> Result<Option<Asignacion>, DbError> {
    let asignacion = sqlx::query_as::<_, Asignacion>(
        r#"
        SELECT * FROM asignaciones
        WHERE paciente_email = ? AND estado = 'aceptada'
        ORDER BY fecha_asignacion DESC
        LIMIT 1
        "#,
    )
    .bind(paciente_email)
    .fetch_optional(pool)
    .await?;
    Ok(asignacion)
}

async fn transicionar(
    pool: &SqlitePool,
    id: Uuid,
    medico_email: &str,
    destino: EstadoAsignacion,
) -> Result<Asignacion, DbError> {
    // Estados de origem derivados da guarda do ciclo de vida
    let origenes: Vec<String> = [
        EstadoAsignacion::Pendiente,
        EstadoAsignacion::Aceptada,
        EstadoAsignacion::Cancelada,
    ]
    .into_iter()
    .filter(|origen| origen.puede_transicionar_a(destino))
    .map(|origen| origen.to_string())
    .collect();

    if origenes.is_empty() {
        return Err(DbError::InvalidTransition(format!(
            "Nenhuma transição leva ao estado {}",
            destino
        )));
    }

    let marcadores = vec!["?"; origenes.len()].join(", ");
    let sql = format!(
        "UPDATE asignaciones SET estado = ? WHERE id = ? AND medico_email = ? AND estado IN ({})",
        marcadores
    );
    let mut consulta = sqlx::query(&sql)
        .bind(destino.to_string())
        .bind(id)
        .bind(medico_email);
    for origen in &origenes {
        consulta = consulta.bind(origen.as_str());
    }
    let resultado = consulta.execute(pool).await?;

    if resultado.rows_affected() == 1 {
        info!(asignacion = %id, medico = medico_email, estado = %destino, "Transição aplicada");
        return buscar(pool, id).await;
    }

    // 0 linhas afetadas: classificar o motivo para o chamador
    let actual = buscar(pool, id).await?;
    if actual.medico_email != medico_email {
        return Err(DbError::Forbidden(format!(
            "Somente o médico atribuído ({}) pode alterar a atribuição {}",
            actual.medico_email, id
        )));
    }
    Err(DbError::InvalidTransition(format!(
        "Atribuição {} em estado {} não pode passar para {}",
        id, actual.estado, destino
    )))
}

/// Aceita uma atribuição pendente. Somente o médico atribuído pode aceitar;
/// aceitar uma atribuição já aceita é um no-op bem-sucedido.
pub async fn aceptar(
    pool: &SqlitePool,
    id: Uuid,
    medico_email: &str,
) -> Result<Asignacion, DbError> {
    transicionar(pool, id, medico_email, EstadoAsignacion::Aceptada).await
}

/// Cancela uma atribuição pendente ou aceita. Somente o médico atribuído.
pub async fn cancelar(
    pool: &SqlitePool,
    id: Uuid,
    medico_email: &str,
) -> Result<Asignacion, DbError> {
    transicionar(pool, id, medico_email, EstadoAsignacion::Cancelada).await
}

/// Remove uma atribuição em qualquer estado (exclusão física, só o admin).
/// Retorna `false` quando o id não existia.
pub async fn eliminar(pool: &SqlitePool, id: Uuid) -> Result<bool, DbError> {
    let resultado = sqlx::query("DELETE FROM asignaciones WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(resultado.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{init_db_pool, DbConfig};
    use anyhow::Result;
    use tempfile::tempdir;

    async fn pool_de_teste(dir: &tempfile::TempDir) -> Result<SqlitePool> {
        let db_path = dir.path().join("asignaciones_test.db");
        let config = DbConfig {
            db_path: db_path.to_str().unwrap().to_string(),
            max_connections: 2,
        };
        Ok(init_db_pool(&config).await?)
    }

    async fn crear_usuario(
        pool: &SqlitePool,
        email: &str,
        rol: &str,
        estado: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO usuarios (id, nombre, email, password, rol, estado)
            VALUES (?, ?, ?, 'secreta123', ?, ?)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email.split('@').next().unwrap())
        .bind(email)
        .bind(rol)
        .bind(estado)
        .execute(pool)
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_automatica_sin_medicos_es_noop() -> Result<()> {
        let dir = tempdir()?;
        let pool = pool_de_teste(&dir).await?;

        // Médicos ocupados/em consulta não são elegíveis
        crear_usuario(&pool, "ocupado@fono.ec", "medico", "ocupado").await?;
        crear_usuario(&pool, "consulta@fono.ec", "medico", "consulta").await?;

        let creada = crear_automatica(&pool, "nino@fono.ec", Dificultad::Media).await?;
        assert!(creada.is_none());

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asignaciones")
            .fetch_one(&pool)
            .await?;
        assert_eq!(total, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_automatica_crea_pendiente_con_medico_elegible() -> Result<()> {
        let dir = tempdir()?;
        let pool = pool_de_teste(&dir).await?;

        crear_usuario(&pool, "dra@fono.ec", "medico", "activo").await?;
        crear_usuario(&pool, "ocupado@fono.ec", "medico", "ocupado").await?;

        let asignacion = crear_automatica(&pool, "nino@fono.ec", Dificultad::Facil)
            .await?
            .expect("deveria criar a atribuição");

        assert_eq!(asignacion.estado, EstadoAsignacion::Pendiente);
        assert_eq!(asignacion.tipo, TipoAsignacion::Automatica);
        assert_eq!(asignacion.dificultad, Dificultad::Facil);
        assert!(asignacion.actividades_asignadas.is_empty());
        // O sorteio nunca escolhe um médico ocupado
        assert_eq!(asignacion.medico_email, "dra@fono.ec");

        Ok(())
    }

    #[tokio::test]
    async fn test_ciclo_de_vida_completo() -> Result<()> {
        let dir = tempdir()?;
        let pool = pool_de_teste(&dir).await?;
        crear_usuario(&pool, "dra@fono.ec", "medico", "activo").await?;

        let asignacion = crear_automatica(&pool, "nino@fono.ec", Dificultad::Media)
            .await?
            .unwrap();
        assert_eq!(asignacion.estado, EstadoAsignacion::Pendiente);

        // pendiente -> aceptada
        let aceptada = aceptar(&pool, asignacion.id, "dra@fono.ec").await?;
        assert_eq!(aceptada.estado, EstadoAsignacion::Aceptada);

        // aceitar novamente continua aceita (idempotente)
        let otra_vez = aceptar(&pool, asignacion.id, "dra@fono.ec").await?;
        assert_eq!(otra_vez.estado, EstadoAsignacion::Aceptada);

        // aceptada -> cancelada
        let cancelada = cancelar(&pool, asignacion.id, "dra@fono.ec").await?;
        assert_eq!(cancelada.estado, EstadoAsignacion::Cancelada);

        // cancelada é terminal
        let error = aceptar(&pool, asignacion.id, "dra@fono.ec").await;
        assert!(matches!(error, Err(DbError::InvalidTransition(_))));
        let error = cancelar(&pool, asignacion.id, "dra@fono.ec").await;
        assert!(matches!(error, Err(DbError::InvalidTransition(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancelar_directo_desde_pendiente() -> Result<()> {
        let dir = tempdir()?;
        let pool = pool_de_teste(&dir).await?;
        crear_usuario(&pool, "dra@fono.ec", "medico", "activo").await?;

        let asignacion = crear_automatica(&pool, "nino@fono.ec", Dificultad::Media)
            .await?
            .unwrap();

        // pendiente -> cancelada, sem passar por aceptada
        let cancelada = cancelar(&pool, asignacion.id, "dra@fono.ec").await?;
        assert_eq!(cancelada.estado, EstadoAsignacion::Cancelada);

        let error = aceptar(&pool, asignacion.id, "dra@fono.ec").await;
        assert!(matches!(error, Err(DbError::InvalidTransition(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_solo_el_medico_asignado_transiciona() -> Result<()> {
        let dir = tempdir()?;
        let pool = pool_de_teste(&dir).await?;
        crear_usuario(&pool, "dra@fono.ec", "medico", "activo").await?;

        let asignacion = crear_automatica(&pool, "nino@fono.ec", Dificultad::Media)
            .await?
            .unwrap();

        let error = aceptar(&pool, asignacion.id, "intrusa@fono.ec").await;
        assert!(matches!(error, Err(DbError::Forbidden(_))));

        // A atribuição segue pendente
        let actual = buscar(&pool, asignacion.id).await?;
        assert_eq!(actual.estado, EstadoAsignacion::Pendiente);

        Ok(())
    }

    #[tokio::test]
    async fn test_manual_y_aceptada_autoritativa() -> Result<()> {
        let dir = tempdir()?;
        let pool = pool_de_teste(&dir).await?;
        crear_usuario(&pool, "dra@fono.ec", "medico", "activo").await?;

        let prescripciones = vec![Prescripcion {
            categoria: "Respiración".to_string(),
            actividad: "Infla el globo".to_string(),
        }];
        let primera = crear_manual(
            &pool,
            "nino@fono.ec",
            "dra@fono.ec",
            prescripciones.clone(),
            Dificultad::Dificil,
        )
        .await?;
        assert_eq!(primera.tipo, TipoAsignacion::Manual);
        assert_eq!(primera.actividades_asignadas, prescripciones);

        // Sem aceitas ainda, não há atribuição autoritativa
        assert!(asignacion_aceptada(&pool, "nino@fono.ec").await?.is_none());

        aceptar(&pool, primera.id, "dra@fono.ec").await?;
        let autoritativa = asignacion_aceptada(&pool, "nino@fono.ec")
            .await?
            .expect("deveria existir uma aceita");
        assert_eq!(autoritativa.id, primera.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_eliminar_en_cualquier_estado() -> Result<()> {
        let dir = tempdir()?;
        let pool = pool_de_teste(&dir).await?;
        crear_usuario(&pool, "dra@fono.ec", "medico", "activo").await?;

        let asignacion = crear_automatica(&pool, "nino@fono.ec", Dificultad::Media)
            .await?
            .unwrap();
        cancelar(&pool, asignacion.id, "dra@fono.ec").await?;

        assert!(eliminar(&pool, asignacion.id).await?);
        assert!(!eliminar(&pool, asignacion.id).await?);
        assert!(matches!(
            buscar(&pool, asignacion.id).await,
            Err(DbError::NotFound(_))
        ));

        Ok(())
    }
}
