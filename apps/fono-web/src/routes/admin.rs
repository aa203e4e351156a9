//! Painel de administração
//!
//! CRUD de pacientes e médicos, atribuições (automáticas e manuais),
//! conteúdo multimídia do sistema, histórico e resultados. Todas as rotas
//! exigem sessão de administrador.

use axum::extract::{Multipart, Path, Query, State};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::security::{hash_password, SesionAdmin};
use crate::AppState;
use fono_db::asignaciones;
use fono_db::models::{
    CategoriaActividades, ContenidoAdmin, Dificultad, EstadoMedico, HistorialActividad,
    Prescripcion, ResultadoJuego, Usuario,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(vista_dashboard))
        .route("/admin/pacientes", get(listar_pacientes))
        .route("/admin/pacientes/crear", post(crear_paciente))
        .route("/admin/pacientes/:id/eliminar", post(eliminar_paciente))
        .route("/admin/medicos", get(listar_medicos))
        .route("/admin/medicos/crear", post(crear_medico))
        .route("/admin/medicos/:id/eliminar", post(eliminar_medico))
        .route("/admin/medicos/:id/cambiar_estado", post(cambiar_estado_medico))
        .route(
            "/admin/medicos/:id/editar",
            get(editar_medico_form).post(editar_medico),
        )
        .route("/admin/medicos/:id/consultas", get(consultas_medico))
        .route("/admin/actividades", get(vista_actividades))
        .route(
            "/admin/contenido",
            get(vista_contenido).post(actualizar_contenido),
        )
        .route("/admin/asignaciones", get(vista_asignaciones))
        .route("/admin/asignaciones/auto", post(crear_asignacion_automatica))
        .route("/admin/asignaciones/manual", post(crear_asignacion_manual))
        .route("/admin/asignaciones/:id/eliminar", post(eliminar_asignacion))
        .route("/admin/historial", get(vista_historial))
        .route("/admin/resultados", get(vista_resultados))
}

async fn contar(pool: &sqlx::SqlitePool, sql: &str) -> Result<i64, AppError> {
    Ok(sqlx::query_scalar(sql).fetch_one(pool).await?)
}

/// Resumo de usuários e disponibilidade dos médicos
async fn vista_dashboard(
    _admin: SesionAdmin,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pool = &state.pool;
    Ok(Json(json!({
        "titulo_pagina": "Panel de administración",
        "usuarios_total": contar(pool, "SELECT COUNT(*) FROM usuarios").await?,
        "pacientes_total":
            contar(pool, "SELECT COUNT(*) FROM usuarios WHERE rol = 'paciente'").await?,
        "medicos_total":
            contar(pool, "SELECT COUNT(*) FROM usuarios WHERE rol = 'medico'").await?,
        "medicos_activos":
            contar(pool, "SELECT COUNT(*) FROM usuarios WHERE rol = 'medico' AND estado = 'activo'").await?,
        "medicos_ocupados":
            contar(pool, "SELECT COUNT(*) FROM usuarios WHERE rol = 'medico' AND estado = 'ocupado'").await?,
        "medicos_consulta":
            contar(pool, "SELECT COUNT(*) FROM usuarios WHERE rol = 'medico' AND estado = 'consulta'").await?,
    })))
}

async fn listar_pacientes(
    _admin: SesionAdmin,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pacientes =
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE rol = 'paciente'")
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(json!({
        "titulo_pagina": "Pacientes",
        "pacientes": pacientes,
    })))
}

#[derive(Debug, Deserialize)]
struct UsuarioForm {
    nombre: String,
    email: String,
    password: String,
}

async fn insertar_usuario(
    state: &AppState,
    form: &UsuarioForm,
    rol: &str,
) -> Result<bool, AppError> {
    let existente: Option<i64> = sqlx::query_scalar("SELECT 1 FROM usuarios WHERE email = ?")
        .bind(&form.email)
        .fetch_optional(&state.pool)
        .await?;
    if existente.is_some() {
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO usuarios (id, nombre, email, password, rol, estado, nivel, puntos)
        VALUES (?, ?, ?, ?, ?, 'activo', 1, 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&form.nombre)
    .bind(&form.email)
    .bind(hash_password(&form.password)?)
    .bind(rol)
    .execute(&state.pool)
    .await?;
    Ok(true)
}

async fn crear_paciente(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Form(form): Form<UsuarioForm>,
) -> Result<Redirect, AppError> {
    // E-mail duplicado: sem mensagem, apenas volta à lista
    insertar_usuario(&state, &form, "paciente").await?;
    Ok(Redirect::to("/admin/pacientes"))
}

async fn eliminar_paciente(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    sqlx::query("DELETE FROM usuarios WHERE id = ? AND rol = 'paciente'")
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(Redirect::to("/admin/pacientes"))
}

#[derive(Debug, Deserialize)]
struct MedicosQuery {
    estado: Option<String>,
}

/// Lista de médicos com filtro por estado (activo/ocupado/consulta)
async fn listar_medicos(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Query(query): Query<MedicosQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let estado = query.estado.unwrap_or_else(|| "todos".to_string());

    let medicos = if estado == "todos" {
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE rol = 'medico'")
            .fetch_all(&state.pool)
            .await?
    } else {
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE rol = 'medico' AND estado = ?")
            .bind(&estado)
            .fetch_all(&state.pool)
            .await?
    };

    let ahora = Utc::now();
    let medicos: Vec<serde_json::Value> = medicos
        .into_iter()
        .map(|m| {
            let tiempo_servicio = (ahora - m.creado_en).num_days();
            let mut valor = serde_json::to_value(&m).unwrap_or_default();
            if let Some(objeto) = valor.as_object_mut() {
                objeto.insert("tiempo_servicio".to_string(), json!(tiempo_servicio));
            }
            valor
        })
        .collect();

    Ok(Json(json!({
        "titulo_pagina": "Médicos",
        "medicos": medicos,
        "estado_seleccionado": estado,
    })))
}

async fn crear_medico(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Form(form): Form<UsuarioForm>,
) -> Result<Redirect, AppError> {
    insertar_usuario(&state, &form, "medico").await?;
    Ok(Redirect::to("/admin/medicos"))
}

async fn eliminar_medico(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    sqlx::query("DELETE FROM usuarios WHERE id = ? AND rol = 'medico'")
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(Redirect::to("/admin/medicos"))
}

#[derive(Debug, Deserialize)]
struct EstadoForm {
    estado: String,
}

async fn cambiar_estado_medico(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<EstadoForm>,
) -> Result<Redirect, AppError> {
    let estado = EstadoMedico::parse(&form.estado)
        .ok_or_else(|| AppError::Validacion(format!("Estado inválido: {}", form.estado)))?;
    sqlx::query("UPDATE usuarios SET estado = ? WHERE id = ? AND rol = 'medico'")
        .bind(estado.to_string())
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(Redirect::to("/admin/medicos"))
}

async fn buscar_medico(state: &AppState, id: Uuid) -> Result<Usuario, AppError> {
    sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE id = ? AND rol = 'medico'")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NoEncontrado("Médico no encontrado".to_string()))
}

async fn editar_medico_form(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let medico = buscar_medico(&state, id).await?;
    Ok(Json(json!({
        "titulo_pagina": "Editar Médico",
        "medico": medico,
    })))
}

#[derive(Debug, Deserialize)]
struct EditarMedicoForm {
    nombre: String,
    email: String,
    #[serde(default)]
    password: String,
}

async fn editar_medico(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<EditarMedicoForm>,
) -> Result<Redirect, AppError> {
    buscar_medico(&state, id).await?;

    sqlx::query("UPDATE usuarios SET nombre = ?, email = ? WHERE id = ?")
        .bind(&form.nombre)
        .bind(&form.email)
        .bind(id)
        .execute(&state.pool)
        .await?;

    // Senha vazia no formulário preserva a atual
    if !form.password.is_empty() {
        sqlx::query("UPDATE usuarios SET password = ? WHERE id = ?")
            .bind(hash_password(&form.password)?)
            .bind(id)
            .execute(&state.pool)
            .await?;
    }
    Ok(Redirect::to("/admin/medicos"))
}

/// Consultas (atribuições) de um médico específico
async fn consultas_medico(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let medico = buscar_medico(&state, id).await?;
    let consultas = asignaciones::listar_por_medico(&state.pool, &medico.email).await?;
    Ok(Json(json!({
        "titulo_pagina": format!("Consultas de {}", medico.nombre),
        "asignaciones": consultas,
    })))
}

/// Catálogo persistido de atividades, por categoria
async fn vista_actividades(
    _admin: SesionAdmin,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let categorias = sqlx::query_as::<_, CategoriaActividades>(
        "SELECT * FROM actividades ORDER BY categoria",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(json!({
        "titulo_pagina": "Actividades por categoría",
        "categorias": categorias,
    })))
}

async fn vista_contenido(
    _admin: SesionAdmin,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let contenido =
        sqlx::query_as::<_, ContenidoAdmin>("SELECT * FROM contenido_admin WHERE id = 1")
            .fetch_optional(&state.pool)
            .await?;
    Ok(Json(json!({
        "titulo_pagina": "Contenido del sistema",
        "contenido": contenido,
    })))
}

/// Recebe imagens e vídeos por multipart, grava no diretório de uploads e
/// anexa as rotas públicas à linha única de conteúdo. O anexo é um
/// `json_insert` no próprio banco, então dois uploads concorrentes não se
/// sobrescrevem.
async fn actualizar_contenido(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    tokio::fs::create_dir_all(&state.uploads_dir)
        .await
        .map_err(|e| AppError::Interno(anyhow::anyhow!("Falha ao criar diretório de uploads: {}", e)))?;

    // Garante a existência da linha única antes dos anexos
    sqlx::query("INSERT OR IGNORE INTO contenido_admin (id) VALUES (1)")
        .execute(&state.pool)
        .await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validacion(format!("Formulário multipart inválido: {}", e)))?
    {
        let campo = field.name().unwrap_or_default().to_string();
        let columna = match campo.as_str() {
            "imagen" => "imagenes",
            "video" => "videos",
            _ => continue,
        };

        let Some(nombre_original) = field.file_name().map(str::to_string) else {
            continue;
        };
        if nombre_original.is_empty() {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validacion(format!("Falha ao ler o arquivo enviado: {}", e)))?;

        let nombre_archivo = format!("{}_{}", Utc::now().timestamp_millis(), nombre_original);
        let ruta_fs = state.uploads_dir.join(&nombre_archivo);
        tokio::fs::write(&ruta_fs, &bytes)
            .await
            .map_err(|e| AppError::Interno(anyhow::anyhow!("Falha ao gravar upload: {}", e)))?;

        // Rota pública usada pelo front
        let ruta_publica = format!("/static/uploads/{}", nombre_archivo);
        let sql = format!(
            "UPDATE contenido_admin SET {columna} = json_insert({columna}, '$[#]', ?) WHERE id = 1"
        );
        sqlx::query(&sql)
            .bind(&ruta_publica)
            .execute(&state.pool)
            .await?;

        info!(archivo = %ruta_publica, campo = %campo, "Conteúdo anexado");
    }

    Ok(Redirect::to("/admin/contenido"))
}

/// Visão global de todas as atribuições
async fn vista_asignaciones(
    _admin: SesionAdmin,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let lista = asignaciones::listar_todas(&state.pool).await?;
    Ok(Json(json!({
        "titulo_pagina": "Asignaciones",
        "asignaciones": lista,
    })))
}

fn parse_dificultad(raw: &str) -> Result<Dificultad, AppError> {
    Dificultad::parse(raw)
        .ok_or_else(|| AppError::Validacion(format!("Dificultad inválida: {}", raw)))
}

#[derive(Debug, Deserialize)]
struct AsignacionAutoForm {
    paciente_email: String,
    #[serde(default = "dificultad_media")]
    dificultad: String,
}

fn dificultad_media() -> String {
    "media".to_string()
}

/// Atribuição automática: sorteia um médico que não esteja ocupado nem em
/// consulta. Sem médicos elegíveis, nada é criado e o admin volta à lista
/// de pacientes.
async fn crear_asignacion_automatica(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Form(form): Form<AsignacionAutoForm>,
) -> Result<Redirect, AppError> {
    let dificultad = parse_dificultad(&form.dificultad)?;
    let creada =
        asignaciones::crear_automatica(&state.pool, &form.paciente_email, dificultad).await?;

    match creada {
        Some(_) => Ok(Redirect::to("/admin/asignaciones")),
        None => Ok(Redirect::to("/admin/pacientes")),
    }
}

#[derive(Debug, Deserialize)]
struct AsignacionManualForm {
    paciente_email: String,
    medico_email: String,
    #[serde(default = "dificultad_media")]
    dificultad: String,
    /// Prescrições opcionais como JSON: `[{"categoria": ..., "actividad": ...}]`
    #[serde(default)]
    actividades: String,
}

async fn crear_asignacion_manual(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Form(form): Form<AsignacionManualForm>,
) -> Result<Redirect, AppError> {
    let dificultad = parse_dificultad(&form.dificultad)?;
    let actividades: Vec<Prescripcion> = if form.actividades.is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&form.actividades)
            .map_err(|e| AppError::Validacion(format!("Lista de actividades inválida: {}", e)))?
    };

    asignaciones::crear_manual(
        &state.pool,
        &form.paciente_email,
        &form.medico_email,
        actividades,
        dificultad,
    )
    .await?;
    Ok(Redirect::to("/admin/asignaciones"))
}

/// Exclusão física de uma atribuição, em qualquer estado
async fn eliminar_asignacion(
    _admin: SesionAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    asignaciones::eliminar(&state.pool, id).await?;
    Ok(Redirect::to("/admin/asignaciones"))
}

async fn vista_historial(
    _admin: SesionAdmin,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let historial = sqlx::query_as::<_, HistorialActividad>(
        "SELECT * FROM historial_actividades ORDER BY fecha DESC",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(json!({
        "titulo_pagina": "Historial de actividades",
        "historial": historial,
    })))
}

async fn vista_resultados(
    _admin: SesionAdmin,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let resultados = sqlx::query_as::<_, ResultadoJuego>(
        "SELECT * FROM resultados_juegos ORDER BY fecha DESC LIMIT 200",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(json!({
        "titulo_pagina": "Resultados de juegos",
        "resultados": resultados,
    })))
}
