//! Utilidades de segurança
//!
//! - Hash de senhas com Argon2id (formato PHC)
//! - Verificação com fallback para senhas legadas em texto plano; no login
//!   bem-sucedido a conta legada é migrada para o hash (migração gradual,
//!   sem quebrar contas existentes)
//! - Extração da sessão a partir dos cookies `usuario_email`/`usuario_rol`
//! - Guardas de papel por rota: os handlers declaram o papel exigido no
//!   próprio tipo do parâmetro (`SesionAdmin`, `SesionMedico`, ...)

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};

use crate::error::AppError;
use fono_db::models::Rol;

/// Duração dos cookies de sessão (24 horas)
const SESSION_MAX_AGE_SECS: u32 = 86_400;

/// Gera o hash Argon2id da senha no formato PHC
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Falha ao gerar hash da senha: {}", e))?;
    Ok(hash.to_string())
}

/// Indica se o valor armazenado já está no formato PHC do Argon2
pub fn es_hash_argon2(stored: &str) -> bool {
    stored.starts_with("$argon2")
}

/// Verifica a senha contra o valor armazenado.
///
/// Aceita hashes Argon2 e, para contas antigas, texto plano. Contas em
/// texto plano são migradas no próximo login bem-sucedido.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if es_hash_argon2(stored) {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    } else {
        // Compatibilidade com senhas em texto plano (contas antigas)
        password == stored
    }
}

/// Extrai o valor de um cookie do cabeçalho `Cookie`
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for par in raw.split(';') {
        let mut kv = par.trim().splitn(2, '=');
        if kv.next() == Some(name) {
            return kv.next().map(str::to_string);
        }
    }
    None
}

fn session_cookie(name: &str, value: &str) -> Result<HeaderValue, AppError> {
    // Não marcado como HttpOnly: os jogos leem o e-mail do lado do cliente
    let cookie = format!(
        "{}={}; Max-Age={}; Path=/; SameSite=Lax",
        name, value, SESSION_MAX_AGE_SECS
    );
    // Caracteres de controle no valor quebrariam o cabeçalho
    HeaderValue::from_str(&cookie)
        .map_err(|_| AppError::Validacion(format!("Valor inválido para o cookie {}", name)))
}

/// Cabeçalhos `Set-Cookie` da sessão, emitidos no login
pub fn cookies_de_sesion(email: &str, rol: Rol) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, session_cookie("usuario_email", email)?);
    headers.append(SET_COOKIE, session_cookie("usuario_rol", &rol.to_string())?);
    Ok(headers)
}

/// Sessão do usuário atual, lida dos cookies
#[derive(Debug, Clone)]
pub struct Sesion {
    pub email: String,
    pub rol: Rol,
}

#[async_trait]
impl<S> FromRequestParts<S> for Sesion
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = cookie_value(&parts.headers, "usuario_email").ok_or(AppError::SinSesion)?;
        let rol_raw = cookie_value(&parts.headers, "usuario_rol").ok_or(AppError::SinSesion)?;
        let rol = Rol::parse(&rol_raw).ok_or(AppError::SinSesion)?;
        if email.is_empty() {
            return Err(AppError::SinSesion);
        }
        Ok(Sesion { email, rol })
    }
}

macro_rules! guarda_de_rol {
    ($nombre:ident, $doc:literal, [$($rol:pat),+]) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $nombre(pub Sesion);

        impl std::ops::Deref for $nombre {
            type Target = Sesion;

            fn deref(&self) -> &Sesion {
                &self.0
            }
        }

        #[async_trait]
        impl<S> FromRequestParts<S> for $nombre
        where
            S: Send + Sync,
        {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &S,
            ) -> Result<Self, Self::Rejection> {
                let sesion = Sesion::from_request_parts(parts, state).await?;
                match sesion.rol {
                    $($rol)|+ => Ok($nombre(sesion)),
                    otro => Err(AppError::RolNegado(format!(
                        "A rota exige outro papel; sessão atual: {}",
                        otro
                    ))),
                }
            }
        }
    };
}

guarda_de_rol!(SesionAdmin, "Sessão restrita a administradores", [Rol::Admin]);
guarda_de_rol!(SesionMedico, "Sessão restrita a médicos", [Rol::Medico]);
guarda_de_rol!(
    SesionPaciente,
    "Sessão restrita a pacientes",
    [Rol::Paciente]
);
guarda_de_rol!(SesionEmisor, "Sessão restrita a emissores", [Rol::Emisor]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_y_verificacion() {
        let hash = hash_password("contrasena-segura").unwrap();
        assert!(es_hash_argon2(&hash));
        assert!(verify_password("contrasena-segura", &hash));
        assert!(!verify_password("otra-cosa", &hash));
    }

    #[test]
    fn test_fallback_texto_plano() {
        // Contas legadas guardam a senha sem hash
        assert!(verify_password("123456", "123456"));
        assert!(!verify_password("123456", "654321"));
        assert!(!es_hash_argon2("123456"));
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("usuario_email=nino@fono.ec; usuario_rol=paciente"),
        );
        assert_eq!(
            cookie_value(&headers, "usuario_email").as_deref(),
            Some("nino@fono.ec")
        );
        assert_eq!(
            cookie_value(&headers, "usuario_rol").as_deref(),
            Some("paciente")
        );
        assert_eq!(cookie_value(&headers, "inexistente"), None);
    }

    #[test]
    fn test_cookie_con_caracter_de_control_es_rechazado() {
        let resultado = cookies_de_sesion("salto\nde@linea.ec", Rol::Paciente);
        assert!(matches!(resultado, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_cookies_de_sesion() {
        let headers = cookies_de_sesion("dra@fono.ec", Rol::Medico).unwrap();
        let valores: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(valores.len(), 2);
        assert!(valores[0].starts_with("usuario_email=dra@fono.ec;"));
        assert!(valores[1].starts_with("usuario_rol=medico;"));
        assert!(valores.iter().all(|v| v.contains("SameSite=Lax")));
    }
}
