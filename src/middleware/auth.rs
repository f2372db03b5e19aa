//! Middleware de autenticación JWT
//!
//! Extrae el bearer token, valida los claims y deja en las extensions
//! un contexto de request explícito con identidad y rol del llamador.
//! El controller decide con ese contexto qué mutaciones permite.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

/// Claims del JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// user_id
    pub sub: String,
    /// Id de conductor cuando el usuario es personal de flota
    pub driver_id: Option<i64>,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// Rol del llamador según la sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Driver,
    Helper,
    Supervisor,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw {
            "driver" => Ok(Role::Driver),
            "helper" => Ok(Role::Helper),
            "supervisor" => Ok(Role::Supervisor),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::Unauthorized(format!("unknown role '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Helper => "helper",
            Role::Supervisor => "supervisor",
            Role::Admin => "admin",
        }
    }

    /// El borrado de viajes queda restringido a supervisión
    pub fn can_delete_trips(&self) -> bool {
        matches!(self, Role::Supervisor | Role::Admin)
    }
}

/// Contexto autenticado que viaja en las extensions del request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub driver_id: Option<i64>,
    pub role: Role,
}

/// Decodificar y validar el token contra el secreto configurado
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))
}

/// Emitir un token de sesión (usado por el colaborador de auth y los tests)
pub fn issue_token(
    user_id: i64,
    driver_id: Option<i64>,
    role: Role,
    secret: &str,
) -> AppResult<String> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        driver_id,
        role: role.as_str().to_string(),
        exp: now + 3600,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
}

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_str| auth_str.to_str().ok())
        .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("authorization token required".to_string()))?;

    let claims = decode_token(token, &state.config.jwt_secret)?;

    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::Unauthorized("invalid user id in token".to_string()))?;

    let authenticated_user = AuthenticatedUser {
        user_id,
        driver_id: claims.driver_id,
        role: Role::parse(&claims.role)?,
    };

    request.extensions_mut().insert(authenticated_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let token = issue_token(42, Some(3), Role::Driver, "secret").unwrap();
        let claims = decode_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.driver_id, Some(3));
        assert_eq!(claims.role, "driver");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(42, None, Role::Admin, "secret").unwrap();
        assert!(matches!(
            decode_token(&token, "other-secret"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Supervisor.can_delete_trips());
        assert!(Role::Admin.can_delete_trips());
        assert!(!Role::Driver.can_delete_trips());
        assert!(!Role::Helper.can_delete_trips());
    }

    #[test]
    fn test_role_parse_rejects_unknown() {
        assert!(Role::parse("intern").is_err());
        assert_eq!(Role::parse("supervisor").unwrap(), Role::Supervisor);
    }
}
