//! Authentication middleware
//!
//! Validates bearer tokens issued by the external auth service and
//! attributes every request to an acting user

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};

use crate::{
    error::{AppError, AppResult},
    AppState,
};

/// Authenticated user information extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    /// Admins may backdate issuances and sales
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Validates the bearer token and stores the acting user in request
/// extensions for the `CurrentUser` extractor
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return Err(AppError::Unauthorized(
                "Missing or invalid Authorization header".to_string(),
            ))
        }
    };

    let claims = decode_token(token, &state.config.jwt.secret)?;

    let user_id = uuid::Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    let auth_user = AuthUser {
        user_id,
        username: claims.username,
        role: claims.role,
    };

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    username: String,
    role: String,
    exp: i64,
    iat: i64,
}

/// Decode and validate a bearer token with the configured secret
fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn sample_claims(exp_offset: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            username: "storekeeper".to_string(),
            role: "staff".to_string(),
            exp: now + exp_offset,
            iat: now,
        }
    }

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_decodes_claims() {
        let claims = sample_claims(3600);
        let token = token_for(&claims, SECRET);

        let decoded = decode_token(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.username, "storekeeper");
        assert_eq!(decoded.role, "staff");
    }

    #[test]
    fn test_expired_token_reports_token_expired() {
        let token = token_for(&sample_claims(-3600), SECRET);
        let result = decode_token(&token, SECRET);
        assert!(matches!(result, Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret_reports_invalid_token() {
        let token = token_for(&sample_claims(3600), "another-secret");
        let result = decode_token(&token, SECRET);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_garbage_token_reports_invalid_token() {
        let result = decode_token("not-a-jwt", SECRET);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_admin_role_check() {
        let admin = AuthUser {
            user_id: uuid::Uuid::new_v4(),
            username: "manager".to_string(),
            role: "admin".to_string(),
        };
        let staff = AuthUser {
            role: "staff".to_string(),
            ..admin.clone()
        };
        assert!(admin.is_admin());
        assert!(!staff.is_admin());
    }
}
