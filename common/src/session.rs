use actix_web::http::header::HeaderMap;

use crate::error::{AppError, Res};

/// The caller's session as seen by the dashboard server.
///
/// The UI keeps its auth token client side; every dashboard request carries
/// it as a bearer token. The token both authorizes the upstream call and
/// identifies whose stats cache to use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    pub token: String,
}

impl Session {
    /// Reads the bearer token from the `Authorization` header.
    pub fn from_headers(headers: &HeaderMap) -> Res<Self> {
        let value = headers
            .get("Authorization")
            .ok_or_else(|| AppError::Unauthorized("No authorization token provided".to_string()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Malformed authorization header".to_string()))?;

        match value.strip_prefix("Bearer ").map(str::trim) {
            Some(token) if !token.is_empty() => Ok(Session {
                token: token.to_string(),
            }),
            _ => Err(AppError::Unauthorized(
                "Expected a bearer token".to_string(),
            )),
        }
    }
}
