//! Bearer-token authentication.
//!
//! Validates an HS256 JWT and inserts the resulting [`Principal`] into the
//! request extensions for handlers to extract.

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use modreg_core::principal::{JwtClaims, Principal};

use crate::error::AppError;

#[derive(Clone)]
pub struct JwtConfig {
    key: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn principal_from_token(&self, token: &str) -> Result<Principal, AppError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| AppError::Unauthenticated(e.to_string()))?;
        Principal::from_jwt_claims(&data.claims)
            .map_err(|e| AppError::Unauthenticated(e.to_string()))
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn jwt_auth(mut req: Request, next: Next) -> Result<Response, AppError> {
    let config = req
        .extensions()
        .get::<JwtConfig>()
        .cloned()
        .ok_or_else(|| AppError::Unauthenticated("authentication is not configured".into()))?;
    let token = bearer_token(&req)
        .ok_or_else(|| AppError::Unauthenticated("missing bearer token".into()))?;
    let principal = config.principal_from_token(token)?;

    tracing::debug!(actor = %principal.actor_id, role = %principal.role, "authenticated");
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
