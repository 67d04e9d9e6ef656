//! Access-token verification.
//!
//! Tokens are minted by the auth subsystem; this service only verifies them
//! and resolves the subject to a user record.

use crate::config::JwtKey;
use crate::error::AppError;
use crate::models::User;
use crate::store::Directory;
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Claims we read from an access token. Older tokens carry the user id in
/// `id` instead of `sub`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        self.sub
            .as_deref()
            .or(self.id.as_deref())
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a raw token to the user it was issued for.
    async fn resolve(&self, token: &str) -> Result<User, AppError>;
}

pub struct JwtIdentityResolver {
    key: DecodingKey,
    validation: Validation,
    directory: Arc<dyn Directory>,
}

impl JwtIdentityResolver {
    pub fn new(key: &JwtKey, directory: Arc<dyn Directory>) -> Result<Self, AppError> {
        let (key, algorithm) = match key {
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            JwtKey::PublicKeyPem(pem) => (
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| AppError::Config(format!("invalid JWT public key: {e}")))?,
                Algorithm::RS256,
            ),
        };
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();
        validation.required_spec_claims.insert("exp".to_string());
        validation.validate_exp = true;

        Ok(Self {
            key,
            validation,
            directory,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AppError::Unauthenticated
            })
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<User, AppError> {
        let claims = self.verify(token)?;
        let user_id = claims.user_id().ok_or(AppError::Unauthenticated)?;
        self.directory
            .find_user(user_id)
            .await?
            .ok_or(AppError::Unauthenticated)
    }
}
