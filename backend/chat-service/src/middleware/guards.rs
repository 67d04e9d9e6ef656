//! Request guards resolving the caller's identity.

use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;
use actix_web::{http::header, web, Error, FromRequest, HttpRequest};
use std::future::Future;
use std::pin::Pin;

/// Pull an access token from a request.
///
/// Checked in order: `Authorization: Bearer`, the `token` query parameter
/// (socket handshake auth), then the auth cookie.
pub fn token_from_request(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string());

    let query = || {
        web::Query::<std::collections::HashMap<String, String>>::from_query(req.query_string())
            .ok()
            .and_then(|q| q.get("token").cloned())
    };

    let cookie = || req.cookie(cookie_name).map(|c| c.value().to_string());

    bearer
        .or_else(query)
        .or_else(cookie)
        .filter(|t| !t.is_empty())
}

/// An authenticated caller. Rejects the request with 401 when no valid
/// token is present.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = state
            .as_ref()
            .and_then(|s| token_from_request(req, &s.config.auth_cookie_name));

        Box::pin(async move {
            let state = state.ok_or(AppError::Internal)?;
            let token = token.ok_or(AppError::Unauthenticated)?;
            let user = state.identity.resolve(&token).await?;
            Ok(AuthUser(user))
        })
    }
}
