use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use chat_protocol::{Role, UserProfile};
use serde::Deserialize;

const SEARCH_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
    pub role: Option<String>,
}

/// Find chat targets by name and role. The caller is excluded.
#[get("/users/search")]
pub async fn search_users(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let role = match query.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        None => None,
        Some(raw) => Some(
            Role::from_db(raw).ok_or_else(|| AppError::invalid_input(format!("unknown role: {raw}")))?,
        ),
    };

    let users: Vec<UserProfile> = state
        .directory
        .search_users(query.search.as_deref(), role, SEARCH_LIMIT + 1)
        .await?
        .into_iter()
        .filter(|u| u.id != user.0.id)
        .take(SEARCH_LIMIT as usize)
        .map(|u| u.profile())
        .collect();
    Ok(HttpResponse::Ok().json(users))
}
