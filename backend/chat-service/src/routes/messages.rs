use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use actix_web::{get, put, web, HttpResponse};
use chat_protocol::MarkReadResponse;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[get("/messages/{conversation_id}")]
pub async fn get_messages(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let page = state
        .messages
        .list_messages(path.into_inner(), user.0.id, query.page, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

#[put("/messages/{conversation_id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let marked_count = state.messages.mark_read(path.into_inner(), user.0.id).await?;
    Ok(HttpResponse::Ok().json(MarkReadResponse { marked_count }))
}
