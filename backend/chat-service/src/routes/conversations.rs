use super::optional_id;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    pub application_id: Option<String>,
    pub job_id: Option<String>,
}

#[get("/conversations")]
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let conversations = state.conversations.list_conversations(user.0.id).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

/// Get the conversation with another user, creating it if allowed.
#[get("/conversations/{other_user_id}")]
pub async fn get_or_create_conversation(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    query: web::Query<ConversationQuery>,
) -> Result<HttpResponse, AppError> {
    let other_user_id = path.into_inner();
    let application_id = optional_id(query.application_id.as_deref(), "applicationId")?;
    let job_id = optional_id(query.job_id.as_deref(), "jobId")?;

    let view = state
        .conversations
        .get_or_create_view(&user.0, other_user_id, application_id, job_id)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}
