use actix_web::web;

pub mod conversations;
pub mod messages;
pub mod socket;
pub mod users;

/// Register every route on an actix app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(conversations::list_conversations)
        .service(conversations::get_or_create_conversation)
        .service(messages::get_messages)
        .service(messages::mark_read)
        .service(users::search_users)
        .service(socket::socket_handler)
        .route("/health", web::get().to(|| async { "OK" }));
}

/// Parse an optional id from a query string, treating blank as absent.
pub(crate) fn optional_id(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<uuid::Uuid>, crate::error::AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => uuid::Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| crate::error::AppError::invalid_input(format!("{field} is not a valid id"))),
    }
}
