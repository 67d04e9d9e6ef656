use crate::middleware::token_from_request;
use crate::state::AppState;
use crate::websocket::WsSession;
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

/// Upgrade to the chat event protocol. Authentication failures do not
/// refuse the upgrade; the connection stays unauthenticated.
#[get("/socket")]
pub async fn socket_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let token = token_from_request(&req, &state.config.auth_cookie_name);
    let (conn, outbound) = state.gateway.connect(token.as_deref()).await;

    let handle = conn.clone();
    let session = WsSession::new(
        conn,
        outbound,
        state.gateway.clone(),
        state.config.ws_heartbeat_interval,
        state.config.ws_client_timeout,
    );
    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            // handshake refused; the actor never ran
            state.gateway.disconnect(&handle).await;
            Err(e)
        }
    }
}
