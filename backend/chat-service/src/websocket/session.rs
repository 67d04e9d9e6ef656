use super::gateway::{Connection, Gateway};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use chat_protocol::ServerEvent;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Websocket actor bridging actix frames to the [`Gateway`].
///
/// Inbound text frames are queued to a single worker task so one
/// connection's events are handled in arrival order.
pub struct WsSession {
    conn: Connection,
    gateway: Gateway,
    outbound: Option<UnboundedReceiver<ServerEvent>>,
    inbound: Option<UnboundedSender<String>>,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    hb: Instant,
}

impl WsSession {
    pub fn new(
        conn: Connection,
        outbound: UnboundedReceiver<ServerEvent>,
        gateway: Gateway,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            conn,
            gateway,
            outbound: Some(outbound),
            inbound: None,
            heartbeat_interval,
            client_timeout,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                tracing::warn!(connection_id = %act.conn.id, "websocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn start_worker(&mut self) {
        let (tx, mut rx) = unbounded_channel::<String>();
        self.inbound = Some(tx);

        let gateway = self.gateway.clone();
        let conn = self.conn.clone();
        actix::spawn(async move {
            while let Some(frame) = rx.recv().await {
                gateway.handle_frame(&conn, &frame).await;
            }
            gateway.disconnect(&conn).await;
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!(connection_id = %self.conn.id, user_id = ?self.conn.user_id(), "websocket session started");
        self.hb(ctx);
        self.start_worker();
        if let Some(rx) = self.outbound.take() {
            ctx.add_stream(UnboundedReceiverStream::new(rx));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // closing the queue lets the worker drain and leave its rooms
        self.inbound.take();
    }
}

impl StreamHandler<ServerEvent> for WsSession {
    fn handle(&mut self, event: ServerEvent, ctx: &mut Self::Context) {
        match event.to_frame() {
            Ok(frame) => ctx.text(frame),
            Err(e) => tracing::error!(error = %e, event = event.event_type(), "failed to encode event"),
        }
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        // outbound channel closes only during teardown
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                let queued = self
                    .inbound
                    .as_ref()
                    .map(|tx| tx.send(text.to_string()).is_ok())
                    .unwrap_or(false);
                if !queued {
                    tracing::warn!(connection_id = %self.conn.id, "event worker gone, closing");
                    ctx.stop();
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("binary websocket messages not supported");
                self.conn.emit(ServerEvent::error(super::gateway::INVALID_EVENT));
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(connection_id = %self.conn.id, ?reason, "websocket close received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(connection_id = %self.conn.id, error = %e, "websocket protocol error");
                ctx.stop();
            }
        }
    }
}
