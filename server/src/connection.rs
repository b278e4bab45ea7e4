use std::mem;
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc::channel;

use system::{ClientMessage, ConnectionId, ServerMessage};

use crate::config::Config;
use crate::connection_tx_storage::ConnectionTx;
use crate::server::ServerTx;

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect { tx: ConnectionTx },
    Disconnect { from: ConnectionId },
    ClientMessage {
        from: ConnectionId,
        message: ClientMessage,
    },
}

#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected { connection_id: ConnectionId },
    ServerMessage(ServerMessage),
}

#[derive(Debug)]
enum ConnectionState {
    /// Waiting for the server to hand out an id. Messages received meanwhile are held here.
    Idle { pending: Vec<ClientMessage> },
    Connected(ConnectionId),
}

impl ConnectionState {
    fn idle() -> Self {
        Self::Idle {
            pending: Vec::new(),
        }
    }

    /// Hands the message back with its sender once the id is known, holds it otherwise.
    fn accept(&mut self, message: ClientMessage) -> Option<(ConnectionId, ClientMessage)> {
        match self {
            Self::Idle { pending } => {
                pending.push(message);
                None
            }
            Self::Connected(from) => Some((*from, message)),
        }
    }

    /// Records the id and returns the held messages in arrival order.
    fn connect(&mut self, connection_id: ConnectionId) -> Vec<ClientMessage> {
        match mem::replace(self, Self::Connected(connection_id)) {
            Self::Idle { pending } => pending,
            Self::Connected(_) => Vec::new(),
        }
    }

    fn connection_id(&self) -> Option<ConnectionId> {
        match self {
            Self::Idle { .. } => None,
            Self::Connected(id) => Some(*id),
        }
    }
}

struct ConnectionActor {
    state: ConnectionState,
    srv_tx: ServerTx,
    outbound_buffer: usize,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    last_heartbeat: Instant,
}

impl ConnectionActor {
    fn new(srv_tx: ServerTx, config: &Config) -> Self {
        Self {
            state: ConnectionState::idle(),
            srv_tx,
            outbound_buffer: config.outbound_buffer,
            heartbeat_interval: config.heartbeat_interval,
            client_timeout: config.client_timeout,
            last_heartbeat: Instant::now(),
        }
    }

    fn receive(&mut self, message: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some((from, message)) = self.state.accept(message) {
            self.forward(from, message, ctx);
        }
    }

    fn forward(
        &self,
        from: ConnectionId,
        message: ClientMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        if self
            .srv_tx
            .send(ConnectionCommand::ClientMessage { from, message })
            .is_err()
        {
            log::error!("Server is gone, closing connection {}", from);
            ctx.stop();
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > actor.client_timeout {
                log::info!(
                    "Heartbeat timed out, closing connection {:?}",
                    actor.state.connection_id()
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, rx) = channel::<ConnectionEvent>(self.outbound_buffer);

        if self.srv_tx.send(ConnectionCommand::Connect { tx }).is_err() {
            log::error!("Server is gone, refusing connection");
            ctx.stop();
            return;
        }

        ctx.add_stream(rx);
        self.heartbeat(ctx);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // Stopped before the id arrived: no Disconnect can be addressed. Dropping the event
        // stream closes the outbound queue, and the server reaps the entry on its next send.
        if let Some(id) = self.state.connection_id() {
            let _ = self.srv_tx.send(ConnectionCommand::Disconnect { from: id });
        }

        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                log::warn!("WebSocket protocol error: {}", err);
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(bytes) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&bytes);
            }
            ws::Message::Pong(_) => self.last_heartbeat = Instant::now(),
            ws::Message::Text(text) => match ClientMessage::from_json(&text) {
                Ok(message) => self.receive(message, ctx),
                Err(err) => log::debug!("Ignoring malformed frame: {}", err),
            },
            ws::Message::Binary(bin) => {
                log::debug!("Ignoring binary frame of {} bytes", bin.len());
            }
            ws::Message::Continuation(_) => {
                log::debug!("Ignoring fragmented frame");
            }
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Nop => (),
        }
    }
}

/// Egress
impl StreamHandler<ConnectionEvent> for ConnectionActor {
    fn handle(&mut self, event: ConnectionEvent, ctx: &mut Self::Context) {
        match event {
            ConnectionEvent::Connected { connection_id } => {
                for message in self.state.connect(connection_id) {
                    self.forward(connection_id, message, ctx);
                }
            }
            ConnectionEvent::ServerMessage(message) => match message.to_json() {
                Ok(text) => ctx.text(text),
                Err(err) => log::error!("Failed to encode {:?}: {}", message, err),
            },
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    ws::start(
        ConnectionActor::new(srv_tx.get_ref().clone(), config.get_ref()),
        &req,
        stream,
    )
}
