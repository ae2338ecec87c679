use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::Actor,
    dto::ws::{ClientRequest, ConnectedPayload, ServerMessage},
    error::ServiceError,
    services::{
        broadcast, chat_service, handshake_service::AuthenticatedSession, mutation_service,
        subscription_service,
    },
    state::{
        SharedState,
        connection::{ConnectionEvent, ConnectionPhase},
        registry::ConnectionId,
    },
};

/// Drive an authenticated WebSocket session until the client goes away.
///
/// Requests from one connection are handled one at a time, in arrival order.
/// Failures are reported to this connection only and never close it.
pub async fn handle_socket(state: SharedState, socket: WebSocket, session: AuthenticatedSession) {
    let AuthenticatedSession { actor, mut phase } = session;
    let (sender, mut receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer so topic fan-out never waits on this socket.
    let writer_task = tokio::spawn(async move {
        if let Err(err) = UnboundedReceiverStream::new(outbound_rx)
            .map(Ok)
            .forward(sender)
            .await
        {
            debug!(error = %err, "websocket writer stopped");
        }
    });

    let connection_id = Uuid::new_v4();
    state
        .registry()
        .register(connection_id, actor.clone(), outbound_tx.clone());
    info!(
        connection_id = %connection_id,
        user_id = %actor.id,
        connections = state.registry().connection_count(),
        "client connected"
    );

    let greeting = ServerMessage::Connected(ConnectedPayload::new(connection_id, &actor));
    if !broadcast::send_to_connection(&state, connection_id, &greeting) {
        warn!(connection_id = %connection_id, "connection closed before greeting");
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(connection_id = %connection_id, payload = %text.as_str(), "received client frame");
                if let Err(err) = dispatch(&state, connection_id, &actor, text.as_str()).await {
                    report(&state, connection_id, &err);
                }
            }
            Ok(Message::Binary(_)) => {
                let err = ServiceError::InvalidRequest("binary frames are not supported".into());
                report(&state, connection_id, &err);
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "client closed connection");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    let topics = state
        .registry()
        .unregister(connection_id)
        .map(|entry| entry.topics.len())
        .unwrap_or_default();
    phase = close(phase);
    info!(
        connection_id = %connection_id,
        user_id = %actor.id,
        topics,
        ?phase,
        "client disconnected"
    );

    finalize(writer_task, outbound_tx).await;
}

/// Route one decoded client request to the owning service.
async fn dispatch(
    state: &SharedState,
    connection_id: ConnectionId,
    actor: &Actor,
    text: &str,
) -> Result<(), ServiceError> {
    let request = ClientRequest::from_json_str(text)?;
    debug!(
        connection_id = %connection_id,
        event = request.event_name(),
        match_id = request.match_id(),
        "dispatching client request"
    );

    match request {
        ClientRequest::SubscribeMatch(data) => {
            subscription_service::subscribe(state, connection_id, actor, &data.match_id).await?;
        }
        ClientRequest::UnsubscribeMatch(data) => {
            subscription_service::unsubscribe(state, connection_id, &data.match_id);
        }
        ClientRequest::MatchUpdate(data) => {
            mutation_service::submit(
                state,
                actor,
                &data.match_id,
                &data.update_type,
                data.update_data,
            )
            .await?;
        }
        ClientRequest::ChatMessage(data) => {
            chat_service::send_message(state, connection_id, actor, &data.match_id, &data.message)
                .await?;
        }
        ClientRequest::TypingStart(data) => {
            chat_service::set_typing(state, connection_id, actor, &data.match_id, true)?;
        }
        ClientRequest::TypingStop(data) => {
            chat_service::set_typing(state, connection_id, actor, &data.match_id, false)?;
        }
    }
    Ok(())
}

fn report(state: &SharedState, connection_id: ConnectionId, err: &ServiceError) {
    warn!(connection_id = %connection_id, error = %err, kind = ?err.kind(), "client request failed");
    broadcast::send_to_connection(state, connection_id, &ServerMessage::error(err));
}

fn close(phase: ConnectionPhase) -> ConnectionPhase {
    phase
        .on(ConnectionEvent::Disconnected)
        .unwrap_or(ConnectionPhase::Closed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
