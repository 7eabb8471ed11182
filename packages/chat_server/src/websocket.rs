//! Session adapter: one WebSocket connection is one chat participant.
//!
//! The connection subscribes to the hub, announces itself with a join,
//! replays the archive and then relays hub events out and chat messages in
//! until either side goes away. Teardown always publishes a leave and then
//! cancels the subscription.

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use chat_hub::{Event, HubError, Subscription};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::AppState;

/// Frames sent to the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame on every connection: the id this session posts under
    Connected { user: String },
    /// A chat event, either replayed history or live
    Event { event: Event },
    Error { message: String },
}

/// Frames accepted from the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Message { text: String },
}

pub async fn handle_websocket(socket: WebSocket, state: AppState) {
    // Transport-assigned identity, not an account
    let user = uuid::Uuid::new_v4().to_string();
    state.metrics.connection_opened();
    info!(user = %user, "Chat client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let mut subscription = match state.hub.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(user = %user, "Failed to subscribe: {}", e);
            let _ = send_message(
                &mut ws_sender,
                &ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            state.metrics.connection_closed();
            return;
        }
    };

    if let Err(e) = state.hub.join(&user).await {
        warn!(user = %user, "Failed to publish join: {}", e);
    }

    if replay_history(&mut ws_sender, &user, &subscription, &state)
        .await
        .is_ok()
    {
        relay(
            &mut ws_sender,
            &mut ws_receiver,
            &mut subscription,
            &user,
            &state,
        )
        .await;
    }

    // The hub may be waiting on this feed, so keep draining it until the leave is queued
    let leave = state.hub.leave(&user);
    if let Err(e) = drain_until(&mut subscription, leave).await {
        debug!(user = %user, "Leave not published: {}", e);
    }
    let discarded = subscription.cancel().await;

    state.metrics.connection_closed();
    info!(
        user = %user,
        discarded,
        "Chat client disconnected"
    );
}

async fn replay_history<S>(
    ws_sender: &mut S,
    user: &str,
    subscription: &Subscription,
    state: &AppState,
) -> Result<()>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    send_message(
        ws_sender,
        &ServerMessage::Connected {
            user: user.to_string(),
        },
    )
    .await?;

    for event in subscription.archive() {
        send_message(
            ws_sender,
            &ServerMessage::Event {
                event: event.clone(),
            },
        )
        .await?;
        state.metrics.event_sent();
    }

    debug!(user = %user, "Replayed {} archived events", subscription.archive().len());
    Ok(())
}

/// Pump hub events out and client messages in until either side stops.
async fn relay<S, R>(
    ws_sender: &mut S,
    ws_receiver: &mut R,
    subscription: &mut Subscription,
    user: &str,
    state: &AppState,
) where
    S: Sink<Message, Error = axum::Error> + Unpin,
    R: futures_util::Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    // Error frames for the client go through the outbound side
    let (notice_tx, mut notice_rx) = mpsc::channel::<ServerMessage>(16);

    let outbound = async {
        loop {
            let message = tokio::select! {
                event = subscription.feed().recv() => match event {
                    Some(event) => ServerMessage::Event { event },
                    None => {
                        info!(user = %user, "Hub released feed");
                        break;
                    }
                },
                Some(notice) = notice_rx.recv() => notice,
            };

            let is_event = matches!(message, ServerMessage::Event { .. });
            if let Err(e) = send_message(ws_sender, &message).await {
                debug!(user = %user, "Send to client failed: {}", e);
                break;
            }
            if is_event {
                state.metrics.event_sent();
            }
        }
    };

    // Publishing may wait on the hub, which in turn may wait on this
    // session's feed; running both halves together keeps the feed drained.
    let inbound = async {
        while let Some(frame) = ws_receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Message { text }) => {
                        state.metrics.message_received();
                        if let Err(e) = state.hub.say(user, &text).await {
                            warn!(user = %user, "Failed to publish message: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(user = %user, "Unparseable client frame: {}", e);
                        state.metrics.invalid_frame();
                        let _ = notice_tx.try_send(ServerMessage::Error {
                            message: format!("invalid message: {}", e),
                        });
                    }
                },
                Ok(Message::Binary(_)) => {
                    state.metrics.invalid_frame();
                    let _ = notice_tx.try_send(ServerMessage::Error {
                        message: "binary frames are not supported".to_string(),
                    });
                }
                Ok(Message::Close(_)) => {
                    debug!(user = %user, "Client sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(user = %user, "WebSocket error: {}", e);
                    state.metrics.websocket_error();
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = outbound => {
            debug!(user = %user, "Outbound relay ended");
        }
        _ = inbound => {
            debug!(user = %user, "Inbound relay ended");
        }
    }
}

/// Drive `request` to completion while discarding whatever arrives on the feed.
async fn drain_until<F>(subscription: &mut Subscription, request: F) -> Result<(), HubError>
where
    F: Future<Output = Result<(), HubError>>,
{
    tokio::pin!(request);
    loop {
        tokio::select! {
            result = &mut request => return result,
            Some(_) = subscription.feed().recv() => {}
        }
    }
}

async fn send_message<S>(sender: &mut S, message: &ServerMessage) -> Result<()>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(message)?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}
