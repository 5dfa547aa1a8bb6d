use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::ai::LegalQuery;
use crate::auth::validate_jwt;
use crate::models::{ChatMessage, MessageRole, NewChatMessage, ChatSessionPatch};
use crate::state::AppState;

/// Live sockets by user id. A reconnect replaces the previous sender.
pub type ChatConnections = Arc<RwLock<HashMap<Uuid, mpsc::UnboundedSender<ServerFrame>>>>;

const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Auth { token: String },
    ChatMessage { session_id: Uuid, content: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    AuthSuccess,
    AuthError { message: String },
    MessageSent { message: ChatMessage },
    AiResponse { message: ChatMessage },
    Error { message: String },
}

/// GET /ws - upgrade to the chat socket
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    tracing::debug!("WebSocket connection established");
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let forward_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&frame) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Set once the auth frame succeeds
    let mut bound_user: Option<Uuid> = None;

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => handle_frame(&state, &mut bound_user, &tx, frame).await,
                Err(_) => {
                    let _ = tx.send(ServerFrame::Error {
                        message: "Invalid message format".to_string(),
                    });
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    if let Some(user_id) = bound_user {
        let mut connections = state.connections.write().await;
        // Only drop the registry entry if it is still this socket's sender
        if connections
            .get(&user_id)
            .is_some_and(|sender| sender.same_channel(&tx))
        {
            connections.remove(&user_id);
        }
    }
    forward_task.abort();
    tracing::debug!("WebSocket connection closed");
}

/// Process one client frame, pushing any number of server frames back
/// through `tx`.
pub async fn handle_frame(
    state: &AppState,
    bound_user: &mut Option<Uuid>,
    tx: &mpsc::UnboundedSender<ServerFrame>,
    frame: ClientFrame,
) {
    match frame {
        ClientFrame::Auth { token } => match validate_jwt(&token) {
            Ok(claims) => {
                *bound_user = Some(claims.sub);
                state.connections.write().await.insert(claims.sub, tx.clone());
                let _ = tx.send(ServerFrame::AuthSuccess);
            }
            Err(_) => {
                let _ = tx.send(ServerFrame::AuthError {
                    message: "Invalid token".to_string(),
                });
            }
        },
        ClientFrame::ChatMessage { session_id, content } => {
            let Some(user_id) = *bound_user else {
                let _ = tx.send(ServerFrame::Error {
                    message: "Authentication required".to_string(),
                });
                return;
            };
            relay_message(state, user_id, session_id, content, tx).await;
        }
    }
}

/// Persist the user's question, ask the assistant, persist and push the
/// answer. The AI service degrades to a canned answer internally, so the
/// only error frames here come from storage.
async fn relay_message(
    state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
    content: String,
    tx: &mpsc::UnboundedSender<ServerFrame>,
) {
    let session = match state.storage.session(session_id).await {
        Ok(Some(session)) if session.user_id == user_id => session,
        Ok(Some(_)) => {
            let _ = tx.send(ServerFrame::Error {
                message: "Access denied".to_string(),
            });
            return;
        }
        Ok(None) => {
            let _ = tx.send(ServerFrame::Error {
                message: "Chat session not found".to_string(),
            });
            return;
        }
        Err(e) => {
            tracing::error!("WebSocket session lookup failed: {}", e);
            let _ = tx.send(ServerFrame::Error {
                message: "Failed to load chat session".to_string(),
            });
            return;
        }
    };

    let user_message = match state
        .storage
        .create_message(NewChatMessage {
            session_id,
            role: MessageRole::User,
            content: content.clone(),
            category: None,
            confidence: None,
            references: None,
        })
        .await
    {
        Ok(message) => message,
        Err(e) => {
            tracing::error!("Failed to persist user message: {}", e);
            let _ = tx.send(ServerFrame::Error {
                message: "Failed to save message".to_string(),
            });
            return;
        }
    };
    let _ = tx.send(ServerFrame::MessageSent {
        message: user_message,
    });

    let answer = state
        .ai
        .answer(&LegalQuery {
            question: content.clone(),
            context: None,
            language: session.language,
        })
        .await;

    let ai_message = match state
        .storage
        .create_message(NewChatMessage {
            session_id,
            role: MessageRole::Assistant,
            content: answer.answer,
            category: Some(answer.category),
            confidence: Some(answer.confidence),
            references: Some(answer.references),
        })
        .await
    {
        Ok(message) => message,
        Err(e) => {
            tracing::error!("Failed to persist assistant message: {}", e);
            let _ = tx.send(ServerFrame::Error {
                message: "Failed to save AI response".to_string(),
            });
            return;
        }
    };
    let _ = tx.send(ServerFrame::AiResponse {
        message: ai_message,
    });

    // Retitle after the first user/assistant exchange
    match state.storage.messages_for_session(session_id).await {
        Ok(messages) if messages.len() == 2 => {
            let patch = ChatSessionPatch {
                title: Some(session_title(&content)),
                ..Default::default()
            };
            if let Err(e) = state.storage.update_session(session_id, patch).await {
                tracing::warn!("Failed to retitle session: {}", e);
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to count session messages: {}", e),
    }
}

/// First question, truncated, becomes the session title.
fn session_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", truncated)
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiLegalService;
    use crate::auth::{generate_jwt, Claims};
    use crate::config::{AiConfig, EmailConfig};
    use crate::email::Mailer;
    use crate::metrics::MetricsCollector;
    use crate::models::{ChatLanguage, NewChatSession, NewUser};
    use crate::storage::{MemoryStorage, Storage};

    fn test_state() -> AppState {
        AppState {
            storage: Arc::new(MemoryStorage::new()),
            mailer: Mailer::new(EmailConfig {
                enabled: false,
                endpoint: "https://formsubmit.co/ajax".into(),
                timeout_secs: 1,
            }),
            // Unreachable endpoint: the service falls back to its canned answer
            ai: AiLegalService::new(AiConfig {
                api_base: "http://127.0.0.1:9".into(),
                api_key: String::new(),
                model: "gpt-4o".into(),
                temperature: 0.3,
                max_tokens: 64,
                max_attempts: 1,
                retry_base_delay_ms: 1,
            }),
            metrics: Arc::new(MetricsCollector::new()),
            connections: ChatConnections::default(),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerFrame>) -> Vec<ServerFrame> {
        let mut frames = vec![];
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn client_frames_use_type_tags() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type": "auth", "token": "abc"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Auth { .. }));

        let json = serde_json::to_value(ServerFrame::AuthSuccess).unwrap();
        assert_eq!(json["type"], "auth_success");
    }

    #[test]
    fn titles_truncate_at_fifty_chars() {
        assert_eq!(session_title("short question"), "short question");

        let long = "a".repeat(80);
        let title = session_title(&long);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[tokio::test]
    async fn chat_before_auth_is_rejected() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut bound = None;

        handle_frame(
            &state,
            &mut bound,
            &tx,
            ClientFrame::ChatMessage {
                session_id: Uuid::new_v4(),
                content: "hello".into(),
            },
        )
        .await;

        let frames = drain(&mut rx);
        assert!(matches!(&frames[0], ServerFrame::Error { message } if message.contains("Authentication")));
    }

    #[tokio::test]
    async fn bad_token_gets_auth_error() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut bound = None;

        handle_frame(
            &state,
            &mut bound,
            &tx,
            ClientFrame::Auth {
                token: "garbage".into(),
            },
        )
        .await;

        assert!(bound.is_none());
        let frames = drain(&mut rx);
        assert!(matches!(frames[0], ServerFrame::AuthError { .. }));
    }

    #[tokio::test]
    async fn full_exchange_persists_and_retitles() {
        let state = test_state();
        let user = state
            .storage
            .create_user(NewUser {
                name: "John Doe".into(),
                email: "user@lawhelp.cm".into(),
                password_hash: "h".into(),
                phone: None,
                location: None,
            })
            .await
            .unwrap();
        let session = state
            .storage
            .create_session(NewChatSession {
                user_id: user.id,
                title: "New Chat Session".into(),
                language: ChatLanguage::En,
            })
            .await
            .unwrap();

        let token = generate_jwt(&Claims::new(user.id, user.email.clone())).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut bound = None;

        handle_frame(&state, &mut bound, &tx, ClientFrame::Auth { token }).await;
        assert_eq!(bound, Some(user.id));
        assert!(state.connections.read().await.contains_key(&user.id));

        handle_frame(
            &state,
            &mut bound,
            &tx,
            ClientFrame::ChatMessage {
                session_id: session.id,
                content: "What does the Penal Code say about theft?".into(),
            },
        )
        .await;

        let frames = drain(&mut rx);
        assert!(matches!(frames[0], ServerFrame::AuthSuccess));
        assert!(matches!(&frames[1], ServerFrame::MessageSent { message } if message.role == MessageRole::User));
        match &frames[2] {
            ServerFrame::AiResponse { message } => {
                assert_eq!(message.role, MessageRole::Assistant);
                // Unreachable AI endpoint degrades to the canned answer
                assert_eq!(message.category.as_deref(), Some("System Error"));
            }
            other => panic!("expected ai_response, got {:?}", other),
        }

        let messages = state.storage.messages_for_session(session.id).await.unwrap();
        assert_eq!(messages.len(), 2);

        let session = state.storage.session(session.id).await.unwrap().unwrap();
        assert_eq!(session.title, "What does the Penal Code say about theft?");
    }

    #[tokio::test]
    async fn strangers_session_is_denied() {
        let state = test_state();
        let owner = state
            .storage
            .create_user(NewUser {
                name: "Owner".into(),
                email: "owner@lawhelp.cm".into(),
                password_hash: "h".into(),
                phone: None,
                location: None,
            })
            .await
            .unwrap();
        let stranger = state
            .storage
            .create_user(NewUser {
                name: "Stranger".into(),
                email: "stranger@lawhelp.cm".into(),
                password_hash: "h".into(),
                phone: None,
                location: None,
            })
            .await
            .unwrap();
        let session = state
            .storage
            .create_session(NewChatSession {
                user_id: owner.id,
                title: "New Chat Session".into(),
                language: ChatLanguage::En,
            })
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut bound = Some(stranger.id);

        handle_frame(
            &state,
            &mut bound,
            &tx,
            ClientFrame::ChatMessage {
                session_id: session.id,
                content: "peek".into(),
            },
        )
        .await;

        let frames = drain(&mut rx);
        assert!(matches!(&frames[0], ServerFrame::Error { message } if message == "Access denied"));
        assert!(state
            .storage
            .messages_for_session(session.id)
            .await
            .unwrap()
            .is_empty());
    }
}
