//! One WebSocket session: refetch, (re)subscribe, then relay input and pushed events.

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use kizuna_server::infrastructure::dto::websocket::{ClientCommand, ServerEvent};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    api::ApiClient,
    command::{Command, HELP, parse_command},
    domain::ViewState,
    error::ClientError,
};

use super::{formatter::MessageFormatter, ui::print_above_prompt};

/// Keeps the session alive on the server, which drops sessions silent for a minute.
const HEARTBEAT_INTERVAL_SECS: u64 = 20;

type SharedView = Arc<Mutex<ViewState>>;

async fn show(view: &SharedView, text: &str) {
    let username = view.lock().await.me.username.clone();
    print_above_prompt(text, &username);
}

/// Run the client session until the user quits or the connection drops
///
/// Returns `Ok(())` when the user quits, an error when the connection is lost.
pub async fn run_client_session(
    api: &ApiClient,
    view: SharedView,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let ws_stream = match connect_async(api.ws_url()?).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(tungstenite::Error::Http(response)) if response.status().as_u16() == 401 => {
            return Err(ClientError::Unauthorized);
        }
        Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
    };
    tracing::info!("Connected to Kizuna!");

    // Events missed while disconnected are not replayed; fetch the current state instead
    refetch(api, &view).await?;

    let (mut write, mut read) = ws_stream.split();

    // Outbound frames go through one task so the heartbeat and commands share the sink
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientCommand>();
    let mut write_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        loop {
            let command = tokio::select! {
                command = out_rx.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
                _ = heartbeat.tick() => ClientCommand::Ping,
            };
            let json = match serde_json::to_string(&command) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize command: {}", e);
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(json.into())).await {
                tracing::warn!("Failed to send frame: {}", e);
                break;
            }
        }
    });

    // Spawn a task to handle incoming frames
    let view_for_read = view.clone();
    let api_for_read = api.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let Ok(event) = serde_json::from_str::<ServerEvent>(text.as_str()) else {
                        let raw = MessageFormatter::format_raw_message(text.as_str());
                        show(&view_for_read, &raw).await;
                        continue;
                    };
                    if matches!(event, ServerEvent::ConnectionEstablished { .. })
                        && let Ok(connections) = api_for_read.connections().await
                    {
                        view_for_read.lock().await.learn_names(&connections);
                    }

                    let output = {
                        let mut view = view_for_read.lock().await;
                        let closed = view.apply_event(&event);
                        let mut output = MessageFormatter::format_event(&event, &view);
                        if closed {
                            output.get_or_insert_with(String::new).push_str(
                                &MessageFormatter::format_notice("(the open conversation is gone)"),
                            );
                        }
                        output
                    };
                    if let Some(output) = output {
                        show(&view_for_read, &output).await;
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // A reconnect starts with only `user:{id}`; follow the open conversation again
    if let Some(conversation_id) = view.lock().await.open_conversation {
        let _ = out_tx.send(ClientCommand::SubscribeConversation { conversation_id });
    }

    let result = loop {
        tokio::select! {
            _ = &mut read_task => {
                break Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            _ = &mut write_task => {
                break Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break Ok(());
                };
                match handle_line(api, &view, &out_tx, &line).await {
                    Ok(true) => continue,
                    Ok(false) => break Ok(()),
                    Err(ClientError::Unauthorized) => break Err(ClientError::Unauthorized),
                    Err(e) => {
                        let error = MessageFormatter::format_error("Error", &e.to_string());
                        show(&view, &error).await;
                    }
                }
            }
        }
    };

    read_task.abort();
    write_task.abort();
    result
}

/// Load connections, the chat list and the open conversation from the API
async fn refetch(api: &ApiClient, view: &SharedView) -> Result<(), ClientError> {
    let connections = api.connections().await?;
    let chats = api.conversations().await?;
    let mut output = {
        let mut view = view.lock().await;
        view.learn_names(&connections);
        for chat in &chats {
            view.learn_name(&chat.counterpart);
        }
        let mut output = MessageFormatter::format_welcome(&view);
        output.push_str(&MessageFormatter::format_chats(&chats, &view));
        output
    };

    let open = view.lock().await.open_conversation;
    if let Some(conversation_id) = open {
        match api.history(conversation_id).await {
            Ok(messages) => {
                let view = view.lock().await;
                output.push_str(&MessageFormatter::format_history(
                    conversation_id,
                    &messages,
                    &view,
                ));
            }
            Err(ClientError::Api { .. }) => {
                // Removed while we were away
                view.lock().await.open_conversation = None;
                output.push_str(&MessageFormatter::format_notice(
                    "(the open conversation is gone)",
                ));
            }
            Err(e) => return Err(e),
        }
    }

    show(view, &output).await;
    Ok(())
}

/// Run one input line. Returns `Ok(false)` when the user asked to quit.
async fn handle_line(
    api: &ApiClient,
    view: &SharedView,
    out_tx: &mpsc::UnboundedSender<ClientCommand>,
    line: &str,
) -> Result<bool, ClientError> {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(e) => {
            show(view, &MessageFormatter::format_notice(&e.to_string())).await;
            return Ok(true);
        }
    };
    let open = view.lock().await.open_conversation;
    let send = |command: ClientCommand| {
        out_tx
            .send(command)
            .map_err(|_| ClientError::ConnectionError("Connection lost".to_string()))
    };

    let output = match command {
        Command::Connect(user_id) => {
            let response = api.connect(user_id).await?;
            format!(
                "\nconnected; conversation {} is ready\n",
                response.conversation.id
            )
        }
        Command::Disconnect(user_id) => {
            let response = api.disconnect(user_id).await?;
            format!(
                "\ndisconnected; {} messages deleted\n",
                response.deleted_messages
            )
        }
        Command::Status(user_id) => {
            let response = api.connection_status(user_id).await?;
            let label = if response.connected {
                "connected"
            } else {
                "not connected"
            };
            format!("\n{}: {}\n", view.lock().await.name_of(user_id), label)
        }
        Command::Connections => {
            let connections = api.connections().await?;
            view.lock().await.learn_names(&connections);
            MessageFormatter::format_connections(&connections)
        }
        Command::Chats => {
            let chats = api.conversations().await?;
            let mut view = view.lock().await;
            for chat in &chats {
                view.learn_name(&chat.counterpart);
            }
            MessageFormatter::format_chats(&chats, &view)
        }
        Command::Open(conversation_id) => {
            let messages = api.history(conversation_id).await?;
            if let Some(previous) = open.filter(|previous| *previous != conversation_id) {
                send(ClientCommand::UnsubscribeConversation {
                    conversation_id: previous,
                })?;
            }
            send(ClientCommand::SubscribeConversation { conversation_id })?;
            let mut view = view.lock().await;
            view.open_conversation = Some(conversation_id);
            MessageFormatter::format_history(conversation_id, &messages, &view)
        }
        Command::Close => match open {
            Some(conversation_id) => {
                send(ClientCommand::UnsubscribeConversation { conversation_id })?;
                view.lock().await.open_conversation = None;
                String::new()
            }
            None => MessageFormatter::format_notice("No conversation is open"),
        },
        Command::History => match open {
            Some(conversation_id) => {
                let messages = api.history(conversation_id).await?;
                MessageFormatter::format_history(conversation_id, &messages, &*view.lock().await)
            }
            None => MessageFormatter::format_notice("No conversation is open"),
        },
        Command::Clear => match open {
            Some(conversation_id) => {
                let response = api.clear(conversation_id).await?;
                format!("\n{} messages deleted\n", response.deleted_messages)
            }
            None => MessageFormatter::format_notice("No conversation is open"),
        },
        Command::Help => format!("\n{}\n", HELP),
        Command::Quit => return Ok(false),
        Command::Say(content) => match open {
            Some(conversation_id) => {
                send(ClientCommand::SendMessage {
                    conversation_id,
                    content,
                })?;
                String::new()
            }
            None => {
                MessageFormatter::format_notice("Open a conversation first (/chats, /open <id>)")
            }
        },
    };

    show(view, &output).await;
    Ok(true)
}
