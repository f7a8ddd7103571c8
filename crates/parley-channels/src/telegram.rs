use crate::channel::{Channel, InboundEvent, InboundKind, MessageHandle, ReplySink, UpdateOutcome};
use crate::filter::UserFilter;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult, ReplyMode, UserId};
use parley_voice::AudioFormat;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const MODE_CALLBACK_PREFIX: &str = "mode:";
const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram Bot API channel adapter.
///
/// Uses the Telegram Bot HTTP API for sending messages and long-polling
/// (`getUpdates`) for receiving them. Authorized updates are forwarded
/// through a `tokio::sync::mpsc` channel as [`InboundEvent`]s; everything else
/// is dropped here, before the engine sees it.
pub struct TelegramChannel {
    api: Arc<TelegramApi>,
    filter: UserFilter,
    event_tx: mpsc::Sender<InboundEvent>,
    event_rx: Option<mpsc::Receiver<InboundEvent>>,
}

/// Shared HTTP plumbing for the channel and its sinks.
struct TelegramApi {
    base: String,
    bot_token: String,
    client: reqwest::Client,
}

// ── Telegram API response types ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessagePayload>,
    callback_query: Option<TelegramCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessagePayload {
    from: Option<TelegramUser>,
    chat: TelegramChat,
    text: Option<String>,
    voice: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    id: i64,
    first_name: String,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramCallbackQuery {
    id: String,
    from: TelegramUser,
    message: Option<TelegramMessagePayload>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct EditMessageRequest<'a> {
    chat_id: &'a str,
    message_id: i64,
    text: &'a str,
}

/// What a raw update turned into.
#[derive(Debug, PartialEq, Eq)]
enum ParsedUpdate {
    Event(InboundEvent),
    /// A button press that must be acknowledged before its event is handled.
    Callback { query_id: String, event: InboundEvent },
    Ignored,
}

impl TelegramApi {
    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.bot_token, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> ParleyResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ParleyError::Channel(format!("Telegram {method} error: {e}")))?;
        Self::parse(method, response).await
    }

    async fn parse<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> ParleyResult<T> {
        let body: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| ParleyError::Channel(format!("Telegram parse error: {e}")))?;

        if !body.ok {
            return Err(ParleyError::Channel(format!(
                "Telegram {method} failed: {}",
                body.description.unwrap_or_default()
            )));
        }

        body.result
            .ok_or_else(|| ParleyError::Channel(format!("Telegram {method}: empty result")))
    }
}

// ── Implementation ──────────────────────────────────────────────────────────

/// Result of one `getUpdates` round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing new arrived.
    Idle,
    /// Updates were consumed; poll next from this offset.
    Advanced(i64),
    /// The event receiver is gone, so polling should stop.
    Closed,
}

impl TelegramChannel {
    /// Create a new `TelegramChannel`.
    ///
    /// * `bot_token` – The bot token obtained from @BotFather.
    /// * `filter` – Senders allowed to talk to the bot.
    /// * `event_buffer` – Capacity of the internal mpsc event buffer.
    pub fn new(bot_token: impl Into<String>, filter: UserFilter, event_buffer: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        Self {
            api: Arc::new(TelegramApi {
                base: DEFAULT_API_BASE.to_string(),
                bot_token: bot_token.into(),
                client: reqwest::Client::new(),
            }),
            filter,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Point the adapter at another Bot API server (self-hosted or a test mock).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        let api = TelegramApi {
            base: base.into().trim_end_matches('/').to_string(),
            bot_token: self.api.bot_token.clone(),
            client: self.api.client.clone(),
        };
        self.api = Arc::new(api);
        self
    }

    /// Take the receiving half of the event channel.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<InboundEvent>> {
        self.event_rx.take()
    }

    /// Publish the bot's command list (`setMyCommands`).
    pub async fn register_commands(&self) -> ParleyResult<()> {
        let body = serde_json::json!({
            "commands": [
                {"command": "new_chat", "description": "Start new chat"},
                {"command": "mode", "description": "Choose text or voice replies"},
            ]
        });
        let _: bool = self.api.call("setMyCommands", &body).await?;
        tracing::info!("Telegram bot commands registered");
        Ok(())
    }

    /// Start long-polling the Telegram `getUpdates` endpoint.
    ///
    /// This method runs until the event receiver is dropped, forwarding every
    /// authorized interaction through the mpsc channel. Poll failures are
    /// logged and retried after a pause. It should be spawned onto a Tokio task.
    pub async fn poll_updates(&self) -> ParleyResult<()> {
        let mut offset: Option<i64> = None;

        tracing::info!("Telegram channel listening for messages");
        loop {
            match self.poll_once(offset).await {
                Ok(PollOutcome::Advanced(next)) => offset = Some(next),
                Ok(PollOutcome::Idle) => {}
                Ok(PollOutcome::Closed) => {
                    tracing::info!("Event receiver dropped, Telegram polling stopped");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram poll failed, retrying");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    /// One `getUpdates` round trip.
    pub async fn poll_once(&self, offset: Option<i64>) -> ParleyResult<PollOutcome> {
        let mut body = serde_json::json!({
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(off) = offset {
            body["offset"] = serde_json::json!(off);
        }

        let updates: Vec<TelegramUpdate> = self.api.call("getUpdates", &body).await?;

        let mut next = None;
        for update in updates {
            // Advance the offset so we do not receive this update again.
            next = Some(update.update_id + 1);

            let event = match self.parse_update(update) {
                ParsedUpdate::Ignored => continue,
                ParsedUpdate::Event(event) => event,
                ParsedUpdate::Callback { query_id, event } => {
                    if let Err(e) = self.answer_callback(&query_id).await {
                        tracing::debug!(error = %e, "answerCallbackQuery failed");
                    }
                    event
                }
            };

            tracing::info!(
                channel = "telegram",
                user_id = %event.user_id,
                chat_id = %event.chat_id,
                kind = ?event.kind,
                "Inbound message"
            );

            if self.event_tx.send(event).await.is_err() {
                return Ok(PollOutcome::Closed);
            }
        }
        Ok(next.map_or(PollOutcome::Idle, PollOutcome::Advanced))
    }

    fn parse_update(&self, update: TelegramUpdate) -> ParsedUpdate {
        if let Some(query) = update.callback_query {
            return self.parse_callback(query);
        }
        let Some(msg) = update.message else {
            return ParsedUpdate::Ignored;
        };

        let Some(from) = msg.from else {
            return ParsedUpdate::Ignored;
        };
        if !self.filter.is_allowed(Some(from.id), from.username.as_deref()) {
            tracing::warn!(
                user = from.id,
                username = from.username.as_deref().unwrap_or("unknown"),
                "Ignoring message from unauthorized user"
            );
            return ParsedUpdate::Ignored;
        }

        let kind = if let Some(text) = msg.text {
            match parse_command(&text) {
                Some(cmd) => match cmd {
                    "start" => InboundKind::Start,
                    "new_chat" => InboundKind::NewConversation,
                    "mode" => InboundKind::ModeMenu,
                    _ => return ParsedUpdate::Ignored,
                },
                None => InboundKind::Text(text),
            }
        } else if msg.voice.is_some() {
            InboundKind::Voice
        } else {
            return ParsedUpdate::Ignored;
        };

        ParsedUpdate::Event(InboundEvent {
            user_id: UserId::from(msg.chat.id),
            chat_id: msg.chat.id.to_string(),
            sender_name: Some(from.first_name),
            kind,
        })
    }

    fn parse_callback(&self, query: TelegramCallbackQuery) -> ParsedUpdate {
        if !self
            .filter
            .is_allowed(Some(query.from.id), query.from.username.as_deref())
        {
            return ParsedUpdate::Ignored;
        }
        let (Some(message), Some(data)) = (query.message, query.data) else {
            return ParsedUpdate::Ignored;
        };
        let Some(mode) = data
            .strip_prefix(MODE_CALLBACK_PREFIX)
            .and_then(|m| m.parse::<ReplyMode>().ok())
        else {
            return ParsedUpdate::Ignored;
        };

        ParsedUpdate::Callback {
            query_id: query.id,
            event: InboundEvent {
                user_id: UserId::from(message.chat.id),
                chat_id: message.chat.id.to_string(),
                sender_name: Some(query.from.first_name),
                kind: InboundKind::SelectMode(mode),
            },
        }
    }

    async fn answer_callback(&self, query_id: &str) -> ParleyResult<()> {
        let body = serde_json::json!({ "callback_query_id": query_id });
        let _: bool = self.api.call("answerCallbackQuery", &body).await?;
        Ok(())
    }
}

/// `"/new_chat@my_bot extra"` → `Some("new_chat")`.
fn parse_command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    let command = command.split('@').next().unwrap_or(command);
    (!command.is_empty()).then_some(command)
}

impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn sink(&self, chat_id: &str) -> Arc<dyn ReplySink> {
        Arc::new(TelegramSink {
            api: self.api.clone(),
            chat_id: chat_id.to_string(),
        })
    }
}

/// [`ReplySink`] bound to one Telegram chat.
pub struct TelegramSink {
    api: Arc<TelegramApi>,
    chat_id: String,
}

#[async_trait]
impl ReplySink for TelegramSink {
    async fn send_placeholder(&self, text: &str) -> ParleyResult<MessageHandle> {
        let sent: SentMessage = self
            .api
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: &self.chat_id,
                    text,
                    reply_markup: None,
                },
            )
            .await?;
        Ok(MessageHandle {
            chat_id: self.chat_id.clone(),
            message_id: sent.message_id,
        })
    }

    async fn update_message(&self, handle: &MessageHandle, text: &str) -> UpdateOutcome {
        let request = EditMessageRequest {
            chat_id: &handle.chat_id,
            message_id: handle.message_id,
            text,
        };
        match self
            .api
            .call::<_, serde_json::Value>("editMessageText", &request)
            .await
        {
            Ok(_) => UpdateOutcome::Applied,
            Err(e) => UpdateOutcome::Rejected {
                reason: e.to_string(),
            },
        }
    }

    async fn send_text(&self, text: &str) -> ParleyResult<()> {
        let _: SentMessage = self
            .api
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: &self.chat_id,
                    text,
                    reply_markup: None,
                },
            )
            .await?;
        Ok(())
    }

    async fn send_voice(&self, path: &Path, duration: Duration) -> ParleyResult<()> {
        let format = AudioFormat::from_path(path).ok_or_else(|| {
            ParleyError::Channel(format!("unsupported voice file: {}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or_else(|| format!("voice.{}", format.extension()), str::to_string);
        let bytes = tokio::fs::read(path).await?;
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(format.mime_type())
            .map_err(|e| ParleyError::Channel(format!("invalid voice mime type: {e}")))?;

        let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("duration", secs.to_string())
            .part("voice", part);

        let response = self
            .api
            .client
            .post(self.api.url("sendVoice"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ParleyError::Channel(format!("Telegram sendVoice error: {e}")))?;
        let _: SentMessage = TelegramApi::parse("sendVoice", response).await?;

        tracing::info!(chat_id = %self.chat_id, duration_secs = secs, "Telegram voice sent");
        Ok(())
    }

    async fn send_typing(&self) -> ParleyResult<()> {
        let body = serde_json::json!({ "chat_id": self.chat_id, "action": "typing" });
        let _: bool = self.api.call("sendChatAction", &body).await?;
        Ok(())
    }

    async fn send_mode_menu(&self, current: ReplyMode) -> ParleyResult<()> {
        let _: SentMessage = self
            .api
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: &self.chat_id,
                    text: "How should I reply?",
                    reply_markup: Some(mode_keyboard(current)),
                },
            )
            .await?;
        Ok(())
    }
}

fn mode_keyboard(current: ReplyMode) -> serde_json::Value {
    let row: Vec<serde_json::Value> = ReplyMode::ALL
        .iter()
        .map(|mode| {
            let label = if *mode == current {
                format!("✓ {}", mode.label())
            } else {
                mode.label().to_string()
            };
            serde_json::json!({
                "text": label,
                "callback_data": format!("{MODE_CALLBACK_PREFIX}{mode}"),
            })
        })
        .collect();
    serde_json::json!({ "inline_keyboard": [row] })
}
