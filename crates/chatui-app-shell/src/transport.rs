use async_trait::async_trait;
use chatui_core::{MediaRef, ParseMode};

pub type SessionId = i64;
pub type MessageId = i64;

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub message_id: Option<MessageId>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            message_id: None,
        }
    }

    pub fn for_message(message_id: MessageId, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            message_id: Some(message_id),
        }
    }
}

/// What the remote side answered for a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteMessage {
    pub id: MessageId,
    pub has_media: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteButton {
    pub text: String,
    pub url: Option<String>,
    /// Callback payload: the button id resolved by the dispatcher.
    pub data: String,
}

/// A message in the shape the transport puts on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingMessage {
    pub text: String,
    pub media: Option<MediaRef>,
    pub keyboard: Vec<Vec<RemoteButton>>,
    pub parse_mode: ParseMode,
    pub disable_web_page_preview: bool,
    pub disable_notification: bool,
}

/// The chat platform API as far as message delivery needs it.
#[async_trait(?Send)]
pub trait MessageTransport {
    async fn send(
        &self,
        session: SessionId,
        message: &OutgoingMessage,
    ) -> Result<RemoteMessage, TransportError>;

    async fn edit_text(
        &self,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError>;

    async fn edit_caption(
        &self,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError>;

    async fn edit_media(
        &self,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError>;

    async fn edit_keyboard(
        &self,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError>;

    async fn delete(&self, session: SessionId, id: MessageId) -> Result<(), TransportError>;
}
