//! Platform glue around [`chatui_core::Session`]: delivers screen diffs through a
//! [`MessageTransport`] and routes inbound traffic to per-chat sessions.

mod manager;
mod sender;
mod store;
mod transport;

pub use manager::{ScreenFactory, SessionManager};
pub use sender::{MessageSender, SenderConfig, SenderError};
pub use store::{MemoryMessageInfoStore, MessageInfo, MessageInfoStore};
pub use transport::{
    MessageId, MessageTransport, OutgoingMessage, RemoteButton, RemoteMessage, SessionId,
    TransportError,
};
