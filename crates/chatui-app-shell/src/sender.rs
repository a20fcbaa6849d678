//! Applies screen diffs to the remote chat through a [`MessageTransport`].

use std::rc::Rc;
use std::time::Instant;

use async_trait::async_trait;
use chatui_core::{MediaKind, MediaRef, MediaSource, MessageSpec, ScreenAction, ScreenSink};
use futures::future::{join, join_all, LocalBoxFuture};
use futures::FutureExt;

use crate::store::{MessageInfo, MessageInfoStore};
use crate::transport::{
    MessageId, MessageTransport, OutgoingMessage, RemoteButton, SessionId, TransportError,
};

#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no remote message stored for key {key:?}")]
    UnknownMessage { key: String },
}

#[derive(Clone, Debug)]
pub struct SenderConfig {
    /// Stands in for the media of a message that must keep its media slot.
    pub default_image: String,
    /// Sent instead of an empty text, which the remote side rejects.
    pub filler_text: String,
    /// Prepended on odd update counters so that a no-op edit still changes the text.
    pub invisible_marker: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            default_image: String::from("https://placehold.co/600x400.png"),
            filler_text: format!("\u{281b}{}&#8204;", " ".repeat(55)),
            invisible_marker: String::from("&#8204;"),
        }
    }
}

/// [`ScreenSink`] of one chat session.
pub struct MessageSender {
    session: SessionId,
    transport: Rc<dyn MessageTransport>,
    store: Rc<dyn MessageInfoStore>,
    config: SenderConfig,
}

impl MessageSender {
    pub fn new(
        session: SessionId,
        transport: Rc<dyn MessageTransport>,
        store: Rc<dyn MessageInfoStore>,
        config: SenderConfig,
    ) -> Self {
        Self {
            session,
            transport,
            store,
            config,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn prepare(&self, message: &MessageSpec, update_counter: u32) -> OutgoingMessage {
        let media = message.media.first().map(|media| match &media.source {
            MediaSource::Url(url) if url.is_empty() => {
                MediaRef::url(media.kind, self.config.default_image.clone())
            }
            _ => media.clone(),
        });
        let mut text = if message.text.is_empty() {
            self.config.filler_text.clone()
        } else {
            message.text.clone()
        };
        if update_counter % 2 == 1 {
            text.insert_str(0, &self.config.invisible_marker);
        }
        let keyboard = message
            .keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| RemoteButton {
                        text: button.text.clone(),
                        url: button.url.clone(),
                        data: button.id.clone(),
                    })
                    .collect()
            })
            .collect();
        OutgoingMessage {
            text,
            media,
            keyboard,
            parse_mode: message.parse_mode,
            disable_web_page_preview: message.disable_web_page_preview,
            disable_notification: !message.enable_notification,
        }
    }

    /// Deletes every known remote message and sends the whole screen again.
    pub async fn reset_screen(&self, screen: &[MessageSpec]) {
        let sent = self.store.get_all(self.session).await;
        self.store.remove_all(self.session).await;

        let sends = async {
            for message in screen {
                if let Err(err) = self.send(message).await {
                    log::error!("session {}: send failed during reset: {err}", self.session);
                }
            }
        };
        let deletes = join_all(sent.iter().map(|info| self.delete_by_id(info.message_id)));
        let (_, deleted) = join(sends, deletes).await;
        for err in deleted.into_iter().filter_map(Result::err) {
            log::error!("session {}: delete failed during reset: {err}", self.session);
        }
    }

    /// Applies a diff. Sends go out one by one in screen order while edits and deletes
    /// run alongside. Returns the first failure after every operation has finished.
    pub async fn apply(&self, actions: &[ScreenAction]) -> Result<(), SenderError> {
        // Resolve remote ids before any re-keying starts.
        let mut edits: Vec<LocalBoxFuture<'_, Result<(), SenderError>>> = Vec::new();
        for action in actions {
            match action {
                ScreenAction::Send { .. } => {}
                ScreenAction::Keep { old, new } => {
                    let info = self.stored(&old.key).await?;
                    edits.push(self.rekey(info, &new.key).boxed_local());
                }
                ScreenAction::Update { old, new } => {
                    let info = self.stored(&old.key).await?;
                    edits.push(self.edit(info, old, new).boxed_local());
                }
                ScreenAction::Delete { old } => {
                    let info = self.stored(&old.key).await?;
                    edits.push(
                        async move {
                            self.delete_by_id(info.message_id).await?;
                            self.store.remove(self.session, info.message_id).await;
                            Ok(())
                        }
                        .boxed_local(),
                    );
                }
            }
        }
        let sends = async {
            for action in actions {
                if let ScreenAction::Send { new } = action {
                    self.send(new).await?;
                }
            }
            Ok::<_, SenderError>(())
        };
        let (sent, edited) = join(sends, join_all(edits)).await;
        let mut first = None;
        for err in std::iter::once(sent).chain(edited).filter_map(Result::err) {
            log::error!("session {}: {err}", self.session);
            first.get_or_insert(err);
        }
        first.map_or(Ok(()), Err)
    }

    async fn stored(&self, key: &str) -> Result<MessageInfo, SenderError> {
        self.store
            .get(self.session, key)
            .await
            .ok_or_else(|| SenderError::UnknownMessage { key: key.to_owned() })
    }

    async fn send(&self, message: &MessageSpec) -> Result<(), SenderError> {
        let outgoing = self.prepare(message, 0);
        let remote = self.transport.send(self.session, &outgoing).await?;
        self.store
            .add(
                self.session,
                &message.key,
                MessageInfo::new(remote.id, remote.has_media),
            )
            .await;
        Ok(())
    }

    async fn rekey(&self, info: MessageInfo, key: &str) -> Result<(), SenderError> {
        self.store.remove(self.session, info.message_id).await;
        self.store.add(self.session, key, info).await;
        Ok(())
    }

    async fn edit(
        &self,
        mut info: MessageInfo,
        old: &MessageSpec,
        new: &MessageSpec,
    ) -> Result<(), SenderError> {
        let media_changed = !new.same_media(old);
        let mut text_changed = !new.same_text(old);
        let keyboard_changed = !new.same_keyboard(old);
        if !media_changed && !text_changed && !keyboard_changed {
            info.update_counter += 1;
            text_changed = true;
        }

        let mut outgoing = self.prepare(new, info.update_counter);
        if info.has_media && outgoing.media.is_none() {
            outgoing.media = Some(MediaRef::url(
                MediaKind::Photo,
                self.config.default_image.clone(),
            ));
        }

        let id = info.message_id;
        let session = self.session;
        if media_changed {
            self.transport.edit_media(session, id, &outgoing).await?;
        } else if text_changed && info.has_media {
            self.transport.edit_caption(session, id, &outgoing).await?;
        } else if text_changed {
            self.transport.edit_text(session, id, &outgoing).await?;
        } else if keyboard_changed {
            self.transport.edit_keyboard(session, id, &outgoing).await?;
        }
        self.rekey(info, &new.key).await
    }

    async fn delete_by_id(&self, id: MessageId) -> Result<(), TransportError> {
        self.transport.delete(self.session, id).await
    }
}

#[async_trait(?Send)]
impl ScreenSink for MessageSender {
    async fn reset(&self, screen: Vec<MessageSpec>) {
        self.reset_screen(&screen).await;
    }

    async fn update(&self, screen: Vec<MessageSpec>, actions: Vec<ScreenAction>) {
        let started = Instant::now();
        if let Err(err) = self.apply(&actions).await {
            log::error!(
                "session {}: screen update failed, resetting: {err}",
                self.session
            );
            self.reset_screen(&screen).await;
        }
        log::debug!(
            "session {}: screen update took {:?}",
            self.session,
            started.elapsed()
        );
    }
}
