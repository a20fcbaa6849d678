use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use chatui_app_shell::{
    MessageId, MessageTransport, OutgoingMessage, RemoteMessage, SessionId, TransportError,
};
use chatui_core::{
    DispatchReport, Element, EngineConfig, MessageSpec, RawInput, ScreenAction, ScreenSink,
    Session,
};
use indexmap::IndexMap;

/// Runs `future` on a fresh `LocalSet`, so that session loops can be spawned.
pub async fn run_local<F: Future>(future: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(future).await
}

#[derive(Clone, Debug, PartialEq)]
pub enum SinkCall {
    Reset(Vec<MessageSpec>),
    Update(Vec<ScreenAction>),
}

/// Screen sink that keeps everything it is handed.
#[derive(Default)]
pub struct RecordingSink {
    calls: RefCell<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn take(&self) -> Vec<SinkCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn resets(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, SinkCall::Reset(_)))
            .count()
    }

    pub fn last_update(&self) -> Option<Vec<ScreenAction>> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            SinkCall::Update(actions) => Some(actions.clone()),
            SinkCall::Reset(_) => None,
        })
    }
}

#[async_trait(?Send)]
impl ScreenSink for RecordingSink {
    async fn reset(&self, screen: Vec<MessageSpec>) {
        self.calls.borrow_mut().push(SinkCall::Reset(screen));
    }

    async fn update(&self, _screen: Vec<MessageSpec>, actions: Vec<ScreenAction>) {
        self.calls.borrow_mut().push(SinkCall::Update(actions));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportOp {
    Send,
    EditText,
    EditCaption,
    EditMedia,
    EditKeyboard,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransportCall {
    pub op: TransportOp,
    pub session: SessionId,
    pub id: MessageId,
    pub message: Option<OutgoingMessage>,
}

/// In-memory chat: tracks what each session currently shows and records every call.
#[derive(Default)]
pub struct RecordingTransport {
    chats: RefCell<IndexMap<SessionId, IndexMap<MessageId, OutgoingMessage>>>,
    calls: RefCell<Vec<TransportCall>>,
    next_id: Cell<MessageId>,
    failing: Cell<Option<TransportOp>>,
}

impl RecordingTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Makes the next call of `op` fail.
    pub fn fail_next(&self, op: TransportOp) {
        self.failing.set(Some(op));
    }

    pub fn take_calls(&self) -> Vec<TransportCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn ops(&self) -> Vec<TransportOp> {
        self.calls.borrow().iter().map(|call| call.op).collect()
    }

    /// Texts of the messages a session shows, oldest first.
    pub fn chat(&self, session: SessionId) -> Vec<String> {
        self.chats
            .borrow()
            .get(&session)
            .map(|chat| chat.values().map(|message| message.text.clone()).collect())
            .unwrap_or_default()
    }

    pub fn message(&self, session: SessionId, id: MessageId) -> Option<OutgoingMessage> {
        self.chats.borrow().get(&session)?.get(&id).cloned()
    }

    fn record(
        &self,
        op: TransportOp,
        session: SessionId,
        id: MessageId,
        message: Option<&OutgoingMessage>,
    ) -> Result<(), TransportError> {
        if self.failing.get() == Some(op) {
            self.failing.set(None);
            return Err(TransportError::for_message(id, format!("{op:?} refused")));
        }
        self.calls.borrow_mut().push(TransportCall {
            op,
            session,
            id,
            message: message.cloned(),
        });
        Ok(())
    }

    fn edit(
        &self,
        op: TransportOp,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.record(op, session, id, Some(message))?;
        let mut chats = self.chats.borrow_mut();
        let current = chats
            .get_mut(&session)
            .and_then(|chat| chat.get_mut(&id))
            .ok_or_else(|| TransportError::for_message(id, "message to edit not found"))?;
        match op {
            TransportOp::EditKeyboard => current.keyboard = message.keyboard.clone(),
            _ => *current = message.clone(),
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl MessageTransport for RecordingTransport {
    async fn send(
        &self,
        session: SessionId,
        message: &OutgoingMessage,
    ) -> Result<RemoteMessage, TransportError> {
        let id = self.next_id.get() + 1;
        self.record(TransportOp::Send, session, id, Some(message))?;
        self.next_id.set(id);
        self.chats
            .borrow_mut()
            .entry(session)
            .or_default()
            .insert(id, message.clone());
        Ok(RemoteMessage {
            id,
            has_media: message.media.is_some(),
        })
    }

    async fn edit_text(
        &self,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.edit(TransportOp::EditText, session, id, message)
    }

    async fn edit_caption(
        &self,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.edit(TransportOp::EditCaption, session, id, message)
    }

    async fn edit_media(
        &self,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.edit(TransportOp::EditMedia, session, id, message)
    }

    async fn edit_keyboard(
        &self,
        session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.edit(TransportOp::EditKeyboard, session, id, message)
    }

    async fn delete(&self, session: SessionId, id: MessageId) -> Result<(), TransportError> {
        self.record(TransportOp::Delete, session, id, None)?;
        let removed = self
            .chats
            .borrow_mut()
            .get_mut(&session)
            .and_then(|chat| chat.shift_remove(&id));
        match removed {
            Some(_) => Ok(()),
            None => Err(TransportError::for_message(id, "message to delete not found")),
        }
    }
}

/// A started session wired to a [`RecordingSink`], driven by hand.
pub struct TestSession {
    session: Session,
    sink: Rc<RecordingSink>,
}

impl TestSession {
    pub async fn start(root: impl Into<Element>) -> Self {
        Self::start_with_config(root, EngineConfig::default()).await
    }

    pub async fn start_with_config(root: impl Into<Element>, config: EngineConfig) -> Self {
        let sink = RecordingSink::new();
        let session = Session::new(root.into(), sink.clone(), config);
        if let Err(err) = session.start(true).await {
            panic!("test session failed to start: {err}");
        }
        Self { session, sink }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sink(&self) -> &RecordingSink {
        &self.sink
    }

    pub fn screen(&self) -> Vec<MessageSpec> {
        self.session.screen()
    }

    pub fn texts(&self) -> Vec<String> {
        self.screen().into_iter().map(|message| message.text).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.screen()
            .iter()
            .flat_map(|message| message.buttons().map(|button| button.text.clone()))
            .collect()
    }

    /// Presses the first button labelled `label` and runs the resulting batch.
    pub async fn press(&self, label: &str) -> Option<DispatchReport> {
        let id = self
            .screen()
            .iter()
            .flat_map(|message| message.buttons().cloned().collect::<Vec<_>>())
            .find(|button| button.text == label)
            .map(|button| button.id)?;
        if !self.session.push_button(&id) {
            return None;
        }
        self.session.drain().await
    }

    pub async fn input(&self, text: &str) -> Option<DispatchReport> {
        if !self.session.push_input(RawInput::text(text)) {
            return None;
        }
        self.session.drain().await
    }

    pub async fn settle(&self) -> Option<DispatchReport> {
        self.session.drain().await
    }
}
