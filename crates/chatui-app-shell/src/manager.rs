use std::cell::RefCell;
use std::rc::Rc;

use chatui_core::hash::HashMap;
use chatui_core::{
    ContextProvider, DispatchReport, Element, EngineConfig, RawInput, Session, SessionError,
};

use crate::sender::{MessageSender, SenderConfig};
use crate::store::MessageInfoStore;
use crate::transport::{MessageTransport, SessionId};

pub type ScreenFactory = Rc<dyn Fn() -> Element>;
type ProviderFactory = Rc<dyn Fn(SessionId) -> Rc<dyn ContextProvider>>;

/// One [`Session`] per chat, created on first contact from the start-screen factory.
///
/// Session loops are spawned with `spawn_local`, so the manager must be driven from inside
/// a `tokio::task::LocalSet` unless autorun is turned off.
pub struct SessionManager {
    start_screen: ScreenFactory,
    transport: Rc<dyn MessageTransport>,
    store: Rc<dyn MessageInfoStore>,
    engine: EngineConfig,
    sender: SenderConfig,
    provider: Option<ProviderFactory>,
    autorun: bool,
    sessions: RefCell<HashMap<SessionId, Rc<Session>>>,
}

impl SessionManager {
    pub fn new<F>(
        start_screen: F,
        transport: Rc<dyn MessageTransport>,
        store: Rc<dyn MessageInfoStore>,
    ) -> Self
    where
        F: Fn() -> Element + 'static,
    {
        Self {
            start_screen: Rc::new(start_screen),
            transport,
            store,
            engine: EngineConfig::default(),
            sender: SenderConfig::default(),
            provider: None,
            autorun: true,
            sessions: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine = config;
        self
    }

    pub fn with_sender_config(mut self, config: SenderConfig) -> Self {
        self.sender = config;
        self
    }

    pub fn with_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(SessionId) -> Rc<dyn ContextProvider> + 'static,
    {
        self.provider = Some(Rc::new(provider));
        self
    }

    /// Without autorun, queued events only run on [`drain`](Self::drain).
    pub fn with_autorun(mut self, autorun: bool) -> Self {
        self.autorun = autorun;
        self
    }

    pub fn get(&self, id: SessionId) -> Option<Rc<Session>> {
        self.sessions.borrow().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.borrow().is_empty()
    }

    /// Handles the start command: back to the first screen, sent fresh.
    pub async fn start(&self, id: SessionId) -> Result<(), SessionError> {
        let (session, created) = self.session(id, true).await?;
        session.navigator().reset();
        if !created {
            session.reset_screen().await?;
        }
        Ok(())
    }

    pub async fn refresh(&self, id: SessionId) -> Result<(), SessionError> {
        let (session, _) = self.session(id, true).await?;
        session.refresh()
    }

    pub async fn back(&self, id: SessionId) -> Result<bool, SessionError> {
        let (session, _) = self.session(id, true).await?;
        Ok(session.back())
    }

    /// Routes a button press. A session created by the press starts without sending
    /// anything; an id the screen does not know resets it.
    pub async fn button(&self, id: SessionId, button: &str) -> Result<bool, SessionError> {
        let (session, created) = self.session(id, false).await?;
        if created {
            session.start(false).await?;
            self.run(&session)?;
        }
        if session.push_button(button) {
            return Ok(true);
        }
        log::info!("session {id}: stale button {button:?}, resetting screen");
        session.reset_screen().await?;
        Ok(false)
    }

    pub async fn input(&self, id: SessionId, input: RawInput) -> Result<bool, SessionError> {
        let (session, _) = self.session(id, true).await?;
        Ok(session.push_input(input))
    }

    /// Runs whatever the session has queued. Only needed without autorun.
    pub async fn drain(&self, id: SessionId) -> Option<DispatchReport> {
        let session = self.get(id)?;
        session.drain().await
    }

    pub async fn stop(&self, id: SessionId) {
        let session = self.sessions.borrow_mut().remove(&id);
        if let Some(session) = session {
            session.navigator().reset();
            session.stop().await;
        }
    }

    pub async fn stop_all(&self) {
        let sessions: Vec<_> = self.sessions.borrow_mut().drain().collect();
        let stops = sessions.into_iter().map(|(_, session)| async move {
            session.navigator().reset();
            session.stop().await;
        });
        futures::future::join_all(stops).await;
    }

    async fn session(
        &self,
        id: SessionId,
        start: bool,
    ) -> Result<(Rc<Session>, bool), SessionError> {
        if let Some(session) = self.get(id) {
            return Ok((session, false));
        }
        let sink = Rc::new(MessageSender::new(
            id,
            self.transport.clone(),
            self.store.clone(),
            self.sender.clone(),
        ));
        let mut session = Session::new((self.start_screen)(), sink, self.engine.clone());
        if let Some(provider) = &self.provider {
            session = session.with_provider(provider(id));
        }
        let session = Rc::new(session);
        self.sessions.borrow_mut().insert(id, session.clone());
        if start {
            session.start(true).await?;
            self.run(&session)?;
        }
        Ok((session, true))
    }

    fn run(&self, session: &Rc<Session>) -> Result<(), SessionError> {
        if self.autorun {
            session.spawn()?;
        }
        Ok(())
    }
}
