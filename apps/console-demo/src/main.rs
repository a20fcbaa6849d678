use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chatui_app_shell::{
    MemoryMessageInfoStore, MessageId, MessageTransport, OutgoingMessage, RemoteMessage,
    SessionId, SessionManager, TransportError,
};
use chatui_core::{
    async_trait, Component, Element, MessageFlags, NodeKind, Props, RawInput, Reactive, Scope,
};
use chatui_ui::{Back, Button, Column, MessageInput, Navigate, Row, Text};
use indexmap::IndexMap;
use tokio::io::{AsyncBufReadExt, BufReader};

const CHAT: SessionId = 1;

/// Prints every delivery and keeps the current chat so buttons can be pressed by number.
#[derive(Default)]
struct ConsoleTransport {
    messages: RefCell<IndexMap<MessageId, OutgoingMessage>>,
    next_id: Cell<MessageId>,
}

impl ConsoleTransport {
    fn print(&self, verb: &str, id: MessageId) {
        let messages = self.messages.borrow();
        let Some(message) = messages.get(&id) else {
            println!("[{verb} #{id}]");
            return;
        };
        println!("[{verb} #{id}]");
        if let Some(media) = &message.media {
            println!("  <{:?}: {:?}>", media.kind, media.source);
        }
        for line in message.text.replace("&#8204;", "").lines() {
            println!("  {line}");
        }
        for row in &message.keyboard {
            let labels: Vec<_> = row.iter().map(|button| format!("[{}]", button.text)).collect();
            println!("  {}", labels.join(" "));
        }
    }

    /// Callback data of every button on screen, top to bottom.
    fn buttons(&self) -> Vec<(String, String)> {
        self.messages
            .borrow()
            .values()
            .flat_map(|message| message.keyboard.iter().flatten())
            .filter(|button| button.url.is_none())
            .map(|button| (button.text.clone(), button.data.clone()))
            .collect()
    }

    fn store(&self, id: MessageId, message: &OutgoingMessage) -> Result<(), TransportError> {
        match self.messages.borrow_mut().get_mut(&id) {
            Some(current) => {
                *current = message.clone();
                Ok(())
            }
            None => Err(TransportError::for_message(id, "no such message")),
        }
    }
}

#[async_trait(?Send)]
impl MessageTransport for ConsoleTransport {
    async fn send(
        &self,
        _session: SessionId,
        message: &OutgoingMessage,
    ) -> Result<RemoteMessage, TransportError> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.messages.borrow_mut().insert(id, message.clone());
        self.print("send", id);
        Ok(RemoteMessage {
            id,
            has_media: message.media.is_some(),
        })
    }

    async fn edit_text(
        &self,
        _session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.store(id, message)?;
        self.print("edit", id);
        Ok(())
    }

    async fn edit_caption(
        &self,
        _session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.store(id, message)?;
        self.print("edit caption", id);
        Ok(())
    }

    async fn edit_media(
        &self,
        _session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.store(id, message)?;
        self.print("edit media", id);
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        _session: SessionId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.store(id, message)?;
        self.print("edit keyboard", id);
        Ok(())
    }

    async fn delete(&self, _session: SessionId, id: MessageId) -> Result<(), TransportError> {
        self.messages.borrow_mut().shift_remove(&id);
        println!("[delete #{id}]");
        Ok(())
    }
}

fn label(text: &str) -> Text {
    Text::new(text).trimmed().with_end("")
}

#[derive(Clone, Debug, PartialEq, Props)]
struct CounterScreen;

#[derive(Reactive)]
struct CounterState {
    count: i64,
}

#[async_trait(?Send)]
impl Component for CounterScreen {
    fn kind(&self) -> NodeKind {
        NodeKind::Screen(MessageFlags::default())
    }

    fn route(&self) -> Option<&str> {
        Some("counter")
    }

    async fn setup(&self, scope: &Scope) -> anyhow::Result<()> {
        CounterState { count: 0 }.install(scope.store());
        Ok(())
    }

    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        let count = CounterState::handle(scope.store()).count()?;
        let step = |delta: i64, text: &str| {
            let this = scope.downgrade();
            Element::new(Button::new().on_click(move |_, _| {
                let this = this.clone();
                async move {
                    if let Some(scope) = this.upgrade() {
                        let state = CounterState::handle(scope.store());
                        state.set_count(state.count()? + delta);
                    }
                    Ok(())
                }
            }))
            .with_child(label(text))
        };
        Ok(vec![
            Text::new(format!("<b>Counter</b>: {count}")).trimmed().into(),
            Element::new(Row::new()).with_children([step(-1, "-1"), step(1, "+1")]),
            Element::new(Navigate::to(notes_screen)).with_child(label("Notes")),
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Props)]
struct NotesScreen;

#[async_trait(?Send)]
impl Component for NotesScreen {
    fn kind(&self) -> NodeKind {
        NodeKind::Screen(MessageFlags::default())
    }

    async fn setup(&self, scope: &Scope) -> anyhow::Result<()> {
        scope.init("notes", Vec::<String>::new());
        Ok(())
    }

    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        let notes: Vec<String> = scope.get("notes")?;
        let this = scope.downgrade();
        let input = MessageInput::new().on_input(move |_, input| {
            let this = this.clone();
            async move {
                if let (Some(scope), Some(text)) = (this.upgrade(), input.text) {
                    let mut notes: Vec<String> = scope.get("notes")?;
                    notes.push(text);
                    scope.set("notes", notes);
                }
                Ok(())
            }
        });
        let mut children: Vec<Element> = vec![Text::new("Type anything to add a note.").into()];
        children.extend(notes.iter().map(|note| Text::new(format!("- {note}")).into()));
        children.push(input.into());
        children.push(
            Element::new(Column).with_child(Element::new(Back::new()).with_child(label("Back"))),
        );
        Ok(children)
    }
}

fn notes_screen() -> Element {
    Element::new(NotesScreen)
}

fn start_screen() -> Element {
    Element::new(CounterScreen)
}

async fn console(manager: &SessionManager, transport: &ConsoleTransport) -> anyhow::Result<()> {
    manager.start(CHAT).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "/quit" => break,
            "/start" => manager.start(CHAT).await?,
            "/back" => {
                manager.back(CHAT).await?;
            }
            "/refresh" => manager.refresh(CHAT).await?,
            "" => {}
            _ => {
                let pressed = line.parse::<usize>().ok().and_then(|index| {
                    transport.buttons().into_iter().nth(index.checked_sub(1)?)
                });
                match pressed {
                    Some((text, data)) => {
                        log::info!("pressing [{text}]");
                        manager.button(CHAT, &data).await?;
                    }
                    None => {
                        if !manager.input(CHAT, RawInput::text(line)).await? {
                            println!("(nothing on screen takes text input)");
                        }
                    }
                }
            }
        }
        // Let the session loop catch up before reading the next line.
        tokio::task::yield_now().await;
    }
    manager.stop_all().await;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("=== chatui console demo ===");
    println!("Type a number to press that button, any other text as input.");
    println!("Commands: /start /back /refresh /quit");
    println!();

    let transport = Rc::new(ConsoleTransport::default());
    let store = Rc::new(MemoryMessageInfoStore::new());
    let manager = SessionManager::new(start_screen, transport.clone(), store);

    tokio::task::LocalSet::new()
        .run_until(console(&manager, &transport))
        .await
}
