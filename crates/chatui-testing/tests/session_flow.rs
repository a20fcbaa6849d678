use chatui_core::{
    async_trait, Component, Element, MessageFlags, NodeKind, Props, Scope, ScreenAction, Screen,
};
use chatui_testing::{RecordingSink, SinkCall, TestSession};
use chatui_ui::{Back, Button, MessageInput, Navigate, Text};

#[derive(Clone, Debug, PartialEq, Props)]
struct Counter {
    title: String,
}

fn counter() -> Element {
    Element::new(Counter {
        title: "Clicks".into(),
    })
}

fn label(text: &str) -> Text {
    Text::new(text).trimmed().with_end("")
}

#[async_trait(?Send)]
impl Component for Counter {
    fn kind(&self) -> NodeKind {
        NodeKind::Screen(MessageFlags::default())
    }

    fn route(&self) -> Option<&str> {
        Some("counter")
    }

    async fn setup(&self, scope: &Scope) -> anyhow::Result<()> {
        scope.init("count", 0_i64);
        Ok(())
    }

    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        let count: i64 = scope.get("count")?;
        let this = scope.downgrade();
        let increment = Button::new().on_click(move |_, _| {
            let this = this.clone();
            async move {
                if let Some(scope) = this.upgrade() {
                    let count: i64 = scope.get("count")?;
                    scope.set("count", count + 1);
                }
                Ok(())
            }
        });
        Ok(vec![
            Text::new(format!("{}: {count}", self.title)).trimmed().into(),
            Element::new(increment).with_child(label("+1")),
            Element::new(Back::new()).with_child(label("Back")),
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Props)]
struct Greeter;

#[async_trait(?Send)]
impl Component for Greeter {
    fn kind(&self) -> NodeKind {
        NodeKind::Screen(MessageFlags::default())
    }

    async fn setup(&self, scope: &Scope) -> anyhow::Result<()> {
        scope.init("name", String::from("stranger"));
        Ok(())
    }

    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        let name: String = scope.get("name")?;
        let this = scope.downgrade();
        let input = MessageInput::new().on_input(move |_, input| {
            let this = this.clone();
            async move {
                if let (Some(scope), Some(text)) = (this.upgrade(), input.text) {
                    scope.set("name", text);
                }
                Ok(())
            }
        });
        Ok(vec![
            Text::new(format!("Hello, {name}")).trimmed().into(),
            input.into(),
        ])
    }
}

fn menu() -> Element {
    Element::new(Screen::new().with_route("menu"))
        .with_child(label("Menu"))
        .with_child(Element::new(Navigate::to(counter)).with_child(label("Open")))
}

fn updates(sink: &RecordingSink) -> Vec<Vec<ScreenAction>> {
    sink.take()
        .into_iter()
        .filter_map(|call| match call {
            SinkCall::Update(actions) => Some(actions),
            SinkCall::Reset(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn start_hands_the_first_screen_to_the_sink() {
    let test = TestSession::start(counter()).await;

    assert_eq!(test.sink().resets(), 1);
    assert_eq!(test.texts(), ["Clicks: 0\n"]);
    assert_eq!(test.labels(), ["+1", "Back"]);
}

#[tokio::test]
async fn pressing_a_button_edits_the_message() {
    let test = TestSession::start(counter()).await;
    test.sink().take();

    let report = test.press("+1").await.expect("batch");
    assert!(report.rendered);
    assert_eq!(test.texts(), ["Clicks: 1\n"]);

    test.press("+1").await;
    assert_eq!(test.texts(), ["Clicks: 2\n"]);
    let updates = updates(test.sink());
    assert_eq!(updates.len(), 2);
    assert!(matches!(updates[1][..], [ScreenAction::Update { .. }]));
}

#[tokio::test]
async fn navigation_replaces_the_visible_screen() {
    let test = TestSession::start(menu()).await;

    test.press("Open").await;
    assert_eq!(test.texts(), ["Clicks: 0\n"]);
    assert_eq!(test.session().navigator().len(), 2);

    test.press("+1").await;
    test.press("Back").await;
    assert_eq!(test.texts(), ["Menu"]);
    assert_eq!(test.session().navigator().len(), 1);

    test.press("Open").await;
    assert_eq!(test.texts(), ["Clicks: 0\n"]);
}

#[tokio::test]
async fn text_input_reaches_the_capture() {
    let test = TestSession::start(Greeter).await;
    assert_eq!(test.texts(), ["Hello, stranger\n"]);

    test.input("Ada").await.expect("batch");

    assert_eq!(test.texts(), ["Hello, Ada\n"]);
}

#[tokio::test]
async fn reset_screen_sends_everything_again() {
    let test = TestSession::start(counter()).await;
    test.press("+1").await;

    let report = test
        .session()
        .reset_screen()
        .await
        .expect("started")
        .expect("drained");

    assert!(report.reset);
    assert_eq!(test.sink().resets(), 2);
    assert_eq!(test.texts(), ["Clicks: 1\n"]);
}

#[tokio::test]
async fn back_signal_never_leaves_the_first_screen() {
    let test = TestSession::start(menu()).await;
    assert!(!test.session().back());

    test.press("Open").await;
    assert!(test.session().back());
    test.settle().await;
    assert_eq!(test.texts(), ["Menu"]);
}

#[tokio::test]
async fn stopped_sessions_ignore_input() {
    let test = TestSession::start(counter()).await;

    test.session().stop().await;

    assert!(!test.session().is_started());
    assert!(test.press("+1").await.is_none());
    assert!(test.session().reset_screen().await.is_err());
}
