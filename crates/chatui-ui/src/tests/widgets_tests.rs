use std::cell::RefCell;
use std::rc::Rc;

use chatui_core::{
    async_trait, Element, EngineConfig, Fragment, MediaKind, MediaSource, MessageSpec, RawInput,
    RenderContext, Renderer, Screen, ScreenAction, ScreenSink, Session,
};

use crate::symbols::{EMPTY, ZW};
use crate::*;

struct NullSink;

#[async_trait(?Send)]
impl ScreenSink for NullSink {
    async fn reset(&self, _screen: Vec<MessageSpec>) {}

    async fn update(&self, _screen: Vec<MessageSpec>, _actions: Vec<ScreenAction>) {}
}

async fn render(root: Element) -> Vec<MessageSpec> {
    let (context, _queue) = RenderContext::new(EngineConfig::default());
    let renderer = Renderer::new(context);
    renderer.mount(root).await.screen
}

fn screen() -> Element {
    Element::new(Screen::new())
}

fn button(label: &str) -> Element {
    Element::new(Button::new()).with_child(Text::new(label).trimmed().with_end(""))
}

fn buttons(count: usize) -> Vec<Element> {
    (0..count).map(|index| button(&index.to_string())).collect()
}

fn widths(message: &MessageSpec) -> Vec<usize> {
    message.keyboard.iter().map(Vec::len).collect()
}

async fn session(root: Element) -> Session {
    let session = Session::new(root, Rc::new(NullSink), EngineConfig::default());
    session.start(false).await.expect("start");
    session
}

fn first_button(session: &Session) -> String {
    session.screen()[0].keyboard[0][0].id.clone()
}

#[tokio::test]
async fn text_keeps_its_spaces_unless_trimmed() {
    let screen = render(
        screen()
            .with_child(Text::new(" hi "))
            .with_child(Text::new("x").trimmed().with_end("")),
    )
    .await;

    assert_eq!(screen[0].text, format!("{ZW} hi {ZW}\nx"));
}

#[tokio::test]
async fn button_label_comes_from_its_children() {
    let screen = render(
        screen()
            .with_child(Text::new("body"))
            .with_child(Element::new(Button::new()).with_child(Text::new("Go <b>")))
            .with_child(Element::new(Button::new().with_url("https://example.org"))),
    )
    .await;

    let message = &screen[0];
    assert_eq!(message.text, format!("{ZW}body{ZW}\n"));
    assert_eq!(message.keyboard[0][0].text, "Go <b>");
    assert_eq!(message.keyboard[1][0].text, EMPTY);
    assert_eq!(message.keyboard[1][0].url.as_deref(), Some("https://example.org"));
}

#[test]
fn keyboard_labels_drop_markup() {
    assert_eq!(symbols::keyboard_label("&lt;a&gt;\n"), "<a>");
    assert_eq!(symbols::keyboard_label(&format!("{ZW}{ZW}")), EMPTY);
}

#[tokio::test]
async fn rows_and_columns_reflow_child_buttons() {
    let screen = render(
        Element::new(Fragment)
            .with_child(screen().with_child(Element::new(Row::new()).with_children(buttons(10))))
            .with_child(screen().with_child(Element::new(Column).with_children(buttons(3))))
            .with_child(
                screen().with_child(
                    Element::new(Group::new().with_width(3).with_fill_tail(true))
                        .with_children(buttons(4)),
                ),
            )
            .with_child(
                screen().with_child(
                    Element::new(Group::new().with_width(8).with_fill_evenly(true))
                        .with_children(buttons(10)),
                ),
            )
            .with_child(
                screen().with_child(
                    Element::new(Group::new().with_max_width(2))
                        .with_child(Element::new(Row::new()).with_children(buttons(3))),
                ),
            ),
    )
    .await;

    assert_eq!(widths(&screen[0]), [8, 2]);
    assert_eq!(widths(&screen[1]), [1, 1, 1]);
    assert_eq!(widths(&screen[2]), [3, 3]);
    assert_eq!(screen[2].keyboard[1][1].text, EMPTY);
    assert_eq!(widths(&screen[3]), [5, 5]);
    assert_eq!(widths(&screen[4]), [2, 1]);
}

#[tokio::test]
async fn media_prefers_url_over_path() {
    let screen = render(
        screen()
            .with_child(Media::photo("https://example.org/a.png"))
            .with_child(Media::path(MediaKind::Document, "/tmp/report.pdf"))
            .with_child(Media::default()),
    )
    .await;

    let media = &screen[0].media;
    assert_eq!(media.len(), 2);
    assert_eq!(media[0].kind, MediaKind::Photo);
    assert_eq!(media[0].source, MediaSource::Url("https://example.org/a.png".into()));
    assert_eq!(media[1].source, MediaSource::Path("/tmp/report.pdf".into()));
}

#[tokio::test]
async fn button_click_runs_its_handler() {
    let clicks = Rc::new(RefCell::new(Vec::new()));
    let seen = clicks.clone();
    let root = screen().with_child(
        Element::new(Button::new().on_click(move |_scope, button| {
            seen.borrow_mut().push(button.text);
            async { Ok(()) }
        }))
        .with_child(Text::new("Press")),
    );
    let session = session(root).await;

    assert!(session.push_button(&first_button(&session)));
    session.drain().await;

    assert_eq!(*clicks.borrow(), ["Press"]);
}

#[tokio::test]
async fn input_capture_receives_raw_text() {
    let received = Rc::new(RefCell::new(None));
    let sink = received.clone();
    let root = screen().with_child(MessageInput::new().on_input(move |_scope, input| {
        *sink.borrow_mut() = input.text;
        async { Ok(()) }
    }));
    let session = session(root).await;

    assert!(session.push_input(RawInput::text("hello")));
    session.drain().await;

    assert_eq!(received.borrow().as_deref(), Some("hello"));
}

fn list_screen() -> Element {
    Element::new(Screen::new().with_route("list"))
        .with_child(Text::new("list").trimmed())
        .with_child(Element::new(Back::new()).with_child(Text::new("Back")))
}

#[tokio::test]
async fn navigation_buttons_drive_the_stack() {
    let home = Element::new(Screen::new().with_route("home"))
        .with_child(Text::new("home").trimmed())
        .with_child(Element::new(Navigate::to(list_screen)).with_child(Text::new("Next")));
    let session = session(home).await;
    assert_eq!(session.screen()[0].keyboard[0][0].text, "Next");

    assert!(session.push_button(&first_button(&session)));
    session.drain().await;
    assert_eq!(session.navigator().len(), 2);
    assert_eq!(session.screen()[0].text, "list\n");
    assert_eq!(session.screen()[0].keyboard[0][0].text, "Back");

    assert!(session.push_button(&first_button(&session)));
    session.drain().await;
    assert_eq!(session.navigator().len(), 1);
    assert_eq!(session.screen()[0].text, "home\n");
}

#[tokio::test]
async fn navigate_with_state_keeps_the_screen() {
    let more = Element::new(Navigate::state("page 2").replacing()).with_child(Text::new("More"));
    let home = Element::new(Screen::new()).with_child(more);
    let session = session(home).await;

    assert!(session.push_button(&first_button(&session)));
    session.drain().await;

    assert_eq!(session.navigator().len(), 1);
    let state = session.navigator().current_state();
    assert_eq!(state.get::<String>().as_deref(), Some("page 2"));
}

#[tokio::test]
async fn navigation_outside_a_session_renders_an_error() {
    let screen = render(screen().with_child(Element::new(Back::new()))).await;

    assert!(screen[0].text.contains("exception"));
    assert!(screen[0].keyboard.is_empty());
}
