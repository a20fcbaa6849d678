use std::rc::Rc;

use chatui_app_shell::{MemoryMessageInfoStore, SessionManager};
use chatui_core::{Element, RawInput, Screen};
use chatui_testing::{run_local, RecordingTransport, TransportOp};
use chatui_ui::{Back, Navigate, Text};

fn label(text: &str) -> Text {
    Text::new(text).trimmed().with_end("")
}

fn home() -> Element {
    Element::new(Screen::new().with_route("home"))
        .with_child(label("Home"))
        .with_child(Element::new(Navigate::to(detail)).with_child(label("Open")))
}

fn detail() -> Element {
    Element::new(Screen::new())
        .with_child(label("Detail"))
        .with_child(Element::new(Back::new()).with_child(label("Back")))
}

fn manager() -> (SessionManager, Rc<RecordingTransport>) {
    let transport = RecordingTransport::new();
    let manager = SessionManager::new(
        home,
        transport.clone(),
        Rc::new(MemoryMessageInfoStore::new()),
    )
    .with_autorun(false);
    (manager, transport)
}

fn button(manager: &SessionManager, chat: i64, text: &str) -> String {
    manager
        .get(chat)
        .expect("session")
        .screen()
        .iter()
        .flat_map(|message| message.buttons().cloned().collect::<Vec<_>>())
        .find(|button| button.text == text)
        .map(|button| button.id)
        .expect("button")
}

#[tokio::test]
async fn start_creates_a_session_and_sends_its_screen() {
    let (manager, transport) = manager();

    manager.start(1).await.expect("start");

    assert_eq!(manager.len(), 1);
    assert_eq!(transport.chat(1), ["Home"]);
    assert!(transport.chat(2).is_empty());
}

#[tokio::test]
async fn button_press_edits_the_message_in_place() {
    let (manager, transport) = manager();
    manager.start(1).await.expect("start");
    transport.take_calls();

    let open = button(&manager, 1, "Open");
    assert!(manager.button(1, &open).await.expect("button"));
    manager.drain(1).await;

    assert_eq!(transport.ops(), [TransportOp::EditText]);
    assert_eq!(transport.chat(1), ["Detail"]);
}

#[tokio::test]
async fn stale_button_resets_the_screen() {
    let (manager, transport) = manager();
    manager.start(1).await.expect("start");
    transport.take_calls();

    assert!(!manager.button(1, "deadbeef").await.expect("button"));

    assert_eq!(transport.ops(), [TransportOp::Send, TransportOp::Delete]);
    assert_eq!(transport.chat(1), ["Home"]);
}

#[tokio::test]
async fn press_from_an_unknown_chat_starts_silently() {
    let (manager, transport) = manager();

    assert!(!manager.button(3, "deadbeef").await.expect("button"));

    assert_eq!(transport.ops(), [TransportOp::Send]);
    assert_eq!(transport.chat(3), ["Home"]);
}

#[tokio::test]
async fn start_command_returns_to_the_first_screen() {
    let (manager, transport) = manager();
    manager.start(1).await.expect("start");
    let open = button(&manager, 1, "Open");
    manager.button(1, &open).await.expect("button");
    manager.drain(1).await;

    manager.start(1).await.expect("restart");

    assert_eq!(transport.chat(1), ["Home"]);
    assert_eq!(manager.get(1).expect("session").navigator().len(), 1);
}

#[tokio::test]
async fn back_and_refresh_signals() {
    let (manager, transport) = manager();
    manager.start(1).await.expect("start");
    assert!(!manager.back(1).await.expect("back"));

    let open = button(&manager, 1, "Open");
    manager.button(1, &open).await.expect("button");
    manager.drain(1).await;
    assert!(manager.back(1).await.expect("back"));
    manager.drain(1).await;
    assert_eq!(transport.chat(1), ["Home"]);

    transport.take_calls();
    manager.refresh(1).await.expect("refresh");
    let report = manager.drain(1).await.expect("batch");
    assert!(report.rendered);
    assert!(transport.ops().is_empty());
}

#[tokio::test]
async fn input_without_capture_is_rejected() {
    let (manager, _transport) = manager();

    assert!(!manager
        .input(1, RawInput::text("hello"))
        .await
        .expect("input"));
}

#[tokio::test]
async fn spawned_sessions_finish_their_queue_on_stop() {
    run_local(async {
        let transport = RecordingTransport::new();
        let manager = SessionManager::new(
            home,
            transport.clone(),
            Rc::new(MemoryMessageInfoStore::new()),
        );
        manager.start(1).await.expect("start");
        manager.start(2).await.expect("start");
        let open = button(&manager, 1, "Open");
        manager.button(1, &open).await.expect("button");

        manager.stop_all().await;

        assert!(manager.is_empty());
        assert_eq!(transport.chat(1), ["Detail"]);
        assert_eq!(transport.chat(2), ["Home"]);
    })
    .await;
}

#[tokio::test]
async fn restart_of_a_running_session_resets_on_its_loop() {
    run_local(async {
        let transport = RecordingTransport::new();
        let manager = SessionManager::new(
            home,
            transport.clone(),
            Rc::new(MemoryMessageInfoStore::new()),
        );
        manager.start(1).await.expect("start");
        transport.take_calls();

        manager.start(1).await.expect("restart");
        assert!(transport.ops().is_empty());

        manager.stop_all().await;

        assert_eq!(transport.ops(), [TransportOp::Send, TransportOp::Delete]);
        assert_eq!(transport.chat(1), ["Home"]);
    })
    .await;
}
