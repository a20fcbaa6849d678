use super::*;
use crate::message::ParseMode;
use crate::reactive::{ReactiveStore, SlotKey};
use crate::screens::{Fragment, Screen, ScreenGroup};
use crate::test_support::{keys, new_log, renderer, take, KeyedList, Probe};

fn child(node: &Rc<ComponentNode>, key: &str) -> Rc<ComponentNode> {
    node.child(&RenderKey::Explicit(key.to_owned()))
        .unwrap_or_else(|| panic!("no child {key}"))
}

#[tokio::test]
async fn keyed_children_survive_reordering() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    let output = renderer
        .mount(Element::new(KeyedList::new(&["a", "b", "c"], &log)))
        .await;
    assert_eq!(output.screen.len(), 1);
    assert_eq!(output.screen[0].text, "abc");

    let root = renderer.root().expect("mounted");
    let b = child(&root, "b");
    let c = child(&root, "c");
    take(&log);

    root.store().set("keys", keys(&["b", "c", "d"]));
    let output = renderer.render(&[root.clone()], None).await;

    assert!(Rc::ptr_eq(&b, &child(&root, "b")));
    assert!(Rc::ptr_eq(&c, &child(&root, "c")));
    assert_eq!(output.screen[0].text, "bcd");
    assert_eq!(
        output.actions,
        vec![ScreenAction::Update {
            old: MessageSpec::new("").with_text("abc"),
            new: MessageSpec::new("").with_text("bcd"),
        }]
    );

    let log = take(&log);
    assert!(log.contains(&"unmounted a".to_owned()));
    assert!(log.contains(&"setup d".to_owned()));
    assert!(log.contains(&"updated b".to_owned()));
    assert!(!log.contains(&"setup b".to_owned()));
}

#[tokio::test]
async fn mount_runs_hooks_children_first() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    renderer
        .mount(Element::new(Probe::screen("outer", &log)).with_child(Probe::new("inner", &log)))
        .await;

    assert_eq!(
        take(&log),
        [
            "setup outer",
            "setup inner",
            "mounted inner",
            "activated inner",
            "mounted outer",
            "activated outer",
        ]
    );
}

#[tokio::test]
async fn unmount_is_post_order_and_clears_state() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    renderer
        .mount(
            Element::new(Probe::screen("outer", &log))
                .with_child(
                    Element::new(Probe::new("middle", &log)).with_child(Probe::new("leaf", &log)),
                ),
        )
        .await;
    let root = renderer.root().expect("mounted");
    root.store().set("scratch", 1_i32);
    take(&log);

    renderer.clear().await;

    assert_eq!(take(&log), ["unmounted leaf", "unmounted middle", "unmounted outer"]);
    assert!(!root.is_mounted());
    assert!(!root.store().contains(&SlotKey::state("scratch")));
    assert!(renderer.screen().is_empty());
}

#[tokio::test]
async fn variant_change_under_same_key_remounts() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    renderer
        .mount(
            Element::new(Screen::new())
                .with_child(Element::new(Probe::new("x", &log)).with_key("slot")),
        )
        .await;
    let root = renderer.root().expect("mounted");
    let before = child(&root, "slot");

    root.replace_element(
        Element::new(Screen::new()).with_child(Element::new(Fragment).with_key("slot")),
    );
    renderer.render(&[root.clone()], None).await;

    let after = child(&root, "slot");
    assert!(!Rc::ptr_eq(&before, &after));
    assert!(after.is::<Fragment>());
    assert!(!before.is_mounted());
    assert!(take(&log).contains(&"unmounted x".to_owned()));
}

#[tokio::test]
async fn failing_render_is_replaced_by_placeholder() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    let output = renderer
        .mount(
            Element::new(Screen::new())
                .with_child(Probe::new("ok", &log))
                .with_child(
                    Element::new(Probe::new("bad", &log).failing("render"))
                        .with_child(Probe::new("lost", &log)),
                ),
        )
        .await;

    assert_eq!(output.screen.len(), 1);
    assert_eq!(output.screen[0].text, "okbad{ exception: bad cannot render }\n");
    let root = renderer.root().expect("mounted");
    let bad = root.child(&RenderKey::Index(1)).expect("bad child");
    let placeholder = bad
        .child(&RenderKey::Explicit(ERROR_KEY.to_owned()))
        .expect("placeholder");
    assert!(placeholder.is::<ErrorPlaceholder>());
    assert!(!take(&log).contains(&"setup lost".to_owned()));
}

#[tokio::test]
async fn error_text_is_escaped_for_the_message_parse_mode() {
    let log = new_log();
    let failing = |screen: Screen| {
        Element::new(screen).with_child(Probe::new("a_<b>", &log).failing("render"))
    };

    let (first, _queue) = renderer();
    let html = first.mount(failing(Screen::new())).await;
    assert_eq!(
        html.screen[0].text,
        "a_<b>{ exception: a_&lt;b&gt; cannot render }\n"
    );

    let (second, _queue) = renderer();
    let markdown = second
        .mount(failing(Screen::new().with_parse_mode(ParseMode::MarkdownV2)))
        .await;
    assert_eq!(
        markdown.screen[0].text,
        "a_<b>{ exception: a\\_<b\\> cannot render }\n"
    );

    let (third, _queue) = renderer();
    let plain = third
        .mount(failing(Screen::new().with_parse_mode(ParseMode::Plain)))
        .await;
    assert_eq!(plain.screen[0].text, "a_<b>{ exception: a_<b> cannot render }\n");
}

#[tokio::test]
async fn failing_mounted_hook_drops_rendered_children() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    let output = renderer
        .mount(
            Element::new(Probe::screen("root", &log).failing("mounted"))
                .with_child(Probe::new("child", &log)),
        )
        .await;

    assert_eq!(output.screen[0].text, "root{ exception: root broke in mounted }\n");
    let log = take(&log);
    assert!(log.contains(&"mounted child".to_owned()));
    assert!(log.contains(&"unmounted child".to_owned()));
}

#[tokio::test]
async fn generic_error_text_without_details() {
    let (context, _queue) = RenderContext::new(EngineConfig {
        detailed_errors: false,
        ..EngineConfig::default()
    });
    let renderer = Renderer::new(context);
    let log = new_log();
    let output = renderer
        .mount(Element::new(Probe::screen("root", &log).failing("render")))
        .await;
    assert_eq!(output.screen[0].text, "root{ exception: something went wrong }\n");
}

#[tokio::test]
async fn nested_screens_follow_their_parent() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    let output = renderer
        .mount(
            Element::new(Probe::screen("first", &log))
                .with_child(Probe::new("-body", &log))
                .with_child(Probe::screen("second", &log))
                .with_child(Probe::new("-tail", &log)),
        )
        .await;

    let texts: Vec<_> = output.screen.iter().map(|message| message.text.as_str()).collect();
    assert_eq!(texts, ["first-body-tail", "second"]);
    assert_eq!(output.screen[0].key, "");
    assert_eq!(output.screen[1].key, "1");
}

#[tokio::test]
async fn flags_come_from_nearest_ancestor_then_defaults() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    let output = renderer
        .mount(
            Element::new(ScreenGroup::new().with_enable_notification(true))
                .with_child(
                    Element::new(Screen::new().with_parse_mode(ParseMode::Markdown))
                        .with_child(Probe::new("a", &log)),
                )
                .with_child(
                    Element::new(
                        Screen::new()
                            .with_enable_notification(false)
                            .with_disable_web_page_preview(true),
                    )
                    .with_child(Probe::new("b", &log)),
                ),
        )
        .await;

    let [first, second] = output.screen.as_slice() else {
        panic!("expected two messages, got {:?}", output.screen);
    };
    assert_eq!(first.parse_mode, ParseMode::Markdown);
    assert!(first.enable_notification);
    assert!(!first.disable_web_page_preview);
    assert_eq!(second.parse_mode, ParseMode::Html);
    assert!(!second.enable_notification);
    assert!(second.disable_web_page_preview);
}

#[tokio::test]
async fn hidden_children_are_skipped_and_toggle_activation() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    let build = |visible: bool| {
        Element::new(Probe::screen("root", &log)).with_child(
            Element::new(Probe::new("panel", &log))
                .with_visible(visible)
                .with_child(Probe::new("-leaf", &log)),
        )
    };
    let output = renderer.mount(build(true)).await;
    assert_eq!(output.screen[0].text, "rootpanel-leaf");
    let root = renderer.root().expect("mounted");
    take(&log);

    root.replace_element(build(false));
    let output = renderer.render(&[root.clone()], None).await;
    assert_eq!(output.screen[0].text, "root");
    assert_eq!(take(&log), ["deactivated -leaf", "deactivated panel", "updated root"]);

    let panel = root.child(&RenderKey::Index(0)).expect("panel");
    assert!(panel.is_mounted());
    assert!(!panel.is_active());

    root.replace_element(build(true));
    let output = renderer.render(&[root.clone()], None).await;
    assert_eq!(output.screen[0].text, "rootpanel-leaf");
    assert_eq!(
        take(&log),
        ["updated -leaf", "activated -leaf", "updated panel", "activated panel", "updated root"]
    );
}

#[tokio::test]
async fn hidden_at_creation_mounts_without_activation() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    renderer
        .mount(
            Element::new(Probe::screen("root", &log))
                .with_child(Element::new(Probe::new("ghost", &log)).with_visible(false)),
        )
        .await;
    let log = take(&log);
    assert!(log.contains(&"mounted ghost".to_owned()));
    assert!(!log.contains(&"activated ghost".to_owned()));
}

#[tokio::test]
async fn disabled_blueprints_keep_sibling_positions() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    let build = |when: bool| {
        Element::new(Probe::screen("root", &log))
            .with_child(Element::new(Probe::new("-a", &log)).with_when(when))
            .with_child(Probe::new("-b", &log))
    };
    renderer.mount(build(true)).await;
    let root = renderer.root().expect("mounted");
    let b = root.child(&RenderKey::Index(1)).expect("b");

    root.replace_element(build(false));
    let output = renderer.render(&[root.clone()], None).await;

    assert_eq!(output.screen[0].text, "root-b");
    assert!(root.child(&RenderKey::Index(0)).is_none());
    assert!(Rc::ptr_eq(&b, &root.child(&RenderKey::Index(1)).expect("b")));
    assert!(take(&log).contains(&"unmounted -a".to_owned()));
}

#[tokio::test]
async fn duplicate_keys_fall_back_to_position() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    let output = renderer
        .mount(
            Element::new(Probe::screen("root", &log))
                .with_child(Element::new(Probe::new("-x", &log)).with_key("same"))
                .with_child(Element::new(Probe::new("-y", &log)).with_key("same")),
        )
        .await;

    assert_eq!(output.screen[0].text, "root-x-y");
    let root = renderer.root().expect("mounted");
    assert!(root.child(&RenderKey::Explicit("same".into())).is_some());
    assert!(root.child(&RenderKey::Index(1)).is_some());
}

#[tokio::test]
async fn changed_props_refire_prop_watchers() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    renderer
        .mount(Element::new(Screen::new()).with_child(Probe::new("p", &log).with_text("one")))
        .await;
    let root = renderer.root().expect("mounted");
    let probe = root.child(&RenderKey::Index(0)).expect("probe");
    let seen = Rc::new(std::cell::RefCell::new(Vec::<String>::new()));
    let sink = seen.clone();
    probe
        .store()
        .watch(
            |store: &ReactiveStore| store.prop::<String>("text"),
            move |new: &String, _old: Option<&String>| {
                sink.borrow_mut().push(new.clone());
                Ok(())
            },
            false,
        )
        .expect("watch");

    root.replace_element(
        Element::new(Screen::new()).with_child(Probe::new("p", &log).with_text("two")),
    );
    let output = renderer.render(&[root.clone()], None).await;

    assert_eq!(output.screen[0].text, "two");
    assert_eq!(*seen.borrow(), ["two"]);
}

#[tokio::test]
async fn topmost_drops_descendants_of_other_modified_nodes() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    renderer
        .mount(
            Element::new(Probe::screen("root", &log))
                .with_child(Element::new(Probe::new("a", &log)).with_child(Probe::new("a1", &log)))
                .with_child(Probe::new("b", &log)),
        )
        .await;
    let root = renderer.root().expect("mounted");
    let a = root.child(&RenderKey::Index(0)).expect("a");
    let a1 = a.child(&RenderKey::Index(0)).expect("a1");
    let b = root.child(&RenderKey::Index(1)).expect("b");

    let trees = topmost(&[a1.clone(), a.clone(), b.clone(), a.clone()]);
    let ids: Vec<_> = trees.iter().map(|node| node.id()).collect();
    assert_eq!(ids, [a.id(), b.id()]);
}

#[tokio::test]
async fn force_target_walks_up_to_a_message_owner() {
    let log = new_log();
    let (renderer, _queue) = renderer();
    renderer
        .mount(
            Element::new(Probe::screen("root", &log))
                .with_child(Element::new(Probe::new("a", &log)).with_child(Probe::new("a1", &log))),
        )
        .await;
    let root = renderer.root().expect("mounted");
    let a1 = root
        .child(&RenderKey::Index(0))
        .and_then(|a| a.child(&RenderKey::Index(0)))
        .expect("a1");

    let output = renderer.render(&[a1.clone()], Some(&a1)).await;
    assert_eq!(
        output.actions,
        vec![ScreenAction::Update {
            old: output.screen[0].clone(),
            new: output.screen[0].clone(),
        }]
    );
}
