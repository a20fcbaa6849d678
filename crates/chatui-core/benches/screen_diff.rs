use chatui_core::{
    diff_screens, ButtonSpec, Element, EngineConfig, Fragment, MediaKind, MediaRef, MessageSpec,
    RenderContext, Renderer, Screen,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::executor::block_on;

const SCREEN_SIZES: &[usize] = &[2, 4, 8, 16, 32];

fn message(index: usize, revision: usize) -> MessageSpec {
    let mut message = MessageSpec::new(index.to_string())
        .with_text(format!("Message {index} rev {revision}"))
        .with_row(vec![
            ButtonSpec::new(format!("{index}.0"), "Back"),
            ButtonSpec::new(format!("{index}.1"), "Next"),
        ]);
    if index % 3 == 0 {
        message = message.with_media(MediaRef::url(
            MediaKind::Photo,
            format!("https://example.org/{index}.png"),
        ));
    }
    message
}

/// Previous screen plus a next screen where every other message changed and one message
/// was inserted in the middle.
fn screens(size: usize) -> (Vec<MessageSpec>, Vec<MessageSpec>) {
    let old: Vec<_> = (0..size).map(|index| message(index, 0)).collect();
    let mut new: Vec<_> = (0..size).map(|index| message(index, index % 2)).collect();
    new.insert(size / 2, message(size + 1, 0));
    (old, new)
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("screen_diff");
    for &size in SCREEN_SIZES {
        let (old, new) = screens(size);
        group.bench_with_input(BenchmarkId::new("messages", size), &size, |b, _| {
            b.iter(|| black_box(diff_screens(&old, &new, Some("0"))));
        });
    }
    group.finish();
}

fn bench_full_render(c: &mut Criterion) {
    let (context, _queue) = RenderContext::new(EngineConfig::default());
    let renderer = Renderer::new(context);
    let tree = Element::new(Fragment).with_children(
        (0..16).map(|index| Element::new(Screen::new()).with_key(index)),
    );
    block_on(renderer.mount(tree));

    c.bench_function("render_full", |b| {
        b.iter(|| black_box(block_on(renderer.render_full())));
    });
}

criterion_group!(screen_diff, bench_diff, bench_full_render);
criterion_main!(screen_diff);
