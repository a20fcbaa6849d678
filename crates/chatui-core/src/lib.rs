#![doc = r"Reactive component tree that renders into a short list of chat messages."]

#![allow(clippy::type_complexity)]

extern crate self as chatui_core;

pub mod component;
pub mod config;
pub mod context;
pub mod diff;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod hash;
pub mod message;
pub mod navigator;
pub mod node;
pub mod props;
pub mod reactive;
pub mod renderer;
pub mod screens;
pub mod session;
pub mod value;

pub use async_trait::async_trait;
pub use chatui_macros::{Props, Reactive};

pub use component::{AsAny, Component, Element, MessageFlags, NodeKind};
pub use config::EngineConfig;
pub use context::{QueueItem, RenderContext};
pub use diff::{diff_screens, full_reset, total_cost, ScreenAction};
pub use dispatcher::{propagate, ContextProvider, DispatchReport, Dispatcher, ScreenSink};
pub use error::{ReactiveError, SessionError};
pub use event::{Event, EventKind, RawInput};
pub use hash::button_id;
pub use message::{
    ButtonSpec, InputKind, InputSpec, Keyboard, MediaKind, MediaRef, MediaSource, MessageSpec,
    ParseMode,
};
pub use navigator::{EntryId, EntrySummary, NavigationEntry, NavigationStack, Navigator, ScreenFrame};
pub use node::{ComponentNode, NodeId, NodeView, RenderKey, Scope, WeakScope};
pub use props::{PropSource, Props};
pub use reactive::{ReactiveStore, SlotKey, WatchId};
pub use renderer::{topmost, RenderOutput, Renderer};
pub use screens::{escape_html, escape_text, ErrorPlaceholder, Fragment, Screen, ScreenGroup};
pub use session::Session;
pub use value::{DynValue, Value};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
