//! Structural built-ins: containers, screen roots and the error placeholder.

use crate::component::{Component, MessageFlags, NodeKind};
use crate::message::ParseMode;
use crate::node::NodeView;
use crate::Props;

/// Plain container that renders its children.
#[derive(Clone, Debug, Default, PartialEq, Props)]
pub struct Fragment;

impl Component for Fragment {}

macro_rules! flag_setters {
    () => {
        pub fn with_route(mut self, route: impl Into<String>) -> Self {
            self.route = Some(route.into());
            self
        }

        pub fn with_disable_web_page_preview(mut self, disable: bool) -> Self {
            self.disable_web_page_preview = Some(disable);
            self
        }

        pub fn with_enable_notification(mut self, enable: bool) -> Self {
            self.enable_notification = Some(enable);
            self
        }
    };
}

/// Root of one message. Its visible subtree, up to nested screens, aggregates into a
/// single [`MessageSpec`](crate::MessageSpec).
#[derive(Clone, Debug, Default, PartialEq, Props)]
pub struct Screen {
    pub route: Option<String>,
    pub parse_mode: Option<ParseMode>,
    pub disable_web_page_preview: Option<bool>,
    pub enable_notification: Option<bool>,
}

impl Screen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }

    flag_setters!();
}

impl Component for Screen {
    fn kind(&self) -> NodeKind {
        NodeKind::Screen(MessageFlags {
            parse_mode: self.parse_mode,
            disable_web_page_preview: self.disable_web_page_preview,
            enable_notification: self.enable_notification,
        })
    }

    fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }
}

/// Groups several screens under one route and passes its flags down to them.
#[derive(Clone, Debug, Default, PartialEq, Props)]
pub struct ScreenGroup {
    pub route: Option<String>,
    pub disable_web_page_preview: Option<bool>,
    pub enable_notification: Option<bool>,
}

impl ScreenGroup {
    pub fn new() -> Self {
        Self::default()
    }

    flag_setters!();
}

impl Component for ScreenGroup {
    fn kind(&self) -> NodeKind {
        NodeKind::Group(MessageFlags {
            parse_mode: None,
            disable_web_page_preview: self.disable_web_page_preview,
            enable_notification: self.enable_notification,
        })
    }

    fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }
}

/// Stands in for the children of a node whose render or lifecycle hook failed.
#[derive(Clone, Debug, PartialEq, Props)]
pub struct ErrorPlaceholder {
    pub message: String,
}

impl ErrorPlaceholder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Component for ErrorPlaceholder {
    fn render_text(&self, view: &NodeView<'_>) -> String {
        format!(
            "{{ exception: {} }}\n",
            escape_text(&self.message, view.parse_mode())
        )
    }
}

/// Escapes `text` so it shows literally under `parse_mode`.
pub fn escape_text(text: &str, parse_mode: ParseMode) -> String {
    match parse_mode {
        ParseMode::Html => escape_html(text),
        ParseMode::Markdown => escape_with(text, "_*`["),
        ParseMode::MarkdownV2 => escape_with(text, "\\_*[]()~`>#+-=|{}.!"),
        ParseMode::Plain => text.to_owned(),
    }
}

fn escape_with(text: &str, special: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if special.contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
