//! Text widget implementation

use chatui_core::{Component, NodeView, Props};

use crate::symbols::ZW;

/// A line of message text. Unless `trim_spaces` is set, the text is wrapped in
/// zero-width marks so that its surrounding spaces survive.
#[derive(Clone, Debug, PartialEq, Props)]
pub struct Text {
    pub text: String,
    pub end: String,
    pub trim_spaces: bool,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            end: String::from("\n"),
            trim_spaces: false,
        }
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = end.into();
        self
    }

    pub fn trimmed(mut self) -> Self {
        self.trim_spaces = true;
        self
    }
}

impl Component for Text {
    fn render_text(&self, _view: &NodeView<'_>) -> String {
        let mut text = if self.trim_spaces {
            self.text.clone()
        } else {
            format!("{ZW}{}{ZW}", self.text)
        };
        text.push_str(&self.end);
        text
    }
}
