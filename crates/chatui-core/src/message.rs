//! Render output: one [`MessageSpec`] per screen root.

use std::fmt;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use crate::hash::button_id;
use crate::node::ComponentNode;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParseMode {
    #[default]
    Html,
    Markdown,
    MarkdownV2,
    Plain,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[default]
    Photo,
    Video,
    Animation,
    Audio,
    Document,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MediaSource {
    Url(String),
    Path(PathBuf),
}

/// Media attached to a message. Two references are equal when they point at the same
/// source, whatever their kind.
#[derive(Clone, Debug)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub source: MediaSource,
}

impl MediaRef {
    pub fn url(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            source: MediaSource::Url(url.into()),
        }
    }

    pub fn path(kind: MediaKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            source: MediaSource::Path(path.into()),
        }
    }
}

impl PartialEq for MediaRef {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A keyboard button. Identity is its text, url and chained key.
#[derive(Clone)]
pub struct ButtonSpec {
    pub id: String,
    pub key: String,
    pub text: String,
    pub url: Option<String>,
    pub(crate) node: Weak<ComponentNode>,
}

impl ButtonSpec {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            id: button_id(&key),
            key,
            text: text.into(),
            url: None,
            node: Weak::new(),
        }
    }

    pub fn for_node(node: &Rc<ComponentNode>, text: impl Into<String>) -> Self {
        let mut button = Self::new(node.chained_key(), text);
        button.node = Rc::downgrade(node);
        button
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn node(&self) -> Option<Rc<ComponentNode>> {
        self.node.upgrade()
    }
}

impl PartialEq for ButtonSpec {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.url == other.url && self.key == other.key
    }
}

impl fmt::Debug for ButtonSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonSpec")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("text", &self.text)
            .field("url", &self.url)
            .finish()
    }
}

pub type Keyboard = Vec<Vec<ButtonSpec>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    Any,
    Text,
    Photo,
    Video,
    Audio,
    Voice,
    Document,
    Sticker,
    Location,
    Contact,
}

/// Registered capture for raw inbound input.
#[derive(Clone)]
pub struct InputSpec {
    pub key: String,
    pub kinds: Vec<InputKind>,
    pub(crate) node: Weak<ComponentNode>,
}

impl InputSpec {
    pub fn new(key: impl Into<String>, kinds: Vec<InputKind>) -> Self {
        Self {
            key: key.into(),
            kinds,
            node: Weak::new(),
        }
    }

    pub fn for_node(node: &Rc<ComponentNode>, kinds: Vec<InputKind>) -> Self {
        let mut input = Self::new(node.chained_key(), kinds);
        input.node = Rc::downgrade(node);
        input
    }

    pub fn accepts(&self, kind: InputKind) -> bool {
        self.kinds
            .iter()
            .any(|accepted| *accepted == InputKind::Any || *accepted == kind)
    }

    pub fn node(&self) -> Option<Rc<ComponentNode>> {
        self.node.upgrade()
    }
}

impl PartialEq for InputSpec {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.kinds == other.kinds
    }
}

impl fmt::Debug for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSpec")
            .field("key", &self.key)
            .field("kinds", &self.kinds)
            .finish()
    }
}

/// One remote message as the current tree wants it to look.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageSpec {
    pub key: String,
    pub text: String,
    pub media: Vec<MediaRef>,
    pub keyboard: Keyboard,
    pub inputs: Vec<InputSpec>,
    pub parse_mode: ParseMode,
    pub disable_web_page_preview: bool,
    pub enable_notification: bool,
}

impl MessageSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    pub fn with_row(mut self, row: Vec<ButtonSpec>) -> Self {
        self.keyboard.push(row);
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &ButtonSpec> {
        self.keyboard.iter().flatten()
    }

    pub fn same_media(&self, other: &MessageSpec) -> bool {
        self.media == other.media
    }

    pub fn same_text(&self, other: &MessageSpec) -> bool {
        self.text == other.text
    }

    /// Keyboards compare as flat button sequences; row layout does not count.
    pub fn same_keyboard(&self, other: &MessageSpec) -> bool {
        self.buttons().eq(other.buttons())
    }

    /// A message can only be edited in place into one that also has (or also lacks) media.
    pub fn can_edit_into(&self, new: &MessageSpec) -> bool {
        self.media.is_empty() == new.media.is_empty()
    }

    pub fn edit_cost(&self, new: &MessageSpec) -> u32 {
        let media = if self.same_media(new) {
            0
        } else {
            new.media.len() as u32
        };
        let text = u32::from(!self.same_text(new));
        let keyboard = u32::from(!self.same_keyboard(new));
        10 * media + 2 * text + keyboard
    }

    pub fn send_cost(&self) -> u32 {
        10 * self.media.len() as u32 + 3
    }
}
