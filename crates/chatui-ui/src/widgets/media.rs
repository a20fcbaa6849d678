use std::path::PathBuf;

use chatui_core::{Component, MediaKind, MediaRef, NodeView, Props};

/// A media attachment, by remote url or local path. Renders nothing without either.
#[derive(Clone, Debug, Default, PartialEq, Props)]
pub struct Media {
    pub kind: MediaKind,
    pub url: Option<String>,
    pub path: Option<PathBuf>,
}

impl Media {
    pub fn url(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: Some(url.into()),
            path: None,
        }
    }

    pub fn path(kind: MediaKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            url: None,
            path: Some(path.into()),
        }
    }

    pub fn photo(url: impl Into<String>) -> Self {
        Self::url(MediaKind::Photo, url)
    }
}

impl Component for Media {
    fn render_media(&self, _view: &NodeView<'_>) -> Vec<MediaRef> {
        match (&self.url, &self.path) {
            (Some(url), _) => vec![MediaRef::url(self.kind, url.clone())],
            (None, Some(path)) => vec![MediaRef::path(self.kind, path.clone())],
            (None, None) => Vec::new(),
        }
    }
}
