//! Keyboard layout containers
//!
//! A [`Group`] collects the keyboards of its children and reflows the buttons into rows.
//! [`Row`] and [`Column`] are the two common shapes.

use std::rc::Rc;

use chatui_core::{ButtonSpec, Component, ComponentNode, Keyboard, NodeView, Props};

use crate::symbols::EMPTY;

/// Chat clients refuse rows wider than this.
pub const MAX_ROW_WIDTH: usize = 8;

#[derive(Clone, Debug, Default, PartialEq, Props)]
pub struct Group {
    /// Flatten the children's buttons and lay them out this many per row.
    pub width: Option<usize>,
    /// Split any row longer than this.
    pub max_width: Option<usize>,
    /// Pad the last row with empty buttons.
    pub fill_tail: bool,
    /// Pick the width that spreads the buttons evenly over the fewest rows.
    pub fill_evenly: bool,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_max_width(mut self, max_width: usize) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn with_fill_tail(mut self, fill_tail: bool) -> Self {
        self.fill_tail = fill_tail;
        self
    }

    pub fn with_fill_evenly(mut self, fill_evenly: bool) -> Self {
        self.fill_evenly = fill_evenly;
        self
    }

    pub fn arrange(&self, keyboard: Keyboard, owner: &Rc<ComponentNode>) -> Keyboard {
        match (self.width, self.max_width) {
            (Some(width), max_width) => {
                let buttons: Vec<ButtonSpec> = keyboard.into_iter().flatten().collect();
                let count = buttons.len();
                let mut width = width.min(MAX_ROW_WIDTH);
                if let Some(max_width) = max_width {
                    width = width.min(max_width);
                }
                if self.fill_evenly && count > 0 {
                    let rows = (count - 1) / MAX_ROW_WIDTH + 1;
                    width = (count - 1) / rows + 1;
                }
                let width = width.max(1);
                let mut rows: Keyboard =
                    buttons.chunks(width).map(<[ButtonSpec]>::to_vec).collect();
                if self.fill_tail && count > width {
                    if let Some(last) = rows.last_mut() {
                        while last.len() < width {
                            last.push(ButtonSpec::for_node(owner, EMPTY));
                        }
                    }
                }
                rows
            }
            (None, Some(max_width)) => {
                let max_width = max_width.clamp(1, MAX_ROW_WIDTH);
                keyboard
                    .into_iter()
                    .flat_map(|row| {
                        row.chunks(max_width)
                            .map(<[ButtonSpec]>::to_vec)
                            .collect::<Vec<_>>()
                    })
                    .collect()
            }
            (None, None) => keyboard,
        }
    }
}

impl Component for Group {
    fn render_keyboard(&self, view: &NodeView<'_>) -> Keyboard {
        self.arrange(view.children_keyboard(), view.node())
    }
}

/// Puts every child button on as few rows as the width limit allows.
#[derive(Clone, Debug, Default, PartialEq, Props)]
pub struct Row {
    pub max_width: Option<usize>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_width(mut self, max_width: usize) -> Self {
        self.max_width = Some(max_width);
        self
    }

    fn group(&self) -> Group {
        let group = Group::new().with_width(MAX_ROW_WIDTH);
        match self.max_width {
            Some(max_width) => group.with_max_width(max_width),
            None => group,
        }
    }
}

impl Component for Row {
    fn render_keyboard(&self, view: &NodeView<'_>) -> Keyboard {
        self.group().arrange(view.children_keyboard(), view.node())
    }
}

/// One button per row.
#[derive(Clone, Debug, Default, PartialEq, Props)]
pub struct Column;

impl Component for Column {
    fn render_keyboard(&self, view: &NodeView<'_>) -> Keyboard {
        Group::new()
            .with_width(1)
            .arrange(view.children_keyboard(), view.node())
    }
}
