//! Leaf widgets built on top of the chatui core tree.

pub mod symbols;
pub mod widgets;

pub use widgets::*;

#[cfg(test)]
#[path = "tests/widgets_tests.rs"]
mod widgets_tests;
