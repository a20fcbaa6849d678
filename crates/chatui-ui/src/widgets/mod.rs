//! Leaf widgets

pub mod button;
pub mod input;
pub mod layout;
pub mod media;
pub mod navigation;
pub mod text;

pub use button::*;
pub use input::*;
pub use layout::*;
pub use media::*;
pub use navigation::*;
pub use text::*;
