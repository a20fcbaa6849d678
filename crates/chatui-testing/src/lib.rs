//! Testing utilities and harness for chatui sessions

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
}
