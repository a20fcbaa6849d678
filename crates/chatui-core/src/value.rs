//! Dynamically typed, comparable values stored in reactive slots.

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

/// Object-safe view over any `PartialEq + Debug` value.
pub trait DynValue: Any {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynValue) -> bool;
    fn dyn_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + PartialEq + fmt::Debug> DynValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| other == self)
    }

    fn dyn_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Shared immutable value. Cloning is a reference-count bump.
#[derive(Clone)]
pub struct Value(Rc<dyn DynValue>);

impl Value {
    pub fn new<T: Any + PartialEq + fmt::Debug>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// The `()` value, used where a slot or state carries no data.
    pub fn unit() -> Self {
        Self::new(())
    }

    pub fn is_unit(&self) -> bool {
        self.is::<()>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.0).as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref::<T>()
    }

    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    pub fn type_name(&self) -> &'static str {
        (*self.0).type_name()
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::unit()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0.dyn_eq(&*other.0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.dyn_fmt(f)
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::new(value)
                }
            }
        )*
    };
}

impl_from_for_value!(bool, i32, i64, u32, u64, usize, f32, f64, String, ());

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::new(value.to_string())
    }
}
