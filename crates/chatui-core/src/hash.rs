//! Hashing backends. The `std-hash` feature swaps `ahash`/`hashbrown` for the std ones.

use core::hash::{Hash, Hasher};

#[cfg(not(feature = "std-hash"))]
mod backend {
    pub use ahash::AHasher as IdHasher;
    pub use hashbrown::{HashMap, HashSet};
}

#[cfg(feature = "std-hash")]
mod backend {
    pub use std::collections::hash_map::DefaultHasher as IdHasher;
    pub use std::collections::{HashMap, HashSet};
}

pub use backend::{HashMap, HashSet};

/// Hashes one value with fixed keys, so the result is stable across renders and runs.
#[inline]
pub fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = backend::IdHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Short opaque id for a button, derived from its chained key.
pub fn button_id(chained_key: &str) -> String {
    format!("{:08x}", hash_one(chained_key) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_id_is_stable_and_short() {
        let a = button_id("0.1.counter");
        assert_eq!(a, button_id("0.1.counter"));
        assert_eq!(a.len(), 8);
        assert_ne!(a, button_id("0.1.other"));
    }
}
