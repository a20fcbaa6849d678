use indexmap::IndexMap;

use crate::value::Value;

/// Ordered snapshot of a blueprint's scalar props.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    values: IndexMap<String, Value>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Props whose value differs from `previous`, including props `previous` lacks.
    pub fn changed_since<'a>(&'a self, previous: &'a Props) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.iter()
            .filter(move |(name, value)| previous.get(name) != Some(*value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (name, value) in iter {
            props.insert(name, value);
        }
        props
    }
}

/// Produces the prop snapshot of a component blueprint.
///
/// Usually derived with `#[derive(Props)]`; fields marked `#[prop(skip)]` (callbacks,
/// nested blueprints) are left out.
pub trait PropSource {
    fn to_props(&self) -> Props;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_since_reports_new_and_modified_props() {
        let old = Props::new().with("title", "a").with("count", 1_i32);
        let new = Props::new()
            .with("title", "a")
            .with("count", 2_i32)
            .with("extra", true);
        let changed: Vec<_> = new.changed_since(&old).map(|(name, _)| name).collect();
        assert_eq!(changed, vec!["count", "extra"]);
        assert_eq!(new.changed_since(&new).count(), 0);
    }
}
