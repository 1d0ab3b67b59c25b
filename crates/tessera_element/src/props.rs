//! Property projections
//!
//! Each projection exposes an external field derived from state. Reads are
//! computed live on every access. Writes pass through an optional guard
//! before the setter derives the next state; values the guard rejects fail
//! with [`PropertyError::GuardRejected`] and leave state untouched.

use indexmap::IndexMap;
use tessera_core::{PropValue, PropertyError};

pub type Getter<S> = Box<dyn Fn(&S) -> PropValue>;
pub type Setter<S> = Box<dyn Fn(&S, PropValue) -> S>;
pub type Guard = Box<dyn Fn(&PropValue) -> bool>;

/// Accessors for one external field
pub struct Property<S> {
    get: Option<Getter<S>>,
    set: Option<Setter<S>>,
    guard: Option<Guard>,
}

impl<S> Default for Property<S> {
    fn default() -> Self {
        Self {
            get: None,
            set: None,
            guard: None,
        }
    }
}

impl<S: 'static> Property<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A read-only projection
    pub fn read<G, V>(get: G) -> Self
    where
        G: Fn(&S) -> V + 'static,
        V: Into<PropValue>,
    {
        Self::new().get(get)
    }

    pub fn get<G, V>(mut self, get: G) -> Self
    where
        G: Fn(&S) -> V + 'static,
        V: Into<PropValue>,
    {
        self.get = Some(Box::new(move |state: &S| -> PropValue { get(state).into() }));
        self
    }

    pub fn set<F>(mut self, set: F) -> Self
    where
        F: Fn(&S, PropValue) -> S + 'static,
    {
        self.set = Some(Box::new(set));
        self
    }

    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&PropValue) -> bool + 'static,
    {
        self.guard = Some(Box::new(guard));
        self
    }

    pub fn is_readable(&self) -> bool {
        self.get.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }
}

/// The fixed table of projections declared for a component type
pub struct PropertyTable<S> {
    entries: IndexMap<String, Property<S>>,
}

impl<S> Default for PropertyTable<S> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<S> PropertyTable<S> {
    pub fn insert(&mut self, name: impl Into<String>, property: Property<S>) {
        self.entries.insert(name.into(), property);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Declared names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a projection against the given state
    pub fn read(&self, name: &str, state: &S) -> Result<PropValue, PropertyError> {
        let property = self
            .entries
            .get(name)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
        let get = property
            .get
            .as_ref()
            .ok_or_else(|| PropertyError::WriteOnly(name.to_string()))?;
        Ok(get(state))
    }

    /// Derive the next state for a write, checking the guard first
    pub fn write(&self, name: &str, state: &S, value: PropValue) -> Result<S, PropertyError> {
        let property = self
            .entries
            .get(name)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
        let set = property
            .set
            .as_ref()
            .ok_or_else(|| PropertyError::ReadOnly(name.to_string()))?;
        if let Some(guard) = &property.guard {
            if !guard(&value) {
                tracing::warn!(property = name, %value, "write rejected by guard");
                return Err(PropertyError::GuardRejected {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(set(state, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Slider {
        value: i64,
        label: String,
    }

    fn table() -> PropertyTable<Slider> {
        let mut table = PropertyTable::default();
        table.insert(
            "value",
            Property::read(|s: &Slider| s.value)
                .set(|s, v| Slider {
                    value: v.as_int().unwrap_or(s.value),
                    ..s.clone()
                })
                .guard(|v| v.as_int().is_some_and(|n| (0..=100).contains(&n))),
        );
        table.insert("label", Property::read(|s: &Slider| s.label.clone()));
        table.insert(
            "reset",
            Property::new().set(|s: &Slider, _| Slider { value: 0, ..s.clone() }),
        );
        table
    }

    fn slider() -> Slider {
        Slider {
            value: 10,
            label: "Volume".into(),
        }
    }

    #[test]
    fn test_read_is_computed_from_given_state() {
        let table = table();
        assert_eq!(table.read("value", &slider()), Ok(PropValue::Int(10)));
        assert_eq!(
            table.read("label", &slider()),
            Ok(PropValue::Text("Volume".into()))
        );
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["value", "label", "reset"]);
    }

    #[test]
    fn test_guarded_write() {
        let table = table();
        let next = table.write("value", &slider(), PropValue::Int(42)).unwrap();
        assert_eq!(next.value, 42);

        assert_eq!(
            table.write("value", &slider(), PropValue::Int(500)),
            Err(PropertyError::GuardRejected {
                name: "value".into(),
                value: PropValue::Int(500),
            })
        );
        assert!(matches!(
            table.write("value", &slider(), PropValue::Text("loud".into())),
            Err(PropertyError::GuardRejected { .. })
        ));
    }

    #[test]
    fn test_access_errors() {
        let table = table();
        assert_eq!(
            table.write("label", &slider(), PropValue::Null),
            Err(PropertyError::ReadOnly("label".into()))
        );
        assert_eq!(
            table.read("reset", &slider()),
            Err(PropertyError::WriteOnly("reset".into()))
        );
        assert_eq!(
            table.read("missing", &slider()),
            Err(PropertyError::Unknown("missing".into()))
        );
    }
}
