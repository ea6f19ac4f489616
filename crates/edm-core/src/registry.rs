//! # Name Registry
//!
//! Fully-qualified name dictionaries that never reject an insert.
//!
//! - `NameMap<T>`: one binding per name. A collision replaces the entry with
//!   an `AmbiguousBinding` (or appends to an existing one); unregistering a
//!   candidate collapses the composite back to a plain binding.
//! - `OperationMap<T>`: operation-like elements may legally share a name as
//!   overloads, so a name maps to a single handle or to a list of them.
//!
//! All maps are `BTreeMap`-backed: enumeration order is the name order, and
//! candidates keep their registration order.

use crate::binding::{AmbiguousBinding, Binding};
use crate::types::ElementKind;
use std::collections::BTreeMap;

// =============================================================================
// NAME MAP
// =============================================================================

/// Name → binding dictionary with collision merging.
#[derive(Debug, Clone)]
pub struct NameMap<T> {
    kind: ElementKind,
    entries: BTreeMap<String, Binding<T>>,
}

impl<T: Clone + PartialEq> NameMap<T> {
    /// Create an empty dictionary for elements of `kind`.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Insert `element` under `name`, merging collisions.
    pub fn register(&mut self, name: &str, element: T) {
        let merged = match self.entries.remove(name) {
            None => Binding::Resolved(element),
            Some(Binding::Resolved(existing)) => {
                tracing::trace!(name, kind = %self.kind, "name collision");
                Binding::Ambiguous(AmbiguousBinding::new(name, self.kind, existing, element))
            }
            Some(Binding::Ambiguous(mut ambiguous)) => {
                ambiguous.add_binding(element);
                Binding::Ambiguous(ambiguous)
            }
            // Placeholders are never stored, but an insert must not lose data.
            Some(Binding::Unresolved(_)) => Binding::Resolved(element),
        };
        self.entries.insert(name.to_string(), merged);
    }

    /// Remove `element` from under `name`.
    ///
    /// Returns `true` if the element was registered there.
    pub fn unregister(&mut self, name: &str, element: &T) -> bool {
        let Some(current) = self.entries.remove(name) else {
            return false;
        };
        match current {
            Binding::Resolved(existing) if existing == *element => true,
            Binding::Ambiguous(mut ambiguous) => {
                let removed = ambiguous.remove_binding(element);
                if let Some(rest) = ambiguous.into_binding() {
                    self.entries.insert(name.to_string(), rest);
                }
                removed
            }
            other => {
                self.entries.insert(name.to_string(), other);
                false
            }
        }
    }

    /// Look up a name. `None` means nothing was registered under it.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Binding<T>> {
        self.entries.get(name)
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding<T>)> {
        self.entries.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// Iterate only the ambiguous entries.
    pub fn ambiguous(&self) -> impl Iterator<Item = &AmbiguousBinding<T>> {
        self.entries.values().filter_map(|binding| match binding {
            Binding::Ambiguous(ambiguous) => Some(ambiguous),
            _ => None,
        })
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// OPERATION MAP
// =============================================================================

/// Overloads registered under one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overloads<T> {
    Single(T),
    List(Vec<T>),
}

impl<T> Overloads<T> {
    /// All overloads in registration order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Single(single) => std::slice::from_ref(single),
            Self::List(list) => list,
        }
    }
}

/// Name → overload set dictionary.
#[derive(Debug, Clone, Default)]
pub struct OperationMap<T> {
    entries: BTreeMap<String, Overloads<T>>,
}

impl<T: Clone + PartialEq> OperationMap<T> {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add an overload. The second insert under a name promotes to a list.
    pub fn register(&mut self, name: &str, operation: T) {
        let merged = match self.entries.remove(name) {
            None => Overloads::Single(operation),
            Some(Overloads::Single(existing)) => Overloads::List(vec![existing, operation]),
            Some(Overloads::List(mut list)) => {
                list.push(operation);
                Overloads::List(list)
            }
        };
        self.entries.insert(name.to_string(), merged);
    }

    /// Remove an overload. A list left with one element collapses to single.
    pub fn unregister(&mut self, name: &str, operation: &T) -> bool {
        let Some(current) = self.entries.remove(name) else {
            return false;
        };
        let (removed, rest) = match current {
            Overloads::Single(existing) if existing == *operation => (true, None),
            Overloads::Single(existing) => (false, Some(Overloads::Single(existing))),
            Overloads::List(mut list) => {
                let removed = match list.iter().position(|op| op == operation) {
                    Some(index) => {
                        list.remove(index);
                        true
                    }
                    None => false,
                };
                let rest = match list.len() {
                    0 => None,
                    1 => list.pop().map(Overloads::Single),
                    _ => Some(Overloads::List(list)),
                };
                (removed, rest)
            }
        };
        if let Some(rest) = rest {
            self.entries.insert(name.to_string(), rest);
        }
        removed
    }

    /// Overloads registered under `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Overloads<T>> {
        self.entries.get(name)
    }

    /// Overload handles registered under `name` (empty if none).
    #[must_use]
    pub fn find_all(&self, name: &str) -> &[T] {
        match self.entries.get(name) {
            Some(overloads) => overloads.as_slice(),
            None => &[],
        }
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Overloads<T>)> {
        self.entries.iter().map(|(name, overloads)| (name.as_str(), overloads))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiagnosticCode, TypeId};

    #[test]
    fn single_registration_resolves() {
        let mut map = NameMap::new(ElementKind::Type);
        map.register("NS.Foo", TypeId(1));
        assert_eq!(map.find("NS.Foo"), Some(&Binding::Resolved(TypeId(1))));
        assert_eq!(map.find("NS.Bar"), None);
    }

    #[test]
    fn collision_produces_ambiguous_in_registration_order() {
        let mut map = NameMap::new(ElementKind::Type);
        map.register("NS.Foo", TypeId(7));
        map.register("NS.Foo", TypeId(3));

        let binding = map.find("NS.Foo").expect("registered");
        assert!(binding.is_ambiguous());
        assert_eq!(binding.candidates(), vec![TypeId(7), TypeId(3)]);
        assert_eq!(
            binding.errors()[0].code,
            DiagnosticCode::BadAmbiguousElementBinding
        );
        assert_eq!(map.ambiguous().count(), 1);
    }

    #[test]
    fn third_registration_appends() {
        let mut map = NameMap::new(ElementKind::Term);
        for id in 1..=3 {
            map.register("NS.T", TypeId(id));
        }
        let binding = map.find("NS.T").expect("registered");
        assert_eq!(binding.candidates(), vec![TypeId(1), TypeId(2), TypeId(3)]);
    }

    #[test]
    fn unregister_collapses_to_plain() {
        let mut map = NameMap::new(ElementKind::Type);
        map.register("NS.Foo", TypeId(1));
        map.register("NS.Foo", TypeId(2));

        assert!(map.unregister("NS.Foo", &TypeId(1)));
        assert_eq!(map.find("NS.Foo"), Some(&Binding::Resolved(TypeId(2))));

        assert!(map.unregister("NS.Foo", &TypeId(2)));
        assert_eq!(map.find("NS.Foo"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut map = NameMap::new(ElementKind::Type);
        map.register("NS.Foo", TypeId(1));
        assert!(!map.unregister("NS.Foo", &TypeId(5)));
        assert!(!map.unregister("NS.Bar", &TypeId(1)));
        assert_eq!(map.find("NS.Foo"), Some(&Binding::Resolved(TypeId(1))));
    }

    #[test]
    fn operations_promote_and_collapse() {
        let mut map = OperationMap::new();
        map.register("NS.Op", 1u32);
        assert_eq!(map.find("NS.Op"), Some(&Overloads::Single(1)));

        map.register("NS.Op", 2);
        map.register("NS.Op", 3);
        assert_eq!(map.find_all("NS.Op"), &[1, 2, 3]);

        assert!(map.unregister("NS.Op", &2));
        assert_eq!(map.find("NS.Op"), Some(&Overloads::List(vec![1, 3])));

        assert!(map.unregister("NS.Op", &1));
        assert_eq!(map.find("NS.Op"), Some(&Overloads::Single(3)));

        assert!(map.unregister("NS.Op", &3));
        assert!(map.find_all("NS.Op").is_empty());
    }
}
