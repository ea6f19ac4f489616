//! # Annotation Overlay
//!
//! Direct (namespace, name) → value annotations attached to model elements.
//!
//! Two layers per element:
//! - **baseline**: written once while the model is bound, immutable afterwards
//! - **transient**: written through `set_annotation` after construction
//!
//! A transient entry with no value is a *tombstone*: it hides the baseline
//! entry of the same name from lookup and enumeration without touching it.
//!
//! Each layer stores a `Slot` per element, allocated on first write. The
//! single/list split keeps the common zero-or-one annotation case free of a
//! collection allocation.

use crate::types::EdmError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ENTRIES AND SLOTS
// =============================================================================

/// One direct annotation. `value == None` marks a tombstone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DirectAnnotation {
    pub namespace: String,
    pub name: String,
    pub value: Option<String>,
}

impl DirectAnnotation {
    /// Create a valued annotation.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            value: Some(value.into()),
        }
    }

    fn is_named(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}

/// Per-element annotation storage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Slot {
    #[default]
    Empty,
    Single(DirectAnnotation),
    List(Vec<DirectAnnotation>),
}

impl Slot {
    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[DirectAnnotation] {
        match self {
            Self::Empty => &[],
            Self::Single(entry) => std::slice::from_ref(entry),
            Self::List(list) => list,
        }
    }

    fn find(&self, namespace: &str, name: &str) -> Option<&DirectAnnotation> {
        self.entries().iter().find(|entry| entry.is_named(namespace, name))
    }

    /// Insert or replace the entry with the same (namespace, name).
    fn put(&mut self, entry: DirectAnnotation) {
        match self {
            Self::Empty => *self = Self::Single(entry),
            Self::Single(existing) if existing.is_named(&entry.namespace, &entry.name) => {
                *existing = entry;
            }
            Self::Single(existing) => {
                let first = existing.clone();
                *self = Self::List(vec![first, entry]);
            }
            Self::List(list) => {
                match list
                    .iter_mut()
                    .find(|existing| existing.is_named(&entry.namespace, &entry.name))
                {
                    Some(existing) => *existing = entry,
                    None => list.push(entry),
                }
            }
        }
    }

    /// Drop the entry with (namespace, name), shrinking list → single → empty.
    fn remove(&mut self, namespace: &str, name: &str) {
        match self {
            Self::Empty => {}
            Self::Single(existing) => {
                if existing.is_named(namespace, name) {
                    *self = Self::Empty;
                }
            }
            Self::List(list) => {
                list.retain(|entry| !entry.is_named(namespace, name));
                *self = match list.len() {
                    0 => Self::Empty,
                    1 => list.pop().map_or(Self::Empty, Self::Single),
                    _ => Self::List(std::mem::take(list)),
                };
            }
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Baseline + transient annotation layers for elements keyed by `K`.
#[derive(Debug, Clone)]
pub struct AnnotationManager<K> {
    baseline: BTreeMap<K, Slot>,
    transient: BTreeMap<K, Slot>,
    allow_override: bool,
}

impl<K: Ord + Copy> AnnotationManager<K> {
    /// Create an empty manager.
    ///
    /// With `allow_override == false`, writes that collide with a baseline
    /// entry are rejected instead of shadowing it.
    #[must_use]
    pub fn new(allow_override: bool) -> Self {
        Self {
            baseline: BTreeMap::new(),
            transient: BTreeMap::new(),
            allow_override,
        }
    }

    /// Record a baseline annotation while the model is being bound.
    pub fn add_baseline(&mut self, element: K, annotation: DirectAnnotation) {
        self.baseline.entry(element).or_default().put(annotation);
    }

    /// Write or remove (`value == None`) a transient annotation.
    pub fn set_annotation(
        &mut self,
        element: K,
        namespace: &str,
        name: &str,
        value: Option<String>,
    ) -> Result<(), EdmError> {
        let shadows_baseline = self
            .baseline
            .get(&element)
            .is_some_and(|slot| slot.find(namespace, name).is_some());

        if shadows_baseline && !self.allow_override {
            return Err(EdmError::AnnotationOverride {
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        }

        if value.is_none() && !shadows_baseline {
            if let Some(slot) = self.transient.get_mut(&element) {
                slot.remove(namespace, name);
                if slot.is_empty() {
                    self.transient.remove(&element);
                }
            }
            return Ok(());
        }

        // Either a value, or a tombstone hiding the baseline entry.
        self.transient.entry(element).or_default().put(DirectAnnotation {
            namespace: namespace.to_string(),
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    /// Current value of an annotation, transient layer first.
    #[must_use]
    pub fn get_annotation(&self, element: K, namespace: &str, name: &str) -> Option<&str> {
        if let Some(entry) = self
            .transient
            .get(&element)
            .and_then(|slot| slot.find(namespace, name))
        {
            return entry.value.as_deref();
        }
        self.baseline
            .get(&element)
            .and_then(|slot| slot.find(namespace, name))
            .and_then(|entry| entry.value.as_deref())
    }

    /// Merged view: baseline entries not shadowed by the transient layer,
    /// followed by transient entries that are not tombstones.
    #[must_use]
    pub fn annotations(&self, element: K) -> Vec<DirectAnnotation> {
        let transient = self.transient.get(&element);
        let mut merged: Vec<DirectAnnotation> = self
            .baseline
            .get(&element)
            .map(Slot::entries)
            .unwrap_or_default()
            .iter()
            .filter(|entry| {
                transient.is_none_or(|slot| slot.find(&entry.namespace, &entry.name).is_none())
            })
            .cloned()
            .collect();
        merged.extend(
            transient
                .map(Slot::entries)
                .unwrap_or_default()
                .iter()
                .filter(|entry| entry.value.is_some())
                .cloned(),
        );
        merged
    }

    /// `true` if a transient slot has been allocated for `element`.
    #[must_use]
    pub fn has_overlay(&self, element: K) -> bool {
        self.transient.contains_key(&element)
    }

    /// The raw transient slot, mostly useful for inspection.
    #[must_use]
    pub fn transient_slot(&self, element: K) -> Option<&Slot> {
        self.transient.get(&element)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:docs";

    fn manager_with_doc() -> AnnotationManager<u32> {
        let mut manager = AnnotationManager::new(true);
        manager.add_baseline(1, DirectAnnotation::new(NS, "doc", "A"));
        manager
    }

    #[test]
    fn tombstone_round_trip() {
        let mut manager = manager_with_doc();
        assert_eq!(manager.get_annotation(1, NS, "doc"), Some("A"));

        manager.set_annotation(1, NS, "doc", None).expect("tombstone");
        assert_eq!(manager.get_annotation(1, NS, "doc"), None);
        assert!(manager.annotations(1).is_empty());

        manager
            .set_annotation(1, NS, "doc", Some("B".to_string()))
            .expect("override");
        assert_eq!(manager.get_annotation(1, NS, "doc"), Some("B"));
        assert_eq!(
            manager.annotations(1),
            vec![DirectAnnotation::new(NS, "doc", "B")]
        );
    }

    #[test]
    fn baseline_is_never_mutated() {
        let mut manager = manager_with_doc();
        manager.set_annotation(1, NS, "doc", None).expect("tombstone");

        let baseline = manager.baseline.get(&1).expect("baseline slot");
        assert_eq!(baseline.entries(), &[DirectAnnotation::new(NS, "doc", "A")]);
    }

    #[test]
    fn override_rejected_when_disabled() {
        let mut manager = AnnotationManager::new(false);
        manager.add_baseline(1u32, DirectAnnotation::new(NS, "doc", "A"));

        let result = manager.set_annotation(1, NS, "doc", Some("B".to_string()));
        assert!(matches!(result, Err(EdmError::AnnotationOverride { .. })));
        assert_eq!(manager.get_annotation(1, NS, "doc"), Some("A"));

        // Non-colliding names are still writable.
        manager
            .set_annotation(1, NS, "summary", Some("S".to_string()))
            .expect("write");
        assert_eq!(manager.get_annotation(1, NS, "summary"), Some("S"));
    }

    #[test]
    fn overlay_allocated_lazily() {
        let mut manager: AnnotationManager<u32> = AnnotationManager::new(true);
        assert!(!manager.has_overlay(5));
        assert!(manager.annotations(5).is_empty());

        manager
            .set_annotation(5, NS, "a", Some("1".to_string()))
            .expect("write");
        assert!(matches!(manager.transient_slot(5), Some(Slot::Single(_))));

        manager
            .set_annotation(5, NS, "b", Some("2".to_string()))
            .expect("write");
        assert!(matches!(manager.transient_slot(5), Some(Slot::List(list)) if list.len() == 2));

        manager.set_annotation(5, NS, "a", None).expect("remove");
        assert!(matches!(manager.transient_slot(5), Some(Slot::Single(_))));

        manager.set_annotation(5, NS, "b", None).expect("remove");
        assert!(!manager.has_overlay(5));
    }

    #[test]
    fn enumeration_yields_one_entry_per_name() {
        let mut manager = manager_with_doc();
        manager.add_baseline(1, DirectAnnotation::new(NS, "title", "T"));
        manager
            .set_annotation(1, NS, "doc", Some("B".to_string()))
            .expect("override");
        manager
            .set_annotation(1, "urn:other", "doc", Some("C".to_string()))
            .expect("write");

        let names: Vec<_> = manager
            .annotations(1)
            .into_iter()
            .map(|entry| (entry.namespace, entry.name, entry.value))
            .collect();
        assert_eq!(
            names,
            vec![
                (NS.to_string(), "title".to_string(), Some("T".to_string())),
                (NS.to_string(), "doc".to_string(), Some("B".to_string())),
                ("urn:other".to_string(), "doc".to_string(), Some("C".to_string())),
            ]
        );
    }
}
