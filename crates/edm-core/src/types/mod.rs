//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the EDM engine:
//! - Arena handles (`TypeId`, `PropertyId`, `TermId`, ...) and `ElementKey`
//! - Element kinds used by placeholder bindings (`ElementKind`)
//! - Diagnostics (`Diagnostic`, `DiagnosticCode`, `ErrorCategory`, `Location`)
//! - Boundary error type (`EdmError`)
//!
//! ## Determinism Guarantees
//!
//! All handles implement `Ord` so they can key `BTreeMap`/`BTreeSet`,
//! which keeps every enumeration in the engine reproducible.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ARENA HANDLES
// =============================================================================

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of the element inside its arena.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_handle!(
    /// Handle of an entity, complex or enum type.
    TypeId
);
arena_handle!(
    /// Handle of a structural or navigation property.
    PropertyId
);
arena_handle!(
    /// Handle of an association (relationship with two ends).
    AssociationId
);
arena_handle!(
    /// Handle of a vocabulary term.
    TermId
);
arena_handle!(
    /// Handle of a schema operation or a container operation import.
    OperationId
);
arena_handle!(
    /// Handle of an entity container.
    ContainerId
);
arena_handle!(
    /// Handle of an entity set or singleton inside a container.
    ContainerElementId
);
arena_handle!(
    /// Handle of an out-of-line vocabulary annotation.
    AnnotationId
);

/// Identity of any addressable element in a model.
///
/// Used as the key of annotation overlays and of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKey {
    Type(TypeId),
    Property(PropertyId),
    Association(AssociationId),
    Term(TermId),
    Operation(OperationId),
    Container(ContainerId),
    ContainerElement(ContainerElementId),
    Annotation(AnnotationId),
}

/// The interface a binding was expected to satisfy.
///
/// Placeholders remember it so diagnostics can say what was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Type,
    Property,
    NavigationProperty,
    Association,
    AssociationEnd,
    Term,
    Operation,
    Parameter,
    EntityContainer,
    ContainerElement,
    AnnotationTarget,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Type => "type",
            Self::Property => "property",
            Self::NavigationProperty => "navigation property",
            Self::Association => "association",
            Self::AssociationEnd => "association end",
            Self::Term => "term",
            Self::Operation => "operation",
            Self::Parameter => "parameter",
            Self::EntityContainer => "entity container",
            Self::ContainerElement => "entity set",
            Self::AnnotationTarget => "annotation target",
        };
        f.write_str(label)
    }
}

// =============================================================================
// SHARED ENUMS
// =============================================================================

/// Cardinality of an association end or navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Multiplicity {
    #[serde(rename = "0..1")]
    ZeroOrOne,
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "*")]
    Many,
}

/// Side-effecting (`Action`) or composable (`Function`) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum OperationKind {
    Action,
    #[default]
    Function,
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Position of an element in its source document.
///
/// Produced by the external document reader; the engine only carries it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Location {
    /// Document identifier (file name, URL, ...).
    #[serde(default)]
    pub source: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.source, self.line, self.column)
    }
}

/// Which half of the error taxonomy a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Malformed reference, missing sub-element, arity mismatch, cycles.
    Structural,
    /// Unresolved or ambiguous name, impossible annotation target.
    NameResolution,
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    BadUnresolvedType,
    BadUnresolvedTerm,
    BadUnresolvedProperty,
    BadUnresolvedAssociation,
    BadUnresolvedEnd,
    BadUnresolvedEntityContainer,
    BadUnresolvedContainerElement,
    BadUnresolvedOperation,
    BadUnresolvedParameter,
    BadUnresolvedTarget,
    BadAmbiguousElementBinding,
    ImpossibleAnnotationsTarget,
    BadCyclicEntity,
    BadCyclicComplex,
    InvalidTypeName,
    TypeMismatchRelationshipConstraint,
    KeyMissingOnEntityType,
}

impl DiagnosticCode {
    /// Taxonomy bucket for this code.
    #[must_use]
    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::BadCyclicEntity
            | Self::BadCyclicComplex
            | Self::InvalidTypeName
            | Self::TypeMismatchRelationshipConstraint
            | Self::KeyMissingOnEntityType => ErrorCategory::Structural,
            _ => ErrorCategory::NameResolution,
        }
    }
}

/// A single defect found while binding or validating a model.
///
/// Diagnostics are values: they ride along on placeholder bindings and are
/// only surfaced when a caller walks `errors()`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a diagnostic without a source location.
    #[must_use]
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a source location.
    #[must_use]
    pub fn at(mut self, location: Option<&Location>) -> Self {
        self.location = location.cloned();
        self
    }

    /// Taxonomy bucket of this diagnostic.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {:?}: {}", self.code, self.message),
            None => write!(f, "{:?}: {}", self.code, self.message),
        }
    }
}

// =============================================================================
// NAMES
// =============================================================================

/// Join a namespace and a simple name into a fully-qualified name.
#[must_use]
pub fn full_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Split a fully-qualified name at its last dot into (namespace, name).
#[must_use]
pub fn split_full_name(qualified: &str) -> (&str, &str) {
    match qualified.rfind('.') {
        Some(dot) => (&qualified[..dot], &qualified[dot + 1..]),
        None => ("", qualified),
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Invariant violations raised at the API boundary.
///
/// Data defects never show up here; they become `Diagnostic`s on
/// placeholder bindings. These errors mean the *caller* broke a contract.
#[derive(Debug, Error)]
pub enum EdmError {
    /// A handle does not belong to this model.
    #[error("Unknown element: {0:?}")]
    UnknownElement(ElementKey),

    /// A required name was empty or malformed.
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// The operation needs a structured (entity or complex) type.
    #[error("Type {0:?} is not a structured type")]
    NotStructured(TypeId),

    /// The element is not a navigation property.
    #[error("Property {0:?} is not a navigation property")]
    NotNavigation(PropertyId),

    /// Writing this annotation would override an immutable baseline entry.
    #[error("Annotation {namespace}:{name} is part of the immutable baseline")]
    AnnotationOverride { namespace: String, name: String },

    /// Settings could not be parsed or contain an invalid value.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// A schema document could not be deserialized.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// A report could not be serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_with_dot() {
        assert_eq!(full_name("NS", "Customer"), "NS.Customer");
        assert_eq!(full_name("", "Customer"), "Customer");
    }

    #[test]
    fn split_full_name_uses_last_dot() {
        assert_eq!(split_full_name("Org.Sales.Order"), ("Org.Sales", "Order"));
        assert_eq!(split_full_name("Order"), ("", "Order"));
    }

    #[test]
    fn codes_map_to_categories() {
        assert_eq!(
            DiagnosticCode::BadUnresolvedType.category(),
            ErrorCategory::NameResolution
        );
        assert_eq!(
            DiagnosticCode::ImpossibleAnnotationsTarget.category(),
            ErrorCategory::NameResolution
        );
        assert_eq!(
            DiagnosticCode::BadCyclicEntity.category(),
            ErrorCategory::Structural
        );
        assert_eq!(
            DiagnosticCode::TypeMismatchRelationshipConstraint.category(),
            ErrorCategory::Structural
        );
    }

    #[test]
    fn diagnostic_display_includes_location() {
        let location = Location {
            source: "orders.csdl".to_string(),
            line: 4,
            column: 9,
        };
        let diagnostic = Diagnostic::new(DiagnosticCode::BadUnresolvedType, "missing")
            .at(Some(&location));
        assert_eq!(
            diagnostic.to_string(),
            "orders.csdl(4, 9): BadUnresolvedType: missing"
        );
    }

    #[test]
    fn handles_are_ordered() {
        let mut ids = vec![TypeId(3), TypeId(1), TypeId(2)];
        ids.sort();
        assert_eq!(ids, vec![TypeId(1), TypeId(2), TypeId(3)]);
        assert_eq!(TypeId(7).index(), 7);
    }
}
