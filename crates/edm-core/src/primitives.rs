//! # Built-in Primitives
//!
//! Hardcoded constants and the built-in primitive type catalogue.
//!
//! Primitive types are not declared by any schema; they live in the reserved
//! `Edm` namespace and are checked before schema types whenever a textual
//! type name is resolved.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved namespace of the built-in primitive types.
pub const EDM_NAMESPACE: &str = "Edm";

/// Maximum number of `/`-separated segments in an annotation target path.
///
/// - 1: schema element (`NS.Type`, `NS.Term`, `NS.Op(..)`, `NS.Container`)
/// - 2: nested member (`NS.Type/Property`, `Container/Set`, `NS.Op(..)/Param`)
/// - 3: `Container/Import(..)/Param`
pub const MAX_TARGET_SEGMENTS: usize = 3;

/// Type constructor for collection-valued type names: `Collection(T)`.
pub const COLLECTION_CONSTRUCTOR: &str = "Collection";

/// Type constructor for entity references: `Ref(T)`.
pub const REFERENCE_CONSTRUCTOR: &str = "Ref";

/// Built-in primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    Date,
    DateTime,
    DateTimeOffset,
    Decimal,
    Double,
    Duration,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    Stream,
    String,
    Time,
    TimeOfDay,
    Geography,
    Geometry,
}

/// Lookup table, kept sorted by simple name.
const PRIMITIVES: &[(&str, PrimitiveKind)] = &[
    ("Binary", PrimitiveKind::Binary),
    ("Boolean", PrimitiveKind::Boolean),
    ("Byte", PrimitiveKind::Byte),
    ("Date", PrimitiveKind::Date),
    ("DateTime", PrimitiveKind::DateTime),
    ("DateTimeOffset", PrimitiveKind::DateTimeOffset),
    ("Decimal", PrimitiveKind::Decimal),
    ("Double", PrimitiveKind::Double),
    ("Duration", PrimitiveKind::Duration),
    ("Geography", PrimitiveKind::Geography),
    ("Geometry", PrimitiveKind::Geometry),
    ("Guid", PrimitiveKind::Guid),
    ("Int16", PrimitiveKind::Int16),
    ("Int32", PrimitiveKind::Int32),
    ("Int64", PrimitiveKind::Int64),
    ("SByte", PrimitiveKind::SByte),
    ("Single", PrimitiveKind::Single),
    ("Stream", PrimitiveKind::Stream),
    ("String", PrimitiveKind::String),
    ("Time", PrimitiveKind::Time),
    ("TimeOfDay", PrimitiveKind::TimeOfDay),
];

impl PrimitiveKind {
    /// Resolve a qualified primitive name such as `Edm.Int32`.
    #[must_use]
    pub fn from_qualified_name(name: &str) -> Option<Self> {
        let simple = name.strip_prefix(EDM_NAMESPACE)?.strip_prefix('.')?;
        PRIMITIVES
            .binary_search_by(|(candidate, _)| candidate.cmp(&simple))
            .ok()
            .map(|index| PRIMITIVES[index].1)
    }

    /// Simple name without the `Edm.` prefix.
    #[must_use]
    pub fn name(self) -> &'static str {
        PRIMITIVES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("", |(name, _)| name)
    }

    /// Qualified name, e.g. `Edm.Int32`.
    #[must_use]
    pub fn full_name(self) -> String {
        format!("{EDM_NAMESPACE}.{}", self.name())
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{EDM_NAMESPACE}.{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_table_is_sorted() {
        let names: Vec<_> = PRIMITIVES.iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn resolves_qualified_names() {
        assert_eq!(
            PrimitiveKind::from_qualified_name("Edm.Int32"),
            Some(PrimitiveKind::Int32)
        );
        assert_eq!(
            PrimitiveKind::from_qualified_name("Edm.String"),
            Some(PrimitiveKind::String)
        );
        assert_eq!(PrimitiveKind::from_qualified_name("Int32"), None);
        assert_eq!(PrimitiveKind::from_qualified_name("NS.Int32"), None);
        assert_eq!(PrimitiveKind::from_qualified_name("Edm.Widget"), None);
    }

    #[test]
    fn full_name_round_trips() {
        for (_, kind) in PRIMITIVES {
            assert_eq!(
                PrimitiveKind::from_qualified_name(&kind.full_name()),
                Some(*kind)
            );
        }
    }

    #[test]
    fn max_target_segments_is_three() {
        assert_eq!(MAX_TARGET_SEGMENTS, 3);
    }
}
