//! # CSDL Syntax Tree
//!
//! The already-parsed form of a schema document, as handed over by an
//! external reader. Nothing here is resolved: every cross-reference is the
//! text that appeared in the document. The semantic binder turns a set of
//! these schemas into a `SemanticModel`.
//!
//! All types derive serde so readers can produce them from any format; JSON
//! via `serde_json` is what the tests use.

use crate::annotations::DirectAnnotation;
use crate::types::{Location, Multiplicity, OperationKind};
use serde::{Deserialize, Serialize};

/// One `<Schema>` element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlSchema {
    pub namespace: String,
    pub alias: Option<String>,
    pub entity_types: Vec<CsdlEntityType>,
    pub complex_types: Vec<CsdlComplexType>,
    pub enum_types: Vec<CsdlEnumType>,
    pub associations: Vec<CsdlAssociation>,
    pub terms: Vec<CsdlTerm>,
    pub operations: Vec<CsdlOperation>,
    pub entity_containers: Vec<CsdlEntityContainer>,
    pub annotations: Vec<CsdlAnnotations>,
    pub location: Option<Location>,
}

impl CsdlSchema {
    /// Empty schema for `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlEntityType {
    pub name: String,
    pub base_type: Option<String>,
    pub is_abstract: bool,
    pub is_open: bool,
    /// `None` when the document has no `<Key>` element.
    pub key: Option<Vec<String>>,
    pub properties: Vec<CsdlProperty>,
    pub navigation_properties: Vec<CsdlNavigationProperty>,
    pub direct_annotations: Vec<DirectAnnotation>,
    pub location: Option<Location>,
}

impl CsdlEntityType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_key<S: Into<String>>(mut self, key: impl IntoIterator<Item = S>) -> Self {
        self.key = Some(key.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: CsdlProperty) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn with_navigation(mut self, navigation: CsdlNavigationProperty) -> Self {
        self.navigation_properties.push(navigation);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlComplexType {
    pub name: String,
    pub base_type: Option<String>,
    pub is_abstract: bool,
    pub is_open: bool,
    pub properties: Vec<CsdlProperty>,
    pub direct_annotations: Vec<DirectAnnotation>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlEnumType {
    pub name: String,
    pub members: Vec<CsdlEnumMember>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlEnumMember {
    pub name: String,
    pub value: Option<i64>,
}

/// A structural property. `type_name` is the textual type expression,
/// e.g. `Edm.Int32`, `NS.Address` or `Collection(Edm.String)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// `None` means the document did not say; properties are nullable then.
    pub nullable: Option<bool>,
    pub default_value: Option<String>,
    pub direct_annotations: Vec<DirectAnnotation>,
    pub location: Option<Location>,
}

impl CsdlProperty {
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }
}

/// A navigation property declared against an association.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlNavigationProperty {
    pub name: String,
    pub relationship: String,
    pub from_role: String,
    pub to_role: String,
    pub location: Option<Location>,
}

impl CsdlNavigationProperty {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        relationship: impl Into<String>,
        from_role: impl Into<String>,
        to_role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relationship: relationship.into(),
            from_role: from_role.into(),
            to_role: to_role.into(),
            location: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlAssociation {
    pub name: String,
    pub ends: Vec<CsdlAssociationEnd>,
    pub referential_constraint: Option<CsdlReferentialConstraint>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlAssociationEnd {
    pub role: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub multiplicity: Multiplicity,
}

impl CsdlAssociationEnd {
    #[must_use]
    pub fn new(
        role: impl Into<String>,
        type_name: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Self {
        Self {
            role: role.into(),
            type_name: type_name.into(),
            multiplicity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlReferentialConstraint {
    pub principal: CsdlConstraintRole,
    pub dependent: CsdlConstraintRole,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlConstraintRole {
    pub role: String,
    /// Ordered property names of this role.
    pub properties: Vec<String>,
}

impl CsdlConstraintRole {
    #[must_use]
    pub fn new<S: Into<String>>(
        role: impl Into<String>,
        properties: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            role: role.into(),
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlTerm {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: Option<bool>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: Option<bool>,
}

impl CsdlParameter {
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: None,
        }
    }
}

/// Schema-level action or function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlOperation {
    pub name: String,
    pub kind: OperationKind,
    pub is_bound: bool,
    pub parameters: Vec<CsdlParameter>,
    pub return_type: Option<String>,
    pub location: Option<Location>,
}

impl CsdlOperation {
    #[must_use]
    pub fn function(name: impl Into<String>, parameters: Vec<CsdlParameter>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Function,
            parameters,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlEntityContainer {
    pub name: String,
    pub entity_sets: Vec<CsdlEntitySet>,
    pub singletons: Vec<CsdlEntitySet>,
    pub operation_imports: Vec<CsdlOperationImport>,
    pub direct_annotations: Vec<DirectAnnotation>,
    pub location: Option<Location>,
}

/// An entity set or a singleton: a named, typed container member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlEntitySet {
    pub name: String,
    pub entity_type: String,
    pub location: Option<Location>,
}

impl CsdlEntitySet {
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            location: None,
        }
    }
}

/// Container-scoped operation (function/action import) with its own signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlOperationImport {
    pub name: String,
    pub kind: OperationKind,
    pub parameters: Vec<CsdlParameter>,
    pub return_type: Option<String>,
    pub entity_set: Option<String>,
    pub location: Option<Location>,
}

impl CsdlOperationImport {
    #[must_use]
    pub fn function(name: impl Into<String>, parameters: Vec<CsdlParameter>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Function,
            parameters,
            ..Self::default()
        }
    }
}

/// Out-of-line `<Annotations Target="...">` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlAnnotations {
    pub target: String,
    pub qualifier: Option<String>,
    pub annotations: Vec<CsdlAnnotation>,
    pub location: Option<Location>,
}

/// One vocabulary annotation: a term applied with an optional value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsdlAnnotation {
    pub term: String,
    pub qualifier: Option<String>,
    pub value: Option<String>,
}

impl CsdlAnnotation {
    #[must_use]
    pub fn new(term: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            term: term.into(),
            qualifier: None,
            value: value.map(str::to_string),
        }
    }
}
