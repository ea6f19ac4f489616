//! Type expressions and operation signatures.
//!
//! Grammar of a textual type expression:
//!
//! ```text
//! expr := "Collection(" expr ")" | "Ref(" expr ")" | qualified-name
//! ```
//!
//! A parameterized name (`Name(T1,T2)`) is a bare name followed by a
//! parenthesized, comma-separated list of type expressions. Commas nested
//! inside `Collection(..)`/`Ref(..)` do not split the list.

use crate::binding::{BadElement, Binding};
use crate::model::{Reference, SemanticModel, TypeDefinition, TypeReference};
use crate::primitives::{COLLECTION_CONSTRUCTOR, PrimitiveKind, REFERENCE_CONSTRUCTOR};
use crate::types::{Diagnostic, DiagnosticCode, ElementKind, Location, OperationId};
use std::fmt;

/// A parsed, still unresolved type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(String),
    Collection(Box<TypeExpr>),
    Reference(Box<TypeExpr>),
}

impl TypeExpr {
    /// Parse a type expression. `None` if it is malformed.
    #[must_use]
    pub fn parse(source: &str) -> Option<Self> {
        let source = source.trim();
        if let Some(inner) = constructor_argument(source, COLLECTION_CONSTRUCTOR) {
            return Self::parse(inner).map(|e| Self::Collection(Box::new(e)));
        }
        if let Some(inner) = constructor_argument(source, REFERENCE_CONSTRUCTOR) {
            return Self::parse(inner).map(|e| Self::Reference(Box::new(e)));
        }
        let malformed = source.is_empty()
            || source
                .chars()
                .any(|c| matches!(c, '(' | ')' | ',' | '/') || c.is_whitespace());
        (!malformed).then(|| Self::Named(source.to_string()))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Collection(inner) => write!(f, "{COLLECTION_CONSTRUCTOR}({inner})"),
            Self::Reference(inner) => write!(f, "{REFERENCE_CONSTRUCTOR}({inner})"),
        }
    }
}

fn constructor_argument<'a>(source: &'a str, constructor: &str) -> Option<&'a str> {
    source
        .strip_prefix(constructor)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// A name with an optional parameter-type list: `Op` or `Op(T1,T2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedName<'a> {
    pub name: &'a str,
    /// `None` when no parentheses were given.
    pub parameters: Option<Vec<TypeExpr>>,
}

/// Split `Name(T1,T2)` into its bare name and parameter types.
///
/// Returns `None` for unbalanced parentheses or malformed parameter types.
#[must_use]
pub fn parse_parameterized(segment: &str) -> Option<ParameterizedName<'_>> {
    let Some(open) = segment.find('(') else {
        return Some(ParameterizedName {
            name: segment,
            parameters: None,
        });
    };
    let name = &segment[..open];
    let inner = segment[open + 1..].strip_suffix(')')?;
    if name.is_empty() {
        return None;
    }
    let parameters = if inner.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(inner)?
            .into_iter()
            .map(TypeExpr::parse)
            .collect::<Option<Vec<_>>>()?
    };
    Some(ParameterizedName {
        name,
        parameters: Some(parameters),
    })
}

fn split_top_level(list: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&list[start..]);
    Some(parts)
}

// =============================================================================
// RESOLUTION
// =============================================================================

impl SemanticModel {
    /// Resolve a textual type expression. Bare names are checked against the
    /// primitives first, then against schema types.
    #[must_use]
    pub fn resolve_type_expression(
        &self,
        source: &str,
        nullable: bool,
        location: Option<&Location>,
    ) -> TypeReference {
        match TypeExpr::parse(source) {
            Some(expr) => self.resolve_type_expr(&expr, nullable, location),
            None => TypeReference::new(
                TypeDefinition::Schema(Binding::Unresolved(BadElement::new(
                    source,
                    ElementKind::Type,
                    vec![
                        Diagnostic::new(
                            DiagnosticCode::InvalidTypeName,
                            format!("The type expression '{source}' is malformed."),
                        )
                        .at(location),
                    ],
                ))),
                nullable,
            ),
        }
    }

    fn resolve_type_expr(
        &self,
        expr: &TypeExpr,
        nullable: bool,
        location: Option<&Location>,
    ) -> TypeReference {
        match expr {
            TypeExpr::Collection(inner) => {
                TypeReference::collection(self.resolve_type_expr(inner, nullable, location))
            }
            TypeExpr::Reference(inner) => TypeReference::entity_reference(
                self.resolve_type_expr(inner, false, location),
                nullable,
            ),
            TypeExpr::Named(name) => match PrimitiveKind::from_qualified_name(name) {
                Some(kind) => TypeReference::primitive(kind, nullable),
                None => TypeReference::new(
                    TypeDefinition::Schema(self.bind_type_name(name, location)),
                    nullable,
                ),
            },
        }
    }

    /// Resolve a stored type reference, textual or bound.
    pub(crate) fn resolve_type_reference(
        &self,
        reference: &Reference<TypeReference>,
        nullable: bool,
        location: Option<&Location>,
    ) -> TypeReference {
        match reference {
            Reference::Named(source) => self.resolve_type_expression(source, nullable, location),
            Reference::Bound(bound) => self.rebind_type_reference(bound, location),
        }
    }

    /// Re-check the schema handles inside a bound reference, so a type
    /// removed after the reference was built shows up as a placeholder.
    fn rebind_type_reference(
        &self,
        reference: &TypeReference,
        location: Option<&Location>,
    ) -> TypeReference {
        let definition = match reference.definition() {
            TypeDefinition::Schema(Binding::Resolved(ty)) => {
                TypeDefinition::Schema(self.bind_type_handle(*ty, location))
            }
            TypeDefinition::Collection(element) => {
                TypeDefinition::Collection(Box::new(self.rebind_type_reference(element, location)))
            }
            TypeDefinition::EntityReference(element) => TypeDefinition::EntityReference(Box::new(
                self.rebind_type_reference(element, location),
            )),
            other => other.clone(),
        };
        TypeReference::new(definition, reference.nullable())
    }

    /// `true` if `reference` is exactly the type `expr` denotes.
    #[must_use]
    pub fn type_matches(&self, reference: &TypeReference, expr: &TypeExpr) -> bool {
        match (reference.definition(), expr) {
            (TypeDefinition::Collection(element), TypeExpr::Collection(inner))
            | (TypeDefinition::EntityReference(element), TypeExpr::Reference(inner)) => {
                self.type_matches(element, inner)
            }
            (definition, TypeExpr::Named(name)) => {
                match PrimitiveKind::from_qualified_name(name) {
                    Some(kind) => *definition == TypeDefinition::Primitive(kind),
                    None => match definition {
                        TypeDefinition::Schema(binding) => {
                            let wanted = self.find_type(name).and_then(|b| b.resolved().copied());
                            wanted.is_some() && binding.resolved().copied() == wanted
                        }
                        _ => false,
                    },
                }
            }
            _ => false,
        }
    }

    /// `true` if `operation` takes exactly the parameter types in `signature`.
    #[must_use]
    pub fn signature_matches(&self, operation: OperationId, signature: &[TypeExpr]) -> bool {
        let Some(def) = self.operation(operation) else {
            return false;
        };
        def.parameters.len() == signature.len()
            && (0..signature.len()).all(|index| {
                self.parameter_type(operation, index)
                    .is_some_and(|ty| self.type_matches(&ty, &signature[index]))
            })
    }

    /// Schema operations named `name` whose parameters match `signature`.
    #[must_use]
    pub fn find_operations_by_signature(
        &self,
        name: &str,
        signature: &[TypeExpr],
    ) -> Vec<OperationId> {
        self.find_operations(name)
            .iter()
            .copied()
            .filter(|op| self.signature_matches(*op, signature))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
