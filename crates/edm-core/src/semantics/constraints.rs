//! Referential constraint validation.
//!
//! A constraint names a principal and a dependent role of its association,
//! each with an ordered property list. It is well formed when:
//! 1. the roles differ and each names one of the association's ends
//! 2. the principal list enumerates the principal end's key exactly (any order)
//! 3. the dependent list has the same arity
//!
//! A well-formed constraint yields the dependent properties reordered to line
//! up with the principal key's natural order. Anything else yields one
//! placeholder per dependent name, each carrying the mismatch diagnostic.

use crate::binding::{BadElement, Binding};
use crate::model::{AssociationDef, ConstraintDef, SemanticModel};
use crate::semantics::unresolved;
use crate::types::{AssociationId, Diagnostic, DiagnosticCode, ElementKind, PropertyId};

impl SemanticModel {
    /// Dependent properties of the association's referential constraint,
    /// aligned with the principal key. `None` without a constraint.
    pub fn referential_constraint(
        &self,
        association: AssociationId,
    ) -> Option<Vec<Binding<PropertyId>>> {
        let def = self.association(association)?;
        def.constraint.as_ref()?;
        def.constraint_cache.get_value(
            self,
            |model| model.compute_referential_constraint(association),
            |_| None,
        )
    }

    fn compute_referential_constraint(
        &self,
        association: AssociationId,
    ) -> Option<Vec<Binding<PropertyId>>> {
        let def = self.association(association)?;
        let constraint = def.constraint.as_ref()?;
        Some(match self.check_constraint(association, def, constraint) {
            Ok(dependents) => dependents,
            Err(diagnostic) => {
                tracing::trace!(
                    association = %def.full_name(),
                    "malformed referential constraint"
                );
                constraint
                    .dependent
                    .iter()
                    .map(|name| {
                        Binding::Unresolved(BadElement::new(
                            name.as_str(),
                            ElementKind::Property,
                            vec![diagnostic.clone()],
                        ))
                    })
                    .collect()
            }
        })
    }

    fn check_constraint(
        &self,
        id: AssociationId,
        def: &AssociationDef,
        constraint: &ConstraintDef,
    ) -> Result<Vec<Binding<PropertyId>>, Diagnostic> {
        let association = def.full_name();
        let mismatch = |message: String| {
            Diagnostic::new(DiagnosticCode::TypeMismatchRelationshipConstraint, message)
                .at(constraint.location.as_ref().or(def.location()))
        };

        if constraint.principal_role == constraint.dependent_role {
            return Err(mismatch(format!(
                "The principal and dependent roles of '{association}' are both '{}'.",
                constraint.principal_role
            )));
        }
        for role in [&constraint.principal_role, &constraint.dependent_role] {
            if def.end(role).is_none() {
                return Err(mismatch(format!(
                    "The role '{role}' is not an end of '{association}'."
                )));
            }
        }

        let principal_type = self
            .end_type(id, &constraint.principal_role)
            .and_then(|binding| binding.resolved().copied())
            .ok_or_else(|| {
                mismatch(format!(
                    "The principal end '{}' of '{association}' has no resolvable type.",
                    constraint.principal_role
                ))
            })?;

        // Unresolved key entries keep their names so a partial list cannot match.
        let key = self.key(principal_type);
        let key_names: Vec<&str> = key
            .iter()
            .filter_map(|binding| match binding {
                Binding::Resolved(property) => self.property(*property).map(|p| p.name.as_str()),
                Binding::Unresolved(bad) => Some(bad.name()),
                Binding::Ambiguous(ambiguous) => Some(ambiguous.name()),
            })
            .collect();

        let enumerates_key = constraint.principal.len() == key_names.len()
            && key_names
                .iter()
                .all(|key| constraint.principal.iter().any(|p| p == key));
        if !enumerates_key {
            return Err(mismatch(format!(
                "The principal properties of '{association}' must be exactly the key of the principal end."
            )));
        }
        if constraint.dependent.len() != constraint.principal.len() {
            return Err(mismatch(format!(
                "The principal and dependent property lists of '{association}' differ in length."
            )));
        }

        let dependent_type = self
            .end_type(id, &constraint.dependent_role)
            .and_then(|binding| binding.resolved().copied());

        Ok(key_names
            .iter()
            .filter_map(|key| constraint.principal.iter().position(|p| p == key))
            .map(|position| {
                let name = &constraint.dependent[position];
                dependent_type
                    .and_then(|ty| self.find_property(ty, name))
                    .unwrap_or_else(|| {
                        unresolved(
                            name,
                            ElementKind::Property,
                            DiagnosticCode::BadUnresolvedProperty,
                            format!(
                                "The dependent property '{name}' of '{association}' could not be found."
                            ),
                            constraint.location.as_ref(),
                        )
                    })
            })
            .collect())
    }
}
