//! # Validation
//!
//! One pass over a `SemanticModel` that forces every lazy binding and
//! collects every diagnostic. Because failed lookups produce placeholders
//! instead of aborting, a single walk reports all defects of a schema set.

use crate::model::{NavigationEnd, PropertyKind, SemanticModel, TypeKind};
use crate::registry::NameMap;
use crate::types::{Diagnostic, DiagnosticCode, EdmError, ErrorCategory, TypeId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Deduplicated diagnostics in first-seen order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    seen: BTreeSet<Diagnostic>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. Returns `false` if it was already reported.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        if !self.seen.insert(diagnostic.clone()) {
            return false;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    pub fn extend<'a>(&mut self, diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic.clone());
        }
    }

    /// `true` when no defect was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn by_category(&self, category: ErrorCategory) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |diagnostic| diagnostic.category() == category)
    }

    /// `true` if any diagnostic carries `code`.
    #[must_use]
    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.iter().any(|diagnostic| diagnostic.code == code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Render the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, EdmError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EdmError::SerializationError(format!("Report: {}", e)))
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

fn ambiguous_entries<T: Clone + PartialEq>(report: &mut ValidationReport, map: &NameMap<T>) {
    for ambiguous in map.ambiguous() {
        report.extend(ambiguous.errors());
    }
}

impl SemanticModel {
    /// Force every binding of the model and collect all diagnostics.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();

        ambiguous_entries(&mut report, &self.type_names);
        ambiguous_entries(&mut report, &self.term_names);
        ambiguous_entries(&mut report, &self.association_names);
        ambiguous_entries(&mut report, &self.container_names);

        for ty in self.type_ids() {
            self.validate_type(ty, &mut report);
        }
        self.validate_properties(&mut report);
        self.validate_associations(&mut report);

        for term in self.term_ids() {
            report.extend(&self.term_type(term).map(|t| t.errors()).unwrap_or_default());
        }
        for operation in self.operation_ids() {
            let arity = self.operation(operation).map_or(0, |def| def.parameters.len());
            for index in 0..arity {
                report.extend(
                    &self
                        .parameter_type(operation, index)
                        .map(|t| t.errors())
                        .unwrap_or_default(),
                );
            }
            report.extend(&self.return_type(operation).map(|t| t.errors()).unwrap_or_default());
        }
        for container in self.container_ids() {
            if let Some(def) = self.container(container) {
                ambiguous_entries(&mut report, &def.element_names);
            }
        }
        for element in self.container_element_ids() {
            if let Some(binding) = self.element_type(element) {
                report.extend(binding.errors());
            }
        }
        for annotation in self.vocabulary_ids() {
            if let Some(binding) = self.vocabulary_target(annotation) {
                report.extend(binding.errors());
            }
            if let Some(binding) = self.vocabulary_term(annotation) {
                report.extend(binding.errors());
            }
        }

        tracing::debug!(
            diagnostics = report.len(),
            valid = report.is_valid(),
            "validated model"
        );
        report
    }

    fn validate_type(&self, ty: TypeId, report: &mut ValidationReport) {
        let Some(def) = self.type_def(ty) else {
            return;
        };
        if def.removed {
            return;
        }
        ambiguous_entries(report, &def.property_names);

        let base = self.base_type(ty);
        if let Some(binding) = &base {
            report.extend(binding.errors());
        }
        if def.kind != TypeKind::Entity {
            return;
        }

        let key = self.key(ty);
        for binding in &key {
            report.extend(binding.errors());
        }
        // Derived types get their key from the root, which reports it.
        let key_expected = match &base {
            None => true,
            Some(binding) => !binding.is_bad() && self.settings.inherit_keys,
        };
        if key.is_empty() && !def.is_abstract && key_expected {
            let name = def.full_name();
            report.push(
                Diagnostic::new(
                    DiagnosticCode::KeyMissingOnEntityType,
                    format!("The entity type '{name}' has no key defined."),
                )
                .at(def.location()),
            );
        }
    }

    fn validate_properties(&self, report: &mut ValidationReport) {
        for property in self.property_ids() {
            let Some(def) = self.property(property) else {
                continue;
            };
            match &def.kind {
                PropertyKind::Structural(_) => {
                    if let Some(type_ref) = self.property_type(property) {
                        report.extend(&type_ref.errors());
                    }
                }
                PropertyKind::Navigation(navigation) => {
                    if let Some(binding) = self.navigation_association(property) {
                        report.extend(binding.errors());
                        // The target end is checked by `navigation_target`.
                        if let (
                            Some(association),
                            NavigationEnd::Role {
                                relationship,
                                from_role,
                                ..
                            },
                        ) = (binding.resolved().copied(), &navigation.end)
                        {
                            let has_end = self
                                .association(association)
                                .is_some_and(|a| a.end(from_role).is_some());
                            if !has_end {
                                report.push(
                                    Diagnostic::new(
                                        DiagnosticCode::BadUnresolvedEnd,
                                        format!(
                                            "The association '{relationship}' has no end named '{from_role}'."
                                        ),
                                    )
                                    .at(def.location()),
                                );
                            }
                        }
                    }
                    if let Some(binding) = self.navigation_target(property) {
                        report.extend(binding.errors());
                    }
                    for binding in self.dependent_properties(property).iter().flatten() {
                        report.extend(binding.errors());
                    }
                }
            }
        }
    }

    fn validate_associations(&self, report: &mut ValidationReport) {
        for association in self.association_ids() {
            let Some(def) = self.association(association) else {
                continue;
            };
            for end in def.ends() {
                if let Some(binding) = self.end_type(association, end.role()) {
                    report.extend(binding.errors());
                }
            }
            for binding in self.referential_constraint(association).iter().flatten() {
                report.extend(binding.errors());
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
