//! Vocabulary annotation targets.
//!
//! A target path is split on `/` into one to three segments:
//!
//! | Segments | Resolution order                                              |
//! |----------|---------------------------------------------------------------|
//! | 1        | schema type, term, operation (signature), entity container     |
//! | 2        | container element or import, type + property, operation + parameter |
//! | 3        | container + operation import (signature) + parameter           |
//!
//! Several matching overloads collapse into an ambiguous binding; no match
//! gives an unresolved placeholder naming the path.

use crate::binding::Binding;
use crate::model::{AnnotationTarget, SemanticModel};
use crate::primitives::MAX_TARGET_SEGMENTS;
use crate::semantics::signatures::{ParameterizedName, TypeExpr, parse_parameterized};
use crate::semantics::{bind_candidates, unresolved};
use crate::types::{AnnotationId, DiagnosticCode, ElementKind, Location, OperationId, TermId};

impl SemanticModel {
    /// Resolve an annotation target path.
    #[must_use]
    pub fn resolve_target(&self, path: &str) -> Binding<AnnotationTarget> {
        self.resolve_target_at(path, None)
    }

    fn resolve_target_at(
        &self,
        path: &str,
        location: Option<&Location>,
    ) -> Binding<AnnotationTarget> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() > MAX_TARGET_SEGMENTS {
            return unresolved(
                path,
                ElementKind::AnnotationTarget,
                DiagnosticCode::ImpossibleAnnotationsTarget,
                format!(
                    "The annotation target '{path}' has more than {MAX_TARGET_SEGMENTS} segments."
                ),
                location,
            );
        }
        let parsed: Option<Vec<ParameterizedName<'_>>> = segments
            .iter()
            .map(|segment| parse_parameterized(segment.trim()).filter(|p| !p.name.is_empty()))
            .collect();
        let Some(parsed) = parsed else {
            return unresolved(
                path,
                ElementKind::AnnotationTarget,
                DiagnosticCode::ImpossibleAnnotationsTarget,
                format!("The annotation target '{path}' is not a valid target path."),
                location,
            );
        };

        match parsed.as_slice() {
            [single] => self.resolve_single(single, path, location),
            [first, second] => self.resolve_pair(first, second, path, location),
            [container, operation, parameter] => {
                self.resolve_import_parameter(container, operation, parameter, path, location)
            }
            _ => unresolved(
                path,
                ElementKind::AnnotationTarget,
                DiagnosticCode::ImpossibleAnnotationsTarget,
                format!("The annotation target '{path}' is empty."),
                location,
            ),
        }
    }

    fn resolve_single(
        &self,
        segment: &ParameterizedName<'_>,
        path: &str,
        location: Option<&Location>,
    ) -> Binding<AnnotationTarget> {
        let name = segment.name;
        if segment.parameters.is_none() {
            if let Some(ty) = self.find_type(name) {
                return ty.clone().map(AnnotationTarget::Type);
            }
            if let Some(term) = self.find_term(name) {
                return term.clone().map(AnnotationTarget::Term);
            }
        }
        let overloads = self.bind_overloads(
            self.find_operations(name),
            segment.parameters.as_deref(),
            name,
            location,
        );
        if let Some(operation) = overloads {
            return operation.map(AnnotationTarget::Operation);
        }
        if segment.parameters.is_none() {
            if let Some(container) = self.find_entity_container(name) {
                return container.map(AnnotationTarget::Container);
            }
        }
        not_found(path, location)
    }

    fn resolve_pair(
        &self,
        first: &ParameterizedName<'_>,
        second: &ParameterizedName<'_>,
        path: &str,
        location: Option<&Location>,
    ) -> Binding<AnnotationTarget> {
        // Container/Set, Container/Import(..)
        if first.parameters.is_none() {
            let container = self.find_entity_container(first.name);
            if let Some(ambiguous) =
                ambiguous_segment(container.as_ref(), first.name, path, location)
            {
                return ambiguous;
            }
            if let Some(container) = container.and_then(|binding| binding.resolved().copied()) {
                if second.parameters.is_none() {
                    if let Some(element) = self.find_container_element(container, second.name) {
                        return element.clone().map(AnnotationTarget::ContainerElement);
                    }
                }
                let display = format!("{}/{}", first.name, second.name);
                if let Some(import) = self.bind_overloads(
                    self.find_operation_imports(container, second.name),
                    second.parameters.as_deref(),
                    &display,
                    location,
                ) {
                    return import.map(AnnotationTarget::Operation);
                }
                return unresolved(
                    path,
                    ElementKind::ContainerElement,
                    DiagnosticCode::BadUnresolvedContainerElement,
                    format!(
                        "The entity container '{}' has no element '{}'.",
                        first.name, second.name
                    ),
                    location,
                );
            }

            // Type/Property
            let ty = self.find_type(first.name);
            if let Some(ambiguous) = ambiguous_segment(ty, first.name, path, location) {
                return ambiguous;
            }
            if let Some(ty) = ty.and_then(|b| b.resolved().copied()) {
                return match self.find_property(ty, second.name) {
                    Some(property) => property.map(AnnotationTarget::Property),
                    None => unresolved(
                        path,
                        ElementKind::Property,
                        DiagnosticCode::BadUnresolvedProperty,
                        format!("The type '{}' has no property '{}'.", first.name, second.name),
                        location,
                    ),
                };
            }
        }

        // Operation(..)/Parameter
        if second.parameters.is_none() {
            if let Some(operation) = self.bind_overloads(
                self.find_operations(first.name),
                first.parameters.as_deref(),
                first.name,
                location,
            ) {
                return self.bind_parameter(operation, second.name, first.name, location);
            }
        }
        not_found(path, location)
    }

    fn resolve_import_parameter(
        &self,
        container: &ParameterizedName<'_>,
        operation: &ParameterizedName<'_>,
        parameter: &ParameterizedName<'_>,
        path: &str,
        location: Option<&Location>,
    ) -> Binding<AnnotationTarget> {
        if container.parameters.is_some() || parameter.parameters.is_some() {
            return not_found(path, location);
        }
        let found = self.find_entity_container(container.name);
        if let Some(ambiguous) = ambiguous_segment(found.as_ref(), container.name, path, location) {
            return ambiguous;
        }
        let Some(container_id) = found.and_then(|binding| binding.resolved().copied()) else {
            return unresolved(
                path,
                ElementKind::EntityContainer,
                DiagnosticCode::BadUnresolvedEntityContainer,
                format!("The entity container '{}' could not be found.", container.name),
                location,
            );
        };
        let display = format!("{}/{}", container.name, operation.name);
        match self.bind_overloads(
            self.find_operation_imports(container_id, operation.name),
            operation.parameters.as_deref(),
            &display,
            location,
        ) {
            Some(import) => self.bind_parameter(import, parameter.name, &display, location),
            None => unresolved(
                &display,
                ElementKind::Operation,
                DiagnosticCode::BadUnresolvedOperation,
                format!("The operation '{display}' could not be found."),
                location,
            ),
        }
    }

    /// Narrow `candidates` to the overloads taking `signature`.
    ///
    /// `None` when there were no candidates and no signature was asked for;
    /// an unresolved placeholder naming `display` when a signature matched
    /// nothing.
    fn bind_overloads(
        &self,
        candidates: &[OperationId],
        signature: Option<&[TypeExpr]>,
        display: &str,
        location: Option<&Location>,
    ) -> Option<Binding<OperationId>> {
        let matches: Vec<OperationId> = match signature {
            Some(signature) => candidates
                .iter()
                .copied()
                .filter(|op| self.signature_matches(*op, signature))
                .collect(),
            None => candidates.to_vec(),
        };
        if let Some(binding) = bind_candidates(display, ElementKind::Operation, matches) {
            return Some(binding);
        }
        signature.map(|signature| {
            let wanted: Vec<String> = signature.iter().map(ToString::to_string).collect();
            unresolved(
                display,
                ElementKind::Operation,
                DiagnosticCode::BadUnresolvedOperation,
                format!(
                    "The operation '{display}' has no overload taking ({}).",
                    wanted.join(",")
                ),
                location,
            )
        })
    }

    fn bind_parameter(
        &self,
        operation: Binding<OperationId>,
        parameter: &str,
        display: &str,
        location: Option<&Location>,
    ) -> Binding<AnnotationTarget> {
        if let Binding::Unresolved(bad) = operation {
            return Binding::Unresolved(bad);
        }
        let targets = operation
            .candidates()
            .into_iter()
            .filter_map(|op| {
                let index = self.operation(op)?.parameter_index(parameter)?;
                Some(AnnotationTarget::Parameter { operation: op, index })
            })
            .collect();
        let name = format!("{display}/{parameter}");
        bind_candidates(&name, ElementKind::Parameter, targets).unwrap_or_else(|| {
            unresolved(
                &name,
                ElementKind::Parameter,
                DiagnosticCode::BadUnresolvedParameter,
                format!("The operation '{display}' has no parameter named '{parameter}'."),
                location,
            )
        })
    }
}

/// Placeholder for a path whose leading segment names several elements.
fn ambiguous_segment<T: Clone + PartialEq>(
    binding: Option<&Binding<T>>,
    segment: &str,
    path: &str,
    location: Option<&Location>,
) -> Option<Binding<AnnotationTarget>> {
    binding.filter(|binding| binding.is_ambiguous()).map(|_| {
        unresolved(
            path,
            ElementKind::AnnotationTarget,
            DiagnosticCode::BadAmbiguousElementBinding,
            format!("The name '{segment}' in annotation target '{path}' is ambiguous."),
            location,
        )
    })
}

fn not_found(path: &str, location: Option<&Location>) -> Binding<AnnotationTarget> {
    unresolved(
        path,
        ElementKind::AnnotationTarget,
        DiagnosticCode::BadUnresolvedTarget,
        format!("The annotation target '{path}' could not be found."),
        location,
    )
}

// =============================================================================
// VOCABULARY ANNOTATIONS
// =============================================================================

impl SemanticModel {
    /// The element an out-of-line annotation applies to.
    pub fn vocabulary_target(&self, annotation: AnnotationId) -> Option<Binding<AnnotationTarget>> {
        let def = self.vocabulary_annotation(annotation)?;
        let resolve = |model: &Self| model.resolve_target_at(&def.target, def.location());
        Some(def.target_cache.get_value(self, resolve, resolve))
    }

    /// The term an out-of-line annotation applies.
    pub fn vocabulary_term(&self, annotation: AnnotationId) -> Option<Binding<TermId>> {
        let def = self.vocabulary_annotation(annotation)?;
        let resolve = |model: &Self| {
            model.find_term(&def.term).cloned().unwrap_or_else(|| {
                unresolved(
                    &def.term,
                    ElementKind::Term,
                    DiagnosticCode::BadUnresolvedTerm,
                    format!("The term '{}' could not be found.", def.term),
                    def.location(),
                )
            })
        };
        Some(def.term_cache.get_value(self, resolve, resolve))
    }

    /// Out-of-line annotations whose target resolves to `target`.
    #[must_use]
    pub fn vocabulary_annotations_for(&self, target: AnnotationTarget) -> Vec<AnnotationId> {
        self.vocabulary_ids()
            .filter(|id| {
                self.vocabulary_target(*id)
                    .is_some_and(|binding| binding.resolved() == Some(&target))
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
