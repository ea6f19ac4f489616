//! # Semantics
//!
//! Lazy resolution of a `SemanticModel`.
//!
//! Every derived property (base type, key, property type, navigation target,
//! dependent properties, annotation target, ...) is computed on first read
//! through the `Cache` stored on its definition, so each is evaluated at most
//! once and cyclic schemas terminate. Lookups are total: a failed or colliding
//! name produces a placeholder `Binding`, never an error.
//!
//! Submodules:
//! - `builder`: CSDL syntax tree → `SemanticModel`
//! - `signatures`: type expressions, parameterized names, overload matching
//! - `constraints`: referential constraint validation and reordering
//! - `targets`: vocabulary annotation target paths

pub mod builder;
pub mod constraints;
pub mod signatures;
pub mod targets;

use crate::annotations::DirectAnnotation;
use crate::binding::{AmbiguousBinding, BadElement, Binding};
use crate::model::{
    NavigationEnd, PropertyKind, Reference, SemanticModel, TypeKind, TypeReference,
};
use crate::registry::NameMap;
use crate::types::{
    AssociationId, ContainerElementId, ContainerId, Diagnostic, DiagnosticCode, EdmError,
    ElementKey, ElementKind, Location, Multiplicity, OperationId, PropertyId, TermId, TypeId,
    full_name, split_full_name,
};
use std::collections::BTreeSet;

// =============================================================================
// PLACEHOLDER HELPERS
// =============================================================================

/// Unresolved placeholder with one located diagnostic.
pub(crate) fn unresolved<T: Clone + PartialEq>(
    name: &str,
    expected: ElementKind,
    code: DiagnosticCode,
    message: String,
    location: Option<&Location>,
) -> Binding<T> {
    Binding::Unresolved(BadElement::new(
        name,
        expected,
        vec![Diagnostic::new(code, message).at(location)],
    ))
}

/// Collapse a candidate list: none → `None`, one → plain, more → ambiguous.
pub(crate) fn bind_candidates<T: Clone + PartialEq>(
    name: &str,
    kind: ElementKind,
    mut candidates: Vec<T>,
) -> Option<Binding<T>> {
    match candidates.len() {
        0 => None,
        1 => candidates.pop().map(Binding::Resolved),
        _ => AmbiguousBinding::from_candidates(name, kind, candidates).map(Binding::Ambiguous),
    }
}

// =============================================================================
// NAME LOOKUP
// =============================================================================

impl SemanticModel {
    /// Rewrite `Alias.Name` into `Namespace.Name` if the prefix is an alias.
    fn dealias(&self, name: &str) -> Option<String> {
        let (prefix, simple) = split_full_name(name);
        self.aliases
            .get(prefix)
            .map(|namespace| full_name(namespace, simple))
    }

    /// The name with any schema alias replaced by its namespace.
    #[must_use]
    pub fn canonical_name(&self, name: &str) -> String {
        self.dealias(name).unwrap_or_else(|| name.to_string())
    }

    fn lookup<'a, T: Clone + PartialEq>(
        &self,
        map: &'a NameMap<T>,
        name: &str,
    ) -> Option<&'a Binding<T>> {
        map.find(name)
            .or_else(|| self.dealias(name).and_then(|canonical| map.find(&canonical)))
    }

    /// Find a schema type by qualified (or alias-qualified) name.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<&Binding<TypeId>> {
        self.lookup(&self.type_names, name)
    }

    #[must_use]
    pub fn find_term(&self, name: &str) -> Option<&Binding<TermId>> {
        self.lookup(&self.term_names, name)
    }

    #[must_use]
    pub fn find_association(&self, name: &str) -> Option<&Binding<AssociationId>> {
        self.lookup(&self.association_names, name)
    }

    /// Every schema operation overload named `name`.
    #[must_use]
    pub fn find_operations(&self, name: &str) -> &[OperationId] {
        let direct = self.operation_names.find_all(name);
        if !direct.is_empty() {
            return direct;
        }
        match self.dealias(name) {
            Some(canonical) => self.operation_names.find_all(&canonical),
            None => &[],
        }
    }

    /// Find an entity container by qualified name, or by simple name when
    /// the name has no namespace.
    #[must_use]
    pub fn find_entity_container(&self, name: &str) -> Option<Binding<ContainerId>> {
        if let Some(binding) = self.lookup(&self.container_names, name) {
            return Some(binding.clone());
        }
        if name.contains('.') {
            return None;
        }
        let candidates = self
            .container_ids()
            .filter(|id| self.container(*id).is_some_and(|c| c.name == name))
            .collect();
        bind_candidates(name, ElementKind::EntityContainer, candidates)
    }

    /// Entity set or singleton named `name` inside `container`.
    #[must_use]
    pub fn find_container_element(
        &self,
        container: ContainerId,
        name: &str,
    ) -> Option<&Binding<ContainerElementId>> {
        self.container(container)?.element_names.find(name)
    }

    /// Operation import overloads named `name` inside `container`.
    #[must_use]
    pub fn find_operation_imports(&self, container: ContainerId, name: &str) -> &[OperationId] {
        match self.container(container) {
            Some(def) => def.imports.find_all(name),
            None => &[],
        }
    }

    pub(crate) fn bind_type_name(
        &self,
        name: &str,
        location: Option<&Location>,
    ) -> Binding<TypeId> {
        self.find_type(name).cloned().unwrap_or_else(|| {
            unresolved(
                name,
                ElementKind::Type,
                DiagnosticCode::BadUnresolvedType,
                format!("The type '{name}' could not be found."),
                location,
            )
        })
    }

    pub(crate) fn bind_type_handle(
        &self,
        ty: TypeId,
        location: Option<&Location>,
    ) -> Binding<TypeId> {
        match self.type_def(ty) {
            Some(def) if !def.removed => Binding::Resolved(ty),
            Some(def) => {
                let name = def.full_name();
                unresolved(
                    &name,
                    ElementKind::Type,
                    DiagnosticCode::BadUnresolvedType,
                    format!("The type '{name}' has been removed from the model."),
                    location,
                )
            }
            None => unresolved(
                &format!("{ty:?}"),
                ElementKind::Type,
                DiagnosticCode::BadUnresolvedType,
                format!("The type handle {ty:?} does not belong to this model."),
                location,
            ),
        }
    }

    pub(crate) fn bind_type_reference(
        &self,
        reference: &Reference<TypeId>,
        location: Option<&Location>,
    ) -> Binding<TypeId> {
        match reference {
            Reference::Named(name) => self.bind_type_name(name, location),
            Reference::Bound(ty) => self.bind_type_handle(*ty, location),
        }
    }

    fn bind_property_handle(&self, property: PropertyId) -> Binding<PropertyId> {
        if self.property(property).is_some() {
            Binding::Resolved(property)
        } else {
            unresolved(
                &format!("{property:?}"),
                ElementKind::Property,
                DiagnosticCode::BadUnresolvedProperty,
                format!("The property handle {property:?} does not belong to this model."),
                None,
            )
        }
    }
}

// =============================================================================
// STRUCTURED TYPES
// =============================================================================

impl SemanticModel {
    /// The base type, `None` if the type declares none.
    ///
    /// A type whose base chain loops back to itself gets a
    /// `BadCyclicEntity`/`BadCyclicComplex` placeholder.
    pub fn base_type(&self, ty: TypeId) -> Option<Binding<TypeId>> {
        let def = self.type_def(ty)?;
        def.base_cache.get_value(
            self,
            |model| model.compute_base_type(ty),
            |model| model.cyclic_base_type(ty),
        )
    }

    fn compute_base_type(&self, ty: TypeId) -> Option<Binding<TypeId>> {
        let def = self.type_def(ty)?;
        let binding = self.bind_type_reference(def.base.as_ref()?, def.location());
        let Some(members) = self.base_cycle(ty, binding.resolved().copied()) else {
            return Some(binding);
        };
        // Every member of the cycle shares the placeholder; settle them now so
        // later reads do not walk the cycle again.
        for member in members {
            if let Some(member_def) = self.type_def(member) {
                let _settled = member_def.base_cache.get_value(
                    self,
                    |model| model.cyclic_base_type(member),
                    |model| model.cyclic_base_type(member),
                );
            }
        }
        self.cyclic_base_type(ty)
    }

    /// The other members of the base-type cycle through `ty`, or `None` if
    /// the chain starting at `start` never comes back to `ty`.
    ///
    /// Walks declared bases in a loop, so chain depth costs no stack.
    fn base_cycle(&self, ty: TypeId, start: Option<TypeId>) -> Option<Vec<TypeId>> {
        let mut members = Vec::new();
        let mut visited = BTreeSet::new();
        let mut current = start;
        while let Some(base) = current {
            if base == ty {
                return Some(members);
            }
            if !visited.insert(base) {
                return None;
            }
            // A settled non-cyclic base cannot lead back to `ty`.
            let settled = self.type_def(base).and_then(|def| def.base_cache.peek());
            if matches!(settled, Some(None | Some(Binding::Resolved(_)))) {
                return None;
            }
            members.push(base);
            current = self.declared_base(base);
        }
        None
    }

    fn declared_base(&self, ty: TypeId) -> Option<TypeId> {
        let def = self.type_def(ty)?;
        self.bind_type_reference(def.base.as_ref()?, None)
            .resolved()
            .copied()
    }

    fn cyclic_base_type(&self, ty: TypeId) -> Option<Binding<TypeId>> {
        let def = self.type_def(ty)?;
        let name = def.full_name();
        let code = match def.kind {
            TypeKind::Complex => DiagnosticCode::BadCyclicComplex,
            _ => DiagnosticCode::BadCyclicEntity,
        };
        tracing::trace!(ty = %name, "cyclic base type");
        Some(unresolved(
            &name,
            ElementKind::Type,
            code,
            format!("The base type of '{name}' is part of a cycle."),
            def.location(),
        ))
    }

    /// Resolved ancestors, nearest first. Stops at the first placeholder.
    #[must_use]
    pub fn ancestors(&self, ty: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut visited = BTreeSet::from([ty]);
        let mut current = ty;
        while let Some(base) = self.base_type(current).and_then(|b| b.resolved().copied()) {
            if !visited.insert(base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Key properties. Entity types without a `<Key>` inherit their base
    /// type's key when `inherit_keys` is set.
    pub fn key(&self, ty: TypeId) -> Vec<Binding<PropertyId>> {
        let Some(def) = self.type_def(ty) else {
            return Vec::new();
        };
        def.key_cache
            .get_value(self, |model| model.compute_key(ty), |_| Vec::new())
    }

    fn compute_key(&self, ty: TypeId) -> Vec<Binding<PropertyId>> {
        let Some(def) = self.type_def(ty) else {
            return Vec::new();
        };
        if def.kind != TypeKind::Entity {
            return Vec::new();
        }
        match &def.declared_key {
            Some(key) => key
                .iter()
                .map(|reference| match reference {
                    Reference::Named(name) => self.find_property(ty, name).unwrap_or_else(|| {
                        unresolved(
                            name,
                            ElementKind::Property,
                            DiagnosticCode::BadUnresolvedProperty,
                            format!(
                                "The key property '{name}' is not declared on '{}'.",
                                def.full_name()
                            ),
                            def.location(),
                        )
                    }),
                    Reference::Bound(property) => self.bind_property_handle(*property),
                })
                .collect(),
            None if self.settings.inherit_keys => self
                .ancestors(ty)
                .into_iter()
                .take_while(|ancestor| {
                    self.type_def(*ancestor)
                        .is_some_and(|def| def.kind == TypeKind::Entity)
                })
                .find(|ancestor| {
                    self.type_def(*ancestor)
                        .is_some_and(|def| def.declared_key.is_some())
                })
                .map(|ancestor| self.key(ancestor))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Find a property declared on `ty` or inherited from its ancestors.
    #[must_use]
    pub fn find_property(&self, ty: TypeId, name: &str) -> Option<Binding<PropertyId>> {
        std::iter::once(ty)
            .chain(self.ancestors(ty))
            .find_map(|current| self.type_def(current)?.property_names.find(name).cloned())
    }

    /// All properties of `ty`, inherited ones first.
    #[must_use]
    pub fn properties(&self, ty: TypeId) -> Vec<PropertyId> {
        let mut lineage = self.ancestors(ty);
        lineage.reverse();
        lineage.push(ty);
        lineage
            .into_iter()
            .filter_map(|current| self.type_def(current))
            .flat_map(|def| def.properties.iter().copied())
            .collect()
    }

    /// `true` if `ty` is `ancestor` or derives from it.
    #[must_use]
    pub fn is_or_derives_from(&self, ty: TypeId, ancestor: TypeId) -> bool {
        ty == ancestor || self.ancestors(ty).contains(&ancestor)
    }
}

// =============================================================================
// PROPERTIES
// =============================================================================

impl SemanticModel {
    /// The type a property is declared on. Silent partners report the
    /// target of the navigation they mirror.
    #[must_use]
    pub fn declaring_type(&self, property: PropertyId) -> Option<TypeId> {
        let def = self.property(property)?;
        def.declaring_type.or_else(|| {
            let partner = self.partner(property)?;
            self.navigation_target(partner)?.resolved().copied()
        })
    }

    /// Type of a structural property. `None` for navigation properties.
    pub fn property_type(&self, property: PropertyId) -> Option<TypeReference> {
        let def = self.property(property)?;
        let PropertyKind::Structural(structural) = &def.kind else {
            return None;
        };
        let resolve = |model: &Self| {
            model.resolve_type_reference(&structural.type_ref, structural.nullable, def.location())
        };
        Some(structural.type_cache.get_value(self, resolve, resolve))
    }

    /// The reciprocal navigation property.
    #[must_use]
    pub fn partner(&self, property: PropertyId) -> Option<PropertyId> {
        match &self.property(property)?.kind {
            PropertyKind::Navigation(navigation) => navigation.partner,
            PropertyKind::Structural(_) => None,
        }
    }

    /// The association a navigation property was declared against.
    pub fn navigation_association(&self, property: PropertyId) -> Option<Binding<AssociationId>> {
        let def = self.property(property)?;
        let PropertyKind::Navigation(navigation) = &def.kind else {
            return None;
        };
        navigation.association_cache.get_value(
            self,
            |model| model.compute_navigation_association(property),
            |_| None,
        )
    }

    fn compute_navigation_association(
        &self,
        property: PropertyId,
    ) -> Option<Binding<AssociationId>> {
        let def = self.property(property)?;
        let PropertyKind::Navigation(navigation) = &def.kind else {
            return None;
        };
        let NavigationEnd::Role { relationship, .. } = &navigation.end else {
            return None;
        };
        Some(self.find_association(relationship).cloned().unwrap_or_else(|| {
            unresolved(
                relationship,
                ElementKind::Association,
                DiagnosticCode::BadUnresolvedAssociation,
                format!("The association '{relationship}' could not be found."),
                def.location(),
            )
        }))
    }

    /// The entity type a navigation property leads to.
    pub fn navigation_target(&self, property: PropertyId) -> Option<Binding<TypeId>> {
        let def = self.property(property)?;
        let PropertyKind::Navigation(navigation) = &def.kind else {
            return None;
        };
        Some(navigation.target_cache.get_value(
            self,
            |model| model.compute_navigation_target(property),
            |_| {
                unresolved(
                    &def.name,
                    ElementKind::Type,
                    DiagnosticCode::BadUnresolvedType,
                    format!("The target of navigation property '{}' is part of a cycle.", def.name),
                    def.location(),
                )
            },
        ))
    }

    fn compute_navigation_target(&self, property: PropertyId) -> Binding<TypeId> {
        let Some(def) = self.property(property) else {
            return self.bind_property_target_missing(property);
        };
        let PropertyKind::Navigation(navigation) = &def.kind else {
            return self.bind_property_target_missing(property);
        };
        match &navigation.end {
            NavigationEnd::Direct { target, .. } => self.bind_type_handle(*target, def.location()),
            NavigationEnd::Role {
                relationship,
                to_role,
                ..
            } => {
                let Some(association) = self.navigation_association(property) else {
                    return self.bind_property_target_missing(property);
                };
                match association.resolved().copied() {
                    Some(id) => self.end_type(id, to_role).unwrap_or_else(|| {
                        unresolved(
                            to_role,
                            ElementKind::AssociationEnd,
                            DiagnosticCode::BadUnresolvedEnd,
                            format!(
                                "The association '{relationship}' has no end named '{to_role}'."
                            ),
                            def.location(),
                        )
                    }),
                    // Same defect as the association itself.
                    None => Binding::Unresolved(BadElement::new(
                        relationship.as_str(),
                        ElementKind::Type,
                        association.errors().to_vec(),
                    )),
                }
            }
        }
    }

    fn bind_property_target_missing(&self, property: PropertyId) -> Binding<TypeId> {
        unresolved(
            &format!("{property:?}"),
            ElementKind::NavigationProperty,
            DiagnosticCode::BadUnresolvedProperty,
            format!("{property:?} is not a navigation property of this model."),
            None,
        )
    }

    /// Multiplicity of the navigation target end.
    #[must_use]
    pub fn navigation_multiplicity(&self, property: PropertyId) -> Option<Multiplicity> {
        let PropertyKind::Navigation(navigation) = &self.property(property)?.kind else {
            return None;
        };
        match &navigation.end {
            NavigationEnd::Direct { multiplicity, .. } => Some(*multiplicity),
            NavigationEnd::Role { to_role, .. } => {
                let association = self.navigation_association(property)?;
                let id = association.resolved().copied()?;
                Some(self.association(id)?.end(to_role)?.multiplicity)
            }
        }
    }

    /// Dependent (foreign key) properties, aligned with the principal key.
    ///
    /// `None` when the navigation carries no dependent-property list.
    pub fn dependent_properties(&self, property: PropertyId) -> Option<Vec<Binding<PropertyId>>> {
        let PropertyKind::Navigation(navigation) = &self.property(property)?.kind else {
            return None;
        };
        navigation.dependent_cache.get_value(
            self,
            |model| model.compute_dependent_properties(property),
            |_| None,
        )
    }

    fn compute_dependent_properties(
        &self,
        property: PropertyId,
    ) -> Option<Vec<Binding<PropertyId>>> {
        let PropertyKind::Navigation(navigation) = &self.property(property)?.kind else {
            return None;
        };
        match &navigation.end {
            NavigationEnd::Direct { .. } => navigation.dependent.as_ref().map(|ids| {
                ids.iter()
                    .map(|id| self.bind_property_handle(*id))
                    .collect()
            }),
            NavigationEnd::Role { from_role, .. } => {
                let association = self.navigation_association(property)?;
                let id = association.resolved().copied()?;
                let constraint = self.association(id)?.constraint.as_ref()?;
                if constraint.dependent_role != *from_role {
                    return None;
                }
                self.referential_constraint(id)
            }
        }
    }

    /// A navigation end is principal when it has no dependent properties
    /// while its partner does.
    #[must_use]
    pub fn is_principal(&self, property: PropertyId) -> bool {
        self.dependent_properties(property).is_none()
            && self
                .partner(property)
                .is_some_and(|partner| self.dependent_properties(partner).is_some())
    }

    /// Type of an association end.
    pub fn end_type(&self, association: AssociationId, role: &str) -> Option<Binding<TypeId>> {
        let def = self.association(association)?;
        let end = def.end(role)?;
        Some(end.type_cache.get_value(
            self,
            |model| model.bind_type_reference(&end.type_ref, def.location()),
            |model| model.bind_type_reference(&end.type_ref, def.location()),
        ))
    }
}

// =============================================================================
// TERMS, OPERATIONS, CONTAINERS
// =============================================================================

impl SemanticModel {
    /// Value type of a term.
    pub fn term_type(&self, term: TermId) -> Option<TypeReference> {
        let def = self.term(term)?;
        let resolve = |model: &Self| {
            model.resolve_type_reference(&def.type_ref, def.nullable, def.location())
        };
        Some(def.type_cache.get_value(self, resolve, resolve))
    }

    /// Type of the parameter at `index`.
    pub fn parameter_type(&self, operation: OperationId, index: usize) -> Option<TypeReference> {
        let def = self.operation(operation)?;
        let parameter = def.parameters.get(index)?;
        let resolve = |model: &Self| {
            model.resolve_type_reference(&parameter.type_ref, parameter.nullable, def.location())
        };
        Some(parameter.type_cache.get_value(self, resolve, resolve))
    }

    /// Return type, `None` for operations without one.
    pub fn return_type(&self, operation: OperationId) -> Option<TypeReference> {
        let def = self.operation(operation)?;
        let resolve = |model: &Self| {
            def.return_type
                .as_ref()
                .map(|reference| model.resolve_type_reference(reference, true, def.location()))
        };
        def.return_cache.get_value(self, resolve, resolve)
    }

    /// Entity type of an entity set or singleton.
    pub fn element_type(&self, element: ContainerElementId) -> Option<Binding<TypeId>> {
        let def = self.container_element(element)?;
        let resolve = |model: &Self| model.bind_type_reference(&def.entity_type, def.location());
        Some(def.type_cache.get_value(self, resolve, resolve))
    }
}

// =============================================================================
// DIRECT ANNOTATIONS
// =============================================================================

impl SemanticModel {
    #[must_use]
    pub fn get_annotation(&self, element: ElementKey, namespace: &str, name: &str) -> Option<&str> {
        self.annotations.get_annotation(element, namespace, name)
    }

    /// Write (`Some`) or remove (`None`) a transient annotation.
    pub fn set_annotation(
        &mut self,
        element: ElementKey,
        namespace: &str,
        name: &str,
        value: Option<String>,
    ) -> Result<(), EdmError> {
        if !self.contains(element) {
            return Err(EdmError::UnknownElement(element));
        }
        if namespace.is_empty() || name.is_empty() {
            return Err(EdmError::InvalidName(format!("{namespace}:{name}")));
        }
        self.annotations.set_annotation(element, namespace, name, value)
    }

    /// Merged baseline and transient annotations of `element`.
    #[must_use]
    pub fn annotations(&self, element: ElementKey) -> Vec<DirectAnnotation> {
        self.annotations.annotations(element)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csdl::{CsdlComplexType, CsdlEntityType, CsdlProperty, CsdlSchema};
    use crate::model::TypeDefinition;
    use crate::primitives::PrimitiveKind;
    use crate::settings::ModelSettings;

    fn entity(name: &str, base: Option<&str>) -> CsdlEntityType {
        let mut ty = CsdlEntityType::new(name);
        ty.base_type = base.map(str::to_string);
        ty
    }

    fn bind(schema: CsdlSchema) -> SemanticModel {
        SemanticModel::from_schemas(&[schema], ModelSettings::default())
    }

    fn type_id(model: &SemanticModel, name: &str) -> TypeId {
        *model
            .find_type(name)
            .and_then(Binding::resolved)
            .expect("type registered")
    }

    #[test]
    fn base_type_cycle_yields_cyclic_placeholder() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![entity("A", Some("NS.B")), entity("B", Some("NS.A"))];
        let model = bind(schema);

        for name in ["NS.A", "NS.B"] {
            let base = model.base_type(type_id(&model, name)).expect("declared base");
            assert!(base.is_bad());
            assert_eq!(base.errors()[0].code, DiagnosticCode::BadCyclicEntity);
        }
    }

    #[test]
    fn complex_cycle_uses_complex_code() {
        let mut schema = CsdlSchema::new("NS");
        schema.complex_types = vec![CsdlComplexType {
            name: "Loop".to_string(),
            base_type: Some("NS.Loop".to_string()),
            ..CsdlComplexType::default()
        }];
        let model = bind(schema);
        let base = model.base_type(type_id(&model, "NS.Loop")).expect("declared base");
        assert_eq!(base.errors()[0].code, DiagnosticCode::BadCyclicComplex);
    }

    #[test]
    fn type_hanging_off_a_cycle_keeps_its_base() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            entity("A", Some("NS.B")),
            entity("B", Some("NS.A")),
            entity("C", Some("NS.A")),
        ];
        let model = bind(schema);
        let c = type_id(&model, "NS.C");
        let a = type_id(&model, "NS.A");
        assert_eq!(model.base_type(c), Some(Binding::Resolved(a)));
        assert_eq!(model.ancestors(c), vec![a]);
    }

    #[test]
    fn key_is_inherited_from_base() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            CsdlEntityType::new("Base")
                .with_key(["Id"])
                .with_property(CsdlProperty::new("Id", "Edm.Int32").not_null()),
            entity("Derived", Some("NS.Base")),
        ];
        let model = bind(schema);
        let derived = type_id(&model, "NS.Derived");
        let key = model.key(derived);
        assert_eq!(key.len(), 1);
        let id = *key[0].resolved().expect("resolved key");
        assert_eq!(model.property(id).expect("property").name(), "Id");
        assert_eq!(model.properties(derived), vec![id]);

        let settings = ModelSettings {
            inherit_keys: false,
            ..ModelSettings::default()
        };
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            CsdlEntityType::new("Base").with_key(["Id"]),
            entity("Derived", Some("NS.Base")),
        ];
        let strict = SemanticModel::from_schemas(&[schema], settings);
        assert!(strict.key(type_id(&strict, "NS.Derived")).is_empty());
    }

    #[test]
    fn missing_key_property_is_a_placeholder() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![CsdlEntityType::new("Order").with_key(["Nope"])];
        let model = bind(schema);
        let key = model.key(type_id(&model, "NS.Order"));
        assert_eq!(key[0].errors()[0].code, DiagnosticCode::BadUnresolvedProperty);
    }

    #[test]
    fn alias_qualified_names_resolve() {
        let mut schema = CsdlSchema::new("Org.Sales");
        schema.alias = Some("S".to_string());
        schema.entity_types = vec![
            CsdlEntityType::new("Order")
                .with_property(CsdlProperty::new("Line", "S.Line")),
            CsdlEntityType::new("Line"),
        ];
        let model = bind(schema);
        let line = type_id(&model, "Org.Sales.Line");
        assert_eq!(model.find_type("S.Line"), Some(&Binding::Resolved(line)));
        assert_eq!(model.canonical_name("S.Line"), "Org.Sales.Line");

        let order = type_id(&model, "S.Order");
        let property = *model
            .find_property(order, "Line")
            .as_ref()
            .and_then(Binding::resolved)
            .expect("property");
        assert_eq!(model.property_type(property).and_then(|t| t.schema_type()), Some(line));
    }

    #[test]
    fn property_types_resolve_primitives_first() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![CsdlEntityType::new("Order")
            .with_property(CsdlProperty::new("Id", "Edm.Int32").not_null())
            .with_property(CsdlProperty::new("Tags", "Collection(Edm.String)"))
            .with_property(CsdlProperty::new("Broken", "NS.Missing"))];
        let model = bind(schema);
        let order = type_id(&model, "NS.Order");
        let properties = model.properties(order);
        assert_eq!(properties.len(), 3);
        let (id, tags, broken) = (properties[0], properties[1], properties[2]);

        let id_type = model.property_type(id).expect("structural");
        assert_eq!(id_type.definition(), &TypeDefinition::Primitive(PrimitiveKind::Int32));
        assert!(!id_type.nullable());
        assert!(model.property_type(tags).expect("structural").is_collection());
        assert_eq!(
            model.property_type(broken).expect("structural").errors()[0].code,
            DiagnosticCode::BadUnresolvedType
        );
    }

    #[test]
    fn duplicate_property_names_are_ambiguous() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![CsdlEntityType::new("Order")
            .with_property(CsdlProperty::new("Id", "Edm.Int32"))
            .with_property(CsdlProperty::new("Id", "Edm.String"))];
        let model = bind(schema);
        let binding = model
            .find_property(type_id(&model, "NS.Order"), "Id")
            .expect("registered");
        assert!(binding.is_ambiguous());
        assert_eq!(binding.candidates().len(), 2);
    }

    #[test]
    fn annotation_writes_require_known_elements() {
        let mut model = bind(CsdlSchema::new("NS"));
        let result = model.set_annotation(ElementKey::Type(TypeId(0)), "urn:x", "doc", None);
        assert!(matches!(result, Err(EdmError::UnknownElement(_))));
    }
}
