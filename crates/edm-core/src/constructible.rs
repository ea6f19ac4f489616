//! # Constructible Model
//!
//! A `SemanticModel` built element by element through setters instead of
//! from CSDL documents.
//!
//! Every setter is routed through the `DependencyGraph`: it writes the field,
//! installs an edge when the new value refers to another element, then
//! flushes the memoized values of the written element and of everything that
//! transitively depends on it. Derived values are recomputed on the next
//! read, so no stale value is ever observable.
//!
//! Cross-references are always handles (`Reference::Bound`), never names.

use crate::cache::Cache;
use crate::dependency::DependencyGraph;
use crate::model::{
    ContainerDef, ContainerElementKind, NavigationEnd, NavigationHalf, OperationDef,
    OperationScope, ParameterDef, PropertyKind, Reference, SemanticModel, StructuralDef, TermDef,
    TypeDef, TypeDefinition, TypeKind, TypeReference,
};
use crate::settings::ModelSettings;
use crate::types::{
    ContainerElementId, ContainerId, EdmError, ElementKey, Multiplicity, OperationId,
    OperationKind, PropertyId, TermId, TypeId,
};
use tracing::debug;

/// Mutable model with push invalidation.
#[derive(Debug)]
pub struct ConstructibleModel {
    model: SemanticModel,
    dependencies: DependencyGraph<ElementKey>,
}

impl ConstructibleModel {
    #[must_use]
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            model: SemanticModel::new(settings),
            dependencies: DependencyGraph::new(),
        }
    }

    /// Read access to the model and all of its lazy semantics.
    #[must_use]
    pub fn model(&self) -> &SemanticModel {
        &self.model
    }

    /// Stop construction and keep the model.
    #[must_use]
    pub fn into_model(self) -> SemanticModel {
        self.model
    }

    #[must_use]
    pub fn dependencies(&self) -> &DependencyGraph<ElementKey> {
        &self.dependencies
    }

    fn require(&self, key: ElementKey) -> Result<(), EdmError> {
        if self.model.contains(key) {
            Ok(())
        } else {
            Err(EdmError::UnknownElement(key))
        }
    }

    fn require_structured(&self, ty: TypeId) -> Result<(), EdmError> {
        match self.model.type_def(ty) {
            Some(def) if def.is_structured() => Ok(()),
            Some(_) => Err(EdmError::NotStructured(ty)),
            None => Err(EdmError::UnknownElement(ElementKey::Type(ty))),
        }
    }

    /// Flush `trigger` and its dependents without writing anything.
    fn invalidate(&mut self, trigger: ElementKey) -> Vec<ElementKey> {
        self.dependencies.set_field(
            &mut self.model,
            trigger,
            |_| None,
            |model, key| model.flush_element(key),
        )
    }

    /// Install `trigger → dependent` for every schema type `reference` names.
    fn depend_on_types(&mut self, reference: &TypeReference, dependent: ElementKey) {
        for ty in schema_types(reference) {
            self.dependencies.add_dependency(ElementKey::Type(ty), dependent);
        }
    }
}

/// Schema types named anywhere inside a type reference.
fn schema_types(reference: &TypeReference) -> Vec<TypeId> {
    match reference.definition() {
        TypeDefinition::Primitive(_) => Vec::new(),
        TypeDefinition::Schema(binding) => binding.resolved().copied().into_iter().collect(),
        TypeDefinition::Collection(element) | TypeDefinition::EntityReference(element) => {
            schema_types(element)
        }
    }
}

fn check_name(name: &str) -> Result<(), EdmError> {
    if name.is_empty() || name.contains('.') {
        return Err(EdmError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn check_namespace(namespace: &str) -> Result<(), EdmError> {
    if namespace.is_empty() || namespace.split('.').any(str::is_empty) {
        return Err(EdmError::InvalidName(namespace.to_string()));
    }
    Ok(())
}

// =============================================================================
// TYPES
// =============================================================================

impl ConstructibleModel {
    pub fn add_entity_type(&mut self, namespace: &str, name: &str) -> Result<TypeId, EdmError> {
        self.add_type(namespace, name, TypeKind::Entity)
    }

    pub fn add_complex_type(&mut self, namespace: &str, name: &str) -> Result<TypeId, EdmError> {
        self.add_type(namespace, name, TypeKind::Complex)
    }

    fn add_type(
        &mut self,
        namespace: &str,
        name: &str,
        kind: TypeKind,
    ) -> Result<TypeId, EdmError> {
        check_namespace(namespace)?;
        check_name(name)?;
        let id = self.model.alloc_type(TypeDef::new(namespace, name, kind));
        debug!(ty = ?id, namespace, name, "added type");
        Ok(id)
    }

    /// Set or clear the base type.
    ///
    /// The type (and everything depending on it, such as derived types and
    /// their inherited keys) is flushed. Returns the flushed elements.
    pub fn set_base_type(
        &mut self,
        ty: TypeId,
        base: Option<TypeId>,
    ) -> Result<Vec<ElementKey>, EdmError> {
        self.require_structured(ty)?;
        if let Some(base) = base {
            self.require_structured(base)?;
        }
        let trigger = ElementKey::Type(ty);

        let previous = self
            .model
            .type_def(ty)
            .and_then(|def| match def.base {
                Some(Reference::Bound(old)) => Some(old),
                _ => None,
            });
        if let Some(old) = previous {
            self.dependencies.remove_dependency(ElementKey::Type(old), trigger);
        }

        Ok(self.dependencies.set_field(
            &mut self.model,
            trigger,
            |model| {
                let def = model.types.get_mut(ty.index())?;
                def.base = base.map(Reference::Bound);
                base.map(ElementKey::Type)
            },
            |model, key| model.flush_element(key),
        ))
    }

    pub fn set_abstract(
        &mut self,
        ty: TypeId,
        is_abstract: bool,
    ) -> Result<Vec<ElementKey>, EdmError> {
        self.require_structured(ty)?;
        Ok(self.dependencies.set_field(
            &mut self.model,
            ElementKey::Type(ty),
            |model| {
                if let Some(def) = model.types.get_mut(ty.index()) {
                    def.is_abstract = is_abstract;
                }
                None
            },
            |model, key| model.flush_element(key),
        ))
    }

    /// Remove a type from the name registry.
    ///
    /// The handle stays valid, but every element that still refers to it now
    /// resolves to a `BadUnresolvedType` placeholder.
    pub fn remove_type(&mut self, ty: TypeId) -> Result<Vec<ElementKey>, EdmError> {
        let def = self
            .model
            .type_def(ty)
            .ok_or(EdmError::UnknownElement(ElementKey::Type(ty)))?;
        let name = def.full_name();
        self.model.type_names.unregister(&name, &ty);
        debug!(ty = %name, "removed type");

        Ok(self.dependencies.set_field(
            &mut self.model,
            ElementKey::Type(ty),
            |model| {
                if let Some(def) = model.types.get_mut(ty.index()) {
                    def.removed = true;
                }
                None
            },
            |model, key| model.flush_element(key),
        ))
    }
}

// =============================================================================
// PROPERTIES
// =============================================================================

impl ConstructibleModel {
    pub fn add_structural_property(
        &mut self,
        ty: TypeId,
        name: &str,
        type_ref: TypeReference,
    ) -> Result<PropertyId, EdmError> {
        self.require_structured(ty)?;
        check_name(name)?;
        let nullable = type_ref.nullable();
        let dependent_types = schema_types(&type_ref);
        let id = self.model.alloc_structural(
            ty,
            name,
            StructuralDef {
                type_ref: Reference::Bound(type_ref),
                nullable,
                default_value: None,
                type_cache: Cache::new(),
            },
            None,
        );
        for target in dependent_types {
            self.dependencies
                .add_dependency(ElementKey::Type(target), ElementKey::Property(id));
        }
        self.invalidate(ElementKey::Type(ty));
        Ok(id)
    }

    /// Declare the key of an entity type. Derived types without their own
    /// key see the change on their next read.
    pub fn set_key(
        &mut self,
        ty: TypeId,
        key: Vec<PropertyId>,
    ) -> Result<Vec<ElementKey>, EdmError> {
        self.require_structured(ty)?;
        for property in &key {
            self.require(ElementKey::Property(*property))?;
        }
        Ok(self.dependencies.set_field(
            &mut self.model,
            ElementKey::Type(ty),
            |model| {
                if let Some(def) = model.types.get_mut(ty.index()) {
                    def.declared_key = Some(key.into_iter().map(Reference::Bound).collect());
                }
                None
            },
            |model, element| model.flush_element(element),
        ))
    }

    /// Create a navigation property on `source` together with its partner on
    /// `target`. Partners can only be created as a pair.
    pub fn add_navigation_pair(
        &mut self,
        source: TypeId,
        name: &str,
        target: TypeId,
        multiplicity: Multiplicity,
        partner_name: &str,
        partner_multiplicity: Multiplicity,
    ) -> Result<(PropertyId, PropertyId), EdmError> {
        self.require_structured(source)?;
        self.require_structured(target)?;
        check_name(name)?;
        check_name(partner_name)?;

        let half = |declaring: TypeId, name: &str, target: TypeId, multiplicity: Multiplicity| {
            NavigationHalf {
                declaring_type: Some(declaring),
                name: name.to_string(),
                end: NavigationEnd::Direct {
                    target,
                    multiplicity,
                },
                silent: false,
                location: None,
            }
        };
        let (navigation, partner) = self.model.alloc_navigation_pair(
            half(source, name, target, multiplicity),
            half(target, partner_name, source, partner_multiplicity),
        );

        let nav_key = ElementKey::Property(navigation);
        let partner_key = ElementKey::Property(partner);
        self.dependencies.add_dependency(nav_key, partner_key);
        self.dependencies.add_dependency(partner_key, nav_key);
        self.dependencies.add_dependency(ElementKey::Type(target), nav_key);
        self.dependencies.add_dependency(ElementKey::Type(source), partner_key);

        self.invalidate(ElementKey::Type(source));
        self.invalidate(ElementKey::Type(target));
        debug!(?navigation, ?partner, "added navigation pair");
        Ok((navigation, partner))
    }

    /// Set (or clear) the dependent properties of a navigation property,
    /// which makes its partner the principal end.
    pub fn set_dependent_properties(
        &mut self,
        navigation: PropertyId,
        dependent: Option<Vec<PropertyId>>,
    ) -> Result<Vec<ElementKey>, EdmError> {
        let def = self
            .model
            .property(navigation)
            .ok_or(EdmError::UnknownElement(ElementKey::Property(navigation)))?;
        if !def.is_navigation() {
            return Err(EdmError::NotNavigation(navigation));
        }
        for property in dependent.iter().flatten() {
            self.require(ElementKey::Property(*property))?;
        }
        Ok(self.dependencies.set_field(
            &mut self.model,
            ElementKey::Property(navigation),
            |model| {
                if let Some(PropertyKind::Navigation(nav)) = model
                    .properties
                    .get_mut(navigation.index())
                    .map(|def| &mut def.kind)
                {
                    nav.dependent = dependent;
                }
                None
            },
            |model, key| model.flush_element(key),
        ))
    }
}

// =============================================================================
// TERMS, OPERATIONS, CONTAINERS
// =============================================================================

impl ConstructibleModel {
    pub fn add_term(
        &mut self,
        namespace: &str,
        name: &str,
        type_ref: TypeReference,
    ) -> Result<TermId, EdmError> {
        check_namespace(namespace)?;
        check_name(name)?;
        let nullable = type_ref.nullable();
        let dependent_types = schema_types(&type_ref);
        let id = self.model.alloc_term(TermDef {
            namespace: namespace.to_string(),
            name: name.to_string(),
            type_ref: Reference::Bound(type_ref),
            nullable,
            location: None,
            type_cache: Cache::new(),
        });
        for ty in dependent_types {
            self.dependencies
                .add_dependency(ElementKey::Type(ty), ElementKey::Term(id));
        }
        Ok(id)
    }

    /// Add a schema-level action or function. Overloads share `name`.
    pub fn add_operation(
        &mut self,
        namespace: &str,
        name: &str,
        kind: OperationKind,
        parameters: Vec<(String, TypeReference)>,
        return_type: Option<TypeReference>,
    ) -> Result<OperationId, EdmError> {
        check_namespace(namespace)?;
        check_name(name)?;
        for (parameter, _) in &parameters {
            check_name(parameter)?;
        }

        let referenced: Vec<TypeReference> = parameters
            .iter()
            .map(|(_, reference)| reference.clone())
            .chain(return_type.iter().cloned())
            .collect();
        let id = self.model.alloc_operation(OperationDef {
            scope: OperationScope::Schema {
                namespace: namespace.to_string(),
            },
            name: name.to_string(),
            kind,
            is_bound: false,
            parameters: parameters
                .into_iter()
                .map(|(parameter, reference)| {
                    let nullable = reference.nullable();
                    ParameterDef::new(&parameter, Reference::Bound(reference), nullable)
                })
                .collect(),
            return_type: return_type.map(Reference::Bound),
            entity_set: None,
            location: None,
            return_cache: Cache::new(),
        });
        for reference in &referenced {
            self.depend_on_types(reference, ElementKey::Operation(id));
        }
        Ok(id)
    }

    pub fn add_entity_container(
        &mut self,
        namespace: &str,
        name: &str,
    ) -> Result<ContainerId, EdmError> {
        check_namespace(namespace)?;
        check_name(name)?;
        Ok(self
            .model
            .alloc_container(ContainerDef::new(namespace, name, None)))
    }

    pub fn add_entity_set(
        &mut self,
        container: ContainerId,
        name: &str,
        entity_type: TypeId,
    ) -> Result<ContainerElementId, EdmError> {
        self.add_container_element(container, name, ContainerElementKind::EntitySet, entity_type)
    }

    pub fn add_singleton(
        &mut self,
        container: ContainerId,
        name: &str,
        entity_type: TypeId,
    ) -> Result<ContainerElementId, EdmError> {
        self.add_container_element(container, name, ContainerElementKind::Singleton, entity_type)
    }

    fn add_container_element(
        &mut self,
        container: ContainerId,
        name: &str,
        kind: ContainerElementKind,
        entity_type: TypeId,
    ) -> Result<ContainerElementId, EdmError> {
        self.require(ElementKey::Container(container))?;
        self.require(ElementKey::Type(entity_type))?;
        check_name(name)?;
        let id = self.model.alloc_container_element(
            container,
            name,
            kind,
            Reference::Bound(entity_type),
            None,
        );
        self.dependencies.add_dependency(
            ElementKey::Type(entity_type),
            ElementKey::ContainerElement(id),
        );
        Ok(id)
    }

    /// Write (`Some`) or remove (`None`) a transient annotation.
    pub fn set_annotation(
        &mut self,
        element: ElementKey,
        namespace: &str,
        name: &str,
        value: Option<String>,
    ) -> Result<(), EdmError> {
        self.model.set_annotation(element, namespace, name, value)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Binding;
    use crate::cache::CacheStatus;
    use crate::primitives::PrimitiveKind;
    use crate::types::DiagnosticCode;

    fn int32() -> TypeReference {
        TypeReference::primitive(PrimitiveKind::Int32, false)
    }

    fn key_names(model: &SemanticModel, ty: TypeId) -> Vec<String> {
        model
            .key(ty)
            .iter()
            .filter_map(|b| b.resolved().copied())
            .filter_map(|id| model.property(id).map(|p| p.name().to_string()))
            .collect()
    }

    #[test]
    fn key_change_reaches_derived_types() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let a = builder.add_entity_type("NS", "A").expect("A");
        let b = builder.add_entity_type("NS", "B").expect("B");
        let c = builder.add_entity_type("NS", "C").expect("C");
        let id = builder.add_structural_property(a, "Id", int32()).expect("Id");
        let other = builder.add_structural_property(a, "Other", int32()).expect("Other");
        builder.set_key(a, vec![id]).expect("key");
        builder.set_base_type(b, Some(a)).expect("B : A");
        builder.set_base_type(c, Some(b)).expect("C : B");

        assert_eq!(key_names(builder.model(), c), vec!["Id"]);

        let flushed = builder.set_key(a, vec![other]).expect("rekey");
        assert_eq!(
            flushed,
            vec![ElementKey::Type(a), ElementKey::Type(b), ElementKey::Type(c)]
        );
        assert_eq!(key_names(builder.model(), c), vec!["Other"]);
    }

    #[test]
    fn breaking_a_base_cycle_clears_settled_members() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let a = builder.add_entity_type("NS", "A").expect("A");
        let b = builder.add_entity_type("NS", "B").expect("B");
        builder.set_base_type(a, Some(b)).expect("A : B");
        builder.set_base_type(b, Some(a)).expect("B : A");

        // Reading one member settles the other.
        let cyclic = builder.model().base_type(a).expect("base");
        assert_eq!(cyclic.errors()[0].code, DiagnosticCode::BadCyclicEntity);
        assert!(builder.model().type_def(b).expect("B").base_cache.peek().is_some());

        let flushed = builder.set_base_type(b, None).expect("B");
        assert_eq!(flushed, vec![ElementKey::Type(b), ElementKey::Type(a)]);
        assert_eq!(builder.model().base_type(a), Some(Binding::Resolved(b)));
        assert_eq!(builder.model().base_type(b), None);
    }

    #[test]
    fn flush_resets_cache_without_recomputing() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let a = builder.add_entity_type("NS", "A").expect("A");
        let b = builder.add_entity_type("NS", "B").expect("B");
        builder.set_base_type(b, Some(a)).expect("B : A");

        let _ = builder.model().key(b);
        let status = |builder: &ConstructibleModel| {
            builder.model().type_def(b).expect("B").key_cache.status()
        };
        assert_eq!(status(&builder), CacheStatus::Done);

        builder.set_abstract(a, true).expect("abstract");
        assert_eq!(status(&builder), CacheStatus::Unknown);
    }

    #[test]
    fn rebasing_drops_the_old_edge() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let a = builder.add_entity_type("NS", "A").expect("A");
        let x = builder.add_entity_type("NS", "X").expect("X");
        let b = builder.add_entity_type("NS", "B").expect("B");

        builder.set_base_type(b, Some(a)).expect("B : A");
        builder.set_base_type(b, Some(x)).expect("B : X");

        assert!(builder.dependencies().dependents(ElementKey::Type(a)).is_empty());
        assert_eq!(
            builder.dependencies().dependents(ElementKey::Type(x)),
            &[ElementKey::Type(b)]
        );
        let base = builder.model().base_type(b).expect("base");
        assert_eq!(base.resolved(), Some(&x));
    }

    #[test]
    fn base_cycle_built_by_setters_is_detected() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let a = builder.add_entity_type("NS", "A").expect("A");
        let b = builder.add_entity_type("NS", "B").expect("B");
        builder.set_base_type(a, Some(b)).expect("A : B");
        builder.set_base_type(b, Some(a)).expect("B : A");

        let base = builder.model().base_type(a).expect("base");
        assert_eq!(base.errors()[0].code, DiagnosticCode::BadCyclicEntity);
    }

    #[test]
    fn dependent_properties_make_the_partner_principal() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let order = builder.add_entity_type("NS", "Order").expect("Order");
        let customer = builder.add_entity_type("NS", "Customer").expect("Customer");
        let customer_id = builder
            .add_structural_property(order, "CustomerId", int32())
            .expect("CustomerId");
        let (to_customer, to_orders) = builder
            .add_navigation_pair(
                order,
                "Customer",
                customer,
                Multiplicity::One,
                "Orders",
                Multiplicity::Many,
            )
            .expect("pair");

        assert_eq!(builder.model().partner(to_customer), Some(to_orders));
        assert!(!builder.model().is_principal(to_orders));

        builder
            .set_dependent_properties(to_customer, Some(vec![customer_id]))
            .expect("dependents");
        assert!(builder.model().is_principal(to_orders));
        assert!(!builder.model().is_principal(to_customer));
    }

    #[test]
    fn dependent_properties_require_a_navigation() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let order = builder.add_entity_type("NS", "Order").expect("Order");
        let id = builder.add_structural_property(order, "Id", int32()).expect("Id");
        assert!(matches!(
            builder.set_dependent_properties(id, None),
            Err(EdmError::NotNavigation(_))
        ));
    }

    #[test]
    fn removed_type_becomes_a_placeholder_everywhere() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let address = builder.add_complex_type("NS", "Address").expect("Address");
        let person = builder.add_entity_type("NS", "Person").expect("Person");
        let home = builder
            .add_structural_property(person, "Home", TypeReference::schema(address, true))
            .expect("Home");
        let container = builder.add_entity_container("NS", "Default").expect("container");
        let people = builder.add_entity_set(container, "People", person).expect("People");

        assert!(builder.model().property_type(home).expect("type").errors().is_empty());
        assert!(!builder.model().element_type(people).expect("type").is_bad());

        let flushed = builder.remove_type(address).expect("remove");
        assert!(flushed.contains(&ElementKey::Property(home)));
        assert_eq!(
            builder.model().property_type(home).expect("type").errors()[0].code,
            DiagnosticCode::BadUnresolvedType
        );
        assert!(builder.model().find_type("NS.Address").is_none());

        builder.remove_type(person).expect("remove");
        assert!(builder.model().element_type(people).expect("type").is_bad());
    }

    #[test]
    fn operations_register_overloads() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let order = builder.add_entity_type("NS", "Order").expect("Order");
        builder
            .add_operation("NS", "Total", OperationKind::Function, vec![], Some(int32()))
            .expect("Total()");
        let by_order = builder
            .add_operation(
                "NS",
                "Total",
                OperationKind::Function,
                vec![("order".to_string(), TypeReference::schema(order, false))],
                Some(int32()),
            )
            .expect("Total(order)");

        assert_eq!(builder.model().find_operations("NS.Total").len(), 2);
        assert_eq!(
            builder.dependencies().dependents(ElementKey::Type(order)),
            &[ElementKey::Operation(by_order)]
        );
    }

    #[test]
    fn invalid_names_and_handles_are_rejected() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        assert!(matches!(
            builder.add_entity_type("NS", ""),
            Err(EdmError::InvalidName(_))
        ));
        assert!(matches!(
            builder.add_entity_type("", "Order"),
            Err(EdmError::InvalidName(_))
        ));
        assert!(matches!(
            builder.set_base_type(TypeId(7), None),
            Err(EdmError::UnknownElement(ElementKey::Type(TypeId(7))))
        ));
    }

    #[test]
    fn annotations_pass_through() {
        let mut builder = ConstructibleModel::new(ModelSettings::default());
        let order = builder.add_entity_type("NS", "Order").expect("Order");
        builder
            .set_annotation(ElementKey::Type(order), "urn:x", "Label", Some("Orders".to_string()))
            .expect("set");
        assert_eq!(
            builder.into_model().get_annotation(ElementKey::Type(order), "urn:x", "Label"),
            Some("Orders")
        );
    }
}
