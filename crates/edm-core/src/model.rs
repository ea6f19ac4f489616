//! # Semantic Model Arena
//!
//! `SemanticModel` owns every element of a bound schema set. Elements live in
//! per-kind arenas (`Vec`s) and point at each other through typed handles, so
//! cyclic shapes (type ↔ type, navigation ↔ partner) need no shared ownership.
//!
//! Cross-references are stored as `Reference`s: either the text that appeared
//! in the document or a handle supplied by a constructible model. Resolving a
//! reference into a `Binding` happens lazily in `semantics`, and every result
//! is memoized in a `Cache` field of the owning definition.

use crate::annotations::AnnotationManager;
use crate::binding::Binding;
use crate::cache::Cache;
use crate::primitives::PrimitiveKind;
use crate::registry::{NameMap, OperationMap};
use crate::settings::ModelSettings;
use crate::types::{
    AnnotationId, AssociationId, ContainerElementId, ContainerId, Diagnostic, ElementKey,
    ElementKind, Location, Multiplicity, OperationId, OperationKind, PropertyId, TermId, TypeId,
    full_name,
};
use std::collections::BTreeMap;

// =============================================================================
// REFERENCES
// =============================================================================

/// An unresolved cross-reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<T> {
    /// Textual name (or type expression) as written in a document.
    Named(String),
    /// Handle supplied directly by a constructible model.
    Bound(T),
}

/// Type of a property, term, parameter or return value.
///
/// The reference owns the nullability; many references may share one
/// definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    definition: TypeDefinition,
    nullable: bool,
}

/// What a `TypeReference` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinition {
    Primitive(PrimitiveKind),
    Schema(Binding<TypeId>),
    Collection(Box<TypeReference>),
    EntityReference(Box<TypeReference>),
}

impl TypeReference {
    #[must_use]
    pub fn new(definition: TypeDefinition, nullable: bool) -> Self {
        Self {
            definition,
            nullable,
        }
    }

    #[must_use]
    pub fn primitive(kind: PrimitiveKind, nullable: bool) -> Self {
        Self::new(TypeDefinition::Primitive(kind), nullable)
    }

    #[must_use]
    pub fn schema(ty: TypeId, nullable: bool) -> Self {
        Self::new(TypeDefinition::Schema(Binding::Resolved(ty)), nullable)
    }

    /// `Collection(element)`. Collections themselves are never null.
    #[must_use]
    pub fn collection(element: Self) -> Self {
        Self::new(TypeDefinition::Collection(Box::new(element)), false)
    }

    /// `Ref(element)`.
    #[must_use]
    pub fn entity_reference(element: Self, nullable: bool) -> Self {
        Self::new(TypeDefinition::EntityReference(Box::new(element)), nullable)
    }

    #[must_use]
    pub fn definition(&self) -> &TypeDefinition {
        &self.definition
    }

    #[must_use]
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self.definition, TypeDefinition::Collection(_))
    }

    /// The schema type this reference names directly, if bound.
    #[must_use]
    pub fn schema_type(&self) -> Option<TypeId> {
        match &self.definition {
            TypeDefinition::Schema(binding) => binding.resolved().copied(),
            _ => None,
        }
    }

    /// Diagnostics of every placeholder nested in this reference.
    #[must_use]
    pub fn errors(&self) -> Vec<Diagnostic> {
        match &self.definition {
            TypeDefinition::Primitive(_) => Vec::new(),
            TypeDefinition::Schema(binding) => binding.errors().to_vec(),
            TypeDefinition::Collection(element) | TypeDefinition::EntityReference(element) => {
                element.errors()
            }
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    Entity,
    Complex,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    name: String,
    value: i64,
}

impl EnumMember {
    pub(crate) fn new(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }
}

/// Entity, complex or enum type.
#[derive(Debug)]
pub struct TypeDef {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) base: Option<Reference<TypeId>>,
    pub(crate) is_abstract: bool,
    pub(crate) is_open: bool,
    pub(crate) declared_key: Option<Vec<Reference<PropertyId>>>,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) property_names: NameMap<PropertyId>,
    pub(crate) members: Vec<EnumMember>,
    pub(crate) removed: bool,
    pub(crate) location: Option<Location>,
    pub(crate) base_cache: Cache<Option<Binding<TypeId>>>,
    pub(crate) key_cache: Cache<Vec<Binding<PropertyId>>>,
}

impl TypeDef {
    pub(crate) fn new(namespace: &str, name: &str, kind: TypeKind) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            base: None,
            is_abstract: false,
            is_open: false,
            declared_key: None,
            properties: Vec::new(),
            property_names: NameMap::new(ElementKind::Property),
            members: Vec::new(),
            removed: false,
            location: None,
            base_cache: Cache::new(),
            key_cache: Cache::new(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.namespace, &self.name)
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// `true` for entity and complex types.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self.kind, TypeKind::Entity | TypeKind::Complex)
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Properties declared on this type (not inherited), declaration order.
    /// Silent navigation partners are not listed.
    #[must_use]
    pub fn declared_properties(&self) -> &[PropertyId] {
        &self.properties
    }

    #[must_use]
    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    /// `true` once a constructible model removed the type.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn flush(&mut self) {
        self.base_cache.flush();
        self.key_cache.flush();
    }
}

// =============================================================================
// PROPERTIES
// =============================================================================

/// Structural or navigation property.
#[derive(Debug)]
pub struct PropertyDef {
    /// `None` for silent partners, which live on their partner's target.
    pub(crate) declaring_type: Option<TypeId>,
    pub(crate) name: String,
    pub(crate) location: Option<Location>,
    pub(crate) kind: PropertyKind,
}

#[derive(Debug)]
pub enum PropertyKind {
    Structural(StructuralDef),
    Navigation(NavigationDef),
}

#[derive(Debug)]
pub struct StructuralDef {
    pub(crate) type_ref: Reference<TypeReference>,
    /// Applies when `type_ref` is a textual expression.
    pub(crate) nullable: bool,
    pub(crate) default_value: Option<String>,
    pub(crate) type_cache: Cache<TypeReference>,
}

/// Where a navigation property points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEnd {
    /// Declared against an association, `from_role` → `to_role`.
    Role {
        relationship: String,
        from_role: String,
        to_role: String,
    },
    /// Built directly by a constructible model.
    Direct {
        target: TypeId,
        multiplicity: Multiplicity,
    },
}

#[derive(Debug)]
pub struct NavigationDef {
    pub(crate) partner: Option<PropertyId>,
    pub(crate) end: NavigationEnd,
    pub(crate) dependent: Option<Vec<PropertyId>>,
    pub(crate) silent: bool,
    pub(crate) association_cache: Cache<Option<Binding<AssociationId>>>,
    pub(crate) target_cache: Cache<Binding<TypeId>>,
    pub(crate) dependent_cache: Cache<Option<Vec<Binding<PropertyId>>>>,
}

impl PropertyDef {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    #[must_use]
    pub fn is_navigation(&self) -> bool {
        matches!(self.kind, PropertyKind::Navigation(_))
    }

    /// Default value of a structural property.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Structural(structural) => structural.default_value.as_deref(),
            PropertyKind::Navigation(_) => None,
        }
    }

    /// `true` for a navigation partner synthesized by the binder.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        match &self.kind {
            PropertyKind::Navigation(navigation) => navigation.silent,
            PropertyKind::Structural(_) => false,
        }
    }

    fn flush(&mut self) {
        match &mut self.kind {
            PropertyKind::Structural(structural) => structural.type_cache.flush(),
            PropertyKind::Navigation(navigation) => {
                navigation.association_cache.flush();
                navigation.target_cache.flush();
                navigation.dependent_cache.flush();
            }
        }
    }
}

impl NavigationDef {
    #[must_use]
    pub fn end(&self) -> &NavigationEnd {
        &self.end
    }
}

/// One half of a navigation pair, before handles are assigned.
#[derive(Debug, Clone)]
pub(crate) struct NavigationHalf {
    pub(crate) declaring_type: Option<TypeId>,
    pub(crate) name: String,
    pub(crate) end: NavigationEnd,
    pub(crate) silent: bool,
    pub(crate) location: Option<Location>,
}

// =============================================================================
// ASSOCIATIONS
// =============================================================================

#[derive(Debug)]
pub struct AssociationEndDef {
    pub(crate) role: String,
    pub(crate) type_ref: Reference<TypeId>,
    pub(crate) multiplicity: Multiplicity,
    pub(crate) type_cache: Cache<Binding<TypeId>>,
}

impl AssociationEndDef {
    pub(crate) fn new(role: &str, type_ref: Reference<TypeId>, multiplicity: Multiplicity) -> Self {
        Self {
            role: role.to_string(),
            type_ref,
            multiplicity,
            type_cache: Cache::new(),
        }
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[must_use]
    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }
}

/// Referential constraint as written: role names and ordered property names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintDef {
    pub(crate) principal_role: String,
    pub(crate) principal: Vec<String>,
    pub(crate) dependent_role: String,
    pub(crate) dependent: Vec<String>,
    pub(crate) location: Option<Location>,
}

impl ConstraintDef {
    #[must_use]
    pub fn principal_role(&self) -> &str {
        &self.principal_role
    }

    #[must_use]
    pub fn dependent_role(&self) -> &str {
        &self.dependent_role
    }
}

#[derive(Debug)]
pub struct AssociationDef {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) ends: Vec<AssociationEndDef>,
    pub(crate) constraint: Option<ConstraintDef>,
    pub(crate) location: Option<Location>,
    pub(crate) constraint_cache: Cache<Option<Vec<Binding<PropertyId>>>>,
}

impl AssociationDef {
    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.namespace, &self.name)
    }

    #[must_use]
    pub fn ends(&self) -> &[AssociationEndDef] {
        &self.ends
    }

    /// The end playing `role`, if any.
    #[must_use]
    pub fn end(&self, role: &str) -> Option<&AssociationEndDef> {
        self.ends.iter().find(|end| end.role == role)
    }

    #[must_use]
    pub fn constraint(&self) -> Option<&ConstraintDef> {
        self.constraint.as_ref()
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn flush(&mut self) {
        for end in &mut self.ends {
            end.type_cache.flush();
        }
        self.constraint_cache.flush();
    }
}

// =============================================================================
// TERMS AND OPERATIONS
// =============================================================================

#[derive(Debug)]
pub struct TermDef {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) type_ref: Reference<TypeReference>,
    pub(crate) nullable: bool,
    pub(crate) location: Option<Location>,
    pub(crate) type_cache: Cache<TypeReference>,
}

impl TermDef {
    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.namespace, &self.name)
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

/// Where an operation is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationScope {
    Schema { namespace: String },
    Import { container: ContainerId },
}

#[derive(Debug)]
pub struct ParameterDef {
    pub(crate) name: String,
    pub(crate) type_ref: Reference<TypeReference>,
    pub(crate) nullable: bool,
    pub(crate) type_cache: Cache<TypeReference>,
}

impl ParameterDef {
    pub(crate) fn new(name: &str, type_ref: Reference<TypeReference>, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            type_ref,
            nullable,
            type_cache: Cache::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
pub struct OperationDef {
    pub(crate) scope: OperationScope,
    pub(crate) name: String,
    pub(crate) kind: OperationKind,
    pub(crate) is_bound: bool,
    pub(crate) parameters: Vec<ParameterDef>,
    pub(crate) return_type: Option<Reference<TypeReference>>,
    pub(crate) entity_set: Option<String>,
    pub(crate) location: Option<Location>,
    pub(crate) return_cache: Cache<Option<TypeReference>>,
}

impl OperationDef {
    #[must_use]
    pub fn scope(&self) -> &OperationScope {
        &self.scope
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.is_bound
    }

    #[must_use]
    pub fn parameters(&self) -> &[ParameterDef] {
        &self.parameters
    }

    /// Position of the parameter called `name`.
    #[must_use]
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Entity set an import returns into, as written.
    #[must_use]
    pub fn entity_set(&self) -> Option<&str> {
        self.entity_set.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn flush(&mut self) {
        for parameter in &mut self.parameters {
            parameter.type_cache.flush();
        }
        self.return_cache.flush();
    }
}

// =============================================================================
// CONTAINERS
// =============================================================================

#[derive(Debug)]
pub struct ContainerDef {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) elements: Vec<ContainerElementId>,
    pub(crate) element_names: NameMap<ContainerElementId>,
    pub(crate) imports: OperationMap<OperationId>,
    pub(crate) location: Option<Location>,
}

impl ContainerDef {
    pub(crate) fn new(namespace: &str, name: &str, location: Option<Location>) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            elements: Vec::new(),
            element_names: NameMap::new(ElementKind::ContainerElement),
            imports: OperationMap::new(),
            location,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.namespace, &self.name)
    }

    /// Entity sets and singletons in declaration order.
    #[must_use]
    pub fn elements(&self) -> &[ContainerElementId] {
        &self.elements
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerElementKind {
    EntitySet,
    Singleton,
}

#[derive(Debug)]
pub struct ContainerElementDef {
    pub(crate) container: ContainerId,
    pub(crate) name: String,
    pub(crate) kind: ContainerElementKind,
    pub(crate) entity_type: Reference<TypeId>,
    pub(crate) location: Option<Location>,
    pub(crate) type_cache: Cache<Binding<TypeId>>,
}

impl ContainerElementDef {
    #[must_use]
    pub fn container(&self) -> ContainerId {
        self.container
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ContainerElementKind {
        self.kind
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

// =============================================================================
// VOCABULARY ANNOTATIONS
// =============================================================================

/// An element a vocabulary annotation can be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnnotationTarget {
    Type(TypeId),
    Property(PropertyId),
    Term(TermId),
    Operation(OperationId),
    Parameter { operation: OperationId, index: usize },
    Container(ContainerId),
    ContainerElement(ContainerElementId),
}

/// Out-of-line annotation: a term applied to a textual target path.
#[derive(Debug)]
pub struct VocabularyAnnotationDef {
    pub(crate) target: String,
    pub(crate) term: String,
    pub(crate) qualifier: Option<String>,
    pub(crate) value: Option<String>,
    pub(crate) location: Option<Location>,
    pub(crate) target_cache: Cache<Binding<AnnotationTarget>>,
    pub(crate) term_cache: Cache<Binding<TermId>>,
}

impl VocabularyAnnotationDef {
    /// The target path as written.
    #[must_use]
    pub fn target_path(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn term_name(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

// =============================================================================
// MODEL
// =============================================================================

/// A bound EDM model.
///
/// Built once by `SemanticModel::from_schemas` and read concurrently after
/// that; a `ConstructibleModel` wraps one for incremental construction.
#[derive(Debug)]
pub struct SemanticModel {
    pub(crate) settings: ModelSettings,
    pub(crate) types: Vec<TypeDef>,
    pub(crate) properties: Vec<PropertyDef>,
    pub(crate) associations: Vec<AssociationDef>,
    pub(crate) terms: Vec<TermDef>,
    pub(crate) operations: Vec<OperationDef>,
    pub(crate) containers: Vec<ContainerDef>,
    pub(crate) container_elements: Vec<ContainerElementDef>,
    pub(crate) vocabulary: Vec<VocabularyAnnotationDef>,
    pub(crate) type_names: NameMap<TypeId>,
    pub(crate) term_names: NameMap<TermId>,
    pub(crate) association_names: NameMap<AssociationId>,
    pub(crate) container_names: NameMap<ContainerId>,
    pub(crate) operation_names: OperationMap<OperationId>,
    /// alias → namespace
    pub(crate) aliases: BTreeMap<String, String>,
    pub(crate) annotations: AnnotationManager<ElementKey>,
}

impl SemanticModel {
    /// Create an empty model.
    #[must_use]
    pub fn new(settings: ModelSettings) -> Self {
        let annotations = AnnotationManager::new(settings.allow_annotation_override);
        Self {
            settings,
            types: Vec::new(),
            properties: Vec::new(),
            associations: Vec::new(),
            terms: Vec::new(),
            operations: Vec::new(),
            containers: Vec::new(),
            container_elements: Vec::new(),
            vocabulary: Vec::new(),
            type_names: NameMap::new(ElementKind::Type),
            term_names: NameMap::new(ElementKind::Term),
            association_names: NameMap::new(ElementKind::Association),
            container_names: NameMap::new(ElementKind::EntityContainer),
            operation_names: OperationMap::new(),
            aliases: BTreeMap::new(),
            annotations,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Arena access
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn type_def(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.index())
    }

    #[must_use]
    pub fn property(&self, id: PropertyId) -> Option<&PropertyDef> {
        self.properties.get(id.index())
    }

    #[must_use]
    pub fn association(&self, id: AssociationId) -> Option<&AssociationDef> {
        self.associations.get(id.index())
    }

    #[must_use]
    pub fn term(&self, id: TermId) -> Option<&TermDef> {
        self.terms.get(id.index())
    }

    #[must_use]
    pub fn operation(&self, id: OperationId) -> Option<&OperationDef> {
        self.operations.get(id.index())
    }

    #[must_use]
    pub fn container(&self, id: ContainerId) -> Option<&ContainerDef> {
        self.containers.get(id.index())
    }

    #[must_use]
    pub fn container_element(&self, id: ContainerElementId) -> Option<&ContainerElementDef> {
        self.container_elements.get(id.index())
    }

    #[must_use]
    pub fn vocabulary_annotation(&self, id: AnnotationId) -> Option<&VocabularyAnnotationDef> {
        self.vocabulary.get(id.index())
    }

    /// All type handles, including removed ones.
    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len()).map(|i| TypeId(i as u32))
    }

    pub fn association_ids(&self) -> impl Iterator<Item = AssociationId> + '_ {
        (0..self.associations.len()).map(|i| AssociationId(i as u32))
    }

    pub fn term_ids(&self) -> impl Iterator<Item = TermId> + '_ {
        (0..self.terms.len()).map(|i| TermId(i as u32))
    }

    pub fn operation_ids(&self) -> impl Iterator<Item = OperationId> + '_ {
        (0..self.operations.len()).map(|i| OperationId(i as u32))
    }

    pub fn container_ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        (0..self.containers.len()).map(|i| ContainerId(i as u32))
    }

    pub fn container_element_ids(&self) -> impl Iterator<Item = ContainerElementId> + '_ {
        (0..self.container_elements.len()).map(|i| ContainerElementId(i as u32))
    }

    pub fn vocabulary_ids(&self) -> impl Iterator<Item = AnnotationId> + '_ {
        (0..self.vocabulary.len()).map(|i| AnnotationId(i as u32))
    }

    /// Every property handle, silent partners included.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        (0..self.properties.len()).map(|i| PropertyId(i as u32))
    }

    /// `true` if `key` names an element of this model.
    #[must_use]
    pub fn contains(&self, key: ElementKey) -> bool {
        match key {
            ElementKey::Type(id) => id.index() < self.types.len(),
            ElementKey::Property(id) => id.index() < self.properties.len(),
            ElementKey::Association(id) => id.index() < self.associations.len(),
            ElementKey::Term(id) => id.index() < self.terms.len(),
            ElementKey::Operation(id) => id.index() < self.operations.len(),
            ElementKey::Container(id) => id.index() < self.containers.len(),
            ElementKey::ContainerElement(id) => id.index() < self.container_elements.len(),
            ElementKey::Annotation(id) => id.index() < self.vocabulary.len(),
        }
    }

    /// Number of elements per arena, for summaries.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.types.len()
            + self.properties.len()
            + self.associations.len()
            + self.terms.len()
            + self.operations.len()
            + self.containers.len()
            + self.container_elements.len()
            + self.vocabulary.len()
    }

    // -------------------------------------------------------------------------
    // Allocation (binder and constructible model only)
    // -------------------------------------------------------------------------

    pub(crate) fn alloc_type(&mut self, def: TypeDef) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.type_names.register(&def.full_name(), id);
        self.types.push(def);
        id
    }

    pub(crate) fn alloc_structural(
        &mut self,
        declaring_type: TypeId,
        name: &str,
        structural: StructuralDef,
        location: Option<Location>,
    ) -> PropertyId {
        let id = PropertyId(self.properties.len() as u32);
        self.properties.push(PropertyDef {
            declaring_type: Some(declaring_type),
            name: name.to_string(),
            location,
            kind: PropertyKind::Structural(structural),
        });
        self.attach_property(declaring_type, name, id);
        id
    }

    /// Allocate both halves of a navigation pair with reciprocal partners.
    pub(crate) fn alloc_navigation_pair(
        &mut self,
        first: NavigationHalf,
        second: NavigationHalf,
    ) -> (PropertyId, PropertyId) {
        let first_id = PropertyId(self.properties.len() as u32);
        let second_id = PropertyId(first_id.0 + 1);
        self.push_navigation(first, Some(second_id));
        self.push_navigation(second, Some(first_id));
        (first_id, second_id)
    }

    /// Allocate a navigation that has no partner at all.
    pub(crate) fn alloc_unpartnered_navigation(&mut self, half: NavigationHalf) -> PropertyId {
        let id = PropertyId(self.properties.len() as u32);
        self.push_navigation(half, None);
        id
    }

    fn push_navigation(&mut self, half: NavigationHalf, partner: Option<PropertyId>) {
        let id = PropertyId(self.properties.len() as u32);
        let NavigationHalf {
            declaring_type,
            name,
            end,
            silent,
            location,
        } = half;
        self.properties.push(PropertyDef {
            declaring_type,
            name: name.clone(),
            location,
            kind: PropertyKind::Navigation(NavigationDef {
                partner,
                end,
                dependent: None,
                silent,
                association_cache: Cache::new(),
                target_cache: Cache::new(),
                dependent_cache: Cache::new(),
            }),
        });
        if let (false, Some(ty)) = (silent, declaring_type) {
            self.attach_property(ty, &name, id);
        }
    }

    fn attach_property(&mut self, ty: TypeId, name: &str, id: PropertyId) {
        if let Some(def) = self.types.get_mut(ty.index()) {
            def.properties.push(id);
            def.property_names.register(name, id);
        }
    }

    pub(crate) fn alloc_association(&mut self, def: AssociationDef) -> AssociationId {
        let id = AssociationId(self.associations.len() as u32);
        self.association_names.register(&def.full_name(), id);
        self.associations.push(def);
        id
    }

    pub(crate) fn alloc_term(&mut self, def: TermDef) -> TermId {
        let id = TermId(self.terms.len() as u32);
        self.term_names.register(&def.full_name(), id);
        self.terms.push(def);
        id
    }

    /// Allocate an operation and register it in its scope.
    pub(crate) fn alloc_operation(&mut self, def: OperationDef) -> OperationId {
        let id = OperationId(self.operations.len() as u32);
        match &def.scope {
            OperationScope::Schema { namespace } => {
                self.operation_names.register(&full_name(namespace, &def.name), id);
            }
            OperationScope::Import { container } => {
                if let Some(container) = self.containers.get_mut(container.index()) {
                    container.imports.register(&def.name, id);
                }
            }
        }
        self.operations.push(def);
        id
    }

    pub(crate) fn alloc_container(&mut self, def: ContainerDef) -> ContainerId {
        let id = ContainerId(self.containers.len() as u32);
        self.container_names.register(&def.full_name(), id);
        self.containers.push(def);
        id
    }

    pub(crate) fn alloc_container_element(
        &mut self,
        container: ContainerId,
        name: &str,
        kind: ContainerElementKind,
        entity_type: Reference<TypeId>,
        location: Option<Location>,
    ) -> ContainerElementId {
        let id = ContainerElementId(self.container_elements.len() as u32);
        self.container_elements.push(ContainerElementDef {
            container,
            name: name.to_string(),
            kind,
            entity_type,
            location,
            type_cache: Cache::new(),
        });
        if let Some(def) = self.containers.get_mut(container.index()) {
            def.elements.push(id);
            def.element_names.register(name, id);
        }
        id
    }

    pub(crate) fn alloc_vocabulary(&mut self, def: VocabularyAnnotationDef) -> AnnotationId {
        let id = AnnotationId(self.vocabulary.len() as u32);
        self.vocabulary.push(def);
        id
    }

    /// Forget every memoized value owned by `key`.
    pub(crate) fn flush_element(&mut self, key: ElementKey) {
        match key {
            ElementKey::Type(id) => {
                if let Some(def) = self.types.get_mut(id.index()) {
                    def.flush();
                }
            }
            ElementKey::Property(id) => {
                if let Some(def) = self.properties.get_mut(id.index()) {
                    def.flush();
                }
            }
            ElementKey::Association(id) => {
                if let Some(def) = self.associations.get_mut(id.index()) {
                    def.flush();
                }
            }
            ElementKey::Term(id) => {
                if let Some(def) = self.terms.get_mut(id.index()) {
                    def.type_cache.flush();
                }
            }
            ElementKey::Operation(id) => {
                if let Some(def) = self.operations.get_mut(id.index()) {
                    def.flush();
                }
            }
            // Containers hold no memoized values of their own.
            ElementKey::Container(_) => {}
            ElementKey::ContainerElement(id) => {
                if let Some(def) = self.container_elements.get_mut(id.index()) {
                    def.type_cache.flush();
                }
            }
            ElementKey::Annotation(id) => {
                if let Some(def) = self.vocabulary.get_mut(id.index()) {
                    def.target_cache.flush();
                    def.term_cache.flush();
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
