//! CSDL syntax tree → `SemanticModel`.
//!
//! Binding only allocates and registers; nothing is resolved here. Names stay
//! textual (`Reference::Named`) until a reader asks for them.
//!
//! Navigation properties are paired per association: a declaration
//! `from → to` is matched with the first unpaired declaration `to → from` on
//! the same association. One-sided declarations get a silent partner when
//! `synthesize_partners` is enabled.

use crate::annotations::DirectAnnotation;
use crate::csdl::{
    CsdlAnnotations, CsdlAssociation, CsdlComplexType, CsdlEntityContainer, CsdlEntityType,
    CsdlEnumType, CsdlNavigationProperty, CsdlOperation, CsdlOperationImport, CsdlParameter,
    CsdlProperty, CsdlSchema, CsdlTerm,
};
use crate::model::{
    AssociationDef, AssociationEndDef, ConstraintDef, ContainerDef, ContainerElementKind,
    EnumMember, NavigationEnd, NavigationHalf, OperationDef, OperationScope, ParameterDef,
    Reference, SemanticModel, StructuralDef, TermDef, TypeDef, TypeKind, VocabularyAnnotationDef,
};
use crate::cache::Cache;
use crate::settings::ModelSettings;
use crate::types::{ContainerId, EdmError, ElementKey, PropertyId, TypeId};

/// A navigation declaration waiting for its partner.
struct PendingNavigation<'a> {
    declaring_type: TypeId,
    relationship: String,
    csdl: &'a CsdlNavigationProperty,
}

impl PendingNavigation<'_> {
    fn half(&self) -> NavigationHalf {
        NavigationHalf {
            declaring_type: Some(self.declaring_type),
            name: self.csdl.name.clone(),
            end: NavigationEnd::Role {
                relationship: self.csdl.relationship.clone(),
                from_role: self.csdl.from_role.clone(),
                to_role: self.csdl.to_role.clone(),
            },
            silent: false,
            location: self.csdl.location.clone(),
        }
    }

    /// The mirror image of this declaration, living on the target type.
    fn silent_half(&self) -> NavigationHalf {
        NavigationHalf {
            declaring_type: None,
            name: self.csdl.from_role.clone(),
            end: NavigationEnd::Role {
                relationship: self.csdl.relationship.clone(),
                from_role: self.csdl.to_role.clone(),
                to_role: self.csdl.from_role.clone(),
            },
            silent: true,
            location: None,
        }
    }

    fn mirrors(&self, other: &Self) -> bool {
        self.relationship == other.relationship
            && self.csdl.from_role == other.csdl.to_role
            && self.csdl.to_role == other.csdl.from_role
    }
}

impl SemanticModel {
    /// Bind a set of schemas into one model.
    ///
    /// Never fails: every defect becomes a placeholder found by `validate`.
    #[must_use]
    pub fn from_schemas(schemas: &[CsdlSchema], settings: ModelSettings) -> Self {
        let mut model = Self::new(settings);

        for schema in schemas {
            if let Some(alias) = &schema.alias {
                model.aliases.insert(alias.clone(), schema.namespace.clone());
            }
        }

        let mut pending = Vec::new();
        for schema in schemas {
            let namespace = schema.namespace.as_str();
            for csdl in &schema.entity_types {
                let ty = model.bind_entity_type(namespace, csdl);
                pending.extend(csdl.navigation_properties.iter().map(|navigation| {
                    PendingNavigation {
                        declaring_type: ty,
                        relationship: model.canonical_name(&navigation.relationship),
                        csdl: navigation,
                    }
                }));
            }
            for csdl in &schema.complex_types {
                model.bind_complex_type(namespace, csdl);
            }
            for csdl in &schema.enum_types {
                model.bind_enum_type(namespace, csdl);
            }
            for csdl in &schema.associations {
                model.bind_association(namespace, csdl);
            }
            for csdl in &schema.terms {
                model.bind_term(namespace, csdl);
            }
            for csdl in &schema.operations {
                model.bind_operation(namespace, csdl);
            }
            for csdl in &schema.entity_containers {
                model.bind_container(namespace, csdl);
            }
            for csdl in &schema.annotations {
                model.bind_vocabulary(csdl);
            }
        }

        model.bind_navigations(&pending);

        tracing::debug!(
            schemas = schemas.len(),
            types = model.types.len(),
            properties = model.properties.len(),
            elements = model.element_count(),
            "bound semantic model"
        );
        model
    }

    /// Bind schemas given as a JSON array of CSDL syntax trees.
    pub fn from_json(source: &str, settings: ModelSettings) -> Result<Self, EdmError> {
        let schemas: Vec<CsdlSchema> = serde_json::from_str(source)
            .map_err(|e| EdmError::DeserializationError(e.to_string()))?;
        Ok(Self::from_schemas(&schemas, settings))
    }

    fn bind_direct_annotations(&mut self, element: ElementKey, annotations: &[DirectAnnotation]) {
        for annotation in annotations {
            self.annotations.add_baseline(element, annotation.clone());
        }
    }

    fn bind_entity_type(&mut self, namespace: &str, csdl: &CsdlEntityType) -> TypeId {
        let mut def = TypeDef::new(namespace, &csdl.name, TypeKind::Entity);
        def.base = csdl.base_type.clone().map(Reference::Named);
        def.is_abstract = csdl.is_abstract;
        def.is_open = csdl.is_open;
        def.declared_key = csdl
            .key
            .as_ref()
            .map(|key| key.iter().cloned().map(Reference::Named).collect());
        def.location = csdl.location.clone();

        let ty = self.alloc_type(def);
        self.bind_direct_annotations(ElementKey::Type(ty), &csdl.direct_annotations);
        for property in &csdl.properties {
            self.bind_structural(ty, property);
        }
        ty
    }

    fn bind_complex_type(&mut self, namespace: &str, csdl: &CsdlComplexType) -> TypeId {
        let mut def = TypeDef::new(namespace, &csdl.name, TypeKind::Complex);
        def.base = csdl.base_type.clone().map(Reference::Named);
        def.is_abstract = csdl.is_abstract;
        def.is_open = csdl.is_open;
        def.location = csdl.location.clone();

        let ty = self.alloc_type(def);
        self.bind_direct_annotations(ElementKey::Type(ty), &csdl.direct_annotations);
        for property in &csdl.properties {
            self.bind_structural(ty, property);
        }
        ty
    }

    fn bind_enum_type(&mut self, namespace: &str, csdl: &CsdlEnumType) -> TypeId {
        let mut def = TypeDef::new(namespace, &csdl.name, TypeKind::Enum);
        let mut next = 0i64;
        def.members = csdl
            .members
            .iter()
            .map(|member| {
                let value = member.value.unwrap_or(next);
                next = value.saturating_add(1);
                EnumMember::new(&member.name, value)
            })
            .collect();
        def.location = csdl.location.clone();
        self.alloc_type(def)
    }

    fn bind_structural(&mut self, ty: TypeId, csdl: &CsdlProperty) -> PropertyId {
        let structural = StructuralDef {
            type_ref: Reference::Named(csdl.type_name.clone()),
            nullable: csdl.nullable.unwrap_or(true),
            default_value: csdl.default_value.clone(),
            type_cache: Cache::new(),
        };
        let property = self.alloc_structural(ty, &csdl.name, structural, csdl.location.clone());
        self.bind_direct_annotations(ElementKey::Property(property), &csdl.direct_annotations);
        property
    }

    fn bind_navigations(&mut self, pending: &[PendingNavigation<'_>]) {
        let mut paired = vec![false; pending.len()];
        for (index, navigation) in pending.iter().enumerate() {
            if paired[index] {
                continue;
            }
            paired[index] = true;
            let partner = (index + 1..pending.len())
                .find(|other| !paired[*other] && navigation.mirrors(&pending[*other]));
            match partner {
                Some(other) => {
                    paired[other] = true;
                    self.alloc_navigation_pair(navigation.half(), pending[other].half());
                }
                None if self.settings.synthesize_partners => {
                    tracing::trace!(
                        navigation = %navigation.csdl.name,
                        relationship = %navigation.relationship,
                        "synthesizing silent partner"
                    );
                    self.alloc_navigation_pair(navigation.half(), navigation.silent_half());
                }
                None => {
                    self.alloc_unpartnered_navigation(navigation.half());
                }
            }
        }
    }

    fn bind_association(&mut self, namespace: &str, csdl: &CsdlAssociation) {
        let ends = csdl
            .ends
            .iter()
            .map(|end| {
                AssociationEndDef::new(
                    &end.role,
                    Reference::Named(end.type_name.clone()),
                    end.multiplicity,
                )
            })
            .collect();
        let constraint = csdl.referential_constraint.as_ref().map(|c| ConstraintDef {
            principal_role: c.principal.role.clone(),
            principal: c.principal.properties.clone(),
            dependent_role: c.dependent.role.clone(),
            dependent: c.dependent.properties.clone(),
            location: c.location.clone(),
        });
        self.alloc_association(AssociationDef {
            namespace: namespace.to_string(),
            name: csdl.name.clone(),
            ends,
            constraint,
            location: csdl.location.clone(),
            constraint_cache: Cache::new(),
        });
    }

    fn bind_term(&mut self, namespace: &str, csdl: &CsdlTerm) {
        self.alloc_term(TermDef {
            namespace: namespace.to_string(),
            name: csdl.name.clone(),
            type_ref: Reference::Named(csdl.type_name.clone()),
            nullable: csdl.nullable.unwrap_or(true),
            location: csdl.location.clone(),
            type_cache: Cache::new(),
        });
    }

    fn bind_operation(&mut self, namespace: &str, csdl: &CsdlOperation) {
        self.alloc_operation(OperationDef {
            scope: OperationScope::Schema {
                namespace: namespace.to_string(),
            },
            name: csdl.name.clone(),
            kind: csdl.kind,
            is_bound: csdl.is_bound,
            parameters: bind_parameters(&csdl.parameters),
            return_type: csdl.return_type.clone().map(Reference::Named),
            entity_set: None,
            location: csdl.location.clone(),
            return_cache: Cache::new(),
        });
    }

    fn bind_container(&mut self, namespace: &str, csdl: &CsdlEntityContainer) -> ContainerId {
        let container =
            self.alloc_container(ContainerDef::new(namespace, &csdl.name, csdl.location.clone()));
        self.bind_direct_annotations(ElementKey::Container(container), &csdl.direct_annotations);

        let members = csdl
            .entity_sets
            .iter()
            .map(|set| (set, ContainerElementKind::EntitySet))
            .chain(
                csdl.singletons
                    .iter()
                    .map(|set| (set, ContainerElementKind::Singleton)),
            );
        for (set, kind) in members {
            self.alloc_container_element(
                container,
                &set.name,
                kind,
                Reference::Named(set.entity_type.clone()),
                set.location.clone(),
            );
        }
        for import in &csdl.operation_imports {
            self.bind_import(container, import);
        }
        container
    }

    fn bind_import(&mut self, container: ContainerId, csdl: &CsdlOperationImport) {
        self.alloc_operation(OperationDef {
            scope: OperationScope::Import { container },
            name: csdl.name.clone(),
            kind: csdl.kind,
            is_bound: false,
            parameters: bind_parameters(&csdl.parameters),
            return_type: csdl.return_type.clone().map(Reference::Named),
            entity_set: csdl.entity_set.clone(),
            location: csdl.location.clone(),
            return_cache: Cache::new(),
        });
    }

    fn bind_vocabulary(&mut self, csdl: &CsdlAnnotations) {
        for annotation in &csdl.annotations {
            self.alloc_vocabulary(VocabularyAnnotationDef {
                target: csdl.target.clone(),
                term: annotation.term.clone(),
                qualifier: annotation.qualifier.clone().or_else(|| csdl.qualifier.clone()),
                value: annotation.value.clone(),
                location: csdl.location.clone(),
                target_cache: Cache::new(),
                term_cache: Cache::new(),
            });
        }
    }
}

fn bind_parameters(parameters: &[CsdlParameter]) -> Vec<ParameterDef> {
    parameters
        .iter()
        .map(|p| {
            ParameterDef::new(
                &p.name,
                Reference::Named(p.type_name.clone()),
                p.nullable.unwrap_or(true),
            )
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
