//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Memoization and Cycle Termination
//! - T1: Name Registry Collisions
//! - T2: Annotation Overlays
//! - T3: End-to-End Semantic Binding

use edm_core::csdl::{
    CsdlAssociation, CsdlAssociationEnd, CsdlConstraintRole, CsdlEntityContainer, CsdlEntityType,
    CsdlNavigationProperty, CsdlOperationImport, CsdlParameter, CsdlProperty,
    CsdlReferentialConstraint,
};
use edm_core::{
    AnnotationTarget, Binding, CsdlSchema, DiagnosticCode, ElementKey, ModelSettings,
    Multiplicity, PropertyId, SemanticModel, TypeId,
};

fn bind(schemas: &[CsdlSchema]) -> SemanticModel {
    SemanticModel::from_schemas(schemas, ModelSettings::default())
}

fn type_id(model: &SemanticModel, name: &str) -> TypeId {
    *model
        .find_type(name)
        .and_then(Binding::exact)
        .expect("type")
}

fn property_names(model: &SemanticModel, bindings: &[Binding<PropertyId>]) -> Vec<String> {
    bindings
        .iter()
        .filter_map(|b| b.exact().copied())
        .filter_map(|id| model.property(id).map(|p| p.name().to_string()))
        .collect()
}

// =============================================================================
// TIER T0: MEMOIZATION AND CYCLE TERMINATION
// =============================================================================

mod t0_memoization {
    use super::*;
    use edm_core::{Cache, CacheStatus};
    use std::cell::Cell;

    /// T0.1: An acyclic value is computed exactly once.
    #[test]
    fn compute_runs_once() {
        let cache: Cache<u32> = Cache::new();
        let calls = Cell::new(0);
        let compute = |_: &()| {
            calls.set(calls.get() + 1);
            42
        };

        assert_eq!(cache.get_value(&(), compute, |_| 0), 42);
        assert_eq!(cache.get_value(&(), compute, |_| 0), 42);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.status(), CacheStatus::Done);
    }

    /// T0.2: Base-type reads are memoized on the model.
    #[test]
    fn base_type_is_memoized() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            CsdlEntityType::new("Base")
                .with_key(["Id"])
                .with_property(CsdlProperty::new("Id", "Edm.Int32")),
            CsdlEntityType::new("Derived").with_base_type("NS.Base"),
        ];
        let model = bind(&[schema]);
        let derived = type_id(&model, "NS.Derived");

        let first = model.base_type(derived);
        assert_eq!(first, model.base_type(derived));
        assert_eq!(
            first.as_ref().and_then(Binding::exact),
            Some(&type_id(&model, "NS.Base"))
        );
    }

    /// T0.3: Two types deriving from each other converge on the cycle value.
    #[test]
    fn mutual_base_types_converge() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            CsdlEntityType::new("A").with_base_type("NS.B"),
            CsdlEntityType::new("B").with_base_type("NS.A"),
        ];
        let model = bind(&[schema]);

        for name in ["NS.A", "NS.B"] {
            let base = model.base_type(type_id(&model, name)).expect("base");
            assert_eq!(base.errors()[0].code, DiagnosticCode::BadCyclicEntity);
        }
    }

    /// T0.4: A base-type cycle deeper than 1000 types terminates on a
    /// default-sized thread stack.
    #[test]
    fn deep_base_cycle_terminates() {
        const DEPTH: usize = 1200;
        let worker = std::thread::spawn(|| {
            let mut schema = CsdlSchema::new("NS");
            schema.entity_types = (0..DEPTH)
                .map(|i| {
                    CsdlEntityType::new(format!("T{i}"))
                        .with_base_type(format!("NS.T{}", (i + 1) % DEPTH))
                })
                .collect();
            let model = bind(&[schema]);
            let report = model.validate();
            let all_cyclic = (0..DEPTH).all(|i| {
                model
                    .base_type(type_id(&model, &format!("NS.T{i}")))
                    .is_some_and(|base| base.errors()[0].code == DiagnosticCode::BadCyclicEntity)
            });
            all_cyclic && report.contains(DiagnosticCode::BadCyclicEntity)
        });
        assert!(worker.join().expect("join"));
    }

    /// T0.5: A 1000-deep acyclic chain inherits its root key without deep
    /// recursion.
    #[test]
    fn deep_base_chain_inherits_root_key() {
        const DEPTH: usize = 1000;
        let worker = std::thread::spawn(|| {
            let mut schema = CsdlSchema::new("NS");
            schema.entity_types = (1..DEPTH)
                .map(|i| {
                    CsdlEntityType::new(format!("T{i}"))
                        .with_base_type(format!("NS.T{}", i - 1))
                })
                .collect();
            schema.entity_types.push(
                CsdlEntityType::new("T0")
                    .with_key(["Id"])
                    .with_property(CsdlProperty::new("Id", "Edm.Int32")),
            );
            let model = bind(&[schema]);
            let leaf = type_id(&model, &format!("NS.T{}", DEPTH - 1));
            (model.ancestors(leaf).len(), property_names(&model, &model.key(leaf)))
        });
        let (ancestors, key) = worker.join().expect("join");
        assert_eq!(ancestors, DEPTH - 1);
        assert_eq!(key, vec!["Id".to_string()]);
    }
}

// =============================================================================
// TIER T1: NAME REGISTRY COLLISIONS
// =============================================================================

mod t1_registry {
    use super::*;
    use edm_core::{ElementKind, NameMap};

    /// T1.1: Two registrations under one name become one ambiguous entry.
    #[test]
    fn collision_keeps_registration_order() {
        let mut map = NameMap::new(ElementKind::Type);
        map.register("NS.Foo", TypeId(1));
        map.register("NS.Foo", TypeId(2));

        let binding = map.find("NS.Foo").expect("entry");
        assert!(binding.is_ambiguous());
        assert_eq!(binding.candidates(), vec![TypeId(1), TypeId(2)]);
        assert_eq!(binding.errors()[0].code, DiagnosticCode::BadAmbiguousElementBinding);
    }

    /// T1.2: Unregistering down to one candidate downgrades the entry.
    #[test]
    fn unregister_downgrades_to_plain() {
        let mut map = NameMap::new(ElementKind::Type);
        map.register("NS.Foo", TypeId(1));
        map.register("NS.Foo", TypeId(2));

        assert!(map.unregister("NS.Foo", &TypeId(1)));
        assert_eq!(map.find("NS.Foo"), Some(&Binding::Resolved(TypeId(2))));
        assert!(map.unregister("NS.Foo", &TypeId(2)));
        assert!(map.find("NS.Foo").is_none());
    }

    /// T1.3: Schema types colliding across documents are reported once.
    #[test]
    fn colliding_types_are_reported() {
        let mut first = CsdlSchema::new("NS");
        first.entity_types = vec![CsdlEntityType::new("Foo")];
        let mut second = CsdlSchema::new("NS");
        second.entity_types = vec![CsdlEntityType::new("Foo")];

        let report = bind(&[first, second]).validate();
        assert_eq!(
            report
                .diagnostics()
                .iter()
                .filter(|d| d.code == DiagnosticCode::BadAmbiguousElementBinding)
                .count(),
            1
        );
    }
}

// =============================================================================
// TIER T2: ANNOTATION OVERLAYS
// =============================================================================

mod t2_annotations {
    use super::*;
    use edm_core::{DirectAnnotation, EdmError};

    const NS: &str = "urn:docs";

    fn documented() -> (SemanticModel, ElementKey) {
        let mut schema = CsdlSchema::new("NS");
        let mut order = CsdlEntityType::new("Order");
        order.direct_annotations = vec![DirectAnnotation::new(NS, "doc", "A")];
        schema.entity_types = vec![order];
        let model = bind(&[schema]);
        let key = ElementKey::Type(type_id(&model, "NS.Order"));
        (model, key)
    }

    /// T2.1: A tombstone hides the baseline; a later write replaces it.
    #[test]
    fn tombstone_round_trip() {
        let (mut model, order) = documented();
        assert_eq!(model.get_annotation(order, NS, "doc"), Some("A"));

        model.set_annotation(order, NS, "doc", None).expect("remove");
        assert_eq!(model.get_annotation(order, NS, "doc"), None);
        assert!(model.annotations(order).is_empty());

        model
            .set_annotation(order, NS, "doc", Some("B".to_string()))
            .expect("write");
        assert_eq!(model.get_annotation(order, NS, "doc"), Some("B"));
        assert_eq!(model.annotations(order).len(), 1);
    }

    /// T2.2: With overrides disabled, baseline annotations are immutable.
    #[test]
    fn baseline_override_can_be_rejected() {
        let mut schema = CsdlSchema::new("NS");
        let mut order = CsdlEntityType::new("Order");
        order.direct_annotations = vec![DirectAnnotation::new(NS, "doc", "A")];
        schema.entity_types = vec![order];
        let settings = ModelSettings {
            allow_annotation_override: false,
            ..ModelSettings::default()
        };
        let mut model = SemanticModel::from_schemas(&[schema], settings);
        let order = ElementKey::Type(type_id(&model, "NS.Order"));

        let result = model.set_annotation(order, NS, "doc", Some("B".to_string()));
        assert!(matches!(result, Err(EdmError::AnnotationOverride { .. })));
        assert_eq!(model.get_annotation(order, NS, "doc"), Some("A"));

        model
            .set_annotation(order, NS, "other", Some("C".to_string()))
            .expect("new annotation");
        assert_eq!(model.annotations(order).len(), 2);
    }
}

// =============================================================================
// TIER T3: END-TO-END SEMANTIC BINDING
// =============================================================================

mod t3_semantics {
    use super::*;

    fn order_customer() -> CsdlSchema {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            CsdlEntityType::new("Order")
                .with_key(["OrderId"])
                .with_property(CsdlProperty::new("OrderId", "Edm.Int32").not_null())
                .with_navigation(CsdlNavigationProperty::new(
                    "Customer",
                    "NS.OrderCustomer",
                    "Order",
                    "Customer",
                )),
            CsdlEntityType::new("Customer")
                .with_key(["CustomerId"])
                .with_property(CsdlProperty::new("CustomerId", "Edm.Int32").not_null()),
        ];
        schema.associations = vec![CsdlAssociation {
            name: "OrderCustomer".to_string(),
            ends: vec![
                CsdlAssociationEnd::new("Order", "NS.Order", Multiplicity::Many),
                CsdlAssociationEnd::new("Customer", "NS.Customer", Multiplicity::One),
            ],
            referential_constraint: Some(CsdlReferentialConstraint {
                principal: CsdlConstraintRole::new("Customer", ["CustomerId"]),
                dependent: CsdlConstraintRole::new("Order", ["OrderId"]),
                location: None,
            }),
            location: None,
        }];
        schema
    }

    /// A second document declaring another `NS.Order` with its own navigation.
    fn order_supplier() -> CsdlSchema {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            CsdlEntityType::new("Order")
                .with_key(["OrderId"])
                .with_property(CsdlProperty::new("OrderId", "Edm.Int32").not_null())
                .with_navigation(CsdlNavigationProperty::new(
                    "Supplier",
                    "NS.OrderSupplier",
                    "Order",
                    "Supplier",
                )),
            CsdlEntityType::new("Supplier")
                .with_key(["SupplierId"])
                .with_property(CsdlProperty::new("SupplierId", "Edm.Int32").not_null()),
        ];
        schema.associations = vec![CsdlAssociation {
            name: "OrderSupplier".to_string(),
            ends: vec![
                CsdlAssociationEnd::new("Order", "NS.Order", Multiplicity::Many),
                CsdlAssociationEnd::new("Supplier", "NS.Supplier", Multiplicity::ZeroOrOne),
            ],
            ..CsdlAssociation::default()
        }];
        schema
    }

    /// T3.1: Clashing type names become one ambiguous entry while each
    /// declaration's navigation still resolves on its own.
    #[test]
    fn ambiguous_type_keeps_independent_navigations() {
        let model = bind(&[order_customer(), order_supplier()]);

        let orders = model.find_type("NS.Order").expect("NS.Order");
        assert!(orders.is_ambiguous());
        let candidates = orders.candidates();
        assert_eq!(candidates.len(), 2);

        let customer_nav = model
            .find_property(candidates[0], "Customer")
            .and_then(|b| b.exact().copied())
            .expect("Order.Customer");
        let supplier_nav = model
            .find_property(candidates[1], "Supplier")
            .and_then(|b| b.exact().copied())
            .expect("Order.Supplier");
        assert!(model.find_property(candidates[0], "Supplier").is_none());
        assert!(model.find_property(candidates[1], "Customer").is_none());

        assert_eq!(
            model.navigation_target(customer_nav).as_ref().and_then(Binding::exact),
            Some(&type_id(&model, "NS.Customer"))
        );
        assert_eq!(
            model.navigation_target(supplier_nav).as_ref().and_then(Binding::exact),
            Some(&type_id(&model, "NS.Supplier"))
        );
        assert_eq!(model.navigation_multiplicity(customer_nav), Some(Multiplicity::One));
        assert_eq!(model.navigation_multiplicity(supplier_nav), Some(Multiplicity::ZeroOrOne));

        let dependents = model.dependent_properties(customer_nav).expect("dependents");
        assert_eq!(property_names(&model, &dependents), vec!["OrderId"]);
        assert!(model.dependent_properties(supplier_nav).is_none());

        // The silent partner on Customer is the principal end.
        let partner = model.partner(customer_nav).expect("partner");
        assert!(model.property(partner).expect("partner").is_silent());
        assert!(model.is_principal(partner));

        let report = model.validate();
        assert!(report.contains(DiagnosticCode::BadAmbiguousElementBinding), "{report}");
    }

    /// T3.2: Constraint dependents follow the principal key order.
    #[test]
    fn constraint_dependents_follow_key_order() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            CsdlEntityType::new("Principal")
                .with_key(["K1", "K2"])
                .with_property(CsdlProperty::new("K1", "Edm.Int32"))
                .with_property(CsdlProperty::new("K2", "Edm.Int32")),
            CsdlEntityType::new("Dependent")
                .with_key(["Id"])
                .with_property(CsdlProperty::new("Id", "Edm.Int32"))
                .with_property(CsdlProperty::new("D1", "Edm.Int32"))
                .with_property(CsdlProperty::new("D2", "Edm.Int32")),
        ];
        schema.associations = vec![CsdlAssociation {
            name: "Link".to_string(),
            ends: vec![
                CsdlAssociationEnd::new("P", "NS.Principal", Multiplicity::One),
                CsdlAssociationEnd::new("D", "NS.Dependent", Multiplicity::Many),
            ],
            referential_constraint: Some(CsdlReferentialConstraint {
                principal: CsdlConstraintRole::new("P", ["K2", "K1"]),
                dependent: CsdlConstraintRole::new("D", ["D2", "D1"]),
                location: None,
            }),
            location: None,
        }];
        let model = bind(&[schema]);
        let link = *model
            .find_association("NS.Link")
            .and_then(Binding::exact)
            .expect("NS.Link");

        let dependents = model.referential_constraint(link).expect("constraint");
        assert_eq!(property_names(&model, &dependents), vec!["D1", "D2"]);
        assert!(model.validate().is_valid());
    }

    /// T3.3: Import signatures pick one overload; a wrong arity names the import.
    #[test]
    fn target_paths_select_overloads() {
        let mut schema = CsdlSchema::new("NS");
        schema.entity_types = vec![
            CsdlEntityType::new("Widget")
                .with_key(["Id"])
                .with_property(CsdlProperty::new("Id", "Edm.Int32")),
        ];
        schema.entity_containers = vec![CsdlEntityContainer {
            name: "Container".to_string(),
            operation_imports: vec![
                CsdlOperationImport::function("Op", vec![CsdlParameter::new("count", "Edm.Int32")]),
                CsdlOperationImport::function(
                    "Op",
                    vec![
                        CsdlParameter::new("count", "Edm.Int32"),
                        CsdlParameter::new("widgets", "Collection(NS.Widget)"),
                    ],
                ),
            ],
            ..CsdlEntityContainer::default()
        }];
        let model = bind(&[schema]);

        let binding = model.resolve_target("Container/Op(Edm.Int32,Collection(NS.Widget))");
        let Some(AnnotationTarget::Operation(op)) = binding.exact().copied() else {
            unreachable!("expected one overload, got {binding:?}");
        };
        assert_eq!(model.operation(op).expect("operation").parameters().len(), 2);

        let mismatch = model.resolve_target("Container/Op(Edm.Int32,Edm.String,Edm.Int32)");
        assert!(mismatch.is_bad());
        assert!(mismatch.errors()[0].message.contains("Container/Op"));
    }

    /// T3.4: A path led by an ambiguous name carries the ambiguity instead
    /// of silently binding through the first candidate.
    #[test]
    fn ambiguous_leading_segment_is_reported() {
        let model = bind(&[order_customer(), order_supplier()]);

        let property = model.resolve_target("NS.Order/OrderId");
        assert!(property.is_bad());
        assert_eq!(property.exact(), None);
        assert_eq!(property.errors()[0].code, DiagnosticCode::BadAmbiguousElementBinding);

        let containers: Vec<CsdlSchema> = ["First", "Second"]
            .into_iter()
            .map(|namespace| {
                let mut schema = CsdlSchema::new(namespace);
                schema.entity_containers = vec![CsdlEntityContainer {
                    name: "Container".to_string(),
                    ..CsdlEntityContainer::default()
                }];
                schema
            })
            .collect();
        let model = bind(&containers);
        assert!(model.find_entity_container("Container").is_some_and(|b| b.is_ambiguous()));

        for path in ["Container/Things", "Container/Op/count"] {
            let target = model.resolve_target(path);
            assert_eq!(target.errors()[0].code, DiagnosticCode::BadAmbiguousElementBinding);
        }
        let qualified = model.resolve_target("First.Container/Things");
        assert_eq!(qualified.errors()[0].code, DiagnosticCode::BadUnresolvedContainerElement);
    }

    /// T3.5: JSON input binds like the syntax tree it describes.
    #[test]
    fn json_schemas_bind() {
        let json = r#"[{
            "namespace": "NS",
            "entity_types": [{
                "name": "Order",
                "key": ["Id"],
                "properties": [{ "name": "Id", "type": "Edm.Int32", "nullable": false }]
            }]
        }]"#;
        let model = SemanticModel::from_json(json, ModelSettings::default()).expect("bind");
        let order = type_id(&model, "NS.Order");
        assert_eq!(property_names(&model, &model.key(order)), vec!["Id"]);
        assert!(model.validate().is_valid());
    }
}
