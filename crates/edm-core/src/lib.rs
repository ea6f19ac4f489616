//! # edm-core
//!
//! The semantic model engine of edmkit.
//!
//! This crate binds already-parsed schema documents (CSDL) into a queryable
//! EDM object graph, and lets callers build the same graph element by element.
//!
//! ## Engine Mechanisms
//!
//! - `cache`: memoized derived values that detect and break cycles
//! - `dependency`: trigger → dependent invalidation for the constructible model
//! - `binding`: unresolved and ambiguous names as placeholder values
//! - `registry`: name → element dictionaries that collapse collisions
//! - `annotations`: transient annotation overlays on an immutable baseline
//! - `semantics`: lazy resolution, referential constraints, annotation targets
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no file I/O (pure Rust)
//! - Deterministic: `BTreeMap` only, registration order preserved
//! - Name resolution never fails; defects are carried as `Diagnostic`s
//! - The library logs through `tracing` and never installs a subscriber

// =============================================================================
// MODULES
// =============================================================================

pub mod annotations;
pub mod binding;
pub mod cache;
pub mod constructible;
pub mod csdl;
pub mod dependency;
pub mod model;
pub mod primitives;
pub mod registry;
pub mod semantics;
pub mod settings;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AnnotationId, AssociationId, ContainerElementId, ContainerId, Diagnostic, DiagnosticCode,
    EdmError, ElementKey, ElementKind, ErrorCategory, Location, Multiplicity, OperationId,
    OperationKind, PropertyId, TermId, TypeId,
};

// =============================================================================
// RE-EXPORTS: Engine Mechanisms
// =============================================================================

pub use annotations::{AnnotationManager, DirectAnnotation};
pub use binding::{AmbiguousBinding, BadElement, Binding};
pub use cache::{Cache, CacheStatus};
pub use dependency::DependencyGraph;
pub use registry::{NameMap, OperationMap, Overloads};

// =============================================================================
// RE-EXPORTS: Model
// =============================================================================

pub use constructible::ConstructibleModel;
pub use model::{
    AnnotationTarget, ContainerElementKind, NavigationEnd, OperationScope, PropertyKind,
    SemanticModel, TypeDefinition, TypeKind, TypeReference,
};
pub use primitives::PrimitiveKind;
pub use semantics::signatures::TypeExpr;
pub use settings::ModelSettings;
pub use validation::ValidationReport;

// =============================================================================
// RE-EXPORTS: Input
// =============================================================================

pub use csdl::CsdlSchema;
