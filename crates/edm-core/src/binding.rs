//! # Bindings
//!
//! Error-as-value results of name resolution.
//!
//! Every lookup in the engine returns a `Binding<T>` instead of failing:
//! - `Resolved(T)`: exactly one element answered to the name
//! - `Unresolved(BadElement)`: nothing answered, the placeholder carries why
//! - `Ambiguous(AmbiguousBinding<T>)`: two or more elements share the name
//!
//! Placeholders follow one inert policy: they resolve to no definition
//! (ambiguous bindings defer to their first candidate), so model accessors
//! fed with them answer `None`, empty collections or `false`. Nothing here
//! panics; callers walk the graph first and check `errors()` afterwards.

use crate::types::{Diagnostic, DiagnosticCode, ElementKind};

// =============================================================================
// BAD ELEMENT
// =============================================================================

/// Placeholder for an element that could not be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadElement {
    name: String,
    expected: ElementKind,
    diagnostics: Vec<Diagnostic>,
}

impl BadElement {
    /// Create a placeholder from its identity and the defects found.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        expected: ElementKind,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            name: name.into(),
            expected,
            diagnostics,
        }
    }

    /// Shorthand for a placeholder with a single diagnostic.
    #[must_use]
    pub fn with_error(
        name: impl Into<String>,
        expected: ElementKind,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self::new(name, expected, vec![Diagnostic::new(code, message)])
    }

    /// The name that failed to bind.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of element that was expected at this position.
    #[must_use]
    pub fn expected(&self) -> ElementKind {
        self.expected
    }

    /// Defects explaining why the element is bad.
    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

// =============================================================================
// AMBIGUOUS BINDING
// =============================================================================

/// Composite of two or more same-named candidates.
///
/// The first candidate answers for the binding; the binding itself reports a
/// single `BadAmbiguousElementBinding` diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousBinding<T> {
    name: String,
    kind: ElementKind,
    candidates: Vec<T>,
    diagnostic: [Diagnostic; 1],
}

impl<T: Clone + PartialEq> AmbiguousBinding<T> {
    /// Build from the two colliding candidates, in registration order.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ElementKind, first: T, second: T) -> Self {
        let name = name.into();
        let diagnostic = Diagnostic::new(
            DiagnosticCode::BadAmbiguousElementBinding,
            format!("The name '{name}' is ambiguous: more than one {kind} is declared with it."),
        );
        Self {
            name,
            kind,
            candidates: vec![first, second],
            diagnostic: [diagnostic],
        }
    }

    /// Build from an already collected candidate list.
    ///
    /// Returns `None` unless there are at least two candidates.
    #[must_use]
    pub fn from_candidates(
        name: impl Into<String>,
        kind: ElementKind,
        candidates: Vec<T>,
    ) -> Option<Self> {
        let mut iter = candidates.into_iter();
        let first = iter.next()?;
        let second = iter.next()?;
        let mut binding = Self::new(name, kind, first, second);
        binding.candidates.extend(iter);
        Some(binding)
    }

    /// Append another same-named candidate.
    pub fn add_binding(&mut self, candidate: T) {
        self.candidates.push(candidate);
    }

    /// Remove one candidate. Returns `true` if it was present.
    pub fn remove_binding(&mut self, candidate: &T) -> bool {
        match self.candidates.iter().position(|c| c == candidate) {
            Some(index) => {
                self.candidates.remove(index);
                true
            }
            None => false,
        }
    }

    /// All candidates in registration order.
    #[must_use]
    pub fn candidates(&self) -> &[T] {
        &self.candidates
    }

    /// The candidate that answers for the binding.
    #[must_use]
    pub fn primary(&self) -> Option<&T> {
        self.candidates.first()
    }

    /// The shared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of the candidates.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The ambiguity diagnostic.
    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        &self.diagnostic
    }

    /// Collapse into a plain binding once fewer than two candidates remain.
    #[must_use]
    pub fn into_binding(mut self) -> Option<Binding<T>> {
        match self.candidates.len() {
            0 => None,
            1 => self.candidates.pop().map(Binding::Resolved),
            _ => Some(Binding::Ambiguous(self)),
        }
    }
}

// =============================================================================
// BINDING
// =============================================================================

/// Outcome of binding a name to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding<T> {
    Resolved(T),
    Unresolved(BadElement),
    Ambiguous(AmbiguousBinding<T>),
}

impl<T: Clone + PartialEq> Binding<T> {
    /// Shorthand for an unresolved placeholder with one diagnostic.
    #[must_use]
    pub fn unresolved(
        name: impl Into<String>,
        expected: ElementKind,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self::Unresolved(BadElement::with_error(name, expected, code, message))
    }

    /// The element answering for this binding.
    ///
    /// Ambiguous bindings defer to their first candidate.
    #[must_use]
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Unresolved(_) => None,
            Self::Ambiguous(ambiguous) => ambiguous.primary(),
        }
    }

    /// The element only if the binding is clean.
    #[must_use]
    pub fn exact(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Every element that answered to the name.
    #[must_use]
    pub fn candidates(&self) -> Vec<T> {
        match self {
            Self::Resolved(value) => vec![value.clone()],
            Self::Unresolved(_) => Vec::new(),
            Self::Ambiguous(ambiguous) => ambiguous.candidates().to_vec(),
        }
    }

    /// Capability check: does this binding stand in for a defect?
    #[must_use]
    pub fn is_bad(&self) -> bool {
        !matches!(self, Self::Resolved(_))
    }

    /// `true` for the ambiguous composite.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }

    /// Defects carried by the binding itself.
    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        match self {
            Self::Resolved(_) => &[],
            Self::Unresolved(bad) => bad.errors(),
            Self::Ambiguous(ambiguous) => ambiguous.errors(),
        }
    }

    /// Map the bound element, keeping placeholders as they are.
    #[must_use]
    pub fn map<U: Clone + PartialEq>(self, f: impl Fn(T) -> U) -> Binding<U> {
        match self {
            Self::Resolved(value) => Binding::Resolved(f(value)),
            Self::Unresolved(bad) => Binding::Unresolved(bad),
            Self::Ambiguous(ambiguous) => {
                let AmbiguousBinding {
                    name,
                    kind,
                    candidates,
                    diagnostic,
                } = ambiguous;
                Binding::Ambiguous(AmbiguousBinding {
                    name,
                    kind,
                    candidates: candidates.into_iter().map(f).collect(),
                    diagnostic,
                })
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
