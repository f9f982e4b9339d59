//! Result types of resolved calls.
//!
//! Calculators are keyed by declaring type and method name, either of which
//! may be a wildcard, and tried in registration order. The first one that
//! produces a type wins. Without one, the declared return type is used with
//! every inferred binding applied and anything still generic erased to
//! `Unknown`, so a resolved call always has a type.

use std::fmt;
use std::sync::Arc;

use crate::args::{ArgSource, ArgumentList};
use crate::filter::ApplicableCandidate;
use crate::ty::Ty;

/// What a calculator sees about a resolved call.
pub struct CallTypeInput<'a> {
    pub receiver: &'a Ty,
    pub resolved: &'a ApplicableCandidate,
    pub args: &'a ArgumentList,
}

impl<'a> CallTypeInput<'a> {
    /// Types of the bound arguments, in argument order.
    pub fn bound_types(&self) -> Vec<(ArgSource, &'a Ty)> {
        self.resolved
            .mapping
            .bound_sources()
            .into_iter()
            .filter_map(|s| self.args.get(s).map(|a| (s, &a.ty)))
            .collect()
    }

    /// The declared return type after substitution, generic leftovers erased.
    pub fn substituted_return(&self) -> Ty {
        self.resolved.instantiated.return_type.erase_params()
    }
}

pub trait CallTypeCalculator: Send + Sync {
    fn name(&self) -> &str;

    /// `None` passes to the next calculator.
    fn compute_type(&self, input: &CallTypeInput<'_>) -> Option<Ty>;
}

/// `None` matches anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalculatorKey {
    pub declaring: Option<String>,
    pub method: Option<String>,
}

impl CalculatorKey {
    pub fn new(declaring: &str, method: &str) -> Self {
        let part = |s: &str| (s != "*").then(|| s.to_string());
        CalculatorKey {
            declaring: part(declaring),
            method: part(method),
        }
    }

    pub fn matches(&self, declaring: &str, method: &str) -> bool {
        self.declaring.as_deref().map_or(true, |d| d == declaring)
            && self.method.as_deref().map_or(true, |m| m == method)
    }
}

impl fmt::Display for CalculatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}",
            self.declaring.as_deref().unwrap_or("*"),
            self.method.as_deref().unwrap_or("*")
        )
    }
}

#[derive(Clone, Default)]
pub struct CalculatorRegistry {
    entries: Vec<(CalculatorKey, Arc<dyn CallTypeCalculator>)>,
}

impl fmt::Debug for CalculatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(k, c)| format!("{} => {}", k, c.name())))
            .finish()
    }
}

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: CalculatorKey, calculator: Arc<dyn CallTypeCalculator>) {
        self.entries.push((key, calculator));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The call's result type and the calculator that produced it (`None`
    /// for the substitution fallback).
    pub fn compute(&self, input: &CallTypeInput<'_>) -> (Ty, Option<&str>) {
        let candidate = &input.resolved.candidate;
        let declaring = candidate.declaring.base_name().unwrap_or("");
        for (key, calculator) in &self.entries {
            if !key.matches(declaring, candidate.name()) {
                continue;
            }
            if let Some(ty) = calculator.compute_type(input) {
                return (ty.erase_params(), Some(calculator.name()));
            }
        }
        (input.substituted_return(), None)
    }
}

/// Element type of a collection-like type: `T[]` and single-argument
/// generics such as `List<T>` or `Set<T>`.
fn element_type(ty: &Ty) -> Option<Ty> {
    match ty {
        Ty::Array(elem) => Some((**elem).clone()),
        Ty::Parameterized(_, args) if args.len() == 1 => Some(args[0].clone()),
        _ => None,
    }
}

/// The result is the element type of the first bound argument:
/// `Collections.max(List<Int>)` is `Int`.
#[derive(Debug, Default)]
pub struct FirstArgumentElementType;

impl CallTypeCalculator for FirstArgumentElementType {
    fn name(&self) -> &str {
        "first-argument-element"
    }

    fn compute_type(&self, input: &CallTypeInput<'_>) -> Option<Ty> {
        let (_, first) = input.bound_types().into_iter().next()?;
        element_type(first)
    }
}

/// `Base<R>` where `R` is the return type of the call's last closure:
/// `collect { it.name }` on a `List<Person>` is `List<String>`.
#[derive(Debug)]
pub struct ClosureResultCollection {
    pub base: String,
}

impl ClosureResultCollection {
    pub fn new(base: impl Into<String>) -> Self {
        ClosureResultCollection { base: base.into() }
    }
}

impl CallTypeCalculator for ClosureResultCollection {
    fn name(&self) -> &str {
        "closure-result-collection"
    }

    fn compute_type(&self, input: &CallTypeInput<'_>) -> Option<Ty> {
        let closure = input
            .bound_types()
            .into_iter()
            .filter(|(_, ty)| ty.is_function())
            .last()?;
        match closure.1 {
            Ty::Function(_, ret) => Some(Ty::generic(self.base.clone(), vec![(**ret).clone()])),
            _ => None,
        }
    }
}
