//! Call-site arguments.

use grove_common::Span;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::ResolveError;
use crate::ty::Ty;

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub ty: Ty,
    pub span: Option<Span>,
}

impl Argument {
    pub fn new(ty: Ty) -> Self {
        Argument { ty, span: None }
    }

    pub fn at(ty: Ty, span: Span) -> Self {
        Argument { ty, span: Some(span) }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedArgument {
    pub key: String,
    pub value: Argument,
}

/// Which argument of the call a slot was bound from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum ArgSource {
    Positional(usize),
    Named(usize),
    Closure(usize),
}

/// The arguments of one call: `f(a, b, key: v) { closure }`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgumentList {
    pub positional: Vec<Argument>,
    pub named: Vec<NamedArgument>,
    /// Trailing closures in source order.
    pub closures: Vec<Argument>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(mut self, ty: Ty) -> Self {
        self.positional.push(Argument::new(ty));
        self
    }

    pub fn named(mut self, key: impl Into<String>, ty: Ty) -> Self {
        self.named.push(NamedArgument {
            key: key.into(),
            value: Argument::new(ty),
        });
        self
    }

    pub fn closure(mut self, ty: Ty) -> Self {
        self.closures.push(Argument::new(ty));
        self
    }

    pub fn push_positional(&mut self, arg: Argument) {
        self.positional.push(arg);
    }

    pub fn push_named(&mut self, key: impl Into<String>, value: Argument) {
        self.named.push(NamedArgument {
            key: key.into(),
            value,
        });
    }

    pub fn push_closure(&mut self, arg: Argument) {
        self.closures.push(arg);
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len() + self.closures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, source: ArgSource) -> Option<&Argument> {
        match source {
            ArgSource::Positional(i) => self.positional.get(i),
            ArgSource::Named(i) => self.named.get(i).map(|n| &n.value),
            ArgSource::Closure(i) => self.closures.get(i),
        }
    }

    /// Every argument of the call, positional first, then named, then
    /// closures.
    pub fn sources(&self) -> impl Iterator<Item = ArgSource> + '_ {
        (0..self.positional.len())
            .map(ArgSource::Positional)
            .chain((0..self.named.len()).map(ArgSource::Named))
            .chain((0..self.closures.len()).map(ArgSource::Closure))
    }

    /// Call-site checks that do not depend on any candidate. A named key
    /// given twice is reported at its second occurrence.
    pub fn validate(&self) -> Result<(), ResolveError> {
        let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, named) in self.named.iter().enumerate() {
            if let Some(&first) = seen.get(named.key.as_str()) {
                return Err(ResolveError::DuplicateNamedArgument {
                    key: named.key.clone(),
                    first: self.named[first].value.span,
                    span: named.value.span,
                });
            }
            seen.insert(&named.key, i);
        }
        Ok(())
    }
}
