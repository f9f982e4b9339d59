//! Structural argument mapping.
//!
//! Decides which call argument feeds which parameter using only the shape
//! of the parameter list (closure-capable tail, named collector, optional
//! and vararg flags). Types are not consulted; that is the filter's job.

use serde::Serialize;

use crate::args::{ArgSource, ArgumentList};
use crate::candidate::{ArityRange, MethodCandidate};
use crate::error::{ArgKind, ResolveError};
use crate::universe::Param;

/// How one parameter is bound.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "binding", content = "sources", rename_all = "lowercase")]
pub enum SlotBinding {
    Single(ArgSource),
    /// A vararg tail receiving zero or more positional arguments.
    Spread(Vec<ArgSource>),
    /// A named collector receiving the call's named arguments.
    Named(Vec<ArgSource>),
    /// Left unbound; the declared default applies.
    Default,
}

/// A total mapping: one binding per parameter, in parameter order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub slots: Vec<SlotBinding>,
}

impl Mapping {
    pub fn slot(&self, param: usize) -> Option<&SlotBinding> {
        self.slots.get(param)
    }

    /// Every argument source bound by this mapping, sorted.
    pub fn bound_sources(&self) -> Vec<ArgSource> {
        let mut out = Vec::new();
        for slot in &self.slots {
            match slot {
                SlotBinding::Single(s) => out.push(*s),
                SlotBinding::Spread(list) | SlotBinding::Named(list) => out.extend(list.iter().copied()),
                SlotBinding::Default => {}
            }
        }
        out.sort();
        out
    }

    pub fn defaulted_count(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, SlotBinding::Default)).count()
    }

    /// The parameter an argument was bound to.
    pub fn param_for(&self, source: ArgSource) -> Option<usize> {
        self.slots.iter().position(|slot| match slot {
            SlotBinding::Single(s) => *s == source,
            SlotBinding::Spread(list) | SlotBinding::Named(list) => list.contains(&source),
            SlotBinding::Default => false,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ArgumentMapping {
    Mapped(Mapping),
    Unmapped(ResolveError),
}

/// A parameter a trailing closure may bind to.
fn accepts_closure(param: &Param) -> bool {
    !param.vararg && !param.is_collector() && (param.ty.is_function() || param.ty.is_dynamic())
}

/// Map `args` onto `candidate`'s parameters.
///
/// Trailing closures take the closure-capable tail of the parameter list,
/// last closure to last parameter. The last parameter not taken by a closure
/// receives all named arguments if it is a collector. Positional arguments
/// fill what is left from the left, surplus arguments going to optional
/// parameters in order, then to a vararg tail.
pub fn map_arguments(candidate: &MethodCandidate, args: &ArgumentList) -> ArgumentMapping {
    match try_map(candidate, args) {
        Ok(mapping) => ArgumentMapping::Mapped(mapping),
        Err(err) => ArgumentMapping::Unmapped(err),
    }
}

fn try_map(candidate: &MethodCandidate, args: &ArgumentList) -> Result<Mapping, ResolveError> {
    let params = candidate.params();
    let mut slots = vec![SlotBinding::Default; params.len()];
    let mut taken = vec![false; params.len()];

    // Trailing closures.
    let tail = params.iter().rev().take_while(|p| accepts_closure(p)).count();
    let closures = args.closures.len();
    if closures > tail {
        return Err(ResolveError::ArityMismatch {
            candidate: candidate.id.clone(),
            expected: ArityRange { min: 0, max: Some(tail) },
            found: closures,
            kind: ArgKind::Closure,
        });
    }
    let first_closure_param = params.len() - closures;
    for i in 0..closures {
        slots[first_closure_param + i] = SlotBinding::Single(ArgSource::Closure(i));
        taken[first_closure_param + i] = true;
    }

    // Named collector.
    let collector = (0..first_closure_param)
        .next_back()
        .filter(|&i| params[i].is_collector());
    match collector {
        Some(idx) => {
            let schema = params[idx].schema().cloned().unwrap_or_default();
            for (i, named) in args.named.iter().enumerate() {
                if schema.key(&named.key).is_none() && !schema.open {
                    return Err(ResolveError::UnknownNamedArgument {
                        candidate: candidate.id.clone(),
                        key: named.key.clone(),
                        source: ArgSource::Named(i),
                    });
                }
            }
            if let Some(missing) = schema
                .required_keys()
                .find(|k| !args.named.iter().any(|n| n.key == k.name))
            {
                return Err(ResolveError::MissingNamedKey {
                    candidate: candidate.id.clone(),
                    key: missing.name.clone(),
                });
            }
            if !args.named.is_empty() {
                slots[idx] = SlotBinding::Named((0..args.named.len()).map(ArgSource::Named).collect());
            }
            taken[idx] = true;
        }
        None => {
            if let Some(named) = args.named.first() {
                return Err(ResolveError::UnknownNamedArgument {
                    candidate: candidate.id.clone(),
                    key: named.key.clone(),
                    source: ArgSource::Named(0),
                });
            }
        }
    }

    // Collectors that did not receive the named arguments only accept
    // their default.
    for (i, p) in params.iter().enumerate() {
        if taken[i] || !p.is_collector() {
            continue;
        }
        if let Some(key) = p.schema().and_then(|s| s.required_keys().next()) {
            return Err(ResolveError::MissingNamedKey {
                candidate: candidate.id.clone(),
                key: key.name.clone(),
            });
        }
        taken[i] = true;
    }

    // Positional.
    let open: Vec<usize> = (0..params.len()).filter(|&i| !taken[i]).collect();
    let vararg = open.last().copied().filter(|&i| params[i].vararg);
    let fixed = match vararg {
        Some(_) => &open[..open.len() - 1],
        None => &open[..],
    };
    let required = fixed.iter().filter(|&&i| !params[i].optional).count();
    let supplied = args.positional.len();
    let too_many = vararg.is_none() && supplied > fixed.len();
    if supplied < required || too_many {
        return Err(ResolveError::ArityMismatch {
            candidate: candidate.id.clone(),
            expected: ArityRange {
                min: required,
                max: vararg.map_or(Some(fixed.len()), |_| None),
            },
            found: supplied,
            kind: ArgKind::Positional,
        });
    }

    let mut surplus = supplied - required;
    let mut next = 0;
    for &i in fixed {
        if params[i].optional {
            if surplus == 0 {
                continue;
            }
            surplus -= 1;
        }
        slots[i] = SlotBinding::Single(ArgSource::Positional(next));
        next += 1;
    }
    if let Some(i) = vararg {
        slots[i] = SlotBinding::Spread((next..supplied).map(ArgSource::Positional).collect());
    }

    Ok(Mapping { slots })
}
