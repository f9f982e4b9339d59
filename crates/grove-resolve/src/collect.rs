//! Candidate collection: declared members, then contributed ones.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::warn;

use crate::candidate::{CandidateId, MethodCandidate, Origin};
use crate::config::ResolveConfig;
use crate::contrib::{ContributionQuery, MemberContributor};
use crate::convert::ConversionRegistry;
use crate::error::ResolveError;
use crate::ty::Ty;
use crate::universe::{hierarchy, HierarchyEntry, TypeUniverse};

/// The type whose declaration is searched for members of `receiver`.
///
/// Arrays, function literals and record literals have no declaration of
/// their own and are looked up through the configured fallbacks. Dynamic
/// receivers fall back to the root type.
pub fn receiver_view(receiver: &Ty, config: &ResolveConfig) -> Ty {
    let fallbacks = &config.fallbacks;
    match receiver {
        Ty::Array(elem) => Ty::generic(fallbacks.array.clone(), vec![(**elem).clone()]),
        Ty::Function(_, ret) => Ty::generic(fallbacks.closure.clone(), vec![(**ret).clone()]),
        Ty::RecordLiteral(rec) => {
            let mut values = rec.fields.values();
            let value = match values.next() {
                Some(first) if values.all(|v| v.is_same_as(first)) => first.clone(),
                _ => Ty::Unknown,
            };
            Ty::generic(fallbacks.record.clone(), vec![Ty::string(), value])
        }
        Ty::Unknown | Ty::Error(_) | Ty::Param(_) | Ty::Var(_) => Ty::nominal(fallbacks.root.clone()),
        Ty::Nominal(_) | Ty::Parameterized(..) => receiver.clone(),
    }
}

/// Declared members named `name`, most-derived declaration first and each
/// declaration's methods in declaration order. A supertype member is
/// shadowed by an already collected member with the same name, arity and
/// parameter types in the receiver's view.
pub fn collect_declared(
    receiver: &Ty,
    name: &str,
    universe: &dyn TypeUniverse,
    config: &ResolveConfig,
) -> Vec<MethodCandidate> {
    let depth = config.max_hierarchy_depth;
    let view = receiver_view(receiver, config);
    let mut walk: Vec<HierarchyEntry<'_>> = hierarchy(universe, &view, depth);
    let root = &config.fallbacks.root;
    if !walk.iter().any(|e| &e.decl.name == root) {
        let base = walk.iter().map(|e| e.depth).max().map_or(0, |d| d + 1);
        walk.extend(
            hierarchy(universe, &Ty::nominal(root.clone()), depth)
                .into_iter()
                .map(|mut e| {
                    e.depth += base;
                    e
                }),
        );
    }

    let mut out: Vec<MethodCandidate> = Vec::new();
    let mut seen: FxHashSet<(usize, Vec<Ty>)> = FxHashSet::default();
    for entry in &walk {
        for method in universe.methods(entry.decl).iter().filter(|m| m.name == name) {
            let sig = method.substitute(&entry.bindings);
            let shape: Vec<Ty> = sig.params.iter().map(|p| p.declared_ty()).collect();
            if !seen.insert((shape.len(), shape)) {
                continue;
            }
            out.push(MethodCandidate::declared(entry.view.clone(), sig));
        }
    }
    out
}

/// Declared members, then each contributor's offerings in registration
/// order. The collector owns the list; contributions are appended after
/// validation.
pub fn collect(
    receiver: &Ty,
    name: &str,
    contributors: &[Arc<dyn MemberContributor>],
    universe: &dyn TypeUniverse,
    config: &ResolveConfig,
    conversions: &ConversionRegistry,
) -> Result<Vec<MethodCandidate>, ResolveError> {
    let mut candidates = collect_declared(receiver, name, universe, config);
    let mut ids: FxHashSet<CandidateId> = candidates.iter().map(|c| c.id.clone()).collect();

    for contributor in contributors {
        let offered = {
            let query = ContributionQuery {
                receiver,
                name,
                existing: &candidates,
                universe,
                config,
                conversions,
            };
            contributor.contribute(&query)
        };
        for candidate in offered {
            if candidate.origin == Origin::Declared {
                return Err(ResolveError::InternalInconsistency(format!(
                    "contributor `{}` returned `{}` tagged as declared",
                    contributor.name(),
                    candidate.id
                )));
            }
            if !ids.insert(candidate.id.clone()) {
                warn!(
                    target: "resolve",
                    contributor = contributor.name(),
                    candidate = %candidate.id,
                    "dropping duplicate contributed candidate"
                );
                continue;
            }
            candidates.push(candidate);
        }
    }
    Ok(candidates)
}
