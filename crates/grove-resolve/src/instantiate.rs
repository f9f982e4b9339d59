//! Inferring a generic method's own type parameters from its arguments.

use crate::args::{ArgSource, ArgumentList};
use crate::candidate::MethodCandidate;
use crate::config::ResolveConfig;
use crate::mapper::{Mapping, SlotBinding};
use crate::ty::{Substitution, Ty};
use crate::unify::BindingCtx;
use crate::universe::{view_as, TypeUniverse};

/// Bindings for `candidate.sig.type_params`, taken from the arguments that
/// `mapping` binds. Parameters no argument constrains map to `Unknown`.
///
/// Arguments are matched in parameter order and the first consistent
/// binding of each parameter wins; an argument whose type conflicts with an
/// earlier binding is skipped here and caught by the applicability check.
pub fn infer_method_bindings(
    candidate: &MethodCandidate,
    mapping: &Mapping,
    args: &ArgumentList,
    universe: &dyn TypeUniverse,
    config: &ResolveConfig,
) -> Substitution {
    let sig = &candidate.sig;
    if sig.type_params.is_empty() {
        return Substitution::default();
    }
    let mut ctx = BindingCtx::with_params(&sig.type_params);
    let arg_ty = |source: ArgSource| args.get(source).map(|a| a.ty.clone()).unwrap_or(Ty::Unknown);

    for (param, slot) in sig.params.iter().zip(&mapping.slots) {
        match slot {
            SlotBinding::Single(source) => {
                let pattern = ctx.instantiate(&param.declared_ty());
                let actual = lift(universe, config, &pattern, &arg_ty(*source));
                ctx.bind(&pattern, &actual);
            }
            SlotBinding::Spread(sources) => {
                if let [only] = sources.as_slice() {
                    let whole = ctx.instantiate(&param.declared_ty());
                    if ctx.bind(&whole, &arg_ty(*only)) {
                        continue;
                    }
                }
                let pattern = ctx.instantiate(&param.ty);
                for source in sources {
                    let actual = lift(universe, config, &pattern, &arg_ty(*source));
                    ctx.bind(&pattern, &actual);
                }
            }
            SlotBinding::Named(sources) => {
                let Some(schema) = param.schema() else {
                    continue;
                };
                for source in sources {
                    let ArgSource::Named(i) = *source else {
                        continue;
                    };
                    let Some(named) = args.named.get(i) else {
                        continue;
                    };
                    if let Some(key) = schema.key(&named.key) {
                        let pattern = ctx.instantiate(&key.ty);
                        let actual = lift(universe, config, &pattern, &named.value.ty);
                        ctx.bind(&pattern, &actual);
                    }
                }
            }
            SlotBinding::Default => {}
        }
    }
    ctx.bindings()
}

/// Present `actual` in the shape of `pattern` when their heads differ:
/// an `ArrayList<Int>` argument for a `Collection<T>` parameter is matched
/// as `Collection<Int>`.
fn lift(universe: &dyn TypeUniverse, config: &ResolveConfig, pattern: &Ty, actual: &Ty) -> Ty {
    let (Some(want), Some(have)) = (pattern.base_name(), actual.base_name()) else {
        return actual.clone();
    };
    if want == have {
        return actual.clone();
    }
    view_as(universe, actual, want, config.max_hierarchy_depth)
        .map(|(view, _)| view)
        .unwrap_or_else(|| actual.clone())
}
