//! Applicability: turning a structural mapping into a costed verdict.

use serde::Serialize;

use crate::args::{ArgSource, ArgumentList};
use crate::candidate::MethodCandidate;
use crate::convert::{Conversion, ConversionCx, Cost, Position};
use crate::error::ResolveError;
use crate::instantiate::infer_method_bindings;
use crate::mapper::{Mapping, SlotBinding};
use crate::ty::{Substitution, Ty};
use crate::universe::MethodSig;

/// The conversion applied to one argument.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotConversion {
    pub param: usize,
    pub source: ArgSource,
    #[serde(serialize_with = "display")]
    pub expected: Ty,
    #[serde(serialize_with = "display")]
    pub found: Ty,
    pub conversion: Conversion,
}

fn display<S: serde::Serializer>(ty: &Ty, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(ty)
}

/// A candidate that survived filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicableCandidate {
    pub candidate: MethodCandidate,
    pub mapping: Mapping,
    /// Inferred bindings of the method's own type parameters.
    pub bindings: Substitution,
    /// `candidate.sig` with `bindings` applied.
    pub instantiated: MethodSig,
    /// One entry per bound argument, in parameter order.
    pub conversions: Vec<SlotConversion>,
    pub cost: Cost,
    /// Whether a vararg tail was applied element-wise.
    pub spread: bool,
}

impl ApplicableCandidate {
    /// The parameter type an argument was checked against.
    pub fn expected_for(&self, source: ArgSource) -> Option<&Ty> {
        self.conversions
            .iter()
            .find(|c| c.source == source)
            .map(|c| &c.expected)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Applicability {
    Applicable(ApplicableCandidate),
    Inapplicable(ResolveError),
}

/// Check every bound argument at `MethodParameter` position. The first
/// failing slot makes the candidate inapplicable.
pub fn check_applicability(
    candidate: &MethodCandidate,
    mapping: Mapping,
    args: &ArgumentList,
    cx: &ConversionCx<'_>,
) -> Applicability {
    let bindings = infer_method_bindings(candidate, &mapping, args, cx.universe, cx.config);
    let instantiated = candidate.sig.instantiate(&bindings);
    let mut conversions = Vec::new();
    let mut spread = false;

    let found_ty = |source: ArgSource| args.get(source).map(|a| a.ty.clone()).unwrap_or(Ty::Unknown);
    let check = |param: usize, name: &str, expected: Ty, source: ArgSource, out: &mut Vec<SlotConversion>| {
        let found = found_ty(source);
        match cx.convert(&expected, &found, Position::MethodParameter) {
            Some(conversion) => {
                out.push(SlotConversion {
                    param,
                    source,
                    expected,
                    found,
                    conversion,
                });
                Ok(())
            }
            None => Err(ResolveError::ConversionError {
                candidate: candidate.id.clone(),
                param: name.to_string(),
                expected,
                found,
                source,
            }),
        }
    };

    for (i, (param, slot)) in instantiated.params.iter().zip(&mapping.slots).enumerate() {
        let result = match slot {
            SlotBinding::Single(source) => {
                check(i, &param.name, param.declared_ty().erase_params(), *source, &mut conversions)
            }
            SlotBinding::Spread(sources) => {
                let direct = match sources.as_slice() {
                    [only] => {
                        let mut attempt = Vec::new();
                        check(i, &param.name, param.declared_ty().erase_params(), *only, &mut attempt)
                            .ok()
                            .map(|_| attempt)
                    }
                    _ => None,
                };
                match direct {
                    Some(attempt) => {
                        conversions.extend(attempt);
                        Ok(())
                    }
                    None => {
                        spread = true;
                        let element = param.ty.erase_params();
                        sources
                            .iter()
                            .try_for_each(|s| check(i, &param.name, element.clone(), *s, &mut conversions))
                    }
                }
            }
            SlotBinding::Named(sources) => sources.iter().try_for_each(|source| {
                let ArgSource::Named(n) = *source else {
                    return Ok(());
                };
                let key = args.named.get(n).map(|a| a.key.as_str()).unwrap_or_default();
                let expected = param
                    .schema()
                    .and_then(|s| s.key(key))
                    .map(|k| k.ty.erase_params())
                    .unwrap_or(Ty::Unknown);
                check(i, &format!("{}.{}", param.name, key), expected, *source, &mut conversions)
            }),
            SlotBinding::Default => Ok(()),
        };
        if let Err(err) = result {
            return Applicability::Inapplicable(err);
        }
    }

    let mut cost: Cost = conversions
        .iter()
        .fold(0, |total: Cost, c| total.saturating_add(c.conversion.cost));
    if spread {
        cost = cost.saturating_add(cx.config.costs.vararg_spread);
    }
    Applicability::Applicable(ApplicableCandidate {
        candidate: candidate.clone(),
        mapping,
        bindings,
        instantiated,
        conversions,
        cost,
        spread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolveConfig;
    use crate::convert::ConversionRegistry;
    use crate::mapper::{map_arguments, ArgumentMapping};
    use crate::universe::{InMemoryUniverse, NamedKey, NamedSchema, Param};

    fn run(sig: MethodSig, args: &ArgumentList) -> Applicability {
        let universe = InMemoryUniverse::new();
        let config = ResolveConfig::default();
        let registry = ConversionRegistry::new();
        let cx = ConversionCx {
            universe: &universe,
            config: &config,
            registry: &registry,
        };
        let candidate = MethodCandidate::declared(Ty::nominal("Util"), sig);
        let ArgumentMapping::Mapped(mapping) = map_arguments(&candidate, args) else {
            panic!("mapping failed");
        };
        check_applicability(&candidate, mapping, args, &cx)
    }

    fn applicable(sig: MethodSig, args: &ArgumentList) -> ApplicableCandidate {
        match run(sig, args) {
            Applicability::Applicable(a) => a,
            Applicability::Inapplicable(e) => panic!("unexpected rejection: {}", e),
        }
    }

    #[test]
    fn spread_costs_more_than_a_fixed_parameter() {
        let one = ArgumentList::new().positional(Ty::int());
        let fixed = applicable(MethodSig::new("f", vec![Param::positional("x", Ty::int())], Ty::Unknown), &one);
        let vararg = applicable(MethodSig::new("f", vec![Param::vararg("xs", Ty::int())], Ty::Unknown), &one);
        assert_eq!(fixed.cost, 0);
        assert_eq!(vararg.cost, 1);
        assert!(vararg.spread);
    }

    #[test]
    fn single_array_argument_uses_direct_form() {
        let whole = ArgumentList::new().positional(Ty::array(Ty::int()));
        let a = applicable(MethodSig::new("f", vec![Param::vararg("xs", Ty::int())], Ty::Unknown), &whole);
        assert!(!a.spread);
        assert_eq!(a.cost, 0);
        assert_eq!(a.expected_for(ArgSource::Positional(0)), Some(&Ty::array(Ty::int())));
    }

    #[test]
    fn generic_parameters_are_checked_after_inference() {
        let sig = MethodSig::new(
            "pair",
            vec![Param::positional("a", Ty::param("T")), Param::positional("b", Ty::param("T"))],
            Ty::param("T"),
        )
        .with_type_params(&["T"]);
        let ok = applicable(sig.clone(), &ArgumentList::new().positional(Ty::int()).positional(Ty::int()));
        assert_eq!(ok.instantiated.return_type, Ty::int());
        // T binds to String first; Int then fails to convert.
        match run(sig, &ArgumentList::new().positional(Ty::string()).positional(Ty::int())) {
            Applicability::Inapplicable(ResolveError::ConversionError { param, expected, found, .. }) => {
                assert_eq!(param, "b");
                assert_eq!(expected, Ty::string());
                assert_eq!(found, Ty::int());
            }
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn named_keys_check_against_schema_types() {
        let schema = NamedSchema {
            keys: vec![NamedKey { name: "size".into(), ty: Ty::long(), required: false }],
            open: true,
        };
        let sig = MethodSig::new("draw", vec![Param::named("opts", schema)], Ty::Unknown);
        let ok = applicable(
            sig.clone(),
            &ArgumentList::new().named("size", Ty::int()).named("color", Ty::string()),
        );
        // Widening for `size`, dynamic for the unlisted `color`.
        assert_eq!(ok.cost, 2);
        match run(sig, &ArgumentList::new().named("size", Ty::string())) {
            Applicability::Inapplicable(ResolveError::ConversionError { param, .. }) => {
                assert_eq!(param, "opts.size")
            }
            other => panic!("unexpected verdict: {:?}", other),
        }
    }
}
