//! Type conversion: whether a value of one type is usable where another is
//! expected, and at what cost.
//!
//! Converters are consulted in registration order. The first one that
//! answers `Ok` or `Error` decides; `NotApplicable` passes to the next. When
//! none answers, the built-in structural rules decide. Nested checks (array
//! elements, type arguments, record fields) go back through the whole chain,
//! so a converter can override a rule at any depth.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::ResolveConfig;
use crate::ty::{RecordTy, Ty};
use crate::universe::{hierarchy, view_as, DeclKind, TypeUniverse};

pub type Cost = u32;

/// Where the converted value is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Position {
    ExplicitCast,
    Assignment,
    MethodParameter,
    /// A type argument of a parameterized type. Invariant: no widening,
    /// no subtyping.
    GenericArgument,
    Return,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionResult {
    Ok(Cost),
    Error,
    /// The converter has no opinion; ask the next one.
    NotApplicable,
}

/// What made a conversion succeed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionKind {
    Identity,
    Dynamic,
    NumericWidening,
    NumericNarrowing,
    Subtype,
    Downcast,
    /// Element-, field- or parameter-wise compatibility of a structural type.
    Structural,
    /// Decided by a registered converter.
    Converter(String),
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionKind::Identity => write!(f, "identity"),
            ConversionKind::Dynamic => write!(f, "dynamic"),
            ConversionKind::NumericWidening => write!(f, "widening"),
            ConversionKind::NumericNarrowing => write!(f, "narrowing"),
            ConversionKind::Subtype => write!(f, "subtype"),
            ConversionKind::Downcast => write!(f, "downcast"),
            ConversionKind::Structural => write!(f, "structural"),
            ConversionKind::Converter(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub kind: ConversionKind,
    pub cost: Cost,
}

impl Conversion {
    fn new(kind: ConversionKind, cost: Cost) -> Self {
        Conversion { kind, cost }
    }
}

/// A pluggable conversion rule.
///
/// Implementations must be pure: the same inputs always give the same
/// answer, and nothing about the resolution is mutated.
pub trait TypeConverter: Send + Sync {
    fn name(&self) -> &str;

    fn is_convertible(
        &self,
        target: &Ty,
        actual: &Ty,
        position: Position,
        cx: &ConversionCx<'_>,
    ) -> ConversionResult;
}

/// Everything a converter may consult.
pub struct ConversionCx<'a> {
    pub universe: &'a dyn TypeUniverse,
    pub config: &'a ResolveConfig,
    pub registry: &'a ConversionRegistry,
}

impl<'a> ConversionCx<'a> {
    /// Run the full chain (converters, then structural rules) on a pair.
    pub fn convert(&self, target: &Ty, actual: &Ty, position: Position) -> Option<Conversion> {
        for converter in &self.registry.converters {
            match converter.is_convertible(target, actual, position, self) {
                ConversionResult::Ok(cost) => {
                    return Some(Conversion::new(
                        ConversionKind::Converter(converter.name().to_string()),
                        cost,
                    ))
                }
                ConversionResult::Error => return None,
                ConversionResult::NotApplicable => {}
            }
        }
        structural(self, target, actual, position)
    }

    pub fn costs(&self) -> &crate::config::CostTable {
        &self.config.costs
    }
}

#[derive(Clone, Default)]
pub struct ConversionRegistry {
    converters: Vec<Arc<dyn TypeConverter>>,
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.converters.iter().map(|c| c.name()))
            .finish()
    }
}

impl ConversionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, converter: Arc<dyn TypeConverter>) {
        self.converters.push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn convert(
        &self,
        target: &Ty,
        actual: &Ty,
        position: Position,
        universe: &dyn TypeUniverse,
        config: &ResolveConfig,
    ) -> Option<Conversion> {
        let cx = ConversionCx {
            universe,
            config,
            registry: self,
        };
        cx.convert(target, actual, position)
    }

    pub fn is_convertible(
        &self,
        target: &Ty,
        actual: &Ty,
        position: Position,
        universe: &dyn TypeUniverse,
        config: &ResolveConfig,
    ) -> ConversionResult {
        match self.convert(target, actual, position, universe, config) {
            Some(conversion) => ConversionResult::Ok(conversion.cost),
            None => ConversionResult::Error,
        }
    }
}

// ── Structural rules ───────────────────────────────────────────────────

fn structural(cx: &ConversionCx<'_>, target: &Ty, actual: &Ty, position: Position) -> Option<Conversion> {
    let costs = cx.costs();
    if target.is_same_as(actual) {
        return Some(Conversion::new(ConversionKind::Identity, costs.identity));
    }
    // Free parameters left after inference are checked in erased form.
    if actual.is_dynamic() || target.is_dynamic() || matches!(target, Ty::Param(_) | Ty::Var(_)) {
        return Some(Conversion::new(ConversionKind::Dynamic, costs.dynamic));
    }
    if position == Position::GenericArgument {
        return None;
    }

    if let Some(conversion) = numeric(cx, target, actual, position) {
        return Some(conversion);
    }

    match (target, actual) {
        (Ty::Array(te), Ty::Array(ae)) => {
            let inner = cx.convert(te, ae, Position::Assignment)?;
            return Some(Conversion::new(ConversionKind::Structural, inner.cost));
        }
        (Ty::Function(tp, tr), Ty::Function(ap, ar)) => {
            if tp.len() != ap.len() {
                return None;
            }
            let mut cost: Cost = 0;
            // Parameters are contravariant.
            for (t, a) in tp.iter().zip(ap) {
                cost = cost.saturating_add(cx.convert(a, t, Position::Assignment)?.cost);
            }
            cost = cost.saturating_add(cx.convert(tr, ar, Position::Return)?.cost);
            return Some(Conversion::new(ConversionKind::Structural, cost));
        }
        (Ty::RecordLiteral(tr), Ty::RecordLiteral(ar)) => {
            let cost = record_fields(cx, tr, ar)?;
            return Some(Conversion::new(ConversionKind::Structural, cost));
        }
        _ => {}
    }

    let target_name = target.base_name()?;
    if let Some(conversion) = nominal_subtype(cx, target, target_name, actual) {
        return Some(conversion);
    }
    if let Some(conversion) = builtin_fallback(cx, target, target_name, actual) {
        return Some(conversion);
    }
    if target_name == cx.config.fallbacks.root {
        let depth = hierarchy(cx.universe, actual, cx.config.max_hierarchy_depth)
            .iter()
            .map(|e| e.depth)
            .max()
            .unwrap_or(0);
        return Some(Conversion::new(ConversionKind::Subtype, costs.subtype_step.saturating_mul(depth.saturating_add(1))));
    }
    if position == Position::ExplicitCast {
        let actual_name = actual.base_name()?;
        let (_, dist) = view_as(cx.universe, target, actual_name, cx.config.max_hierarchy_depth)?;
        return Some(Conversion::new(ConversionKind::Downcast, costs.subtype_step.saturating_mul(dist)));
    }
    None
}

fn numeric(cx: &ConversionCx<'_>, target: &Ty, actual: &Ty, position: Position) -> Option<Conversion> {
    let (Ty::Nominal(t), Ty::Nominal(a)) = (target, actual) else {
        return None;
    };
    let t = cx.config.numeric_rank(&t.name)?;
    let a = cx.config.numeric_rank(&a.name)?;
    let step = cx.costs().numeric_step;
    if t > a {
        Some(Conversion::new(ConversionKind::NumericWidening, step.saturating_mul(steps(t - a))))
    } else if position == Position::ExplicitCast {
        Some(Conversion::new(ConversionKind::NumericNarrowing, step.saturating_mul(steps(a - t))))
    } else {
        None
    }
}

/// Tower distance as a cost multiplier.
fn steps(distance: usize) -> Cost {
    Cost::try_from(distance).unwrap_or(Cost::MAX)
}

/// `actual` seen as `target`'s declaration, with invariant type arguments.
fn nominal_subtype(cx: &ConversionCx<'_>, target: &Ty, target_name: &str, actual: &Ty) -> Option<Conversion> {
    actual.base_name()?;
    let (view, dist) = view_as(cx.universe, actual, target_name, cx.config.max_hierarchy_depth)?;
    let cost = cx
        .costs()
        .subtype_step
        .saturating_mul(dist)
        .saturating_add(type_args(cx, target, &view)?);
    let kind = if dist == 0 {
        ConversionKind::Identity
    } else {
        ConversionKind::Subtype
    };
    Some(Conversion::new(kind, cost))
}

/// Pairwise type-argument check at `GenericArgument` position. A raw side
/// (no arguments) is accepted dynamically.
fn type_args(cx: &ConversionCx<'_>, target: &Ty, view: &Ty) -> Option<Cost> {
    let (targs, vargs) = (target.type_args(), view.type_args());
    if targs.is_empty() || vargs.is_empty() {
        return Some(0);
    }
    if targs.len() != vargs.len() {
        return None;
    }
    let mut cost: Cost = 0;
    for (t, v) in targs.iter().zip(vargs) {
        cost = cost.saturating_add(cx.convert(t, v, Position::GenericArgument)?.cost);
    }
    Some(cost)
}

/// Record literals are maps and function literals are closures.
fn builtin_fallback(cx: &ConversionCx<'_>, target: &Ty, target_name: &str, actual: &Ty) -> Option<Conversion> {
    let fallbacks = &cx.config.fallbacks;
    let step = cx.costs().subtype_step;
    match actual {
        Ty::RecordLiteral(rec) if target_name == fallbacks.record => {
            let args = target.type_args();
            let mut cost = step;
            if let [key, value] = args {
                cost = cost.saturating_add(cx.convert(key, &Ty::string(), Position::Assignment)?.cost);
                for field in rec.fields.values() {
                    cost = cost.saturating_add(cx.convert(value, field, Position::Assignment)?.cost);
                }
            }
            Some(Conversion::new(ConversionKind::Structural, cost))
        }
        Ty::Function(_, ret) if target_name == fallbacks.closure => {
            let mut cost = step;
            if let [result] = target.type_args() {
                cost = cost.saturating_add(cx.convert(result, ret, Position::Return)?.cost);
            }
            Some(Conversion::new(ConversionKind::Structural, cost))
        }
        Ty::Array(elem) if target_name == fallbacks.array => {
            let mut cost = step;
            if let [expected] = target.type_args() {
                cost = cost.saturating_add(cx.convert(expected, elem, Position::GenericArgument)?.cost);
            }
            Some(Conversion::new(ConversionKind::Structural, cost))
        }
        _ => None,
    }
}

/// A closed target needs exactly its fields; an open target needs at least
/// them. An open actual record cannot satisfy a closed target.
fn record_fields(cx: &ConversionCx<'_>, target: &RecordTy, actual: &RecordTy) -> Option<Cost> {
    if target.closed && (!actual.closed || actual.fields.len() != target.fields.len()) {
        return None;
    }
    let mut cost: Cost = 0;
    for (key, expected) in &target.fields {
        let found = actual.fields.get(key)?;
        cost = cost.saturating_add(cx.convert(expected, found, Position::Assignment)?.cost);
    }
    Some(cost)
}

// ── Built-in converters ────────────────────────────────────────────────

/// Record literal to a declared class whose properties cover its fields:
/// `new Person(name: "x")` style construction.
#[derive(Debug, Default)]
pub struct RecordToDeclaredConverter;

impl TypeConverter for RecordToDeclaredConverter {
    fn name(&self) -> &str {
        "record-to-declared"
    }

    fn is_convertible(
        &self,
        target: &Ty,
        actual: &Ty,
        position: Position,
        cx: &ConversionCx<'_>,
    ) -> ConversionResult {
        let Ty::RecordLiteral(rec) = actual else {
            return ConversionResult::NotApplicable;
        };
        if position == Position::GenericArgument {
            return ConversionResult::NotApplicable;
        }
        let Some(name) = target.base_name() else {
            return ConversionResult::NotApplicable;
        };
        if name == cx.config.fallbacks.record || name == cx.config.fallbacks.root {
            return ConversionResult::NotApplicable;
        }
        let walk = hierarchy(cx.universe, target, cx.config.max_hierarchy_depth);
        if walk.first().map_or(true, |e| e.decl.kind != DeclKind::Class) {
            return ConversionResult::NotApplicable;
        }
        let mut cost = cx.costs().coercion;
        for (field, found) in &rec.fields {
            let property = walk.iter().find_map(|e| {
                e.decl
                    .properties
                    .iter()
                    .find(|p| &p.name == field)
                    .map(|p| p.ty.substitute(&e.bindings))
            });
            let Some(expected) = property else {
                return ConversionResult::Error;
            };
            match cx.convert(&expected, found, Position::Assignment) {
                Some(c) => cost = cost.saturating_add(c.cost),
                None => return ConversionResult::Error,
            }
        }
        ConversionResult::Ok(cost)
    }
}

/// Function literal to an interface with a single abstract method.
#[derive(Debug, Default)]
pub struct ClosureToSamConverter;

impl TypeConverter for ClosureToSamConverter {
    fn name(&self) -> &str {
        "closure-to-sam"
    }

    fn is_convertible(
        &self,
        target: &Ty,
        actual: &Ty,
        position: Position,
        cx: &ConversionCx<'_>,
    ) -> ConversionResult {
        if !actual.is_function() || position == Position::GenericArgument {
            return ConversionResult::NotApplicable;
        }
        let walk = hierarchy(cx.universe, target, cx.config.max_hierarchy_depth);
        let mut abstracts = walk.iter().flat_map(|e| {
            cx.universe
                .methods(e.decl)
                .iter()
                .filter(|m| m.is_abstract)
                .map(move |m| m.substitute(&e.bindings))
        });
        let (Some(sam), None) = (abstracts.next(), abstracts.next()) else {
            return ConversionResult::NotApplicable;
        };
        let shape = Ty::fun(
            sam.params.iter().map(|p| p.declared_ty()).collect(),
            sam.return_type.clone(),
        );
        match cx.convert(&shape, actual, Position::Assignment) {
            Some(c) => ConversionResult::Ok(cx.costs().coercion.saturating_add(c.cost)),
            None => ConversionResult::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::{InMemoryUniverse, MethodSig, Param, TypeDecl};

    fn universe() -> InMemoryUniverse {
        InMemoryUniverse::new()
            .with(TypeDecl::class("Object"))
            .with(TypeDecl::interface("CharSequence").extends(Ty::object()))
            .with(TypeDecl::class("String").extends(Ty::nominal("CharSequence")))
            .with(TypeDecl::interface("Collection").type_params(&["E"]))
            .with(
                TypeDecl::interface("List")
                    .type_params(&["E"])
                    .extends(Ty::generic("Collection", vec![Ty::param("E")])),
            )
            .with(
                TypeDecl::interface("Runnable")
                    .method(MethodSig::new("run", vec![], Ty::nominal("Void")).abstract_method()),
            )
            .with(
                TypeDecl::interface("Comparator").type_params(&["T"]).method(
                    MethodSig::new(
                        "compare",
                        vec![Param::positional("a", Ty::param("T")), Param::positional("b", Ty::param("T"))],
                        Ty::int(),
                    )
                    .abstract_method(),
                ),
            )
            .with(
                TypeDecl::class("Person")
                    .property("name", Ty::string())
                    .property("age", Ty::int()),
            )
    }

    fn check(registry: &ConversionRegistry, target: &Ty, actual: &Ty, position: Position) -> Option<Conversion> {
        registry.convert(target, actual, position, &universe(), &ResolveConfig::default())
    }

    fn cost(target: &Ty, actual: &Ty, position: Position) -> Option<Cost> {
        check(&ConversionRegistry::new(), target, actual, position).map(|c| c.cost)
    }

    #[test]
    fn numeric_widening_depends_on_position() {
        assert_eq!(cost(&Ty::long(), &Ty::int(), Position::MethodParameter), Some(1));
        assert_eq!(cost(&Ty::double(), &Ty::int(), Position::MethodParameter), Some(4));
        assert_eq!(cost(&Ty::int(), &Ty::long(), Position::MethodParameter), None);
        assert_eq!(cost(&Ty::int(), &Ty::long(), Position::ExplicitCast), Some(1));
        assert_eq!(cost(&Ty::long(), &Ty::int(), Position::GenericArgument), None);
    }

    #[test]
    fn subtyping_costs_distance_and_keeps_arguments_invariant() {
        let list_int = Ty::list(Ty::int());
        assert_eq!(cost(&Ty::nominal("CharSequence"), &Ty::string(), Position::Assignment), Some(1));
        assert_eq!(
            cost(&Ty::generic("Collection", vec![Ty::int()]), &list_int, Position::MethodParameter),
            Some(1)
        );
        assert_eq!(
            cost(&Ty::generic("Collection", vec![Ty::long()]), &list_int, Position::MethodParameter),
            None
        );
        // Raw targets and dynamic arguments are accepted.
        assert_eq!(cost(&Ty::nominal("Collection"), &list_int, Position::MethodParameter), Some(1));
        assert_eq!(cost(&Ty::list(Ty::int()), &Ty::list(Ty::Unknown), Position::MethodParameter), Some(1));
        // Everything reaches the root.
        assert_eq!(cost(&Ty::object(), &Ty::string(), Position::MethodParameter), Some(2));
        assert_eq!(cost(&Ty::object(), &Ty::int(), Position::MethodParameter), Some(1));
    }

    #[test]
    fn downcast_only_in_explicit_cast() {
        assert_eq!(cost(&Ty::string(), &Ty::nominal("CharSequence"), Position::Assignment), None);
        let cast = check(
            &ConversionRegistry::new(),
            &Ty::string(),
            &Ty::nominal("CharSequence"),
            Position::ExplicitCast,
        )
        .unwrap();
        assert_eq!(cast.kind, ConversionKind::Downcast);
    }

    #[test]
    fn structural_types() {
        assert_eq!(
            cost(&Ty::array(Ty::nominal("CharSequence")), &Ty::array(Ty::string()), Position::MethodParameter),
            Some(1)
        );
        let takes_string = Ty::fun(vec![Ty::string()], Ty::int());
        let takes_sequence = Ty::fun(vec![Ty::nominal("CharSequence")], Ty::int());
        assert_eq!(cost(&takes_string, &takes_sequence, Position::MethodParameter), Some(1));
        assert_eq!(cost(&takes_sequence, &takes_string, Position::MethodParameter), None);
        let rec = Ty::record([("a", Ty::int())], true);
        assert_eq!(cost(&Ty::map(Ty::string(), Ty::long()), &rec, Position::MethodParameter), Some(2));
        assert_eq!(cost(&Ty::record([("a", Ty::long())], true), &rec, Position::Assignment), Some(1));
        assert_eq!(cost(&Ty::record([("b", Ty::int())], false), &rec, Position::Assignment), None);
    }

    struct RejectStrings;

    impl TypeConverter for RejectStrings {
        fn name(&self) -> &str {
            "reject-strings"
        }

        fn is_convertible(&self, _: &Ty, actual: &Ty, _: Position, _: &ConversionCx<'_>) -> ConversionResult {
            if actual == &Ty::string() {
                ConversionResult::Error
            } else {
                ConversionResult::NotApplicable
            }
        }
    }

    #[test]
    fn converters_short_circuit_at_every_depth() {
        let mut registry = ConversionRegistry::new();
        registry.register(Arc::new(RejectStrings));
        assert!(check(&registry, &Ty::string(), &Ty::string(), Position::Assignment).is_none());
        assert!(check(&registry, &Ty::array(Ty::Unknown), &Ty::array(Ty::string()), Position::Assignment).is_none());
        assert_eq!(
            registry.is_convertible(&Ty::long(), &Ty::int(), Position::Assignment, &universe(), &ResolveConfig::default()),
            ConversionResult::Ok(1)
        );
    }

    #[test]
    fn record_to_declared_class() {
        let mut registry = ConversionRegistry::new();
        registry.register(Arc::new(RecordToDeclaredConverter));
        let person = Ty::nominal("Person");
        let ok = check(&registry, &person, &Ty::record([("name", Ty::string())], true), Position::MethodParameter)
            .unwrap();
        assert_eq!(ok.kind, ConversionKind::Converter("record-to-declared".into()));
        assert_eq!(ok.cost, 3);
        assert!(check(&registry, &person, &Ty::record([("height", Ty::int())], true), Position::MethodParameter)
            .is_none());
        assert!(check(&registry, &person, &Ty::record([("age", Ty::string())], true), Position::MethodParameter)
            .is_none());
    }

    #[test]
    fn closure_to_single_abstract_method() {
        let mut registry = ConversionRegistry::new();
        registry.register(Arc::new(ClosureToSamConverter));
        let runnable = Ty::nominal("Runnable");
        assert_eq!(
            check(&registry, &runnable, &Ty::fun(vec![], Ty::Unknown), Position::MethodParameter).map(|c| c.cost),
            Some(4)
        );
        assert!(check(&registry, &runnable, &Ty::fun(vec![Ty::int()], Ty::Unknown), Position::MethodParameter)
            .is_none());
        let comparator = Ty::generic("Comparator", vec![Ty::string()]);
        let lambda = Ty::fun(vec![Ty::string(), Ty::string()], Ty::int());
        assert_eq!(
            check(&registry, &comparator, &lambda, Position::MethodParameter).map(|c| c.cost),
            Some(3)
        );
    }
}
