//! Ranking applicable candidates.
//!
//! Plugged-in comparators run first, one pass each in registration order;
//! every pass removes the candidates its comparator says are dominated. The
//! default ordering then narrows what is left by cost, spread varargs,
//! parameter specificity, origin and defaulted parameters. Anything still tied is
//! reported as a tie, never broken arbitrarily.
//!
//! All comparator verdicts are taken before the first pass. A pair on which
//! two comparators disagree is contested: every comparator's verdict on it
//! is dropped and the default ordering decides.

use std::sync::Arc;

use grove_common::CancellationToken;

use crate::args::ArgumentList;
use crate::candidate::Origin;
use crate::convert::{ConversionCx, Position};
use crate::filter::ApplicableCandidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dominance {
    /// The left candidate is preferred.
    Left,
    /// The right candidate is preferred.
    Right,
    NoOpinion,
}

/// A pluggable ranking rule.
///
/// `compare(a, b)` and `compare(b, a)` must agree: answering `Left` to both
/// is an inconsistency and fails the resolution.
pub trait CandidateComparator: Send + Sync {
    fn name(&self) -> &str;

    fn compare(&self, a: &ApplicableCandidate, b: &ApplicableCandidate, cx: &RankCx<'_>) -> Dominance;
}

pub struct RankCx<'a> {
    pub conversions: ConversionCx<'a>,
    pub args: &'a ArgumentList,
    pub cancel: &'a CancellationToken,
}

#[derive(Debug)]
pub enum RankOutcome {
    Winner(ApplicableCandidate),
    /// Two or more maximal candidates.
    Tied(Vec<ApplicableCandidate>),
    Cancelled,
    Inconsistent(String),
}

/// dominates[i][j]: candidate `i` is preferred over `j` by one comparator.
type Relation = Vec<Vec<bool>>;

pub fn rank(
    candidates: Vec<ApplicableCandidate>,
    comparators: &[Arc<dyn CandidateComparator>],
    cx: &RankCx<'_>,
) -> RankOutcome {
    let n = candidates.len();
    let mut relations: Vec<Relation> = Vec::with_capacity(comparators.len());
    for comparator in comparators {
        let mut rel = vec![vec![false; n]; n];
        for i in 0..n {
            if cx.cancel.is_cancelled() {
                return RankOutcome::Cancelled;
            }
            for j in 0..n {
                if i == j {
                    continue;
                }
                match comparator.compare(&candidates[i], &candidates[j], cx) {
                    Dominance::Left => rel[i][j] = true,
                    Dominance::Right => rel[j][i] = true,
                    Dominance::NoOpinion => {}
                }
            }
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if rel[i][j] && rel[j][i] {
                    return RankOutcome::Inconsistent(format!(
                        "comparator `{}` prefers both `{}` and `{}` over each other",
                        comparator.name(),
                        candidates[i].candidate.id,
                        candidates[j].candidate.id
                    ));
                }
            }
        }
        relations.push(rel);
    }

    // Drop contested pairs from every relation.
    for i in 0..n {
        for j in 0..n {
            let forward = relations.iter().any(|r| r[i][j]);
            let backward = relations.iter().any(|r| r[j][i]);
            if forward && backward {
                for rel in relations.iter_mut() {
                    rel[i][j] = false;
                    rel[j][i] = false;
                }
            }
        }
    }

    let mut alive: Vec<usize> = (0..n).collect();
    for (rel, comparator) in relations.iter().zip(comparators) {
        if let Some(cycle) = find_cycle(rel, &alive) {
            let ids: Vec<String> = cycle
                .iter()
                .map(|&i| candidates[i].candidate.id.to_string())
                .collect();
            return RankOutcome::Inconsistent(format!(
                "comparator `{}` ranks candidates in a cycle: {}",
                comparator.name(),
                ids.join(" > ")
            ));
        }
        alive = alive
            .iter()
            .copied()
            .filter(|&j| !alive.iter().any(|&i| rel[i][j]))
            .collect();
    }

    let mut survivors: Vec<ApplicableCandidate> = Vec::with_capacity(alive.len());
    let mut slots: Vec<Option<ApplicableCandidate>> = candidates.into_iter().map(Some).collect();
    for i in alive {
        if let Some(c) = slots[i].take() {
            survivors.push(c);
        }
    }

    match default_order(survivors, cx) {
        None => RankOutcome::Cancelled,
        Some(mut rest) if rest.len() == 1 => match rest.pop() {
            Some(winner) => RankOutcome::Winner(winner),
            None => RankOutcome::Tied(rest),
        },
        Some(rest) => RankOutcome::Tied(rest),
    }
}

/// A cycle among `alive` in `rel`, as the candidate indices along it.
fn find_cycle(rel: &Relation, alive: &[usize]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    fn visit(node: usize, rel: &Relation, alive: &[usize], marks: &mut [Mark], path: &mut Vec<usize>) -> Option<Vec<usize>> {
        marks[node] = Mark::Open;
        path.push(node);
        for &next in alive {
            if !rel[node][next] {
                continue;
            }
            match marks[next] {
                Mark::Open => {
                    let start = path.iter().position(|&p| p == next).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::New => {
                    if let Some(cycle) = visit(next, rel, alive, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }
        path.pop();
        marks[node] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::New; rel.len()];
    let mut path = Vec::new();
    for &start in alive {
        if marks[start] == Mark::New {
            if let Some(cycle) = visit(start, rel, alive, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

/// The built-in ordering. `None` when cancelled.
fn default_order(mut survivors: Vec<ApplicableCandidate>, cx: &RankCx<'_>) -> Option<Vec<ApplicableCandidate>> {
    if cx.cancel.is_cancelled() {
        return None;
    }
    if survivors.len() <= 1 {
        return Some(survivors);
    }

    // Lowest aggregate cost.
    let min_cost = survivors.iter().map(|c| c.cost).min().unwrap_or(0);
    survivors.retain(|c| c.cost == min_cost);

    // Fixed arity over a spread vararg, whatever the spread costs.
    if survivors.iter().any(|c| !c.spread) {
        survivors.retain(|c| !c.spread);
    }

    // Most specific parameter types.
    if survivors.len() > 1 {
        let mut maximal = Vec::with_capacity(survivors.len());
        for (i, c) in survivors.iter().enumerate() {
            if cx.cancel.is_cancelled() {
                return None;
            }
            let dominated = survivors
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && is_more_specific(other, c, cx));
            maximal.push(!dominated);
        }
        let mut keep = maximal.into_iter();
        survivors.retain(|_| keep.next().unwrap_or(true));
    }

    // Declared members over synthetic ones.
    if survivors.iter().any(|c| c.candidate.origin == Origin::Declared) {
        survivors.retain(|c| c.candidate.origin == Origin::Declared);
    }

    // Fewest defaulted parameters.
    let min_defaults = survivors
        .iter()
        .map(|c| c.mapping.defaulted_count())
        .min()
        .unwrap_or(0);
    survivors.retain(|c| c.mapping.defaulted_count() == min_defaults);

    Some(survivors)
}

/// `a` is at least as specific as `b` on every argument both bind, and
/// strictly more specific on one. Specificity of two parameter types is
/// convertibility of the more specific into the less specific.
fn is_more_specific(a: &ApplicableCandidate, b: &ApplicableCandidate, cx: &RankCx<'_>) -> bool {
    let mut strictly = false;
    for conv in &a.conversions {
        let Some(other) = b.expected_for(conv.source) else {
            continue;
        };
        let mine = &conv.expected;
        if mine.is_same_as(other) {
            continue;
        }
        let narrower = cx.conversions.convert(other, mine, Position::MethodParameter).is_some();
        if !narrower {
            return false;
        }
        let wider = cx.conversions.convert(mine, other, Position::MethodParameter).is_some();
        if !wider {
            strictly = true;
        }
    }
    strictly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgSource;
    use crate::candidate::{MethodCandidate, Origin};
    use crate::config::ResolveConfig;
    use crate::convert::{Conversion, ConversionKind, ConversionRegistry};
    use crate::filter::SlotConversion;
    use crate::mapper::{Mapping, SlotBinding};
    use crate::ty::{Substitution, Ty};
    use crate::universe::{InMemoryUniverse, MethodSig, Param, TypeDecl};

    fn applicable(name: &str, param: Ty, cost: u32, origin: Origin) -> ApplicableCandidate {
        let sig = MethodSig::new(name, vec![Param::positional("x", param.clone())], Ty::Unknown);
        let mut candidate = MethodCandidate::declared(Ty::nominal("T"), sig.clone());
        candidate.origin = origin;
        candidate.id = crate::candidate::CandidateId::new(format!("{}#{}", name, param));
        ApplicableCandidate {
            candidate,
            mapping: Mapping {
                slots: vec![SlotBinding::Single(ArgSource::Positional(0))],
            },
            bindings: Substitution::default(),
            instantiated: sig,
            conversions: vec![SlotConversion {
                param: 0,
                source: ArgSource::Positional(0),
                expected: param,
                found: Ty::nominal("String"),
                conversion: Conversion {
                    kind: ConversionKind::Subtype,
                    cost,
                },
            }],
            cost,
            spread: false,
        }
    }

    struct Fixture {
        universe: InMemoryUniverse,
        config: ResolveConfig,
        registry: ConversionRegistry,
        args: ArgumentList,
        cancel: CancellationToken,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                universe: InMemoryUniverse::new()
                    .with(TypeDecl::class("Object"))
                    .with(TypeDecl::interface("CharSequence").extends(Ty::object()))
                    .with(TypeDecl::class("String").extends(Ty::nominal("CharSequence"))),
                config: ResolveConfig::default(),
                registry: ConversionRegistry::new(),
                args: ArgumentList::new().positional(Ty::string()),
                cancel: CancellationToken::new(),
            }
        }

        fn cx(&self) -> RankCx<'_> {
            RankCx {
                conversions: ConversionCx {
                    universe: &self.universe,
                    config: &self.config,
                    registry: &self.registry,
                },
                args: &self.args,
                cancel: &self.cancel,
            }
        }
    }

    fn ids(outcome: &RankOutcome) -> Vec<String> {
        match outcome {
            RankOutcome::Winner(w) => vec![w.candidate.id.to_string()],
            RankOutcome::Tied(t) => t.iter().map(|c| c.candidate.id.to_string()).collect(),
            RankOutcome::Cancelled => vec!["<cancelled>".into()],
            RankOutcome::Inconsistent(msg) => vec![msg.clone()],
        }
    }

    #[test]
    fn default_order_prefers_specific_then_declared() {
        let fx = Fixture::new();
        let outcome = rank(
            vec![
                applicable("f", Ty::nominal("CharSequence"), 1, Origin::Declared),
                applicable("f", Ty::string(), 1, Origin::Declared),
                applicable("f", Ty::object(), 1, Origin::Declared),
            ],
            &[],
            &fx.cx(),
        );
        assert_eq!(ids(&outcome), vec!["f#String"]);

        let outcome = rank(
            vec![
                applicable("g", Ty::string(), 0, Origin::Extension),
                applicable("h", Ty::string(), 0, Origin::Declared),
            ],
            &[],
            &fx.cx(),
        );
        assert_eq!(ids(&outcome), vec!["h#String"]);
    }

    #[test]
    fn identical_candidates_tie() {
        let fx = Fixture::new();
        let outcome = rank(
            vec![
                applicable("a", Ty::string(), 0, Origin::Contributed),
                applicable("b", Ty::string(), 0, Origin::Contributed),
            ],
            &[],
            &fx.cx(),
        );
        assert!(matches!(outcome, RankOutcome::Tied(ref t) if t.len() == 2));
    }

    struct Prefer(&'static str);

    impl CandidateComparator for Prefer {
        fn name(&self) -> &str {
            self.0
        }

        fn compare(&self, a: &ApplicableCandidate, b: &ApplicableCandidate, _: &RankCx<'_>) -> Dominance {
            if a.candidate.id.as_str().starts_with(self.0) {
                Dominance::Left
            } else if b.candidate.id.as_str().starts_with(self.0) {
                Dominance::Right
            } else {
                Dominance::NoOpinion
            }
        }
    }

    #[test]
    fn comparator_overrides_default_order() {
        let fx = Fixture::new();
        let comparators: Vec<Arc<dyn CandidateComparator>> = vec![Arc::new(Prefer("wide"))];
        let outcome = rank(
            vec![
                applicable("narrow", Ty::string(), 0, Origin::Declared),
                applicable("wide", Ty::object(), 2, Origin::Declared),
            ],
            &comparators,
            &fx.cx(),
        );
        assert_eq!(ids(&outcome), vec!["wide#Object"]);
    }

    #[test]
    fn disagreeing_comparators_defer_to_default_order() {
        let fx = Fixture::new();
        let comparators: Vec<Arc<dyn CandidateComparator>> =
            vec![Arc::new(Prefer("wide")), Arc::new(Prefer("narrow"))];
        let outcome = rank(
            vec![
                applicable("narrow", Ty::string(), 0, Origin::Declared),
                applicable("wide", Ty::object(), 2, Origin::Declared),
            ],
            &comparators,
            &fx.cx(),
        );
        assert_eq!(ids(&outcome), vec!["narrow#String"]);
    }

    struct Always;

    impl CandidateComparator for Always {
        fn name(&self) -> &str {
            "always"
        }

        fn compare(&self, _: &ApplicableCandidate, _: &ApplicableCandidate, _: &RankCx<'_>) -> Dominance {
            Dominance::Left
        }
    }

    #[test]
    fn self_contradicting_comparator_is_inconsistent() {
        let fx = Fixture::new();
        let comparators: Vec<Arc<dyn CandidateComparator>> = vec![Arc::new(Always)];
        let outcome = rank(
            vec![
                applicable("a", Ty::string(), 0, Origin::Declared),
                applicable("b", Ty::string(), 0, Origin::Declared),
            ],
            &comparators,
            &fx.cx(),
        );
        assert!(matches!(outcome, RankOutcome::Inconsistent(ref m) if m.contains("`always`")));
    }

    fn spread(mut c: ApplicableCandidate) -> ApplicableCandidate {
        c.spread = true;
        c.candidate.id = crate::candidate::CandidateId::new(format!("{}...", c.candidate.id));
        c
    }

    #[test]
    fn fixed_arity_beats_spread_at_equal_cost() {
        let fx = Fixture::new();
        let outcome = rank(
            vec![
                spread(applicable("f", Ty::string(), 0, Origin::Declared)),
                applicable("f", Ty::string(), 0, Origin::Declared),
            ],
            &[],
            &fx.cx(),
        );
        assert_eq!(ids(&outcome), vec!["f#String"]);
    }

    #[test]
    fn cancelled_ranking_with_one_candidate() {
        let fx = Fixture::new();
        fx.cancel.cancel();
        let outcome = rank(vec![applicable("a", Ty::string(), 0, Origin::Declared)], &[], &fx.cx());
        assert!(matches!(outcome, RankOutcome::Cancelled));

        let outcome = rank(
            vec![
                applicable("a", Ty::string(), 0, Origin::Declared),
                applicable("b", Ty::string(), 3, Origin::Declared),
            ],
            &[],
            &fx.cx(),
        );
        assert!(matches!(outcome, RankOutcome::Cancelled));
    }

    #[test]
    fn cancellation_stops_ranking() {
        let fx = Fixture::new();
        fx.cancel.cancel();
        let outcome = rank(
            vec![
                applicable("a", Ty::string(), 0, Origin::Declared),
                applicable("b", Ty::object(), 0, Origin::Declared),
            ],
            &[],
            &fx.cx(),
        );
        assert!(matches!(outcome, RankOutcome::Cancelled));
    }
}
