//! The resolution engine.
//!
//! `Engine` ties the phases together:
//!
//! ```text
//! Collecting -> Mapping -> Filtering -> Ranking -> Resolved | Unresolved | Ambiguous
//! ```
//!
//! Every extension point lives in one immutable [`Registries`] value. The
//! engine holds it as an `Arc` behind a lock that is only taken to clone or
//! swap the `Arc`, so a resolution runs start to finish against the snapshot
//! it cloned on entry, whatever `initialize` does meanwhile.

use std::fmt;
use std::sync::Arc;

use grove_common::{CancellationToken, Span};
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::args::ArgumentList;
use crate::calc::{CalculatorKey, CalculatorRegistry, CallTypeCalculator, CallTypeInput, ClosureResultCollection, FirstArgumentElementType};
use crate::candidate::{CandidateId, MethodCandidate};
use crate::collect::collect;
use crate::config::ResolveConfig;
use crate::contrib::{MemberContributor, PropertyAccessorContributor};
use crate::convert::{ClosureToSamConverter, ConversionCx, ConversionRegistry, RecordToDeclaredConverter, TypeConverter};
use crate::error::ResolveError;
use crate::filter::{check_applicability, Applicability, SlotConversion};
use crate::mapper::{map_arguments, ArgumentMapping, Mapping};
use crate::rank::{rank, CandidateComparator, RankCx, RankOutcome};
use crate::ty::Ty;
use crate::universe::TypeUniverse;

/// Every extension point plus the configuration, frozen.
#[derive(Clone, Default)]
pub struct Registries {
    pub config: ResolveConfig,
    pub conversions: ConversionRegistry,
    pub comparators: Vec<Arc<dyn CandidateComparator>>,
    pub calculators: CalculatorRegistry,
    pub contributors: Vec<Arc<dyn MemberContributor>>,
}

impl fmt::Debug for Registries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registries")
            .field("conversions", &self.conversions)
            .field("comparators", &self.comparators.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("calculators", &self.calculators)
            .field("contributors", &self.contributors.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Registries {
    pub fn builder() -> RegistriesBuilder {
        RegistriesBuilder::default()
    }
}

/// The single place extensions are registered. Order of calls is the
/// order components are consulted in.
#[derive(Default)]
pub struct RegistriesBuilder {
    inner: Registries,
}

impl RegistriesBuilder {
    pub fn config(mut self, config: ResolveConfig) -> Self {
        self.inner.config = config;
        self
    }

    pub fn converter(mut self, converter: Arc<dyn TypeConverter>) -> Self {
        self.inner.conversions.register(converter);
        self
    }

    pub fn comparator(mut self, comparator: Arc<dyn CandidateComparator>) -> Self {
        self.inner.comparators.push(comparator);
        self
    }

    pub fn calculator(mut self, key: CalculatorKey, calculator: Arc<dyn CallTypeCalculator>) -> Self {
        self.inner.calculators.register(key, calculator);
        self
    }

    pub fn contributor(mut self, contributor: Arc<dyn MemberContributor>) -> Self {
        self.inner.contributors.push(contributor);
        self
    }

    /// The stock extensions: record and closure coercions, property
    /// accessors, `collect` and `Collections.max/min` result types.
    pub fn with_builtins(self) -> Self {
        self.converter(Arc::new(RecordToDeclaredConverter))
            .converter(Arc::new(ClosureToSamConverter))
            .contributor(Arc::new(PropertyAccessorContributor))
            .calculator(CalculatorKey::new("*", "collect"), Arc::new(ClosureResultCollection::new("List")))
            .calculator(CalculatorKey::new("Collections", "max"), Arc::new(FirstArgumentElementType))
            .calculator(CalculatorKey::new("Collections", "min"), Arc::new(FirstArgumentElementType))
    }

    pub fn build(self) -> Registries {
        self.inner
    }
}

/// Per-call context from the host.
#[derive(Clone, Debug, Default)]
pub struct UsageContext {
    pub cancel: CancellationToken,
    /// Span of the whole call, for diagnostics.
    pub call_span: Option<Span>,
}

impl UsageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancellationToken) -> Self {
        UsageContext {
            cancel,
            call_span: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResolutionResult {
    Resolved {
        candidate: MethodCandidate,
        mapping: Mapping,
        conversions: Vec<SlotConversion>,
        inferred_type: Ty,
    },
    Unresolved {
        considered: Vec<CandidateId>,
        reasons: Vec<ResolveError>,
    },
    Ambiguous {
        tied: Vec<MethodCandidate>,
    },
}

impl ResolutionResult {
    fn unresolved(considered: Vec<CandidateId>, reason: ResolveError) -> Self {
        ResolutionResult::Unresolved {
            considered,
            reasons: vec![reason],
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved { .. })
    }

    pub fn resolved_candidate(&self) -> Option<&MethodCandidate> {
        match self {
            ResolutionResult::Resolved { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ResolutionResult::Unresolved { reasons, .. } if reasons.iter().any(|r| matches!(r, ResolveError::Cancelled))
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Mapping,
    Filtering,
    Ranking,
    Resolved,
    Unresolved,
    Ambiguous,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Collecting => "collecting",
            Phase::Mapping => "mapping",
            Phase::Filtering => "filtering",
            Phase::Ranking => "ranking",
            Phase::Resolved => "resolved",
            Phase::Unresolved => "unresolved",
            Phase::Ambiguous => "ambiguous",
        };
        f.write_str(s)
    }
}

pub struct Engine {
    universe: Arc<dyn TypeUniverse>,
    registries: RwLock<Arc<Registries>>,
}

impl Engine {
    pub fn new(universe: Arc<dyn TypeUniverse>, registries: Registries) -> Self {
        Engine {
            universe,
            registries: RwLock::new(Arc::new(registries)),
        }
    }

    /// Replace the registries. Resolutions already running keep the
    /// snapshot they started with.
    pub fn initialize(&self, registries: Registries) {
        let next = Arc::new(registries);
        *self.registries.write() = next;
        debug!(target: "resolve", "registries replaced");
    }

    pub fn snapshot(&self) -> Arc<Registries> {
        Arc::clone(&self.registries.read())
    }

    pub fn universe(&self) -> &dyn TypeUniverse {
        self.universe.as_ref()
    }

    pub fn resolve_call(
        &self,
        receiver: &Ty,
        name: &str,
        args: &ArgumentList,
        usage: &UsageContext,
    ) -> ResolutionResult {
        let registries = self.snapshot();
        self.resolve_with(&registries, receiver, name, args, usage)
    }

    /// Resolve against an explicit snapshot.
    pub fn resolve_with(
        &self,
        registries: &Registries,
        receiver: &Ty,
        name: &str,
        args: &ArgumentList,
        usage: &UsageContext,
    ) -> ResolutionResult {
        let universe = self.universe.as_ref();
        let config = &registries.config;

        if let Err(err) = args.validate() {
            debug!(target: "resolve", %receiver, method = name, error = %err, "call site rejected");
            return ResolutionResult::unresolved(Vec::new(), err);
        }

        // Collecting
        if usage.cancel.is_cancelled() {
            return ResolutionResult::unresolved(Vec::new(), ResolveError::Cancelled);
        }
        let candidates = match collect(receiver, name, &registries.contributors, universe, config, &registries.conversions) {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(target: "resolve", phase = %Phase::Collecting, %receiver, method = name, error = %err, "resolution aborted");
                return ResolutionResult::unresolved(Vec::new(), err);
            }
        };
        debug!(target: "resolve", phase = %Phase::Collecting, %receiver, method = name, candidates = candidates.len());
        if candidates.is_empty() {
            return ResolutionResult::unresolved(
                Vec::new(),
                ResolveError::NoCandidates {
                    receiver: receiver.clone(),
                    name: name.to_string(),
                },
            );
        }
        let considered: Vec<CandidateId> = candidates.iter().map(|c| c.id.clone()).collect();
        let mut reasons = Vec::new();

        // Mapping
        let mut mapped = Vec::new();
        for candidate in &candidates {
            match map_arguments(candidate, args) {
                ArgumentMapping::Mapped(mapping) => mapped.push((candidate, mapping)),
                ArgumentMapping::Unmapped(reason) => reasons.push(reason),
            }
        }
        debug!(target: "resolve", phase = %Phase::Mapping, mapped = mapped.len(), rejected = reasons.len());

        // Filtering
        if usage.cancel.is_cancelled() {
            return ResolutionResult::unresolved(considered, ResolveError::Cancelled);
        }
        let cx = ConversionCx {
            universe,
            config,
            registry: &registries.conversions,
        };
        let mut applicable = Vec::new();
        for (candidate, mapping) in mapped {
            match check_applicability(candidate, mapping, args, &cx) {
                Applicability::Applicable(a) => applicable.push(a),
                Applicability::Inapplicable(reason) => reasons.push(reason),
            }
        }
        debug!(target: "resolve", phase = %Phase::Filtering, applicable = applicable.len());
        if applicable.is_empty() {
            debug!(target: "resolve", phase = %Phase::Unresolved, %receiver, method = name, reasons = reasons.len());
            return ResolutionResult::Unresolved { considered, reasons };
        }

        // Ranking
        if usage.cancel.is_cancelled() {
            return ResolutionResult::unresolved(considered, ResolveError::Cancelled);
        }
        let rank_cx = RankCx {
            conversions: cx,
            args,
            cancel: &usage.cancel,
        };
        match rank(applicable, &registries.comparators, &rank_cx) {
            RankOutcome::Winner(winner) => {
                let input = CallTypeInput {
                    receiver,
                    resolved: &winner,
                    args,
                };
                let (inferred_type, calculator) = registries.calculators.compute(&input);
                debug!(
                    target: "resolve",
                    phase = %Phase::Resolved,
                    candidate = %winner.candidate.id,
                    cost = winner.cost,
                    calculator = calculator.unwrap_or("substitution"),
                    %inferred_type,
                );
                ResolutionResult::Resolved {
                    candidate: winner.candidate,
                    mapping: winner.mapping,
                    conversions: winner.conversions,
                    inferred_type,
                }
            }
            RankOutcome::Tied(tied) => {
                debug!(target: "resolve", phase = %Phase::Ambiguous, %receiver, method = name, tied = tied.len());
                ResolutionResult::Ambiguous {
                    tied: tied.into_iter().map(|a| a.candidate).collect(),
                }
            }
            RankOutcome::Cancelled => {
                debug!(target: "resolve", phase = %Phase::Ranking, "cancelled");
                ResolutionResult::unresolved(considered, ResolveError::Cancelled)
            }
            RankOutcome::Inconsistent(msg) => {
                error!(target: "resolve", phase = %Phase::Ranking, %receiver, method = name, error = %msg, "resolution aborted");
                ResolutionResult::unresolved(considered, ResolveError::InternalInconsistency(msg))
            }
        }
    }
}
