//! Grove call resolution: which method does `receiver.name(args)` call, and
//! what type does the call have?
//!
//! Resolution runs in fixed phases over a receiver type, a member name and
//! a call's arguments:
//!
//! - [`collect`]: declared members along the receiver's supertypes, then
//!   whatever registered [`contrib::MemberContributor`]s add
//! - [`mapper`]: bind arguments to parameters (varargs, optionals, named
//!   argument collectors, trailing closures)
//! - [`filter`]: infer method type arguments and cost every conversion
//!   through the [`convert::ConversionRegistry`]
//! - [`rank`]: plugged-in comparators, then cost and specificity
//! - [`calc`]: the result type of the winner
//!
//! [`engine::Engine`] runs the phases against an immutable snapshot of
//! [`engine::Registries`]. Supporting modules:
//!
//! - [`ty`]: the type model; [`ty_syntax`] parses it from text
//! - [`unify`]: `ena`-backed binding inference
//! - [`universe`]: declarations and the supertype walk
//! - [`config`]: costs, numeric tower and fallbacks, loadable from TOML
//! - [`error`]: rejection reasons
//! - [`expr`]: expression typing on top of call resolution
//! - [`diagnostics`]: ariadne and JSON rendering of failed calls

pub mod args;
pub mod calc;
pub mod candidate;
pub mod collect;
pub mod config;
pub mod contrib;
pub mod convert;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod expr;
pub mod filter;
pub mod instantiate;
pub mod mapper;
pub mod rank;
pub mod ty;
pub mod ty_syntax;
pub mod unify;
pub mod universe;

pub use args::{ArgSource, Argument, ArgumentList};
pub use candidate::{CandidateId, MethodCandidate, Origin};
pub use config::ResolveConfig;
pub use engine::{Engine, Registries, RegistriesBuilder, ResolutionResult, UsageContext};
pub use error::ResolveError;
pub use expr::{CallExpr, Expr};
pub use grove_common::{CancellationToken, Span};
pub use ty::Ty;
pub use universe::{InMemoryUniverse, MethodSig, Param, TypeDecl, TypeUniverse};
