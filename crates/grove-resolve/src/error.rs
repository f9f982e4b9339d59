//! Resolution errors.
//!
//! Everything except `InternalInconsistency` is an expected outcome that
//! callers act on (diagnostics, completion filtering). They travel inside
//! `ResolutionResult::Unresolved` as reasons; none of them aborts anything
//! beyond the call that produced it.

use std::fmt;

use grove_common::Span;

use crate::args::ArgSource;
use crate::candidate::{ArityRange, CandidateId};
use crate::ty::Ty;

/// Which kind of argument overflowed a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Positional,
    Closure,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::Positional => write!(f, "positional"),
            ArgKind::Closure => write!(f, "closure"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResolveError {
    /// A named argument with no collector to receive it, or a key a closed
    /// collector does not list.
    UnknownNamedArgument {
        candidate: CandidateId,
        key: String,
        source: ArgSource,
    },
    /// A required collector key was not supplied.
    MissingNamedKey { candidate: CandidateId, key: String },
    ArityMismatch {
        candidate: CandidateId,
        expected: ArityRange,
        found: usize,
        kind: ArgKind,
    },
    /// A bound argument does not convert to its parameter.
    ConversionError {
        candidate: CandidateId,
        param: String,
        expected: Ty,
        found: Ty,
        source: ArgSource,
    },
    /// Nothing named `name` exists on the receiver.
    NoCandidates { receiver: Ty, name: String },
    /// The same key appears twice among the call's named arguments.
    DuplicateNamedArgument {
        key: String,
        first: Option<Span>,
        span: Option<Span>,
    },
    Cancelled,
    /// A plugged-in component broke an engine invariant.
    InternalInconsistency(String),
}

impl ResolveError {
    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::UnknownNamedArgument { .. } => "R0001",
            ResolveError::MissingNamedKey { .. } => "R0002",
            ResolveError::ArityMismatch { .. } => "R0003",
            ResolveError::ConversionError { .. } => "R0004",
            ResolveError::NoCandidates { .. } => "R0005",
            ResolveError::DuplicateNamedArgument { .. } => "R0006",
            ResolveError::Cancelled => "R0007",
            ResolveError::InternalInconsistency(_) => "R0008",
        }
    }

    /// The call argument this error is about, if any.
    pub fn arg_source(&self) -> Option<ArgSource> {
        match self {
            ResolveError::UnknownNamedArgument { source, .. }
            | ResolveError::ConversionError { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn candidate(&self) -> Option<&CandidateId> {
        match self {
            ResolveError::UnknownNamedArgument { candidate, .. }
            | ResolveError::MissingNamedKey { candidate, .. }
            | ResolveError::ArityMismatch { candidate, .. }
            | ResolveError::ConversionError { candidate, .. } => Some(candidate),
            _ => None,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnknownNamedArgument { candidate, key, .. } => {
                write!(f, "`{}` does not accept named argument `{}`", candidate, key)
            }
            ResolveError::MissingNamedKey { candidate, key } => {
                write!(f, "`{}` requires named argument `{}`", candidate, key)
            }
            ResolveError::ArityMismatch {
                candidate,
                expected,
                found,
                kind,
            } => write!(
                f,
                "`{}` expects {} {} arguments, found {}",
                candidate, expected, kind, found
            ),
            ResolveError::ConversionError {
                candidate,
                param,
                expected,
                found,
                ..
            } => write!(
                f,
                "`{}` parameter `{}` expects `{}`, found `{}`",
                candidate, param, expected, found
            ),
            ResolveError::NoCandidates { receiver, name } => {
                write!(f, "no method `{}` on `{}`", name, receiver)
            }
            ResolveError::DuplicateNamedArgument { key, .. } => {
                write!(f, "named argument `{}` is given more than once", key)
            }
            ResolveError::Cancelled => write!(f, "resolution was cancelled"),
            ResolveError::InternalInconsistency(msg) => {
                write!(f, "internal inconsistency: {}", msg)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_and_codes() {
        let err = ResolveError::MissingNamedKey {
            candidate: CandidateId::new("Chart::plot(opts: ..)"),
            key: "b".to_string(),
        };
        assert_eq!(err.to_string(), "`Chart::plot(opts: ..)` requires named argument `b`");
        assert_eq!(err.code(), "R0002");

        let err = ResolveError::ArityMismatch {
            candidate: CandidateId::new("List::add(Int)"),
            expected: ArityRange::exact(1),
            found: 3,
            kind: ArgKind::Positional,
        };
        assert_eq!(
            err.to_string(),
            "`List::add(Int)` expects 1 positional arguments, found 3"
        );
        assert_eq!(err.candidate().map(|c| c.as_str()), Some("List::add(Int)"));
        assert_eq!(ResolveError::Cancelled.arg_source(), None);
    }
}
