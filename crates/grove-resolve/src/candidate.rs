//! Method candidates: what the collector produces and every later phase
//! consumes.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::ty::Ty;
use crate::universe::{MethodSig, Param};

/// Where a candidate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// A member of the receiver's declaration or one of its supertypes.
    Declared,
    /// Synthesized by a contributor.
    Contributed,
    /// An extension method offered for the receiver.
    Extension,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Declared => "declared",
            Origin::Contributed => "contributed",
            Origin::Extension => "extension",
        };
        f.write_str(s)
    }
}

/// Stable identity of a candidate, e.g. `List::add(E)` or
/// `ext:Strings::shout(String)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(Arc<str>);

impl CandidateId {
    pub fn new(id: impl AsRef<str>) -> Self {
        CandidateId(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CandidateId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Number of positional arguments a candidate accepts. `max == None` means
/// unbounded (a vararg tail).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArityRange {
    pub min: usize,
    pub max: Option<usize>,
}

impl ArityRange {
    pub fn exact(n: usize) -> Self {
        ArityRange { min: n, max: Some(n) }
    }

    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }
}

impl fmt::Display for ArityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodCandidate {
    pub id: CandidateId,
    /// Signature in the receiver's view: the declaring type's parameters are
    /// already replaced, the method's own type parameters are still free.
    pub sig: MethodSig,
    /// The declaring type as seen from the receiver, e.g. `List<Int>`.
    pub declaring: Ty,
    pub origin: Origin,
}

impl MethodCandidate {
    pub fn declared(declaring: Ty, sig: MethodSig) -> Self {
        let id = CandidateId::new(format!(
            "{}::{}",
            declaring.base_name().unwrap_or("?"),
            sig.display_signature()
        ));
        MethodCandidate {
            id,
            sig,
            declaring,
            origin: Origin::Declared,
        }
    }

    /// A synthetic member. `source` names the contributor so two
    /// contributors offering the same shape keep distinct identities.
    pub fn contributed(source: &str, declaring: Ty, sig: MethodSig) -> Self {
        Self::synthetic(source, Origin::Contributed, declaring, sig)
    }

    pub fn extension(source: &str, declaring: Ty, sig: MethodSig) -> Self {
        Self::synthetic(source, Origin::Extension, declaring, sig)
    }

    fn synthetic(source: &str, origin: Origin, declaring: Ty, sig: MethodSig) -> Self {
        let id = CandidateId::new(format!(
            "{}:{}::{}",
            source,
            declaring.base_name().unwrap_or("?"),
            sig.display_signature()
        ));
        MethodCandidate {
            id,
            sig,
            declaring,
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.sig.name
    }

    pub fn params(&self) -> &[Param] {
        &self.sig.params
    }

    pub fn arity(&self) -> ArityRange {
        let positional = self.sig.params.iter().filter(|p| !p.is_collector());
        let mut min = 0;
        let mut max = Some(0);
        for p in positional {
            if p.vararg {
                max = None;
                continue;
            }
            if p.is_required() {
                min += 1;
            }
            max = max.map(|m| m + 1);
        }
        ArityRange { min, max }
    }
}
