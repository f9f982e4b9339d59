//! Type representation for the Grove resolver.
//!
//! Types are immutable values compared structurally. Substitution always
//! produces a new `Ty`. The structural predicates here (`is_same_as`,
//! `is_assignable_hint`) are hints only: real convertibility is decided by
//! the conversion registry so that plugged-in converters can override them.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

/// Index of a declaration inside a [`crate::universe::TypeUniverse`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeclId(pub u32);

/// An inference variable, identified by its index in the `ena` table.
///
/// Variables only live inside a [`crate::unify::BindingCtx`]; they are
/// replaced by concrete types or `Unknown` before a type leaves the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyVar(pub u32);

/// A nominal type constructor: a name plus an optional link to its
/// declaration.
///
/// `decl` is a lookup shortcut for providers that hand out ids; it is
/// excluded from `PartialEq` and `Hash` so a type written by hand and the
/// same type produced by a provider compare equal.
#[derive(Clone, Debug)]
pub struct TyCon {
    pub name: String,
    pub decl: Option<DeclId>,
}

impl PartialEq for TyCon {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TyCon {}

impl std::hash::Hash for TyCon {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl TyCon {
    pub fn new(name: impl Into<String>) -> Self {
        TyCon { name: name.into(), decl: None }
    }

    pub fn with_decl(name: impl Into<String>, decl: DeclId) -> Self {
        TyCon { name: name.into(), decl: Some(decl) }
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Field map of a record literal such as `[name: "x", age: 3]`.
///
/// A closed record has exactly these fields; an open one may carry more
/// that the analysis could not see.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordTy {
    pub fields: BTreeMap<String, Ty>,
    pub closed: bool,
}

/// A Grove type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A named type: `String`, `Person`, or a raw generic like `List`.
    Nominal(TyCon),
    /// A generic type applied to arguments: `Map<String, Int>`.
    Parameterized(Box<Ty>, Vec<Ty>),
    /// `T[]`
    Array(Box<Ty>),
    /// A function or closure type: `(A, B) -> R`.
    Function(Vec<Ty>, Box<Ty>),
    /// A record (map) literal with statically known keys.
    RecordLiteral(RecordTy),
    /// A free type parameter of a declaration or method, e.g. `T`.
    Param(String),
    /// An inference variable (internal to binding inference).
    Var(TyVar),
    /// Statically unknown: the dynamic type.
    Unknown,
    /// A type that could not be computed, with the reason.
    Error(String),
}

/// Type parameter name -> bound type.
pub type Substitution = FxHashMap<String, Ty>;

impl Ty {
    pub fn nominal(name: impl Into<String>) -> Ty {
        Ty::Nominal(TyCon::new(name))
    }

    /// `name<args>`; collapses to a plain nominal when `args` is empty.
    pub fn generic(name: impl Into<String>, args: Vec<Ty>) -> Ty {
        if args.is_empty() {
            Ty::nominal(name)
        } else {
            Ty::Parameterized(Box::new(Ty::nominal(name)), args)
        }
    }

    pub fn array(element: Ty) -> Ty {
        Ty::Array(Box::new(element))
    }

    pub fn fun(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Function(params, Box::new(ret))
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Ty)>, closed: bool) -> Ty {
        Ty::RecordLiteral(RecordTy {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            closed,
        })
    }

    pub fn param(name: impl Into<String>) -> Ty {
        Ty::Param(name.into())
    }

    pub fn error(reason: impl Into<String>) -> Ty {
        Ty::Error(reason.into())
    }

    pub fn int() -> Ty {
        Ty::nominal("Int")
    }

    pub fn long() -> Ty {
        Ty::nominal("Long")
    }

    pub fn double() -> Ty {
        Ty::nominal("Double")
    }

    pub fn string() -> Ty {
        Ty::nominal("String")
    }

    pub fn bool() -> Ty {
        Ty::nominal("Bool")
    }

    pub fn object() -> Ty {
        Ty::nominal("Object")
    }

    pub fn list(element: Ty) -> Ty {
        Ty::generic("List", vec![element])
    }

    pub fn map(key: Ty, value: Ty) -> Ty {
        Ty::generic("Map", vec![key, value])
    }

    /// Name of the nominal head: `Map` for both `Map` and `Map<K, V>`.
    pub fn base_name(&self) -> Option<&str> {
        match self {
            Ty::Nominal(con) => Some(&con.name),
            Ty::Parameterized(base, _) => base.base_name(),
            _ => None,
        }
    }

    /// Type arguments of a parameterized type, empty otherwise.
    pub fn type_args(&self) -> &[Ty] {
        match self {
            Ty::Parameterized(_, args) => args,
            _ => &[],
        }
    }

    /// `Unknown` or `Error`: values of these types are accepted anywhere.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Ty::Unknown | Ty::Error(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Ty::Function(..))
    }

    /// Whether any `Param` or `Var` occurs in this type.
    pub fn has_free_params(&self) -> bool {
        match self {
            Ty::Param(_) | Ty::Var(_) => true,
            Ty::Parameterized(base, args) => {
                base.has_free_params() || args.iter().any(Ty::has_free_params)
            }
            Ty::Array(elem) => elem.has_free_params(),
            Ty::Function(params, ret) => {
                params.iter().any(Ty::has_free_params) || ret.has_free_params()
            }
            Ty::RecordLiteral(rec) => rec.fields.values().any(Ty::has_free_params),
            Ty::Nominal(_) | Ty::Unknown | Ty::Error(_) => false,
        }
    }

    /// Replace bound type parameters. Unbound parameters are left in place.
    pub fn substitute(&self, bindings: &Substitution) -> Ty {
        if bindings.is_empty() {
            return self.clone();
        }
        match self {
            Ty::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Ty::Parameterized(base, args) => Ty::Parameterized(
                Box::new(base.substitute(bindings)),
                args.iter().map(|a| a.substitute(bindings)).collect(),
            ),
            Ty::Array(elem) => Ty::Array(Box::new(elem.substitute(bindings))),
            Ty::Function(params, ret) => Ty::Function(
                params.iter().map(|p| p.substitute(bindings)).collect(),
                Box::new(ret.substitute(bindings)),
            ),
            Ty::RecordLiteral(rec) => Ty::RecordLiteral(RecordTy {
                fields: rec
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.substitute(bindings)))
                    .collect(),
                closed: rec.closed,
            }),
            Ty::Nominal(_) | Ty::Var(_) | Ty::Unknown | Ty::Error(_) => self.clone(),
        }
    }

    /// Replace every remaining `Param`/`Var` with `Unknown`.
    pub fn erase_params(&self) -> Ty {
        if !self.has_free_params() {
            return self.clone();
        }
        match self {
            Ty::Param(_) | Ty::Var(_) => Ty::Unknown,
            Ty::Parameterized(base, args) => Ty::Parameterized(
                Box::new(base.erase_params()),
                args.iter().map(Ty::erase_params).collect(),
            ),
            Ty::Array(elem) => Ty::Array(Box::new(elem.erase_params())),
            Ty::Function(params, ret) => Ty::Function(
                params.iter().map(Ty::erase_params).collect(),
                Box::new(ret.erase_params()),
            ),
            Ty::RecordLiteral(rec) => Ty::RecordLiteral(RecordTy {
                fields: rec
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.erase_params()))
                    .collect(),
                closed: rec.closed,
            }),
            Ty::Nominal(_) | Ty::Unknown | Ty::Error(_) => self.clone(),
        }
    }

    /// Structural identity, treating `Name` and `Name<>` as the same type.
    pub fn is_same_as(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Nominal(a), Ty::Parameterized(base, args))
            | (Ty::Parameterized(base, args), Ty::Nominal(a))
                if args.is_empty() =>
            {
                matches!(base.as_ref(), Ty::Nominal(b) if b == a)
            }
            (Ty::Parameterized(b1, a1), Ty::Parameterized(b2, a2)) => {
                b1.is_same_as(b2)
                    && a1.len() == a2.len()
                    && a1.iter().zip(a2).all(|(x, y)| x.is_same_as(y))
            }
            (Ty::Array(a), Ty::Array(b)) => a.is_same_as(b),
            (Ty::Function(p1, r1), Ty::Function(p2, r2)) => {
                p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(x, y)| x.is_same_as(y))
                    && r1.is_same_as(r2)
            }
            (Ty::RecordLiteral(r1), Ty::RecordLiteral(r2)) => {
                r1.closed == r2.closed
                    && r1.fields.len() == r2.fields.len()
                    && r1
                        .fields
                        .iter()
                        .all(|(k, v)| r2.fields.get(k).is_some_and(|w| v.is_same_as(w)))
            }
            _ => self == other,
        }
    }

    /// Universe-free assignability guess: identity, dynamic operands,
    /// covariant arrays, and record literals whose fields cover a closed
    /// target record. Used for hints such as completion ordering, never for
    /// applicability.
    pub fn is_assignable_hint(&self, target: &Ty) -> bool {
        if self.is_dynamic() || target.is_dynamic() || self.is_same_as(target) {
            return true;
        }
        match (self, target) {
            (Ty::Array(a), Ty::Array(b)) => a.is_assignable_hint(b),
            (Ty::Function(p1, r1), Ty::Function(p2, r2)) => {
                p1.len() == p2.len()
                    && p2.iter().zip(p1).all(|(t, a)| t.is_assignable_hint(a))
                    && r1.is_assignable_hint(r2)
            }
            (Ty::RecordLiteral(actual), Ty::RecordLiteral(expected)) => expected
                .fields
                .iter()
                .all(|(k, v)| actual.fields.get(k).is_some_and(|a| a.is_assignable_hint(v)))
                && (!expected.closed || actual.fields.len() == expected.fields.len()),
            _ => false,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ty]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Nominal(con) => write!(f, "{}", con),
            Ty::Parameterized(base, args) => {
                write!(f, "{}", base)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    write_list(f, args)?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Array(elem) => write!(f, "{}[]", elem),
            Ty::Function(params, ret) => {
                write!(f, "(")?;
                write_list(f, params)?;
                write!(f, ") -> {}", ret)
            }
            Ty::RecordLiteral(rec) => {
                write!(f, "{{")?;
                for (i, (k, v)) in rec.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                if !rec.closed {
                    if rec.fields.is_empty() {
                        write!(f, "..")?;
                    } else {
                        write!(f, ", ..")?;
                    }
                }
                write!(f, "}}")
            }
            Ty::Param(name) => write!(f, "{}", name),
            Ty::Var(v) => write!(f, "?{}", v.0),
            Ty::Unknown => write!(f, "?"),
            Ty::Error(reason) => write!(f, "<error: {}>", reason),
        }
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}
