//! Type-parameter binding inference.
//!
//! A generic method's type parameters are freshened into `ena` inference
//! variables, each declared parameter type is unified with the type of the
//! argument bound to it, and the result is read back as a [`Substitution`].
//! Unlike a checker, a failed match here is not an error: the attempt is
//! rolled back and the first consistent binding wins. Variables that no
//! argument constrained come out as `Unknown`.

use std::fmt;

use ena::unify::InPlaceUnificationTable;
use rustc_hash::FxHashMap;

use crate::ty::{RecordTy, Substitution, Ty, TyVar};

/// Two types that could not be made equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnifyError {
    pub expected: Ty,
    pub found: Ty,
}

impl fmt::Display for UnifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot unify `{}` with `{}`", self.expected, self.found)
    }
}

pub struct BindingCtx {
    table: InPlaceUnificationTable<TyVar>,
    /// Type parameter name -> the variable standing for it.
    params: FxHashMap<String, TyVar>,
    /// Declaration order of `params`, for deterministic output.
    order: Vec<String>,
}

impl Default for BindingCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingCtx {
    pub fn new() -> Self {
        BindingCtx {
            table: InPlaceUnificationTable::new(),
            params: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// A context where each of `type_params` stands for a fresh variable.
    pub fn with_params(type_params: &[String]) -> Self {
        let mut ctx = BindingCtx::new();
        for name in type_params {
            if ctx.params.contains_key(name) {
                continue;
            }
            let var = ctx.table.new_key(None);
            ctx.params.insert(name.clone(), var);
            ctx.order.push(name.clone());
        }
        ctx
    }

    pub fn fresh_var(&mut self) -> Ty {
        Ty::Var(self.table.new_key(None))
    }

    /// Replace this context's type parameters in `ty` with their variables.
    pub fn instantiate(&self, ty: &Ty) -> Ty {
        if self.params.is_empty() {
            return ty.clone();
        }
        let vars: Substitution = self
            .params
            .iter()
            .map(|(name, var)| (name.clone(), Ty::Var(*var)))
            .collect();
        ty.substitute(&vars)
    }

    /// Follow union-find links until reaching a non-variable or an unbound
    /// root variable.
    pub fn resolve(&mut self, ty: Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(v) {
                Some(inner) => self.resolve(inner),
                None => Ty::Var(self.table.find(v)),
            },
            Ty::Parameterized(base, args) => {
                let base = Box::new(self.resolve(*base));
                let args = args.into_iter().map(|a| self.resolve(a)).collect();
                Ty::Parameterized(base, args)
            }
            Ty::Array(elem) => Ty::Array(Box::new(self.resolve(*elem))),
            Ty::Function(params, ret) => {
                let params = params.into_iter().map(|p| self.resolve(p)).collect();
                let ret = Box::new(self.resolve(*ret));
                Ty::Function(params, ret)
            }
            Ty::RecordLiteral(rec) => Ty::RecordLiteral(RecordTy {
                fields: rec
                    .fields
                    .into_iter()
                    .map(|(k, v)| (k, self.resolve(v)))
                    .collect(),
                closed: rec.closed,
            }),
            other => other,
        }
    }

    fn occurs_in(&mut self, var: TyVar, ty: &Ty) -> bool {
        match ty {
            Ty::Var(v) => {
                if self.table.find(*v) == self.table.find(var) {
                    return true;
                }
                match self.table.probe_value(*v) {
                    Some(inner) => self.occurs_in(var, &inner),
                    None => false,
                }
            }
            Ty::Parameterized(base, args) => {
                self.occurs_in(var, base) || args.iter().any(|a| self.occurs_in(var, a))
            }
            Ty::Array(elem) => self.occurs_in(var, elem),
            Ty::Function(params, ret) => {
                params.iter().any(|p| self.occurs_in(var, p)) || self.occurs_in(var, ret)
            }
            Ty::RecordLiteral(rec) => rec.fields.values().any(|f| self.occurs_in(var, f)),
            Ty::Nominal(_) | Ty::Param(_) | Ty::Unknown | Ty::Error(_) => false,
        }
    }

    fn mismatch(expected: Ty, found: Ty) -> Result<(), UnifyError> {
        Err(UnifyError { expected, found })
    }

    /// Structurally unify `a` (the declared side) with `b` (the argument
    /// side). Dynamic types on either side unify with anything and bind
    /// nothing, so a later, better-typed argument can still bind the variable.
    pub fn unify(&mut self, a: Ty, b: Ty) -> Result<(), UnifyError> {
        let a = self.resolve(a);
        let b = self.resolve(b);

        match (a, b) {
            (x, y) if x.is_dynamic() || y.is_dynamic() => Ok(()),

            (Ty::Var(v1), Ty::Var(v2)) => {
                if v1 != v2 {
                    self.table
                        .unify_var_var(v1, v2)
                        .map_err(|_| UnifyError {
                            expected: Ty::Var(v1),
                            found: Ty::Var(v2),
                        })?;
                }
                Ok(())
            }

            (Ty::Var(v), ty) | (ty, Ty::Var(v)) => {
                if self.occurs_in(v, &ty) {
                    return Self::mismatch(Ty::Var(v), ty);
                }
                self.table
                    .unify_var_value(v, Some(ty.clone()))
                    .map_err(|_| UnifyError {
                        expected: Ty::Var(v),
                        found: ty,
                    })
            }

            // Parameters of an enclosing scope are opaque here and bind nothing.
            (Ty::Param(_), _) | (_, Ty::Param(_)) => Ok(()),

            (Ty::Nominal(c1), Ty::Nominal(c2)) => {
                if c1 == c2 {
                    Ok(())
                } else {
                    Self::mismatch(Ty::Nominal(c1), Ty::Nominal(c2))
                }
            }

            // `Name` and `Name<>` are the same type.
            (Ty::Nominal(c), Ty::Parameterized(base, args))
            | (Ty::Parameterized(base, args), Ty::Nominal(c))
                if args.is_empty() =>
            {
                self.unify(Ty::Nominal(c), *base)
            }

            (Ty::Parameterized(b1, a1), Ty::Parameterized(b2, a2)) => {
                if a1.len() != a2.len() {
                    return Self::mismatch(Ty::Parameterized(b1, a1), Ty::Parameterized(b2, a2));
                }
                self.unify(*b1, *b2)?;
                for (x, y) in a1.into_iter().zip(a2) {
                    self.unify(x, y)?;
                }
                Ok(())
            }

            (Ty::Array(e1), Ty::Array(e2)) => self.unify(*e1, *e2),

            (Ty::Function(p1, r1), Ty::Function(p2, r2)) => {
                if p1.len() != p2.len() {
                    return Self::mismatch(Ty::Function(p1, r1), Ty::Function(p2, r2));
                }
                for (x, y) in p1.into_iter().zip(p2) {
                    self.unify(x, y)?;
                }
                self.unify(*r1, *r2)
            }

            (Ty::RecordLiteral(r1), Ty::RecordLiteral(r2)) => {
                if r1.fields.len() != r2.fields.len()
                    || !r1.fields.keys().all(|k| r2.fields.contains_key(k))
                {
                    return Self::mismatch(Ty::RecordLiteral(r1), Ty::RecordLiteral(r2));
                }
                let mut other = r2.fields;
                for (k, v) in r1.fields {
                    if let Some(w) = other.remove(&k) {
                        self.unify(v, w)?;
                    }
                }
                Ok(())
            }

            (a, b) => Self::mismatch(a, b),
        }
    }

    /// Try to unify `pattern` with `actual`; on failure every variable bound
    /// during the attempt is rolled back. Returns whether the attempt stuck.
    pub fn bind(&mut self, pattern: &Ty, actual: &Ty) -> bool {
        let snapshot = self.table.snapshot();
        match self.unify(pattern.clone(), actual.clone()) {
            Ok(()) => {
                self.table.commit(snapshot);
                true
            }
            Err(_) => {
                self.table.rollback_to(snapshot);
                false
            }
        }
    }

    /// Resolve `ty` and replace every variable still unbound with `Unknown`.
    pub fn finish(&mut self, ty: &Ty) -> Ty {
        self.resolve(ty.clone()).erase_params()
    }

    /// The inferred binding of every type parameter; unconstrained
    /// parameters map to `Unknown`.
    pub fn bindings(&mut self) -> Substitution {
        let mut out = Substitution::default();
        let order = self.order.clone();
        for name in order {
            let var = self.params[&name];
            let ty = self.finish(&Ty::Var(var));
            out.insert(name, ty);
        }
        out
    }
}
