//! Expression typing on top of call resolution.
//!
//! Only the expression shapes the resolver needs are modelled. Calls go
//! through [`Engine::resolve_call`]; everything else is typed structurally.

use grove_common::Span;

use crate::args::{Argument, ArgumentList};
use crate::convert::{ConversionCx, Position};
use crate::engine::{Engine, ResolutionResult, UsageContext};
use crate::ty::Ty;

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A leaf whose type the host already knows.
    Typed(Ty),
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// `new T[] { a, b }` with the element type left to inference.
    Array(Vec<Expr>),
    /// `[key: value, ...]`
    Record(Vec<(String, Expr)>),
    Closure { params: Vec<Ty>, body: Box<Expr> },
    Cast { target: Ty, expr: Box<Expr> },
    Call(CallExpr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub receiver: Box<Expr>,
    pub name: String,
    pub positional: Vec<Expr>,
    pub named: Vec<(String, Expr)>,
    pub closures: Vec<Expr>,
    pub span: Option<Span>,
}

impl CallExpr {
    pub fn new(receiver: Expr, name: impl Into<String>) -> Self {
        CallExpr {
            receiver: Box::new(receiver),
            name: name.into(),
            positional: Vec::new(),
            named: Vec::new(),
            closures: Vec::new(),
            span: None,
        }
    }

    pub fn arg(mut self, expr: Expr) -> Self {
        self.positional.push(expr);
        self
    }

    pub fn named(mut self, key: impl Into<String>, expr: Expr) -> Self {
        self.named.push((key.into(), expr));
        self
    }

    pub fn closure(mut self, expr: Expr) -> Self {
        self.closures.push(expr);
        self
    }
}

impl From<CallExpr> for Expr {
    fn from(call: CallExpr) -> Self {
        Expr::Call(call)
    }
}

impl Engine {
    /// The static type of `expr`. Always produces a type: failed calls
    /// give `Error`, ambiguous or cancelled ones `Unknown`.
    pub fn infer_expression_type(&self, expr: &Expr, usage: &UsageContext) -> Ty {
        match expr {
            Expr::Typed(ty) => ty.clone(),
            Expr::List(items) => match self.join_elements(items, usage) {
                Ok(elem) => Ty::list(elem),
                Err(err) => err,
            },
            Expr::Array(items) => match self.join_elements(items, usage) {
                Ok(elem) => Ty::array(elem),
                Err(err) => err,
            },
            Expr::Record(fields) => {
                let mut typed = Vec::with_capacity(fields.len());
                for (key, value) in fields {
                    let ty = self.infer_expression_type(value, usage);
                    if matches!(ty, Ty::Error(_)) {
                        return ty;
                    }
                    typed.push((key.clone(), ty));
                }
                Ty::record(typed, true)
            }
            Expr::Closure { params, body } => {
                let ret = self.infer_expression_type(body, usage);
                if matches!(ret, Ty::Error(_)) {
                    return ret;
                }
                Ty::fun(params.clone(), ret)
            }
            Expr::Cast { target, expr } => {
                let actual = self.infer_expression_type(expr, usage);
                if matches!(actual, Ty::Error(_)) {
                    return actual;
                }
                let registries = self.snapshot();
                let cx = ConversionCx {
                    universe: self.universe(),
                    config: &registries.config,
                    registry: &registries.conversions,
                };
                match cx.convert(target, &actual, Position::ExplicitCast) {
                    Some(_) => target.clone(),
                    None => Ty::error(format!("cannot cast `{}` to `{}`", actual, target)),
                }
            }
            Expr::Call(call) => self.infer_call(call, usage),
        }
    }

    fn infer_call(&self, call: &CallExpr, usage: &UsageContext) -> Ty {
        let receiver = self.infer_expression_type(&call.receiver, usage);
        if matches!(receiver, Ty::Error(_)) {
            return receiver;
        }
        let mut args = ArgumentList::new();
        for expr in &call.positional {
            match self.infer_expression_type(expr, usage) {
                Ty::Error(reason) => return Ty::Error(reason),
                ty => args.push_positional(Argument::new(ty)),
            }
        }
        for (key, expr) in &call.named {
            match self.infer_expression_type(expr, usage) {
                Ty::Error(reason) => return Ty::Error(reason),
                ty => args.push_named(key.clone(), Argument::new(ty)),
            }
        }
        for expr in &call.closures {
            match self.infer_expression_type(expr, usage) {
                Ty::Error(reason) => return Ty::Error(reason),
                ty => args.push_closure(Argument::new(ty)),
            }
        }

        match self.resolve_call(&receiver, &call.name, &args, usage) {
            ResolutionResult::Resolved { inferred_type, .. } => inferred_type,
            ResolutionResult::Ambiguous { .. } => Ty::Unknown,
            result @ ResolutionResult::Unresolved { .. } if result.is_cancelled() => Ty::Unknown,
            ResolutionResult::Unresolved { reasons, .. } => {
                let reason = match reasons.first() {
                    Some(first) => first.to_string(),
                    None => format!("no applicable `{}` on `{}`", call.name, receiver),
                };
                Ty::Error(reason)
            }
        }
    }

    /// Common element type of a literal: the shared type, the widest
    /// numeric type, or the first element type every other converts to.
    /// `Unknown` when none exists.
    fn join_elements(&self, items: &[Expr], usage: &UsageContext) -> Result<Ty, Ty> {
        let mut types = Vec::with_capacity(items.len());
        for item in items {
            let ty = self.infer_expression_type(item, usage);
            if matches!(ty, Ty::Error(_)) {
                return Err(ty);
            }
            types.push(ty);
        }
        let Some(first) = types.first() else {
            return Ok(Ty::Unknown);
        };
        if types.iter().all(|t| t.is_same_as(first)) {
            return Ok(first.clone());
        }

        let registries = self.snapshot();
        let config = &registries.config;
        let ranks: Option<Vec<usize>> = types
            .iter()
            .map(|t| match t {
                Ty::Nominal(con) => config.numeric_rank(&con.name),
                _ => None,
            })
            .collect();
        if let Some(ranks) = ranks {
            let widest = ranks
                .iter()
                .enumerate()
                .max_by_key(|(_, r)| **r)
                .map(|(i, _)| types[i].clone());
            if let Some(widest) = widest {
                return Ok(widest);
            }
        }

        let cx = ConversionCx {
            universe: self.universe(),
            config,
            registry: &registries.conversions,
        };
        let common = types.iter().find(|candidate| {
            types
                .iter()
                .all(|t| cx.convert(candidate, t, Position::Assignment).is_some())
        });
        Ok(common.cloned().unwrap_or(Ty::Unknown))
    }
}
