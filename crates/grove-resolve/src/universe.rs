//! Declarations and the type universe the resolver queries.
//!
//! The universe is produced upstream (by whatever indexes the host's source
//! files and libraries) and is read-only to the resolver. [`TypeUniverse`] is
//! the seam; [`InMemoryUniverse`] is the implementation used by the CLI and
//! the tests.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ty::{DeclId, Substitution, Ty, TyCon};

/// One key accepted by a named-argument collector.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedKey {
    pub name: String,
    pub ty: Ty,
    pub required: bool,
}

/// The keys a named-argument collector parameter accepts.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct NamedSchema {
    pub keys: Vec<NamedKey>,
    /// An open schema accepts keys it does not list.
    pub open: bool,
}

impl NamedSchema {
    pub fn key(&self, name: &str) -> Option<&NamedKey> {
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &NamedKey> {
        self.keys.iter().filter(|k| k.required)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamKind {
    Positional,
    /// Receives every named argument of the call as one map.
    NamedCollector(NamedSchema),
}

/// A declared parameter.
///
/// For a vararg parameter `ty` is the element type: `String... names` has
/// `ty == String`.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
    pub optional: bool,
    pub vararg: bool,
    pub kind: ParamKind,
}

impl Param {
    pub fn positional(name: impl Into<String>, ty: Ty) -> Self {
        Param {
            name: name.into(),
            ty,
            optional: false,
            vararg: false,
            kind: ParamKind::Positional,
        }
    }

    pub fn optional(name: impl Into<String>, ty: Ty) -> Self {
        Param {
            optional: true,
            ..Param::positional(name, ty)
        }
    }

    pub fn vararg(name: impl Into<String>, element: Ty) -> Self {
        Param {
            vararg: true,
            ..Param::positional(name, element)
        }
    }

    pub fn named(name: impl Into<String>, schema: NamedSchema) -> Self {
        Param {
            kind: ParamKind::NamedCollector(schema),
            ..Param::positional(name, Ty::map(Ty::string(), Ty::Unknown))
        }
    }

    /// Must be bound by the call: not optional, not vararg, not a collector.
    pub fn is_required(&self) -> bool {
        !self.optional && !self.vararg && !self.is_collector()
    }

    pub fn is_collector(&self) -> bool {
        matches!(self.kind, ParamKind::NamedCollector(_))
    }

    pub fn schema(&self) -> Option<&NamedSchema> {
        match &self.kind {
            ParamKind::NamedCollector(schema) => Some(schema),
            ParamKind::Positional => None,
        }
    }

    /// The type as written at the declaration: `T[]` for a vararg `T...`.
    pub fn declared_ty(&self) -> Ty {
        if self.vararg {
            Ty::array(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }

    fn substitute(&self, bindings: &Substitution) -> Param {
        let kind = match &self.kind {
            ParamKind::Positional => ParamKind::Positional,
            ParamKind::NamedCollector(schema) => ParamKind::NamedCollector(NamedSchema {
                keys: schema
                    .keys
                    .iter()
                    .map(|k| NamedKey {
                        ty: k.ty.substitute(bindings),
                        ..k.clone()
                    })
                    .collect(),
                open: schema.open,
            }),
        };
        Param {
            ty: self.ty.substitute(bindings),
            kind,
            ..self.clone()
        }
    }
}

/// A method signature as declared (or synthesized).
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSig {
    pub name: String,
    /// Method-level type parameters, e.g. `<R>` in `<R> List<R> collect(...)`.
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub return_type: Ty,
    pub is_abstract: bool,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, params: Vec<Param>, return_type: Ty) -> Self {
        MethodSig {
            name: name.into(),
            type_params: Vec::new(),
            params,
            return_type,
            is_abstract: false,
        }
    }

    pub fn with_type_params(mut self, names: &[&str]) -> Self {
        self.type_params = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Apply `bindings` to parameter and return types. The method's own
    /// type parameters shadow same-named entries in `bindings`.
    pub fn substitute(&self, bindings: &Substitution) -> MethodSig {
        let shadowed;
        let bindings = if self.type_params.iter().any(|p| bindings.contains_key(p)) {
            let mut reduced = bindings.clone();
            for p in &self.type_params {
                reduced.remove(p);
            }
            shadowed = reduced;
            &shadowed
        } else {
            bindings
        };
        MethodSig {
            params: self.params.iter().map(|p| p.substitute(bindings)).collect(),
            return_type: self.return_type.substitute(bindings),
            ..self.clone()
        }
    }

    /// Bind the method's own type parameters. The result has none left.
    pub fn instantiate(&self, bindings: &Substitution) -> MethodSig {
        let monomorphic = MethodSig {
            type_params: Vec::new(),
            ..self.clone()
        };
        monomorphic.substitute(bindings)
    }

    /// `name(T1, T2...)`, used for identities and diagnostics.
    pub fn display_signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match &p.kind {
                ParamKind::NamedCollector(_) => format!("{}: ..", p.name),
                ParamKind::Positional if p.vararg => format!("{}...", p.ty),
                ParamKind::Positional if p.optional => format!("{}?", p.ty),
                ParamKind::Positional => p.ty.to_string(),
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub name: String,
    pub ty: Ty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Class,
    Interface,
}

/// A class or interface declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: DeclKind,
    pub type_params: Vec<String>,
    /// Direct supertypes in declaration order, written in terms of this
    /// declaration's type parameters (`ArrayList<E>` extends `List<E>`).
    pub supertypes: Vec<Ty>,
    /// Own methods in declaration order.
    pub methods: Vec<MethodSig>,
    pub properties: Vec<Property>,
}

impl TypeDecl {
    pub fn class(name: impl Into<String>) -> Self {
        TypeDecl {
            name: name.into(),
            kind: DeclKind::Class,
            type_params: Vec::new(),
            supertypes: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        TypeDecl {
            kind: DeclKind::Interface,
            ..TypeDecl::class(name)
        }
    }

    pub fn type_params(mut self, names: &[&str]) -> Self {
        self.type_params = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn extends(mut self, supertype: Ty) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn method(mut self, sig: MethodSig) -> Self {
        self.methods.push(sig);
        self
    }

    pub fn property(mut self, name: impl Into<String>, ty: Ty) -> Self {
        self.properties.push(Property {
            name: name.into(),
            ty,
        });
        self
    }

    /// Bind this declaration's type parameters to the arguments of `ty`.
    /// A raw use (no arguments) binds every parameter to `Unknown`.
    pub fn bindings_for(&self, ty: &Ty) -> Substitution {
        let args = ty.type_args();
        self.type_params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), args.get(i).cloned().unwrap_or(Ty::Unknown)))
            .collect()
    }

    /// Abstract methods of this declaration only (not inherited).
    pub fn abstract_methods(&self) -> impl Iterator<Item = &MethodSig> {
        self.methods.iter().filter(|m| m.is_abstract)
    }
}

/// The declaration/type provider consumed by the resolver.
///
/// Implementations must be cheap to query and must not block: resolution
/// calls this from many threads at once.
pub trait TypeUniverse: Send + Sync {
    fn declaration(&self, name: &str) -> Option<&TypeDecl>;

    /// Own methods of `decl`, in a stable order.
    fn methods<'a>(&'a self, decl: &'a TypeDecl) -> &'a [MethodSig] {
        &decl.methods
    }

    /// Direct supertypes of `decl`, in a stable order.
    fn supertypes<'a>(&'a self, decl: &'a TypeDecl) -> &'a [Ty] {
        &decl.supertypes
    }
}

/// A declaration reached while walking a receiver's hierarchy.
#[derive(Debug)]
pub struct HierarchyEntry<'a> {
    pub decl: &'a TypeDecl,
    /// The receiver seen as this declaration, e.g. `Collection<Int>` for an
    /// `ArrayList<Int>` receiver.
    pub view: Ty,
    /// `decl.type_params` bound according to `view`.
    pub bindings: Substitution,
    /// Number of supertype edges from the receiver.
    pub depth: u32,
}

/// Walk `ty`'s declaration and its supertypes breadth-first in declared
/// supertype order, so more-derived declarations come first. Each
/// declaration is visited once (the shallowest path wins); `max_depth`
/// bounds the walk.
pub fn hierarchy<'a>(universe: &'a dyn TypeUniverse, ty: &Ty, max_depth: usize) -> Vec<HierarchyEntry<'a>> {
    let mut out = Vec::new();
    let Some(root_name) = ty.base_name() else {
        return out;
    };
    let Some(root) = universe.declaration(root_name) else {
        return out;
    };

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut queue = VecDeque::new();
    seen.insert(root.name.as_str());
    queue.push_back((root, ty.clone(), 0u32));

    while let Some((decl, view, depth)) = queue.pop_front() {
        let bindings = decl.bindings_for(&view);
        if (depth as usize) < max_depth {
            for sup in universe.supertypes(decl) {
                let Some(name) = sup.base_name() else {
                    continue;
                };
                let Some(sup_decl) = universe.declaration(name) else {
                    continue;
                };
                if seen.insert(sup_decl.name.as_str()) {
                    queue.push_back((sup_decl, sup.substitute(&bindings), depth + 1));
                }
            }
        }
        out.push(HierarchyEntry {
            decl,
            view,
            bindings,
            depth,
        });
    }
    out
}

/// `ty` seen as `target`, with the number of supertype edges crossed.
///
/// `view_as(ArrayList<Int>, "Collection")` is `Some((Collection<Int>, 2))`.
/// A type is always a view of its own base, even when the universe does not
/// declare it.
pub fn view_as(universe: &dyn TypeUniverse, ty: &Ty, target: &str, max_depth: usize) -> Option<(Ty, u32)> {
    if ty.base_name() == Some(target) {
        return Some((ty.clone(), 0));
    }
    hierarchy(universe, ty, max_depth)
        .into_iter()
        .find(|entry| entry.decl.name == target)
        .map(|entry| (entry.view, entry.depth))
}

/// In-memory universe keyed by declaration name, preserving insertion order.
#[derive(Debug, Default)]
pub struct InMemoryUniverse {
    decls: Vec<TypeDecl>,
    index: FxHashMap<String, DeclId>,
}

impl InMemoryUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration, replacing any earlier one with the same name.
    pub fn insert(&mut self, decl: TypeDecl) -> DeclId {
        if let Some(&id) = self.index.get(&decl.name) {
            self.decls[id.0 as usize] = decl;
            return id;
        }
        let id = DeclId(self.decls.len() as u32);
        self.index.insert(decl.name.clone(), id);
        self.decls.push(decl);
        id
    }

    pub fn with(mut self, decl: TypeDecl) -> Self {
        self.insert(decl);
        self
    }

    pub fn get(&self, id: DeclId) -> Option<&TypeDecl> {
        self.decls.get(id.0 as usize)
    }

    /// A nominal type carrying this declaration's id.
    pub fn nominal(&self, name: &str) -> Ty {
        match self.index.get(name) {
            Some(&id) => Ty::Nominal(TyCon::with_decl(name, id)),
            None => Ty::nominal(name),
        }
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.iter()
    }
}

impl TypeUniverse for InMemoryUniverse {
    fn declaration(&self, name: &str) -> Option<&TypeDecl> {
        let id = self.index.get(name)?;
        self.decls.get(id.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collections() -> InMemoryUniverse {
        InMemoryUniverse::new()
            .with(TypeDecl::class("Object"))
            .with(
                TypeDecl::interface("Iterable")
                    .type_params(&["T"])
                    .extends(Ty::object()),
            )
            .with(
                TypeDecl::interface("Collection")
                    .type_params(&["E"])
                    .extends(Ty::generic("Iterable", vec![Ty::param("E")])),
            )
            .with(
                TypeDecl::interface("List")
                    .type_params(&["E"])
                    .extends(Ty::generic("Collection", vec![Ty::param("E")])),
            )
            .with(
                TypeDecl::class("ArrayList")
                    .type_params(&["E"])
                    .extends(Ty::object())
                    .extends(Ty::list(Ty::param("E"))),
            )
    }

    #[test]
    fn hierarchy_is_breadth_first_and_instantiated() {
        let universe = collections();
        let receiver = Ty::generic("ArrayList", vec![Ty::int()]);
        let walk = hierarchy(&universe, &receiver, 16);
        let names: Vec<&str> = walk.iter().map(|e| e.decl.name.as_str()).collect();
        assert_eq!(names, vec!["ArrayList", "Object", "List", "Collection", "Iterable"]);
        let iterable = walk.iter().find(|e| e.decl.name == "Iterable").unwrap();
        assert_eq!(iterable.view, Ty::generic("Iterable", vec![Ty::int()]));
        assert_eq!(iterable.bindings["T"], Ty::int());
        assert_eq!(iterable.depth, 3);
    }

    #[test]
    fn view_as_reports_distance() {
        let universe = collections();
        let receiver = Ty::generic("ArrayList", vec![Ty::string()]);
        assert_eq!(
            view_as(&universe, &receiver, "Collection", 16),
            Some((Ty::generic("Collection", vec![Ty::string()]), 2))
        );
        assert_eq!(view_as(&universe, &receiver, "Map", 16), None);
        // Undeclared types are still views of themselves.
        assert_eq!(view_as(&universe, &Ty::int(), "Int", 16), Some((Ty::int(), 0)));
    }

    #[test]
    fn raw_receiver_binds_parameters_to_unknown() {
        let universe = collections();
        let walk = hierarchy(&universe, &Ty::nominal("List"), 16);
        assert_eq!(walk[0].bindings["E"], Ty::Unknown);
        assert_eq!(walk[1].view, Ty::generic("Collection", vec![Ty::Unknown]));
    }

    #[test]
    fn depth_limit_stops_the_walk() {
        let universe = collections();
        let walk = hierarchy(&universe, &Ty::list(Ty::int()), 1);
        let names: Vec<&str> = walk.iter().map(|e| e.decl.name.as_str()).collect();
        assert_eq!(names, vec!["List", "Collection"]);
    }

    #[test]
    fn method_substitution_respects_own_type_params() {
        let sig = MethodSig::new(
            "map",
            vec![Param::positional("f", Ty::fun(vec![Ty::param("E")], Ty::param("E")))],
            Ty::param("E"),
        )
        .with_type_params(&["E"]);
        let mut bindings = Substitution::default();
        bindings.insert("E".into(), Ty::int());
        // The method's own `E` shadows the declaration's `E`.
        assert_eq!(sig.substitute(&bindings), sig);
        assert_eq!(sig.display_signature(), "map((E) -> E)");
    }
}
