//! Member contributors: sources of candidates that no declaration lists.

use crate::candidate::MethodCandidate;
use crate::config::ResolveConfig;
use crate::convert::{ConversionRegistry, Position};
use crate::ty::{Substitution, Ty};
use crate::universe::{hierarchy, view_as, MethodSig, Param, TypeUniverse};

/// Read-only view of a collection in progress.
pub struct ContributionQuery<'a> {
    pub receiver: &'a Ty,
    pub name: &'a str,
    /// Everything collected so far, declared members first.
    pub existing: &'a [MethodCandidate],
    pub universe: &'a dyn TypeUniverse,
    pub config: &'a ResolveConfig,
    pub conversions: &'a ConversionRegistry,
}

impl<'a> ContributionQuery<'a> {
    /// Whether a collected candidate already has this name and arity.
    pub fn has_shape(&self, name: &str, arity: usize) -> bool {
        self.existing
            .iter()
            .any(|c| c.name() == name && c.sig.arity() == arity)
    }
}

/// Offers extra candidates for a receiver and member name.
///
/// Contributors only add: they see the collected list and return new
/// entries, which the collector appends. Returning a candidate tagged
/// `Declared` fails the resolution.
pub trait MemberContributor: Send + Sync {
    fn name(&self) -> &str;

    fn contribute(&self, query: &ContributionQuery<'_>) -> Vec<MethodCandidate>;
}

/// `getX()`, `isX()` and `setX(v)` for declared properties.
#[derive(Debug, Default)]
pub struct PropertyAccessorContributor;

enum Accessor {
    Get,
    Is,
    Set,
}

/// `getFirstName` -> (Get, "firstName").
fn split_accessor(name: &str) -> Option<(Accessor, String)> {
    let (kind, rest) = if let Some(rest) = name.strip_prefix("get") {
        (Accessor::Get, rest)
    } else if let Some(rest) = name.strip_prefix("is") {
        (Accessor::Is, rest)
    } else if let Some(rest) = name.strip_prefix("set") {
        (Accessor::Set, rest)
    } else {
        return None;
    };
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    let property: String = first.to_lowercase().chain(chars).collect();
    Some((kind, property))
}

impl MemberContributor for PropertyAccessorContributor {
    fn name(&self) -> &str {
        "properties"
    }

    fn contribute(&self, query: &ContributionQuery<'_>) -> Vec<MethodCandidate> {
        let Some((kind, property)) = split_accessor(query.name) else {
            return Vec::new();
        };
        let walk = hierarchy(query.universe, query.receiver, query.config.max_hierarchy_depth);
        let found = walk.iter().find_map(|entry| {
            entry
                .decl
                .properties
                .iter()
                .find(|p| p.name == property)
                .map(|p| (entry.view.clone(), p.ty.substitute(&entry.bindings)))
        });
        let Some((declaring, ty)) = found else {
            return Vec::new();
        };

        let sig = match kind {
            Accessor::Get => MethodSig::new(query.name, vec![], ty),
            Accessor::Is if ty == Ty::bool() => MethodSig::new(query.name, vec![], ty),
            Accessor::Is => return Vec::new(),
            Accessor::Set => MethodSig::new(
                query.name,
                vec![Param::positional("value", ty)],
                Ty::nominal("Void"),
            ),
        };
        if query.has_shape(&sig.name, sig.arity()) {
            return Vec::new();
        }
        vec![MethodCandidate::contributed(self.name(), declaring, sig)]
    }
}

/// A method attached to every receiver that converts to `target`.
///
/// `sig` is written in terms of the target's type parameters: an extension
/// on `Iterable<T>` may return `T`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionMethod {
    pub target: Ty,
    pub sig: MethodSig,
}

/// Extension methods grouped under one source name (a category class, a
/// plugin).
#[derive(Clone, Debug, Default)]
pub struct ExtensionMethodContributor {
    source: String,
    methods: Vec<ExtensionMethod>,
}

impl ExtensionMethodContributor {
    pub fn new(source: impl Into<String>) -> Self {
        ExtensionMethodContributor {
            source: source.into(),
            methods: Vec::new(),
        }
    }

    pub fn add(&mut self, target: Ty, sig: MethodSig) {
        self.methods.push(ExtensionMethod { target, sig });
    }

    pub fn with(mut self, target: Ty, sig: MethodSig) -> Self {
        self.add(target, sig);
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Bind the parameters written as `target`'s arguments to `view`'s
/// arguments: `Iterable<T>` against `Iterable<Int>` gives `T = Int`.
fn target_bindings(target: &Ty, view: &Ty) -> Substitution {
    target
        .type_args()
        .iter()
        .zip(view.type_args())
        .filter_map(|(t, v)| match t {
            Ty::Param(name) => Some((name.clone(), v.clone())),
            _ => None,
        })
        .collect()
}

impl MemberContributor for ExtensionMethodContributor {
    fn name(&self) -> &str {
        &self.source
    }

    fn contribute(&self, query: &ContributionQuery<'_>) -> Vec<MethodCandidate> {
        let depth = query.config.max_hierarchy_depth;
        let mut out = Vec::new();
        for ext in self.methods.iter().filter(|e| e.sig.name == query.name) {
            let Some(target_name) = ext.target.base_name() else {
                continue;
            };
            let (declaring, bindings) = match view_as(query.universe, query.receiver, target_name, depth) {
                Some((view, _)) => {
                    let bindings = target_bindings(&ext.target, &view);
                    (view, bindings)
                }
                None => {
                    let erased = ext.target.erase_params();
                    let reachable = query
                        .conversions
                        .convert(&erased, query.receiver, Position::Assignment, query.universe, query.config)
                        .is_some();
                    if !reachable {
                        continue;
                    }
                    (erased, Substitution::default())
                }
            };
            out.push(MethodCandidate::extension(
                &self.source,
                declaring,
                ext.sig.substitute(&bindings),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Origin;
    use crate::universe::{InMemoryUniverse, TypeDecl};

    fn universe() -> InMemoryUniverse {
        InMemoryUniverse::new()
            .with(TypeDecl::class("Object"))
            .with(
                TypeDecl::class("Person")
                    .extends(Ty::object())
                    .property("firstName", Ty::string())
                    .property("active", Ty::bool()),
            )
            .with(TypeDecl::class("Employee").extends(Ty::nominal("Person")))
            .with(TypeDecl::interface("Iterable").type_params(&["T"]))
            .with(
                TypeDecl::class("List")
                    .type_params(&["E"])
                    .extends(Ty::generic("Iterable", vec![Ty::param("E")])),
            )
    }

    fn contribute(contributor: &dyn MemberContributor, receiver: Ty, name: &str, existing: &[MethodCandidate]) -> Vec<MethodCandidate> {
        let universe = universe();
        let config = ResolveConfig::default();
        let conversions = ConversionRegistry::new();
        let query = ContributionQuery {
            receiver: &receiver,
            name,
            existing,
            universe: &universe,
            config: &config,
            conversions: &conversions,
        };
        contributor.contribute(&query)
    }

    #[test]
    fn accessor_names() {
        assert!(matches!(split_accessor("getFirstName"), Some((Accessor::Get, p)) if p == "firstName"));
        assert!(matches!(split_accessor("isActive"), Some((Accessor::Is, p)) if p == "active"));
        assert!(split_accessor("getter").is_none());
        assert!(split_accessor("get").is_none());
        assert!(split_accessor("size").is_none());
    }

    #[test]
    fn synthesizes_inherited_accessors() {
        let got = contribute(&PropertyAccessorContributor, Ty::nominal("Employee"), "getFirstName", &[]);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].origin, Origin::Contributed);
        assert_eq!(got[0].sig.return_type, Ty::string());
        assert_eq!(got[0].id.as_str(), "properties:Person::getFirstName()");

        let setter = contribute(&PropertyAccessorContributor, Ty::nominal("Employee"), "setFirstName", &[]);
        assert_eq!(setter[0].params()[0].ty, Ty::string());

        assert_eq!(contribute(&PropertyAccessorContributor, Ty::nominal("Person"), "isActive", &[]).len(), 1);
        assert!(contribute(&PropertyAccessorContributor, Ty::nominal("Person"), "isFirstName", &[]).is_empty());
    }

    #[test]
    fn declared_accessors_win() {
        let declared = MethodCandidate::declared(
            Ty::nominal("Person"),
            MethodSig::new("getFirstName", vec![], Ty::string()),
        );
        let got = contribute(
            &PropertyAccessorContributor,
            Ty::nominal("Person"),
            "getFirstName",
            std::slice::from_ref(&declared),
        );
        assert!(got.is_empty());
    }

    #[test]
    fn extensions_bind_target_parameters() {
        let ext = ExtensionMethodContributor::new("ext")
            .with(
                Ty::generic("Iterable", vec![Ty::param("T")]),
                MethodSig::new("firstOr", vec![Param::positional("fallback", Ty::param("T"))], Ty::param("T")),
            )
            .with(Ty::object(), MethodSig::new("firstOr", vec![], Ty::object()))
            .with(Ty::string(), MethodSig::new("firstOr", vec![], Ty::string()));
        let got = contribute(&ext, Ty::list(Ty::int()), "firstOr", &[]);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].declaring, Ty::generic("Iterable", vec![Ty::int()]));
        assert_eq!(got[0].sig.return_type, Ty::int());
        assert_eq!(got[0].origin, Origin::Extension);
        assert_eq!(got[1].declaring, Ty::object());
    }
}
