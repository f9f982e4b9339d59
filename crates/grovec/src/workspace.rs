//! Workspace files: declarations, extension methods and call queries in TOML.
//!
//! ```toml
//! [config]
//! max_hierarchy_depth = 32
//!
//! [[types]]
//! name = "Map"
//! kind = "interface"
//! type_params = ["K", "V"]
//! methods = [
//!     { name = "get", params = [{ name = "key", type = "K" }], returns = "V" },
//! ]
//!
//! [[extensions]]
//! source = "strings"
//! target = "Object"
//! name = "describe"
//! returns = "String"
//!
//! [[calls]]
//! receiver = "Map<String, Int>"
//! method = "get"
//! args = ["String"]
//! source = "counts.get(key)"
//! ```

use std::fmt;
use std::path::Path;

use grove_resolve::contrib::ExtensionMethodContributor;
use grove_resolve::ty_syntax::{parse_type_with_params, TypeSyntaxError};
use grove_resolve::universe::{NamedKey, NamedSchema, Property};
use grove_resolve::{ArgumentList, InMemoryUniverse, MethodSig, Param, ResolveConfig, Ty, TypeDecl};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default)]
    pub config: ResolveConfig,
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    #[serde(default)]
    pub extensions: Vec<ExtensionEntry>,
    #[serde(default)]
    pub calls: Vec<CallEntry>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindEntry {
    #[default]
    Class,
    Interface,
}

#[derive(Debug, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(default)]
    pub kind: KindEntry,
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodEntry>,
    #[serde(default)]
    pub properties: Vec<PropertyEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MethodEntry {
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub params: Vec<ParamEntry>,
    #[serde(default = "unknown_type")]
    pub returns: String,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

fn unknown_type() -> String {
    "?".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ParamEntry {
    pub name: String,
    #[serde(rename = "type", default = "unknown_type")]
    pub ty: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub vararg: bool,
    /// Present on a named-argument collector.
    #[serde(default)]
    pub named: Option<Vec<NamedKeyEntry>>,
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Deserialize)]
pub struct NamedKeyEntry {
    pub name: String,
    #[serde(rename = "type", default = "unknown_type")]
    pub ty: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Deserialize)]
pub struct PropertyEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtensionEntry {
    pub source: String,
    pub target: String,
    /// Parameters of `target` the signature refers to.
    #[serde(default)]
    pub type_params: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamEntry>,
    #[serde(default = "unknown_type")]
    pub returns: String,
}

#[derive(Debug, Deserialize)]
pub struct NamedArgEntry {
    pub key: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Deserialize)]
pub struct CallEntry {
    pub receiver: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub named: Vec<NamedArgEntry>,
    #[serde(default)]
    pub closures: Vec<String>,
    /// Source text of the call, used for diagnostics.
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug)]
pub enum WorkspaceError {
    Io { path: String, source: std::io::Error },
    Parse(toml::de::Error),
    Config(grove_resolve::config::ConfigError),
    Type { context: String, source: TypeSyntaxError },
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::Io { path, source } => write!(f, "failed to read {}: {}", path, source),
            WorkspaceError::Parse(e) => write!(f, "failed to parse workspace: {}", e),
            WorkspaceError::Config(e) => write!(f, "{}", e),
            WorkspaceError::Type { context, source } => write!(f, "{}: {}", context, source),
        }
    }
}

impl std::error::Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkspaceError::Io { source, .. } => Some(source),
            WorkspaceError::Parse(e) => Some(e),
            WorkspaceError::Config(e) => Some(e),
            WorkspaceError::Type { source, .. } => Some(source),
        }
    }
}

/// A call query with its types parsed.
#[derive(Debug)]
pub struct CallQuery {
    pub receiver: Ty,
    pub method: String,
    pub args: ArgumentList,
    pub source: String,
}

impl CallQuery {
    /// `receiver.method(args)` as written in the workspace.
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self.args.positional.iter().map(|a| a.ty.to_string()).collect();
        parts.extend(self.args.named.iter().map(|n| format!("{}: {}", n.key, n.value.ty)));
        let mut out = format!("{}.{}({})", self.receiver, self.method, parts.join(", "));
        for closure in &self.args.closures {
            out.push_str(&format!(" {{ {} }}", closure.ty));
        }
        out
    }
}

/// Everything a resolution run needs.
#[derive(Debug)]
pub struct Workspace {
    pub config: ResolveConfig,
    pub universe: InMemoryUniverse,
    pub extensions: Vec<ExtensionMethodContributor>,
    pub calls: Vec<CallQuery>,
}

impl Workspace {
    pub fn from_file(path: &Path) -> Result<Workspace, WorkspaceError> {
        let content = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Workspace, WorkspaceError> {
        let file: WorkspaceFile = toml::from_str(content).map_err(WorkspaceError::Parse)?;
        Self::build(file)
    }

    fn build(file: WorkspaceFile) -> Result<Workspace, WorkspaceError> {
        file.config.validate().map_err(WorkspaceError::Config)?;

        let mut universe = InMemoryUniverse::new();
        for entry in &file.types {
            universe.insert(type_decl(entry)?);
        }

        // One contributor per source, in order of first appearance.
        let mut extensions: Vec<ExtensionMethodContributor> = Vec::new();
        let mut sources: Vec<&str> = Vec::new();
        for entry in &file.extensions {
            let context = format!("extension `{}.{}`", entry.source, entry.name);
            let target = parse(&entry.target, &entry.type_params, &context)?;
            let sig = method_sig(&entry.name, &[], &entry.params, &entry.returns, false, &entry.type_params, &context)?;
            match sources.iter().position(|s| *s == entry.source) {
                Some(i) => extensions[i].add(target, sig),
                None => {
                    sources.push(&entry.source);
                    extensions.push(ExtensionMethodContributor::new(entry.source.clone()).with(target, sig));
                }
            }
        }

        let calls = file
            .calls
            .iter()
            .enumerate()
            .map(|(i, entry)| call_query(i, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Workspace {
            config: file.config,
            universe,
            extensions,
            calls,
        })
    }
}

fn parse(src: &str, type_params: &[String], context: &str) -> Result<Ty, WorkspaceError> {
    parse_type_with_params(src, type_params).map_err(|source| WorkspaceError::Type {
        context: format!("{} (`{}`)", context, src),
        source,
    })
}

fn type_decl(entry: &TypeEntry) -> Result<TypeDecl, WorkspaceError> {
    let scope = &entry.type_params;
    let mut decl = match entry.kind {
        KindEntry::Class => TypeDecl::class(entry.name.clone()),
        KindEntry::Interface => TypeDecl::interface(entry.name.clone()),
    };
    decl.type_params = scope.clone();
    for sup in &entry.extends {
        decl.supertypes.push(parse(sup, scope, &format!("supertype of `{}`", entry.name))?);
    }
    for m in &entry.methods {
        let context = format!("method `{}.{}`", entry.name, m.name);
        decl.methods.push(method_sig(&m.name, &m.type_params, &m.params, &m.returns, m.is_abstract, scope, &context)?);
    }
    for p in &entry.properties {
        let ty = parse(&p.ty, scope, &format!("property `{}.{}`", entry.name, p.name))?;
        decl.properties.push(Property { name: p.name.clone(), ty });
    }
    Ok(decl)
}

fn method_sig(
    name: &str,
    own_params: &[String],
    params: &[ParamEntry],
    returns: &str,
    is_abstract: bool,
    outer: &[String],
    context: &str,
) -> Result<MethodSig, WorkspaceError> {
    let scope: Vec<String> = outer.iter().chain(own_params).cloned().collect();
    let params = params
        .iter()
        .map(|p| param(p, &scope, context))
        .collect::<Result<Vec<_>, _>>()?;
    let mut sig = MethodSig::new(name, params, parse(returns, &scope, context)?);
    sig.type_params = own_params.to_vec();
    sig.is_abstract = is_abstract;
    Ok(sig)
}

fn param(entry: &ParamEntry, scope: &[String], context: &str) -> Result<Param, WorkspaceError> {
    let context = format!("{} parameter `{}`", context, entry.name);
    if let Some(keys) = &entry.named {
        let keys = keys
            .iter()
            .map(|k| {
                Ok(NamedKey {
                    name: k.name.clone(),
                    ty: parse(&k.ty, scope, &context)?,
                    required: k.required,
                })
            })
            .collect::<Result<Vec<_>, WorkspaceError>>()?;
        return Ok(Param::named(entry.name.clone(), NamedSchema { keys, open: entry.open }));
    }
    let ty = parse(&entry.ty, scope, &context)?;
    let mut param = if entry.vararg {
        Param::vararg(entry.name.clone(), ty)
    } else {
        Param::positional(entry.name.clone(), ty)
    };
    param.optional = entry.optional;
    Ok(param)
}

fn call_query(index: usize, entry: &CallEntry) -> Result<CallQuery, WorkspaceError> {
    let context = format!("call #{} (`{}`)", index + 1, entry.method);
    let receiver = parse(&entry.receiver, &[], &context)?;
    let mut args = ArgumentList::new();
    for a in &entry.args {
        args = args.positional(parse(a, &[], &context)?);
    }
    for n in &entry.named {
        args = args.named(n.key.clone(), parse(&n.ty, &[], &context)?);
    }
    for c in &entry.closures {
        args = args.closure(parse(c, &[], &context)?);
    }
    let mut query = CallQuery {
        receiver,
        method: entry.method.clone(),
        args,
        source: String::new(),
    };
    query.source = entry.source.clone().unwrap_or_else(|| query.describe());
    Ok(query)
}
