//! `@inject` annotations and use-statement lookup
//!
//! Parameters and properties can name the component to inject in their docblock:
//!
//! ```text
//! @inject $transport Norma\Mail\Transport lazy scope=instance
//! ```
//!
//! Both collaborators are traits so embedders can plug in their own metadata source;
//! [`DocParser`] and [`ImportMap`] are the container defaults.

use crate::{DiError, Result, Scope, key};
use ahash::{AHashMap, RandomState};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Component requested by an `@inject` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    component: String,
    lazy: bool,
    scope: Option<Scope>,
}

impl Annotation {
    #[inline]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            lazy: false,
            scope: None,
        }
    }

    #[inline]
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    #[inline]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Component name as written
    #[inline]
    pub fn component(&self) -> &str {
        &self.component
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    #[inline]
    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }
}

/// Parsed annotations of one member, keyed by `$param` (or `""` for the member itself).
pub type Annotations = AHashMap<String, Annotation>;

/// Source of injection metadata
pub trait AnnotationParser: Send + Sync {
    /// Parse the docblock of `target` (a `Class::member` path used for caching and
    /// error messages).
    fn parse(&self, target: &str, doc: &str) -> Result<Annotations>;
}

static INJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)@inject(?:[ \t]+([^\r\n]*))?[ \t]*$").expect("inject pattern is valid")
});

/// Regex-based docblock parser with a per-member cache.
pub struct DocParser {
    cache: DashMap<(String, String), Annotations, RandomState>,
}

impl DocParser {
    pub fn new() -> Self {
        Self {
            cache: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    fn parse_uncached(target: &str, doc: &str) -> Result<Annotations> {
        let mut annotations = Annotations::new();
        for captures in INJECT.captures_iter(doc) {
            let body = captures.get(1).map_or("", |m| m.as_str());
            let body = body.trim_end().trim_end_matches("*/");

            let mut param = None;
            let mut component: Option<&str> = None;
            let mut annotation = Annotation::new("");
            for token in body.split_whitespace() {
                if token == "lazy" {
                    annotation.lazy = true;
                } else if let Some(scope) = token.strip_prefix("scope=") {
                    annotation.scope = Some(Scope::parse(scope).ok_or_else(|| {
                        DiError::InvalidAnnotation {
                            target: target.to_string(),
                            reason: format!("unknown scope '{scope}'"),
                        }
                    })?);
                } else if key::is_parameter_key(token) && param.is_none() && component.is_none() {
                    param = Some(token);
                } else if component.is_none() {
                    component = Some(token);
                } else {
                    return Err(DiError::InvalidAnnotation {
                        target: target.to_string(),
                        reason: format!("unexpected token '{token}'"),
                    });
                }
            }

            let Some(component) = component else {
                return Err(DiError::MissingAnnotationComponent {
                    target: target.to_string(),
                });
            };
            annotation.component = component.to_string();
            annotations.insert(param.unwrap_or_default().to_string(), annotation);
        }
        Ok(annotations)
    }
}

impl Default for DocParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationParser for DocParser {
    fn parse(&self, target: &str, doc: &str) -> Result<Annotations> {
        if doc.is_empty() {
            return Ok(Annotations::new());
        }
        let cache_key = (target.to_string(), doc.to_string());
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached.value().clone());
        }

        let annotations = Self::parse_uncached(target, doc)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "norma_di",
            member = target,
            annotations = annotations.len(),
            "Parsed injection annotations"
        );

        self.cache.insert(cache_key, annotations.clone());
        Ok(annotations)
    }
}

impl std::fmt::Debug for DocParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocParser")
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Imports visible to a class, used to expand short component names in annotations.
pub trait UseStatementResolver: Send + Sync {
    /// Alias -> normalized full name for classes in `namespace` (declared in `file`).
    fn aliases(&self, namespace: &str, file: Option<&Path>) -> AHashMap<String, String>;
}

/// Explicit per-namespace imports.
///
/// ```rust
/// use norma_di::{ImportMap, UseStatementResolver};
///
/// let imports = ImportMap::new()
///     .import("App\\Http", "Norma\\Mail\\Mailer")
///     .import_as("App\\Http", "Norma\\Log\\FileLogger", "Logger");
///
/// let aliases = imports.aliases("App|Http", None);
/// assert_eq!(aliases.get("Mailer").map(String::as_str), Some("Norma|Mail|Mailer"));
/// assert_eq!(aliases.get("Logger").map(String::as_str), Some("Norma|Log|FileLogger"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    namespaces: AHashMap<String, AHashMap<String, String>>,
}

impl ImportMap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a class under its short name
    pub fn import(self, namespace: &str, class: &str) -> Self {
        let full = key::normalize(class);
        let alias = key::short_name(&full).to_string();
        self.import_as(namespace, class, &alias)
    }

    /// Import a class under an alias
    pub fn import_as(mut self, namespace: &str, class: &str, alias: &str) -> Self {
        self.namespaces
            .entry(key::normalize(namespace))
            .or_default()
            .insert(alias.to_string(), key::normalize(class));
        self
    }
}

impl UseStatementResolver for ImportMap {
    fn aliases(&self, namespace: &str, _file: Option<&Path>) -> AHashMap<String, String> {
        self.namespaces
            .get(&key::normalize(namespace))
            .cloned()
            .unwrap_or_default()
    }
}

static USE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?use[ \t]+([^;]+);")
        .expect("use pattern is valid")
});

/// Reads `use` declarations from the class's source file.
///
/// `crate::`, `self::` and `super::` prefixes are resolved against the namespace asking.
/// Parsed files are cached; unreadable files contribute no aliases.
pub struct SourceImports {
    cache: DashMap<PathBuf, Arc<Vec<(String, Vec<String>)>>, RandomState>,
}

impl SourceImports {
    pub fn new() -> Self {
        Self {
            cache: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Alias -> raw path segments for every import in `source`.
    fn parse_source(source: &str) -> Vec<(String, Vec<String>)> {
        let mut imports = Vec::new();
        for captures in USE_DECL.captures_iter(source) {
            let Some(decl) = captures.get(1) else { continue };
            let decl: String = decl.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            use_tree(&[], &decl, &mut imports);
        }
        imports
    }

    fn imports(&self, file: &Path) -> Arc<Vec<(String, Vec<String>)>> {
        if let Some(cached) = self.cache.get(file) {
            return Arc::clone(cached.value());
        }
        let imports = match std::fs::read_to_string(file) {
            Ok(source) => Self::parse_source(&source),
            Err(_err) => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "norma_di",
                    file = %file.display(),
                    error = %_err,
                    "Could not read source file for use statements"
                );
                Vec::new()
            }
        };
        let imports = Arc::new(imports);
        self.cache.insert(file.to_path_buf(), Arc::clone(&imports));
        imports
    }
}

/// Collect the imports of one use tree, descending into nested `{...}` groups.
fn use_tree(prefix: &[String], tree: &str, imports: &mut Vec<(String, Vec<String>)>) {
    let tree = tree.trim();
    if let Some(open) = tree.find('{') {
        let Some(body) = tree[open + 1..].strip_suffix('}') else {
            return;
        };
        let mut nested = prefix.to_vec();
        nested.extend(path_segments(tree[..open].trim_end().trim_end_matches("::")));
        for item in split_group(body) {
            use_tree(&nested, item, imports);
        }
        return;
    }

    if tree == "self" {
        if let Some(last) = prefix.last() {
            imports.push((last.clone(), prefix.to_vec()));
        }
        return;
    }
    if let Some((alias, mut path)) = import_item(tree) {
        if !prefix.is_empty() && path.first().is_some_and(|first| first == "self") {
            path.remove(0);
        }
        let mut full = prefix.to_vec();
        full.extend(path);
        imports.push((alias, full));
    }
}

/// Split a group body on the commas outside nested braces
fn split_group(body: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (at, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&body[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    items.push(&body[start..]);
    items
}

fn path_segments(path: &str) -> Vec<String> {
    path.split("::")
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `a::b::C` or `a::b::C as D` into `(alias, segments)`.
fn import_item(item: &str) -> Option<(String, Vec<String>)> {
    let item = item.trim();
    let (path, alias) = match item.split_once(" as ") {
        Some((path, alias)) => (path.trim(), Some(alias.trim())),
        None => (item, None),
    };
    let segments = path_segments(path);
    let last = segments.last()?.clone();
    let alias = alias.map(str::to_string).unwrap_or(last);
    if alias == "*" || alias == "_" || segments.is_empty() {
        return None;
    }
    Some((alias, segments))
}

/// Resolve `crate`, `self` and `super` against the importing namespace.
fn anchor(namespace: &str, segments: &[String]) -> String {
    let mut base: Vec<&str> = key::split(namespace).collect();
    let mut rest = segments;
    match rest.first().map(String::as_str) {
        Some("crate") => {
            base.truncate(1);
            rest = &rest[1..];
        }
        Some("self") => rest = &rest[1..],
        Some("super") => {
            while rest.first().is_some_and(|s| s == "super") {
                base.pop();
                rest = &rest[1..];
            }
        }
        _ => base.clear(),
    }
    let mut full: Vec<&str> = base;
    full.extend(rest.iter().map(String::as_str));
    key::join(&full)
}

impl Default for SourceImports {
    fn default() -> Self {
        Self::new()
    }
}

impl UseStatementResolver for SourceImports {
    fn aliases(&self, namespace: &str, file: Option<&Path>) -> AHashMap<String, String> {
        let Some(file) = file else {
            return AHashMap::new();
        };
        let namespace = key::normalize(namespace);
        self.imports(file)
            .iter()
            .map(|(alias, segments)| (alias.clone(), anchor(&namespace, segments)))
            .collect()
    }
}

impl std::fmt::Debug for SourceImports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImports")
            .field("files", &self.cache.len())
            .finish()
    }
}
