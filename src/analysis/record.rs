//! Fact records: everything statically discoverable about one source file.
//!
//! A `FactRecord` is populated exactly once by the matching analyzer and is
//! read-only from the graph's point of view, except for the explicit `merge`
//! used when an inline directive template is re-analyzed as markup and its
//! facts folded back into the owning script's record.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::source::normalize_path;

/// The component registration kinds an AngularJS module chain can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComponentKind {
    Provider,
    Factory,
    Service,
    Value,
    Constant,
    Controller,
    Animation,
    Filter,
    Directive,
}

impl ComponentKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "provider" => Some(ComponentKind::Provider),
            "factory" => Some(ComponentKind::Factory),
            "service" => Some(ComponentKind::Service),
            "value" => Some(ComponentKind::Value),
            "constant" => Some(ComponentKind::Constant),
            "controller" => Some(ComponentKind::Controller),
            "animation" => Some(ComponentKind::Animation),
            "filter" => Some(ComponentKind::Filter),
            "directive" => Some(ComponentKind::Directive),
            _ => None,
        }
    }

    /// `value` and `constant` registrations take plain values, never
    /// injectables, so their definitions carry no dependencies.
    pub fn is_injectable(self) -> bool {
        !matches!(self, ComponentKind::Value | ComponentKind::Constant)
    }

    /// Index key for a component of this kind. Directives, filters and
    /// animations live in their own namespaces; everything else shares the
    /// injector namespace.
    pub fn qualified(self, name: &str) -> String {
        match self {
            ComponentKind::Directive => format!("directive:{name}"),
            ComponentKind::Filter => format!("filter:{name}"),
            ComponentKind::Animation => format!("animation:{name}"),
            _ => name.to_string(),
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComponentKind::Provider => "provider",
            ComponentKind::Factory => "factory",
            ComponentKind::Service => "service",
            ComponentKind::Value => "value",
            ComponentKind::Constant => "constant",
            ComponentKind::Controller => "controller",
            ComponentKind::Animation => "animation",
            ComponentKind::Filter => "filter",
            ComponentKind::Directive => "directive",
        };
        write!(f, "{s}")
    }
}

/// The flavors of dependency a fact record can declare.
///
/// The first three are declared dependencies and resolve fatally; the token
/// kinds are heuristically discovered candidates and resolve best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencyKind {
    /// An injected component name.
    Component,
    /// An explicitly referenced template path.
    Template,
    /// A filter name used in an expression.
    Filter,
    /// A literal that merely looks like a template path.
    TemplateToken,
    /// A markup tag or attribute name that might be a directive.
    DirectiveToken,
    /// A class or id selector that might name an animation.
    AnimationToken,
}

/// Lookup policy applied when a dependency of a given kind cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Unresolved is a build-aborting error.
    Fatal,
    /// Unresolved is logged but does not abort (allowlist downgrade).
    Warn,
    /// Unresolved is silently ignored.
    Silent,
}

impl DependencyKind {
    pub fn policy(self) -> ResolvePolicy {
        match self {
            DependencyKind::Component | DependencyKind::Template | DependencyKind::Filter => {
                ResolvePolicy::Fatal
            }
            DependencyKind::TemplateToken
            | DependencyKind::DirectiveToken
            | DependencyKind::AnimationToken => ResolvePolicy::Silent,
        }
    }
}

/// Per-file structured dependency facts.
#[derive(Debug, Clone, Default)]
pub struct FactRecord {
    pub path: String,

    /// Modules this file contributes definitions to.
    pub modules: BTreeSet<String>,
    /// Component definitions keyed by kind.
    pub items: BTreeMap<ComponentKind, BTreeSet<String>>,

    component: BTreeSet<String>,
    template: BTreeSet<String>,
    filter: BTreeSet<String>,
    template_token: BTreeSet<String>,
    directive_token: BTreeSet<String>,
    animation_token: BTreeSet<String>,

    /// Resolve keys locally satisfied, keyed by owning controller name.
    /// `None` is the "no owner" bucket.
    pub resolves: BTreeMap<Option<String>, BTreeSet<String>>,

    pub is_app: bool,
    pub has_config: bool,
    pub has_run: bool,
    pub is_required: bool,
}

impl FactRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn dependencies(&self, kind: DependencyKind) -> &BTreeSet<String> {
        match kind {
            DependencyKind::Component => &self.component,
            DependencyKind::Template => &self.template,
            DependencyKind::Filter => &self.filter,
            DependencyKind::TemplateToken => &self.template_token,
            DependencyKind::DirectiveToken => &self.directive_token,
            DependencyKind::AnimationToken => &self.animation_token,
        }
    }

    pub fn add_module(&mut self, module: impl Into<String>) {
        self.modules.insert(module.into());
    }

    pub fn add_item(&mut self, kind: ComponentKind, name: impl Into<String>) {
        self.items.entry(kind).or_default().insert(name.into());
    }

    /// Record a dependency, applying kind-specific normalization. Duplicate
    /// calls are no-ops.
    pub fn add_dependency(&mut self, kind: DependencyKind, value: &str) {
        match kind {
            DependencyKind::Component => {
                // `$`-prefixed services are framework-internal.
                if value.starts_with('$') {
                    return;
                }
                let mut name = match value.split_once(" as ") {
                    Some((pre, _)) => pre,
                    None => value,
                };
                // Asking for fooProvider is asking for foo.
                name = name.strip_suffix("Provider").unwrap_or(name);
                if !name.is_empty() {
                    self.component.insert(name.to_string());
                }
            }
            DependencyKind::Template => {
                let path = normalize_path(value);
                if path.is_empty() {
                    return;
                }
                // A confirmed template supersedes its candidate entry.
                self.template_token.remove(&path);
                self.template.insert(path);
            }
            DependencyKind::TemplateToken => {
                let path = normalize_path(value);
                if !path.is_empty() && !self.template.contains(&path) {
                    self.template_token.insert(path);
                }
            }
            DependencyKind::Filter => {
                if !value.is_empty() {
                    self.filter.insert(value.to_string());
                }
            }
            DependencyKind::DirectiveToken => {
                let token = camelize(value);
                if !token.is_empty() {
                    self.directive_token.insert(token);
                }
            }
            DependencyKind::AnimationToken => {
                if value.len() > 1 {
                    self.animation_token.insert(value.to_string());
                }
            }
        }
    }

    pub fn add_resolve(&mut self, owner: Option<&str>, key: impl Into<String>) {
        self.resolves
            .entry(owner.map(str::to_string))
            .or_default()
            .insert(key.into());
    }

    /// Union of resolve keys across all owners, including the no-owner
    /// bucket. This is what suppresses missing-dependency findings for a
    /// file reached by path.
    pub fn all_resolves(&self) -> BTreeSet<String> {
        self.resolves.values().flatten().cloned().collect()
    }

    pub fn mark_config(&mut self) {
        self.has_config = true;
        self.is_required = true;
    }

    pub fn mark_run(&mut self) {
        self.has_run = true;
        self.is_required = true;
    }

    pub fn mark_app(&mut self) {
        self.is_app = true;
        self.is_required = true;
    }

    pub fn mark_required(&mut self) {
        self.is_required = true;
    }

    /// Fold another record's facts into this one. Used when an inline
    /// literal template inside a script is analyzed as markup.
    pub fn merge(&mut self, other: &FactRecord) {
        for module in &other.modules {
            self.add_module(module.clone());
        }
        for (kind, names) in &other.items {
            for name in names {
                self.add_item(*kind, name.clone());
            }
        }
        // Re-insert through add_dependency so normalization and the
        // candidate/confirmed template rule keep holding after a merge.
        for kind in [
            DependencyKind::Component,
            DependencyKind::Template,
            DependencyKind::Filter,
            DependencyKind::TemplateToken,
            DependencyKind::DirectiveToken,
            DependencyKind::AnimationToken,
        ] {
            for value in other.dependencies(kind).clone() {
                self.add_dependency(kind, &value);
            }
        }
        for (owner, keys) in &other.resolves {
            for key in keys {
                self.add_resolve(owner.as_deref(), key.clone());
            }
        }
        if other.is_app {
            self.mark_app();
        }
        if other.has_config {
            self.mark_config();
        }
        if other.has_run {
            self.mark_run();
        }
        if other.is_required {
            self.mark_required();
        }
    }
}

/// Normalize a hyphenated markup token to camel case; `data-` vendor
/// prefixes are stripped first since both notations name the same directive.
pub fn camelize(token: &str) -> String {
    let token = token
        .strip_prefix("data-")
        .or_else(|| token.strip_prefix("DATA-"))
        .unwrap_or(token);
    let mut out = String::with_capacity(token.len());
    let mut upper_next = false;
    for c in token.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
