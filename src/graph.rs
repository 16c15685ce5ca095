//! The dependency graph: owns the ingested file set, derives the component
//! and resolve indices, and computes the ordered transitive closure.
//!
//! Indices are never persisted; every `build` pass derives them fresh from
//! the authoritative file set, so watch-mode `add`/`remove` calls only have
//! to keep that one map correct.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::SystemTime;

use colored::Colorize;
use glob::Pattern;

use crate::analysis::record::{DependencyKind, ResolvePolicy};
use crate::analysis::{FileNode, SourceFile, normalize_path};
use crate::config::Config;
use crate::errors::BuildError;

/// Filters shipped with the framework itself; always externally satisfied.
const BUILTIN_FILTERS: &[&str] = &[
    "currency", "date", "filter", "json", "limitTo", "lowercase", "number", "orderBy", "uppercase",
];

/// A compiled pattern list. Relative patterns match anywhere in the path,
/// so `includes/*` also matches `libs/calendar/includes/grid.js`.
struct PathMatcher {
    patterns: Vec<(Pattern, Pattern)>,
}

impl PathMatcher {
    fn new<'a>(patterns: impl IntoIterator<Item = &'a String>) -> Self {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| {
                let exact = Pattern::new(p).ok()?;
                let anywhere = Pattern::new(&format!("**/{p}")).ok()?;
                Some((exact, anywhere))
            })
            .collect();
        Self { patterns }
    }

    fn matches(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|(exact, anywhere)| exact.matches(path) || anywhere.matches(path))
    }
}

pub struct DependencyGraph {
    nodes: BTreeMap<String, FileNode>,
    config: Config,
    seeds: Vec<String>,

    parse_exclude: PathMatcher,
    required_files: PathMatcher,
    required_libs: PathMatcher,
    ignored_templates: PathMatcher,
    optional_libs: PathMatcher,
    optional_libs_include: PathMatcher,
    files_with_resolved_deps: PathMatcher,
    priority: Vec<Pattern>,
    global_dependencies: BTreeSet<String>,
}

impl DependencyGraph {
    pub fn new(config: Config) -> Self {
        let seeds = config.seeds.iter().map(|s| normalize_path(s)).collect();
        Self {
            nodes: BTreeMap::new(),
            seeds,
            parse_exclude: PathMatcher::new(&config.parse_exclude),
            required_files: PathMatcher::new(&config.required_files),
            required_libs: PathMatcher::new(&config.required_libs),
            ignored_templates: PathMatcher::new(&config.ignored_templates),
            optional_libs: PathMatcher::new(&config.optional_libs),
            optional_libs_include: PathMatcher::new([&config.optional_libs_include]),
            files_with_resolved_deps: PathMatcher::new(&config.files_with_resolved_deps),
            priority: config
                .file_priority
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
            global_dependencies: config.global_dependencies.iter().cloned().collect(),
            config,
        }
    }

    /// Ingest or update one file. Re-adding with an equal-or-older
    /// modification time is a no-op. May fail with a parse error.
    pub fn add(&mut self, file: SourceFile) -> Result<(), BuildError> {
        if let Some(existing) = self.nodes.get(&file.path) {
            if file.mtime <= existing.file.mtime {
                return Ok(());
            }
        }

        if self.config.verbose {
            let event = file.event.map(|e| e.to_string()).unwrap_or("ADD".into());
            eprintln!("{} {}", format!("{event}:").magenta(), file.path);
        }

        let path = file.path.clone();
        let unparsed = self.required_libs.matches(&path)
            || self.optional_libs_include.matches(&path)
            || self.parse_exclude.matches(&path);
        let mut node = FileNode::new(file, unparsed)?;

        if self.seeds.contains(&path)
            || self.required_libs.matches(&path)
            || self.required_files.matches(&path)
        {
            node.record.mark_required();
        }

        self.nodes.insert(path, node);
        Ok(())
    }

    /// Drop one file by path. No-op if unknown.
    pub fn remove(&mut self, path: &str) {
        let path = normalize_path(path);
        if self.config.verbose {
            eprintln!("{} {}", "DELETE:".red(), path);
        }
        self.nodes.remove(&path);
    }

    /// Run a full resolution pass: index, walk, order, synthesize, emit.
    ///
    /// Returns the synthesized bootstrap file followed by the required
    /// files in dependency-safe order, or the first structural error.
    pub fn build(&self) -> Result<Vec<SourceFile>, BuildError> {
        for seed in &self.seeds {
            if !self.nodes.contains_key(seed) {
                return Err(BuildError::MissingSeed { path: seed.clone() });
            }
        }

        // Index pass: path and component identities into one lookup, with
        // duplicate-definition fail-fast, plus the optional-file list.
        let mut node_map: BTreeMap<String, String> = BTreeMap::new();
        let mut optional_list: Vec<String> = Vec::new();
        for path in self.nodes.keys() {
            node_map.insert(path.clone(), path.clone());
            if self.optional_libs_include.matches(path) {
                optional_list.push(path.clone());
            }
        }
        for (path, node) in &self.nodes {
            for (kind, names) in &node.record.items {
                for name in names {
                    let key = kind.qualified(name);
                    if let Some(first) = node_map.get(&key) {
                        return Err(BuildError::DuplicateDefinition {
                            identity: key,
                            first: first.clone(),
                            second: path.clone(),
                        });
                    }
                    node_map.insert(key, path.clone());
                }
            }
        }

        // Resolve-map aggregation: owner identity → satisfied keys, plus a
        // per-file union so files reached by path are covered too.
        let mut resolves_map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (path, node) in &self.nodes {
            for (owner, keys) in &node.record.resolves {
                if let Some(owner) = owner {
                    resolves_map
                        .entry(owner.clone())
                        .or_default()
                        .extend(keys.iter().cloned());
                }
            }
            resolves_map.insert(path.clone(), node.record.all_resolves());
        }

        let mut resolver = Resolver {
            graph: self,
            node_map: &node_map,
            resolves_map: &resolves_map,
            optional_list: &optional_list,
            required: Vec::new(),
            required_set: HashSet::new(),
        };

        for seed in &self.seeds {
            resolver.require(seed, ResolvePolicy::Fatal, None)?;
        }
        for (path, node) in &self.nodes {
            if node.record.is_required {
                resolver.require(path, ResolvePolicy::Fatal, None)?;
            }
        }

        let mut required = resolver.required;
        if self.config.verbose {
            eprintln!("Requiring {} file(s)", required.len().to_string().magenta());
        }

        // Priority ordering: earlier-matching base names first, unmatched
        // last, lexicographic within a rank.
        required.sort_by(|a, b| {
            self.priority_rank(a)
                .cmp(&self.priority_rank(b))
                .then_with(|| a.cmp(b))
        });

        // Module aggregation in first-seen order over the sorted closure.
        let mut modules: Vec<String> = Vec::new();
        for path in &required {
            for module in &self.nodes[path].record.modules {
                if module == &self.config.app_module
                    || self.config.global_modules.contains(module)
                    || modules.contains(module)
                {
                    continue;
                }
                modules.push(module.clone());
            }
        }

        let mut output = Vec::with_capacity(required.len() + 1);
        output.push(self.synthesize_bootstrap(&modules));
        for path in &required {
            let node = self
                .nodes
                .get(path)
                .ok_or_else(|| BuildError::UnresolvableOutput { path: path.clone() })?;
            output.push(node.file.clone());
        }
        Ok(output)
    }

    /// One line registering the application module with its full
    /// dependency list: global modules first, then discovered ones.
    fn synthesize_bootstrap(&self, modules: &[String]) -> SourceFile {
        let deps: Vec<String> = self
            .config
            .global_modules
            .iter()
            .chain(modules.iter())
            .map(|m| format!("\"{m}\""))
            .collect();
        let contents = format!(
            "angular.module(\"{}\", [{}]);\n\n",
            self.config.app_module,
            deps.join(",")
        );
        SourceFile::new("init.js", contents, SystemTime::UNIX_EPOCH)
    }

    fn priority_rank(&self, path: &str) -> usize {
        let base = path.rsplit('/').next().unwrap_or(path);
        self.priority
            .iter()
            .position(|p| p.matches(base))
            .unwrap_or(usize::MAX)
    }
}

/// One closure walk over the derived indices.
struct Resolver<'a> {
    graph: &'a DependencyGraph,
    node_map: &'a BTreeMap<String, String>,
    resolves_map: &'a BTreeMap<String, BTreeSet<String>>,
    optional_list: &'a [String],
    required: Vec<String>,
    required_set: HashSet<String>,
}

impl Resolver<'_> {
    /// Require the file owning `key`, then recursively everything it
    /// depends on. Revisits are no-ops, so mutual references terminate.
    fn require(
        &mut self,
        key: &str,
        policy: ResolvePolicy,
        parent: Option<&str>,
    ) -> Result<(), BuildError> {
        let Some(path) = self.node_map.get(key) else {
            return self.handle_unresolved(key, policy, parent);
        };
        let path = path.clone();

        if !self.required_set.insert(path.clone()) {
            return Ok(());
        }
        if self.graph.config.verbose && self.graph.config.debug {
            eprintln!("{} {}", "REQUIRING:".green(), key);
        }
        self.required.push(path.clone());

        let record = &self.graph.nodes[&path].record;

        for component in record.dependencies(DependencyKind::Component) {
            if self.satisfied_by_resolve(key, &path, component) {
                continue;
            }
            self.require(component, DependencyKind::Component.policy(), Some(&path))?;
        }
        for template in record.dependencies(DependencyKind::Template) {
            if self.graph.ignored_templates.matches(template) {
                continue;
            }
            self.require(template, DependencyKind::Template.policy(), Some(&path))?;
        }
        for filter in record.dependencies(DependencyKind::Filter) {
            if BUILTIN_FILTERS.contains(&filter.as_str()) {
                continue;
            }
            self.require(
                &format!("filter:{filter}"),
                DependencyKind::Filter.policy(),
                Some(&path),
            )?;
        }
        for token in record.dependencies(DependencyKind::TemplateToken) {
            self.require(token, DependencyKind::TemplateToken.policy(), Some(&path))?;
        }
        for token in record.dependencies(DependencyKind::DirectiveToken) {
            self.require(
                &format!("directive:{token}"),
                DependencyKind::DirectiveToken.policy(),
                Some(&path),
            )?;
        }
        for token in record.dependencies(DependencyKind::AnimationToken) {
            self.require(
                &format!("animation:{token}"),
                DependencyKind::AnimationToken.policy(),
                Some(&path),
            )?;
        }

        // An optional-library marker pulls in every discovered optional
        // file, recursively. Deliberately not scoped to the marker's own
        // directory; see DESIGN.md.
        if self.graph.optional_libs.matches(&path) {
            for optional in self.optional_list.to_vec() {
                self.require(&optional, ResolvePolicy::Silent, Some(&path))?;
            }
        }

        Ok(())
    }

    fn handle_unresolved(
        &self,
        key: &str,
        policy: ResolvePolicy,
        parent: Option<&str>,
    ) -> Result<(), BuildError> {
        match policy {
            ResolvePolicy::Silent => Ok(()),
            ResolvePolicy::Warn => {
                self.warn_unresolved(key, parent);
                Ok(())
            }
            ResolvePolicy::Fatal => {
                // The allowlist names bare identities; strip any namespace
                // qualifier before consulting it.
                let bare = key
                    .strip_prefix("filter:")
                    .or_else(|| key.strip_prefix("directive:"))
                    .or_else(|| key.strip_prefix("animation:"))
                    .unwrap_or(key);
                if self.graph.global_dependencies.contains(bare) {
                    return Ok(());
                }
                let required_by = parent.unwrap_or("n/a (seed)");
                if parent.is_some_and(|p| self.graph.files_with_resolved_deps.matches(p)) {
                    self.warn_unresolved(key, parent);
                    return Ok(());
                }
                Err(BuildError::MissingDependency {
                    identity: key.to_string(),
                    required_by: required_by.to_string(),
                })
            }
        }
    }

    fn warn_unresolved(&self, key: &str, parent: Option<&str>) {
        eprintln!(
            "{} cannot find dependency {} required by {}",
            "warning:".bold().yellow(),
            key.yellow(),
            parent.unwrap_or("n/a (seed)").magenta()
        );
    }

    /// A component dependency is satisfied when the requiring file's own
    /// resolve block (looked up by the identity it was reached by, or by
    /// its path) provides that name.
    fn satisfied_by_resolve(&self, key: &str, path: &str, component: &str) -> bool {
        [key, path].iter().any(|k| {
            self.resolves_map
                .get(*k)
                .is_some_and(|keys| keys.contains(component))
        })
    }
}
