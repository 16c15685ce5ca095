//! Markup analyzer: scans HTML/EJS template text for component usage.
//!
//! Everything found here except `ng-include` targets and `ng-controller`
//! bindings is a heuristic candidate. Tag and attribute names become
//! directive-token candidates, class/id selectors become animation-token
//! candidates, and failing to resolve any of them later is never an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::record::{DependencyKind, FactRecord};

static COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--[\s\S]*?-->").unwrap());

static INTERPOLATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").unwrap());

static OPEN_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([A-Za-z][A-Za-z0-9-]*)((?:"[^"]*"|'[^']*'|[^>"'])*)>"#).unwrap()
});

static ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z][-\w:]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#).unwrap()
});

static IDENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*").unwrap());

/// Analyze markup text into `record`.
///
/// Infallible: markup that does not match any recognized shape simply
/// contributes no facts.
pub fn analyze(contents: &str, record: &mut FactRecord) {
    let contents = COMMENT_REGEX.replace_all(contents, "");

    for capture in INTERPOLATION_REGEX.captures_iter(&contents) {
        add_expression_filters(&capture[1], record);
    }

    for tag in OPEN_TAG_REGEX.captures_iter(&contents) {
        let name = &tag[1];
        record.add_dependency(DependencyKind::DirectiveToken, name);

        let attrs = &tag[2];
        for attr in ATTR_REGEX.captures_iter(attrs) {
            let key = &attr[1];
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            handle_attribute(name, key, value, record);
        }
    }
}

fn handle_attribute(tag: &str, key: &str, value: &str, record: &mut FactRecord) {
    match key {
        "ng-app" => record.mark_app(),
        "ng-include" => {
            if let Some(template) = quoted_literal(value) {
                record.add_dependency(DependencyKind::Template, template);
            }
        }
        "src" if tag == "ng-include" => {
            if let Some(template) = quoted_literal(value) {
                record.add_dependency(DependencyKind::Template, template);
            }
        }
        "ng-controller" => record.add_dependency(DependencyKind::Component, value),
        "class" => {
            for class in value.split_whitespace() {
                record.add_dependency(DependencyKind::AnimationToken, &format!(".{class}"));
            }
        }
        "ng-class" => {
            // Map form: { 'active': cond, busy: other } — the keys are the
            // candidate selectors.
            for entry in value.split(',') {
                let class: String = entry
                    .split(':')
                    .next()
                    .unwrap_or("")
                    .chars()
                    .filter(|c| !matches!(c, '{' | '}' | '\'' | '"') && !c.is_whitespace())
                    .collect();
                record.add_dependency(DependencyKind::AnimationToken, &format!(".{class}"));
            }
        }
        "id" => {
            if !value.is_empty() {
                record.add_dependency(DependencyKind::AnimationToken, &format!("#{value}"));
            }
        }
        _ => {
            record.add_dependency(DependencyKind::DirectiveToken, key);
            add_expression_filters(value, record);
        }
    }
}

/// Record the `|`-delimited filter stages of an expression, skipping the
/// first (unfiltered) stage and any `:` argument suffix.
///
/// A logical OR splits into an empty stage followed by its right operand;
/// neither is a filter.
fn add_expression_filters(expression: &str, record: &mut FactRecord) {
    let mut or_operand = false;
    for stage in expression.split('|').skip(1) {
        if stage.trim().is_empty() {
            or_operand = true;
            continue;
        }
        if or_operand {
            or_operand = false;
            continue;
        }
        let stage = stage.split(':').next().unwrap_or("").trim();
        if let Some(name) = IDENT_REGEX.find(stage) {
            record.add_dependency(DependencyKind::Filter, name.as_str());
        }
    }
}

/// `ng-include` targets are expressions; only quoted string literals are
/// statically resolvable.
fn quoted_literal(value: &str) -> Option<&str> {
    let value = value.trim();
    let inner = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
    if inner.is_empty() { None } else { Some(inner) }
}
