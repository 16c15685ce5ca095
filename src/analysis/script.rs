//! Script analyzer: walks a JavaScript syntax tree and records module
//! definitions, component registrations and their dependencies.
//!
//! The recognized shapes are purely syntactic; there is no semantic model of
//! the program. A module chain is only recognized when it hangs directly off
//! `angular.module(...)`, injection notation covers the array, bare-function
//! and `$inject` forms, and resolve blocks are matched in both their
//! assignment and object-property forms.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use swc_common::comments::{Comment, CommentKind, SingleThreadedComments};
use swc_common::{FileName, SourceMap, Spanned};
use swc_ecma_ast::{
    ArrowExpr, AssignExpr, AssignOp, AssignTarget, BlockStmt, BlockStmtOrExpr, CallExpr, Callee,
    Expr, Function, Lit, MemberProp, ObjectLit, Pat, Prop, PropName, PropOrSpread, Script,
    SimpleAssignTarget, Stmt,
};
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax};
use swc_ecma_visit::{Visit, VisitWith};

use crate::analysis::markup;
use crate::analysis::record::{ComponentKind, DependencyKind, FactRecord};
use crate::errors::BuildError;

static TEMPLATE_LIKE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(html?|json|svg)$").unwrap());

static ABSOLUTE_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?:)?//").unwrap());

static RESOLVE_COMMENT_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,?\s+").unwrap());

/// Analyze one script file into `record`.
///
/// Fails with a descriptive parse error if the source is not valid
/// JavaScript; the analyzer itself never recovers from that.
pub fn analyze(path: &str, contents: &str, record: &mut FactRecord) -> Result<(), BuildError> {
    let source_map = SourceMap::default();
    let source_file =
        source_map.new_source_file(FileName::Real(path.into()).into(), contents.to_string());

    let comments = SingleThreadedComments::default();
    let syntax = Syntax::Es(EsSyntax::default());
    let mut parser = Parser::new(syntax, StringInput::from(&*source_file), Some(&comments));

    let parse_error = |err: swc_ecma_parser::error::Error| {
        let loc = source_map.lookup_char_pos(err.span().lo);
        BuildError::Parse {
            path: path.to_string(),
            message: err.kind().msg().to_string(),
            line: loc.line,
            col: loc.col_display,
        }
    };

    let script = parser.parse_script().map_err(parse_error)?;
    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(parse_error(err));
    }

    let mut visitor = ScriptVisitor {
        record,
        controller_siblings: Vec::new(),
        errors: Vec::new(),
    };
    script.visit_with(&mut visitor);
    if let Some(err) = visitor.errors.into_iter().next() {
        return Err(err);
    }

    let (leading, trailing) = comments.borrow_all();
    for comment in leading
        .iter()
        .chain(trailing.iter())
        .flat_map(|(_, cmts)| cmts.iter())
    {
        handle_resolve_comment(comment, record);
    }

    Ok(())
}

struct ScriptVisitor<'a> {
    record: &'a mut FactRecord,
    /// Per enclosing statement list: object name → controller name, from
    /// sibling `x.controller = "Name"` assignments. Used to attribute
    /// assignment-form resolve blocks to their owning controller.
    controller_siblings: Vec<HashMap<String, String>>,
    errors: Vec<BuildError>,
}

impl Visit for ScriptVisitor<'_> {
    fn visit_script(&mut self, node: &Script) {
        self.controller_siblings.push(sibling_controllers(&node.body));
        node.visit_children_with(self);
        self.controller_siblings.pop();
    }

    fn visit_block_stmt(&mut self, node: &BlockStmt) {
        self.controller_siblings.push(sibling_controllers(&node.stmts));
        node.visit_children_with(self);
        self.controller_siblings.pop();
    }

    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Some(module) = chain_module(call) {
            self.handle_component_call(call, &module);
        }
        self.handle_decorator(call);
        self.handle_filter_call(call);
        call.visit_children_with(self);
    }

    fn visit_assign_expr(&mut self, assign: &AssignExpr) {
        if assign.op == AssignOp::Assign {
            if let AssignTarget::Simple(SimpleAssignTarget::Member(member)) = &assign.left {
                match member_prop_name(&member.prop) {
                    Some("$inject") => {
                        if let Expr::Array(array) = &*assign.right {
                            self.add_array_dependencies(array);
                        }
                    }
                    Some("controller") => match &*assign.right {
                        Expr::Lit(Lit::Str(name)) => {
                            if let Some(name) = name.value.as_str() {
                                self.record.add_dependency(DependencyKind::Component, name);
                            }
                        }
                        other => {
                            self.handle_injection(other);
                        }
                    },
                    Some("resolve") => {
                        if let Expr::Object(object) = &*assign.right {
                            let owner = member
                                .obj
                                .as_ident()
                                .and_then(|obj| self.sibling_controller(&obj.sym));
                            self.handle_resolve_block(object, owner);
                        }
                    }
                    _ => {}
                }
            }
        }
        assign.visit_children_with(self);
    }

    fn visit_object_lit(&mut self, object: &ObjectLit) {
        let controller = object_prop(object, "controller").and_then(|value| match value {
            Expr::Lit(Lit::Str(name)) => name.value.as_str().map(|s| s.to_string()),
            _ => None,
        });

        for prop in key_value_props(object) {
            let (key, value) = prop;
            match key {
                "templateUrl" => {
                    if let Expr::Lit(Lit::Str(url)) = value {
                        if let Some(url) = url.value.as_str() {
                            self.record.add_dependency(DependencyKind::Template, url);
                        }
                    }
                }
                "controller" => match value {
                    Expr::Lit(Lit::Str(name)) => {
                        if let Some(name) = name.value.as_str() {
                            self.record.add_dependency(DependencyKind::Component, name);
                        }
                    }
                    other => {
                        self.handle_injection(other);
                    }
                },
                "resolve" => {
                    if let Expr::Object(resolves) = value {
                        self.handle_resolve_block(resolves, controller.clone());
                    }
                }
                _ => {}
            }
        }
        object.visit_children_with(self);
    }

    fn visit_str(&mut self, node: &swc_ecma_ast::Str) {
        // Literals with unpaired surrogates cannot name a file on disk.
        let Some(value) = node.value.as_str() else {
            return;
        };
        if TEMPLATE_LIKE_REGEX.is_match(value) && !ABSOLUTE_URL_REGEX.is_match(value) {
            self.record
                .add_dependency(DependencyKind::TemplateToken, value);
        }
    }
}

impl ScriptVisitor<'_> {
    /// One chained call of a module definition: `.kind(name, definition)`.
    fn handle_component_call(&mut self, call: &CallExpr, module: &str) {
        let Some(kind_name) = callee_prop_name(call) else {
            return;
        };

        self.record.add_module(module);

        match kind_name {
            "config" => {
                self.record.mark_config();
                if let Some(arg) = call.args.first() {
                    self.handle_injection(&arg.expr);
                }
            }
            "run" => {
                self.record.mark_run();
                if let Some(arg) = call.args.first() {
                    self.handle_injection(&arg.expr);
                }
            }
            other => match ComponentKind::parse(other) {
                Some(kind) => {
                    let Some(name) = str_arg(call, 0) else {
                        // Dynamically named components are invisible to
                        // static analysis.
                        return;
                    };
                    self.record.add_item(kind, name);
                    if kind.is_injectable() {
                        if let Some(arg) = call.args.get(1) {
                            let injected = self.handle_injection(&arg.expr);
                            if kind == ComponentKind::Directive {
                                if let Some(injected) = injected {
                                    self.scan_directive_body(&injected);
                                }
                            }
                        }
                    }
                }
                None => self.errors.push(BuildError::UnknownComponentKind {
                    kind: other.to_string(),
                    path: self.record.path.clone(),
                }),
            },
        }
    }

    /// `$provide.decorator(name, definition)` depends on the decorated
    /// component and injects like any other definition.
    fn handle_decorator(&mut self, call: &CallExpr) {
        let Callee::Expr(callee) = &call.callee else {
            return;
        };
        let Expr::Member(member) = &**callee else {
            return;
        };
        let is_provide = matches!(&*member.obj, Expr::Ident(obj) if obj.sym == "$provide");
        if !is_provide || member_prop_name(&member.prop) != Some("decorator") {
            return;
        }

        if let Some(name) = str_arg(call, 0) {
            self.record.add_dependency(DependencyKind::Component, &name);
        }
        if let Some(arg) = call.args.get(1) {
            self.handle_injection(&arg.expr);
        }
    }

    /// `$filter("name")` inside any expression.
    fn handle_filter_call(&mut self, call: &CallExpr) {
        let Callee::Expr(callee) = &call.callee else {
            return;
        };
        let is_filter = matches!(&**callee, Expr::Ident(id) if id.sym == "$filter");
        if !is_filter {
            return;
        }
        if let Some(name) = str_arg(call, 0) {
            self.record.add_dependency(DependencyKind::Filter, &name);
        }
    }

    /// Both injection notations resolve to the same dependency set. Returns
    /// the injected function, if any, so directive definitions can be
    /// scanned further.
    fn handle_injection<'b>(&mut self, expr: &'b Expr) -> Option<Injected<'b>> {
        match expr {
            Expr::Fn(fn_expr) => {
                for param in &fn_expr.function.params {
                    if let Pat::Ident(ident) = &param.pat {
                        self.record
                            .add_dependency(DependencyKind::Component, &ident.id.sym);
                    }
                }
                Some(Injected::Function(&fn_expr.function))
            }
            Expr::Arrow(arrow) => {
                for param in &arrow.params {
                    if let Pat::Ident(ident) = param {
                        self.record
                            .add_dependency(DependencyKind::Component, &ident.id.sym);
                    }
                }
                Some(Injected::Arrow(arrow))
            }
            Expr::Array(array) => {
                self.add_array_dependencies(array);
                array.elems.iter().flatten().find_map(|el| match &*el.expr {
                    Expr::Fn(fn_expr) => Some(Injected::Function(&fn_expr.function)),
                    Expr::Arrow(arrow) => Some(Injected::Arrow(arrow)),
                    _ => None,
                })
            }
            _ => None,
        }
    }

    fn add_array_dependencies(&mut self, array: &swc_ecma_ast::ArrayLit) {
        for element in array.elems.iter().flatten() {
            if let Expr::Lit(Lit::Str(name)) = &*element.expr {
                if let Some(name) = name.value.as_str() {
                    self.record.add_dependency(DependencyKind::Component, name);
                }
            }
        }
    }

    /// Rule for directives: the returned definition object's inline
    /// `template` literal is re-analyzed as markup and folded back in.
    /// `templateUrl` and `controller` properties are picked up by the
    /// generic object-literal handling.
    fn scan_directive_body(&mut self, injected: &Injected<'_>) {
        let Some(object) = injected.returned_object() else {
            return;
        };
        for (key, value) in key_value_props(object) {
            if key != "template" {
                continue;
            }
            if let Expr::Lit(Lit::Str(template)) = value {
                let template = template.value.to_string_lossy();
                let mut inline =
                    FactRecord::new(format!("{}: inline template", self.record.path));
                markup::analyze(&template, &mut inline);
                self.record.merge(&inline);
            }
        }
    }

    fn handle_resolve_block(&mut self, object: &ObjectLit, owner: Option<String>) {
        for (key, value) in key_value_props(object) {
            if let Some(owner) = &owner {
                self.record.add_resolve(Some(owner), key);
            }
            self.record.add_resolve(None, key);
            self.handle_injection(value);
        }
    }

    fn sibling_controller(&self, object_name: &str) -> Option<String> {
        self.controller_siblings
            .iter()
            .rev()
            .find_map(|scope| scope.get(object_name).cloned())
    }
}

enum Injected<'a> {
    Function(&'a Function),
    Arrow(&'a ArrowExpr),
}

impl Injected<'_> {
    fn returned_object(&self) -> Option<&ObjectLit> {
        match self {
            Injected::Function(function) => function
                .body
                .as_ref()?
                .stmts
                .iter()
                .find_map(|stmt| match stmt {
                    Stmt::Return(ret) => ret.arg.as_deref(),
                    _ => None,
                })
                .and_then(as_object),
            Injected::Arrow(arrow) => match &*arrow.body {
                BlockStmtOrExpr::BlockStmt(block) => block
                    .stmts
                    .iter()
                    .find_map(|stmt| match stmt {
                        Stmt::Return(ret) => ret.arg.as_deref(),
                        _ => None,
                    })
                    .and_then(as_object),
                BlockStmtOrExpr::Expr(expr) => as_object(expr),
            },
        }
    }
}

fn as_object(expr: &Expr) -> Option<&ObjectLit> {
    match expr {
        Expr::Object(object) => Some(object),
        Expr::Paren(paren) => as_object(&paren.expr),
        _ => None,
    }
}

/// Module name of the chain this call hangs off, if its callee chain
/// bottoms out at `angular.module(name, ...)`. The `angular.module` call
/// itself is not a chain link.
fn chain_module(call: &CallExpr) -> Option<String> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Member(member) = &**callee else {
        return None;
    };
    let Expr::Call(inner) = &*member.obj else {
        return None;
    };
    module_root(inner).or_else(|| chain_module(inner))
}

/// Matches the chain root `angular.module("name", ...)`.
fn module_root(call: &CallExpr) -> Option<String> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Member(member) = &**callee else {
        return None;
    };
    let is_angular = matches!(&*member.obj, Expr::Ident(obj) if obj.sym == "angular");
    if !is_angular || member_prop_name(&member.prop) != Some("module") {
        return None;
    }
    str_arg(call, 0)
}

fn callee_prop_name(call: &CallExpr) -> Option<&str> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Member(member) = &**callee else {
        return None;
    };
    member_prop_name(&member.prop)
}

fn member_prop_name(prop: &MemberProp) -> Option<&str> {
    match prop {
        MemberProp::Ident(ident) => Some(&ident.sym),
        _ => None,
    }
}

fn str_arg(call: &CallExpr, index: usize) -> Option<String> {
    let arg = call.args.get(index)?;
    match &*arg.expr {
        Expr::Lit(Lit::Str(value)) => value.value.as_str().map(|s| s.to_string()),
        _ => None,
    }
}

fn key_value_props(object: &ObjectLit) -> impl Iterator<Item = (&str, &Expr)> {
    object.props.iter().filter_map(|prop| {
        let PropOrSpread::Prop(prop) = prop else {
            return None;
        };
        let Prop::KeyValue(kv) = &**prop else {
            return None;
        };
        let key = match &kv.key {
            PropName::Ident(ident) => Some(&*ident.sym),
            PropName::Str(name) => name.value.as_str(),
            _ => None,
        }?;
        Some((key, &*kv.value))
    })
}

fn object_prop<'a>(object: &'a ObjectLit, name: &str) -> Option<&'a Expr> {
    key_value_props(object).find_map(|(key, value)| (key == name).then_some(value))
}

fn sibling_controllers(stmts: &[Stmt]) -> HashMap<String, String> {
    let mut controllers = HashMap::new();
    for stmt in stmts {
        let Stmt::Expr(expr_stmt) = stmt else {
            continue;
        };
        let Expr::Assign(assign) = &*expr_stmt.expr else {
            continue;
        };
        if assign.op != AssignOp::Assign {
            continue;
        }
        let AssignTarget::Simple(SimpleAssignTarget::Member(member)) = &assign.left else {
            continue;
        };
        if member_prop_name(&member.prop) != Some("controller") {
            continue;
        }
        let Expr::Ident(object) = &*member.obj else {
            continue;
        };
        if let Expr::Lit(Lit::Str(name)) = &*assign.right {
            if let Some(name) = name.value.as_str() {
                controllers.insert(object.sym.to_string(), name.to_string());
            }
        }
    }
    controllers
}

/// Block comments starting with `resolve`/`resolves` declare resolve keys
/// the analyzer cannot infer; the author asserts they are satisfied.
fn handle_resolve_comment(comment: &Comment, record: &mut FactRecord) {
    if comment.kind != CommentKind::Block {
        return;
    }
    let text = comment.text.trim();
    if !text.starts_with("resolve") {
        return;
    }
    let mut tokens = RESOLVE_COMMENT_SPLIT.split(text);
    match tokens.next() {
        Some("resolve") | Some("resolves") => {}
        _ => return,
    }
    for token in tokens {
        if !token.is_empty() {
            record.add_resolve(None, token);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn analyze_str(code: &str) -> FactRecord {
        let mut record = FactRecord::new("app.js");
        analyze("app.js", code, &mut record).unwrap();
        record
    }

    fn components(record: &FactRecord) -> Vec<String> {
        record
            .dependencies(DependencyKind::Component)
            .iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_module_chain_definitions() {
        let record = analyze_str(
            r#"angular.module("app")
                .controller("MainCtrl", ["userService", function (userService) {}])
                .factory("userService", function (storage) {});"#,
        );
        assert_eq!(
            record.modules.iter().cloned().collect::<Vec<_>>(),
            vec!["app"]
        );
        assert!(record.items[&ComponentKind::Controller].contains("MainCtrl"));
        assert!(record.items[&ComponentKind::Factory].contains("userService"));
        assert_eq!(components(&record), vec!["storage", "userService"]);
    }

    #[test]
    fn test_bare_module_call_records_nothing() {
        // A module declaration with no chained component call contributes
        // no module fact.
        let record = analyze_str(r#"angular.module("app", ["ngRoute"]);"#);
        assert!(record.modules.is_empty());
    }

    #[test]
    fn test_value_and_constant_are_not_injectables() {
        let record = analyze_str(
            r#"angular.module("app").constant("limits", ["a", "b"]).value("version", "1.0");"#,
        );
        assert!(record.items[&ComponentKind::Constant].contains("limits"));
        assert!(record.items[&ComponentKind::Value].contains("version"));
        assert!(components(&record).is_empty());
    }

    #[test]
    fn test_inject_annotation() {
        let record = analyze_str(r#"MainCtrl.$inject = ["$http", "sessionService"];"#);
        assert_eq!(components(&record), vec!["sessionService"]);
    }

    #[test]
    fn test_config_and_run_flags() {
        let record = analyze_str(
            r#"angular.module("app").config(["routerProvider", function (routerProvider) {}])
                .run(function (session) {});"#,
        );
        assert!(record.has_config);
        assert!(record.has_run);
        assert!(record.is_required);
        assert_eq!(components(&record), vec!["router", "session"]);
    }

    #[test]
    fn test_template_url_and_candidates() {
        let record = analyze_str(
            r#"var route = {
                templateUrl: "views/home.html",
                other: "./views/extra.html",
                remote: "https://cdn.example.com/x.html",
                script: "main.js"
            };"#,
        );
        assert_eq!(
            record
                .dependencies(DependencyKind::Template)
                .iter()
                .cloned()
                .collect::<Vec<_>>(),
            vec!["views/home.html"]
        );
        assert_eq!(
            record
                .dependencies(DependencyKind::TemplateToken)
                .iter()
                .cloned()
                .collect::<Vec<_>>(),
            vec!["views/extra.html"]
        );
    }

    #[test]
    fn test_lone_surrogate_literal_records_nothing() {
        // Valid JavaScript, but not a UTF-8 string; it cannot name a file.
        let record = analyze_str(r#"var x = "\uD800broken.html";"#);
        assert!(
            record
                .dependencies(DependencyKind::TemplateToken)
                .is_empty()
        );
    }

    #[test]
    fn test_controller_bindings() {
        let record = analyze_str(
            r#"state.controller = "EditCtrl";
               var route = { controller: ["report", function (report) {}] };"#,
        );
        assert_eq!(components(&record), vec!["EditCtrl", "report"]);
    }

    #[test]
    fn test_resolve_assignment_form_finds_sibling_controller() {
        let record = analyze_str(
            r#"function setup(state) {
                state.controller = "MainCtrl";
                state.resolve = {
                    data: ["api", function (api) { return api.load(); }]
                };
            }"#,
        );
        assert!(record.resolves[&Some("MainCtrl".to_string())].contains("data"));
        assert!(record.resolves[&None].contains("data"));
        // The literal controller binding is itself a component dependency.
        assert_eq!(components(&record), vec!["MainCtrl", "api"]);
    }

    #[test]
    fn test_resolve_property_form_finds_sibling_property() {
        let record = analyze_str(
            r#"var route = {
                controller: "ListCtrl",
                resolve: { items: function (api) { return api.items(); } }
            };"#,
        );
        assert!(record.resolves[&Some("ListCtrl".to_string())].contains("items"));
        assert!(record.resolves[&None].contains("items"));
    }

    #[test]
    fn test_resolve_comment_escape_hatch() {
        let record = analyze_str("/* resolves data, session */\nvar x = 1;");
        let unowned = &record.resolves[&None];
        assert!(unowned.contains("data"));
        assert!(unowned.contains("session"));
    }

    #[test]
    fn test_decorator() {
        let record = analyze_str(
            r#"$provide.decorator("logService", ["$delegate", "sink", function ($delegate, sink) {}]);"#,
        );
        assert_eq!(components(&record), vec!["logService", "sink"]);
    }

    #[test]
    fn test_directive_inline_template_is_merged() {
        let record = analyze_str(
            r#"angular.module("app").directive("panel", function () {
                return {
                    template: "<div ng-controller=\"PanelCtrl\">{{ x | tidy }}</div>",
                    controller: "ShellCtrl"
                };
            });"#,
        );
        assert!(components(&record).contains(&"PanelCtrl".to_string()));
        assert!(components(&record).contains(&"ShellCtrl".to_string()));
        assert!(record.dependencies(DependencyKind::Filter).contains("tidy"));
        assert!(
            record
                .dependencies(DependencyKind::DirectiveToken)
                .contains("div")
        );
    }

    #[test]
    fn test_filter_call() {
        let record = analyze_str(r#"var short = $filter("shorten")(name);"#);
        assert!(record.dependencies(DependencyKind::Filter).contains("shorten"));
    }

    #[test]
    fn test_unknown_component_kind_is_an_error() {
        let mut record = FactRecord::new("app.js");
        let err = analyze(
            "app.js",
            r#"angular.module("app").widget("w", function () {});"#,
            &mut record,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::UnknownComponentKind { .. }));
    }

    #[test]
    fn test_parse_error_carries_location() {
        let mut record = FactRecord::new("bad.js");
        let err = analyze("bad.js", "function (", &mut record).unwrap_err();
        match err {
            BuildError::Parse { path, line, .. } => {
                assert_eq!(path, "bad.js");
                assert_eq!(line, 1);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
