//! End-to-end resolution over a small but realistic application: routed
//! controllers with resolve blocks, a directive with an external template,
//! markup-discovered filters, and a watch-mode edit cycle.

use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;

use ngbuild::analysis::SourceFile;
use ngbuild::config::{Config, load_config};
use ngbuild::errors::BuildError;
use ngbuild::graph::DependencyGraph;

fn mtime(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn add(graph: &mut DependencyGraph, path: &str, contents: &str) {
    graph
        .add(SourceFile::new(path, contents, mtime(1)))
        .unwrap();
}

fn app_config() -> Config {
    Config {
        app_module: "shop".to_string(),
        seeds: vec!["app.js".to_string()],
        global_modules: vec!["ngRoute".to_string()],
        ..Default::default()
    }
}

/// Every candidate file of the sample application; only a subset is
/// actually required.
fn populate(graph: &mut DependencyGraph) {
    add(
        graph,
        "app.js",
        r#"angular.module("shop").config(["$routeProvider", function ($routeProvider) {
            $routeProvider.when("/orders", {
                templateUrl: "views/orders.html",
                controller: "OrdersCtrl",
                resolve: {
                    orders: ["orderService", function (orderService) {
                        return orderService.list();
                    }]
                }
            });
        }]);"#,
    );
    add(
        graph,
        "controllers/orders.js",
        r#"angular.module("shop.orders").controller("OrdersCtrl", ["orders", function (orders) {}]);"#,
    );
    add(
        graph,
        "services/orders.js",
        r#"angular.module("shop.orders").factory("orderService", ["$http", function ($http) {}]);"#,
    );
    add(
        graph,
        "views/orders.html",
        r#"<div>
            <order-row ng-repeat="o in orders"></order-row>
            <p>{{ total | money }}</p>
            <ng-include src="'views/footer.html'"></ng-include>
        </div>"#,
    );
    add(graph, "views/footer.html", "<footer></footer>");
    add(
        graph,
        "directives/order_row.js",
        r#"angular.module("shop.ui").directive("orderRow", function () {
            return { templateUrl: "views/order_row.html" };
        });"#,
    );
    add(graph, "views/order_row.html", "<tr></tr>");
    add(
        graph,
        "filters/money.js",
        r#"angular.module("shop.format").filter("money", function () { return function (v) { return v; }; });"#,
    );
    add(
        graph,
        "unused/legacy.js",
        r#"angular.module("shop.legacy").factory("legacyThing", function () {});"#,
    );
}

#[test]
fn resolves_a_routed_application() {
    let mut graph = DependencyGraph::new(app_config());
    populate(&mut graph);

    let output = graph.build().unwrap();
    let paths: Vec<&str> = output.iter().map(|f| f.path.as_str()).collect();

    assert_eq!(
        paths,
        vec![
            "init.js",
            "app.js",
            "controllers/orders.js",
            "directives/order_row.js",
            "filters/money.js",
            "services/orders.js",
            "views/footer.html",
            "views/order_row.html",
            "views/orders.html",
        ]
    );
    // The unused module never reaches the bootstrap list.
    assert_eq!(
        output[0].contents,
        "angular.module(\"shop\", [\"ngRoute\",\"shop.orders\",\"shop.ui\",\"shop.format\"]);\n\n"
    );
}

#[test]
fn resolve_block_satisfies_controller_injection() {
    // OrdersCtrl injects "orders", which no file defines; the route's
    // resolve block provides it, so the build must not fail.
    let mut graph = DependencyGraph::new(app_config());
    populate(&mut graph);
    graph.build().unwrap();
}

#[test]
fn watch_cycle_edit_and_delete() {
    let mut graph = DependencyGraph::new(app_config());
    populate(&mut graph);
    graph.build().unwrap();

    // An edit arrives with a newer mtime and drops the money filter usage
    // dependency chain.
    graph
        .add(SourceFile::new(
            "views/orders.html",
            "<div><ng-include src=\"'views/footer.html'\"></ng-include></div>",
            mtime(2),
        ))
        .unwrap();
    let output = graph.build().unwrap();
    let paths: Vec<&str> = output.iter().map(|f| f.path.as_str()).collect();
    assert!(!paths.contains(&"filters/money.js"));

    // Deleting a depended-on file surfaces on the next pass.
    graph.remove("services/orders.js");
    let err = graph.build().unwrap_err();
    match err {
        BuildError::MissingDependency { identity, .. } => assert_eq!(identity, "orderService"),
        other => panic!("expected missing dependency, got {other:?}"),
    }
}

#[test]
fn build_output_is_stable_across_passes() {
    let mut graph = DependencyGraph::new(app_config());
    populate(&mut graph);

    let first = graph.build().unwrap();
    let second = graph.build().unwrap();

    let first_paths: Vec<&str> = first.iter().map(|f| f.path.as_str()).collect();
    let second_paths: Vec<&str> = second.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(first_paths, second_paths);
    assert_eq!(first[0].contents, second[0].contents);
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".ngbuildrc.json");
    std::fs::write(
        &path,
        r#"{
            "appModule": "shop",
            "seeds": ["app.js"],
            "globalModules": ["ngRoute"],
            "filePriority": ["app.js"]
        }"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.app_module, "shop");
    assert_eq!(config.file_priority, vec!["app.js"]);
    assert_eq!(config.optional_libs_include, "includes/*");
}
