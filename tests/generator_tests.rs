mod common;

use common::fixtures::shop_files;
use common::temp_files::{list_files, spec_tree};
use parking_lot::Mutex;
use specgen::generator::{generate_project, GenerateOptions};
use specgen::orchestrator::ProgressEvent;
use std::fs;
use std::sync::Arc;

const EDITED_LOGIN: &str = r#"package handlers

import "shop/repositories"

type LoginHandlerImpl struct{ users repositories.UserRepository }

func NewLoginHandler(users repositories.UserRepository) *LoginHandlerImpl {
	return &LoginHandlerImpl{users: users}
}
"#;

#[test]
fn test_dry_run_reports_without_writing() {
    let files = shop_files();
    let (dir, spec) = spec_tree(&files);
    let output = dir.path().join("backend");

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut options = GenerateOptions::new(&spec, &output);
    options.dry_run = true;
    let outcome = generate_project(
        &options,
        Some(Arc::new(move |e: &ProgressEvent| sink.lock().push(e.clone()))),
    )
    .unwrap();

    assert_eq!(outcome.includes, vec!["server".to_string()]);
    assert!(!output.exists());
    let report = outcome.report.unwrap();
    let rendered = report.to_string();
    for expected in [
        "go.mod",
        "get_health.gen.go",
        "health_response.gen.go",
        "user_repository.gen.go",
        "login.impl.go",
        "users.sql",
        "bootstrap.gen.go",
        "openapi.bundled.yaml",
    ] {
        assert!(rendered.contains(expected), "missing {expected} in\n{rendered}");
    }
    assert!(rendered.contains("Dry run: would write to"));

    let events = events.lock();
    assert!(matches!(events.first(), Some(ProgressEvent::Start { total: 8 })));
    assert!(matches!(events.last(), Some(ProgressEvent::Done { total: 8 })));
}

#[test]
fn test_generates_backend_on_disk() {
    let files = shop_files();
    let (dir, spec) = spec_tree(&files);
    let output = dir.path().join("backend");

    let mut options = GenerateOptions::new(&spec, &output);
    options.module = Some("github.com/acme/shop/".to_string());
    let outcome = generate_project(&options, None).unwrap();
    assert!(outcome.report.is_none());
    assert_eq!(outcome.summary.executed.len(), 8);

    let written = list_files(&output);
    for expected in [
        "api/openapi.bundled.yaml",
        "app/bootstrap.gen.go",
        "database/queries/users.sql",
        "database/schema.gen.sql",
        "go.mod",
        "handlers/get_health.gen.go",
        "handlers/get_user.gen.go",
        "handlers/list_users.gen.go",
        "handlers/login.gen.go",
        "handlers/login.impl.go",
        "http/routes.gen.go",
        "models/credentials.gen.go",
        "models/health_response.gen.go",
        "models/user.gen.go",
        "repositories/user_repository.gen.go",
    ] {
        assert!(written.iter().any(|f| f == expected), "missing {expected} in {written:?}");
    }

    let go_mod = fs::read_to_string(output.join("go.mod")).unwrap();
    assert!(go_mod.starts_with("module github.com/acme/shop\n"));

    let schema = fs::read_to_string(output.join("database/schema.gen.sql")).unwrap();
    assert!(schema.contains("CREATE TABLE"));
    assert!(schema.contains("users"));

    let bundled = fs::read_to_string(output.join("api/openapi.bundled.yaml")).unwrap();
    assert!(bundled.contains("/health"));
    assert!(!bundled.contains("x-include-server"));

    // the fresh stub has no dependencies yet
    let bootstrap = fs::read_to_string(output.join("app/bootstrap.gen.go")).unwrap();
    assert!(bootstrap.contains("handlers.NewLoginHandler()"));
}

#[test]
fn test_rerun_keeps_user_code_and_rewires() {
    let files = shop_files();
    let (dir, spec) = spec_tree(&files);
    let output = dir.path().join("backend");
    let options = GenerateOptions::new(&spec, &output);
    generate_project(&options, None).unwrap();

    let impl_path = output.join("handlers/login.impl.go");
    fs::write(&impl_path, EDITED_LOGIN).unwrap();
    generate_project(&options, None).unwrap();

    assert_eq!(fs::read_to_string(&impl_path).unwrap(), EDITED_LOGIN);
    let bootstrap = fs::read_to_string(output.join("app/bootstrap.gen.go")).unwrap();
    assert!(bootstrap.contains("handlers.NewLoginHandler(repos.Users)"));
}

#[test]
fn test_only_filter_limits_outputs() {
    let files = shop_files();
    let (dir, spec) = spec_tree(&files);
    let mut options = GenerateOptions::new(&spec, dir.path().join("backend"));
    options.dry_run = true;
    options.only = vec!["models".to_string(), "go.mod".to_string()];

    let outcome = generate_project(&options, None).unwrap();
    assert_eq!(outcome.summary.executed, vec!["go.mod", "models"]);
    let report = outcome.report.unwrap();
    let dirs: Vec<String> = report
        .directories
        .iter()
        .map(|d| d.directory.to_string_lossy().into_owned())
        .collect();
    assert_eq!(dirs, vec!["", "models"]);
}

#[test]
fn test_invalid_spec_fails_before_generation() {
    let root = "openapi: 3.1.0\ninfo: { title: T, version: '1' }\npaths:\n  /a:\n    get:\n      responses: { '200': { description: ok } }\n";
    let (dir, spec) = spec_tree(&[("openapi.yaml", root)]);
    let output = dir.path().join("backend");
    let err = generate_project(&GenerateOptions::new(&spec, &output), None).unwrap_err();
    assert!(format!("{err:#}").contains("operationId"));
    assert!(!output.exists());
}
