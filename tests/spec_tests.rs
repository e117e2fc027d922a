mod common;

use common::fixtures::shop_files;
use common::temp_files::spec_tree;
use specgen::spec::{load_document, load_spec, SchemaKind, SpecError};

#[test]
fn test_load_bundles_multi_file_spec() {
    let files = shop_files();
    let (_dir, spec) = spec_tree(&files);
    let doc = load_document(&spec).unwrap();

    // path file inlined, nested file ref turned into an internal ref
    let list = &doc["paths"]["/users"]["get"];
    assert_eq!(list["operationId"], "listUsers");
    assert_eq!(
        list["responses"]["200"]["content"]["application/json"]["schema"]["items"]["$ref"],
        "#/components/schemas/User"
    );
    assert_eq!(doc["components"]["schemas"]["User"]["type"], "object");
    // status codes are strings
    assert!(doc["paths"]["/auth/login"]["post"]["responses"]["204"].is_object());
}

#[test]
fn test_load_spec_builds_model() {
    let files = shop_files();
    let (_dir, spec) = spec_tree(&files);
    let model = load_spec(&spec, "").unwrap();

    assert_eq!(model.project_name, "shop");
    assert_eq!(model.title, "Shop API");
    let ids: Vec<&str> = model.operations.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["Login", "getUser", "listUsers"]);

    let user = model.schema("User").unwrap();
    assert_eq!(user.kind, SchemaKind::Entity);
    assert!(user.is_repository_eligible());
    let nested: Vec<String> = user.collect_nested_types().into_iter().map(|s| s.name).collect();
    assert_eq!(nested, vec!["UserAddress"]);

    let login = model.operations.iter().find(|o| o.id == "Login").unwrap();
    assert!(login.is_public());
    assert!(login.custom_handler);
    let get_user = model.operations.iter().find(|o| o.id == "getUser").unwrap();
    assert_eq!(get_user.security[0].name, "bearerAuth");
    assert_eq!(get_user.path_parameters().count(), 1);
}

#[test]
fn test_invalid_operations_report_every_issue() {
    let root = r#"openapi: 3.1.0
info: { title: Broken, version: 0.0.1 }
paths:
  /a:
    get:
      summary: no id
      tags: [A]
      responses: { '200': { description: ok } }
  /b:
    post:
      operationId: makeB
      tags: [B, Extra]
      responses: { '200': { description: ok } }
"#;
    let (_dir, spec) = spec_tree(&[("openapi.yaml", root)]);
    let err = load_spec(&spec, "").unwrap_err();
    let spec_error = err.downcast_ref::<SpecError>().unwrap();
    let kinds: Vec<&str> = spec_error.issues().iter().map(|i| i.kind.as_str()).collect();
    assert!(kinds.contains(&"missing_operation_id"));
    assert!(kinds.contains(&"missing_summary"));
    assert!(kinds.contains(&"operation_tags"));
    assert!(spec_error
        .issues()
        .iter()
        .any(|i| i.location == "/b → POST"));
}

#[test]
fn test_swagger_2_is_rejected() {
    let root = "swagger: '2.0'\ninfo: { title: Old, version: '1' }\npaths: {}\n";
    let (_dir, spec) = spec_tree(&[("openapi.yaml", root)]);
    assert!(load_spec(&spec, "").is_err());
}

#[test]
fn test_missing_file_is_reported() {
    let root = "openapi: 3.1.0\ninfo: { title: T, version: '1' }\npaths:\n  /x:\n    $ref: paths/missing.yaml\n";
    let (_dir, spec) = spec_tree(&[("openapi.yaml", root)]);
    let err = load_spec(&spec, "").unwrap_err();
    assert!(format!("{err:#}").contains("missing.yaml"));
}
