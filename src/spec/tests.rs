use super::*;
use serde_json::{json, Value};

fn doc_with(paths: Value, schemas: Value) -> Value {
    json!({
        "openapi": "3.1.0",
        "info": { "title": "Pet Store API", "version": "1.2.0" },
        "paths": paths,
        "components": {
            "schemas": schemas,
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer" },
                "sessionCookie": { "type": "apiKey", "in": "cookie", "name": "session" }
            }
        }
    })
}

fn get_op(id: &str, tag: &str) -> Value {
    json!({
        "operationId": id,
        "summary": "Does a thing",
        "tags": [tag],
        "responses": { "200": { "description": "ok" } }
    })
}

#[test]
fn test_project_name_falls_back_to_title_slug() {
    let model = build_model(&doc_with(json!({}), json!({})), "").unwrap();
    assert_eq!(model.project_name, "pet_store_api");
    assert_eq!(model.version, "1.2.0");

    let mut doc = doc_with(json!({}), json!({}));
    doc["x-project-name"] = json!("petstore");
    assert_eq!(build_model(&doc, "").unwrap().project_name, "petstore");
}

#[test]
fn test_all_of_unions_required_and_overlays_properties() {
    let schemas = json!({
        "Base": {
            "type": "object",
            "required": ["id", "createdAt"],
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "createdAt": { "type": "string", "format": "date-time" },
                "name": { "type": "integer" }
            }
        },
        "User": {
            "allOf": [
                { "$ref": "#/components/schemas/Base" },
                {
                    "type": "object",
                    "required": ["email"],
                    "properties": { "email": { "type": "string" } }
                }
            ],
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        }
    });
    let model = build_model(&doc_with(json!({}), schemas), "").unwrap();
    let user = model.schema("User").unwrap();

    assert_eq!(user.schema_type.as_deref(), Some("object"));
    let required: Vec<&str> = user.required.iter().map(String::as_str).collect();
    assert_eq!(required, vec!["createdAt", "email", "id", "name"]);
    assert_eq!(
        user.sorted_property_names(),
        vec!["id", "createdAt", "email", "name"]
    );
    // own property shadows the base one
    assert_eq!(user.properties["name"].schema_type.as_deref(), Some("string"));
}

#[test]
fn test_cyclic_all_of_terminates() {
    let schemas = json!({
        "A": { "allOf": [{ "$ref": "#/components/schemas/B" }], "properties": { "a": { "type": "string" } } },
        "B": { "allOf": [{ "$ref": "#/components/schemas/A" }], "properties": { "b": { "type": "string" } } }
    });
    let model = build_model(&doc_with(json!({}), schemas), "").unwrap();
    let a = model.schema("A").unwrap();
    assert!(a.properties.contains_key("a"));
    assert!(a.properties.contains_key("b"));
}

#[test]
fn test_nested_types_emitted_once() {
    let address = json!({
        "type": "object",
        "properties": { "street": { "type": "string" } }
    });
    let schemas = json!({
        "User": {
            "type": "object",
            "properties": {
                "billing_address": address.clone(),
                "billingAddress": address,
                "tags": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "label": { "type": "string" } }
                    }
                },
                "owner": { "$ref": "#/components/schemas/Owner" }
            }
        },
        "Owner": { "type": "object", "properties": { "id": { "type": "string" } } }
    });
    let model = build_model(&doc_with(json!({}), schemas), "").unwrap();
    let nested = model.schema("User").unwrap().collect_nested_types();
    let names: Vec<&str> = nested.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["UserBillingAddress", "UserTags"]);
}

#[test]
fn test_type_array_with_null_is_nullable() {
    let schemas = json!({
        "Pet": {
            "type": "object",
            "properties": {
                "nickname": { "type": ["string", "null"] },
                "status": { "type": "string", "enum": ["available", "sold", null] }
            }
        }
    });
    let model = build_model(&doc_with(json!({}), schemas), "").unwrap();
    let pet = model.schema("Pet").unwrap();
    assert!(pet.properties["nickname"].nullable);
    assert_eq!(pet.properties["nickname"].schema_type.as_deref(), Some("string"));
    assert_eq!(pet.properties["status"].enum_values, vec!["available", "sold"]);
}

#[test]
fn test_two_tags_fails_naming_path_and_method() {
    let mut op = get_op("listPets", "Pets");
    op["tags"] = json!(["Pets", "Admin"]);
    let doc = doc_with(json!({ "/pets": { "get": op } }), json!({}));

    let err = build_model(&doc, "").unwrap_err();
    let issues = err.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, "operation_tags");
    assert_eq!(issues[0].location, "/pets → GET");
    assert!(err.to_string().contains("/pets → GET"));
}

#[test]
fn test_empty_operation_id_and_summary_fail() {
    let mut op = get_op("", "Pets");
    op["summary"] = json!("  ");
    let doc = doc_with(json!({ "/pets": { "post": op } }), json!({}));

    let err = build_model(&doc, "").unwrap_err();
    let kinds: Vec<&str> = err.issues().iter().map(|i| i.kind.as_str()).collect();
    assert_eq!(kinds, vec!["missing_operation_id", "missing_summary"]);
    assert!(err.issues().iter().all(|i| i.location == "/pets → POST"));
}

#[test]
fn test_duplicate_operation_id_fails() {
    let doc = doc_with(
        json!({
            "/pets": { "get": get_op("listPets", "Pets") },
            "/animals": { "get": get_op("listPets", "Pets") }
        }),
        json!({}),
    );
    let err = build_model(&doc, "").unwrap_err();
    assert_eq!(err.issues()[0].kind, "duplicate_operation_id");
}

#[test]
fn test_malformed_xcodegen_names_schema() {
    let schemas = json!({
        "Order": {
            "type": "object",
            "properties": { "id": { "type": "string" } },
            "x-codegen": {
                "type": "entity",
                "repository": {
                    "additionalMethods": [{ "name": "FindRecent", "returns": "many" }]
                }
            }
        }
    });
    let err = build_model(&doc_with(json!({}), schemas), "").unwrap_err();
    assert_eq!(err.issues()[0].location, "schema:Order");
}

#[test]
fn test_security_inheritance() {
    let mut public = get_op("health", "Health");
    public["security"] = json!([]);
    let mut flagged = get_op("version", "Health");
    flagged["x-public-endpoint"] = json!(true);
    let mut scoped = get_op("deletePet", "Pets");
    scoped["security"] = json!([{ "bearerAuth": ["pets:write"] }]);

    let paths = json!({
        "/health": { "get": public },
        "/version": { "get": flagged },
        "/pets": { "get": get_op("listPets", "Pets") },
        "/pets/{id}": { "delete": scoped }
    });

    let model = build_model(&doc_with(paths.clone(), json!({})), "").unwrap();
    let op = |id: &str| model.operations.iter().find(|o| o.id == id).unwrap();
    assert!(op("health").is_public());
    assert!(op("version").is_public());
    assert_eq!(op("deletePet").security[0].scopes, vec!["pets:write"]);
    assert_eq!(op("deletePet").security[0].scheme, "bearer");

    // no root security: every declared scheme applies
    let names: Vec<&str> = op("listPets").security.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["bearerAuth", "sessionCookie"]);
    assert_eq!(op("listPets").security[1].scheme, "cookie");

    let mut doc = doc_with(paths, json!({}));
    doc["security"] = json!([{ "sessionCookie": [] }]);
    let model = build_model(&doc, "").unwrap();
    let list = model.operations.iter().find(|o| o.id == "listPets").unwrap();
    assert_eq!(list.security.len(), 1);
    assert_eq!(list.security[0].name, "sessionCookie");
}

#[test]
fn test_parameters_merge_and_synthesize() {
    let mut op = get_op("getPet", "Pets");
    op["parameters"] = json!([
        { "name": "verbose", "in": "query", "required": true, "schema": { "type": "boolean" } }
    ]);
    let paths = json!({
        "/owners/{ownerId}/pets/{petId}": {
            "parameters": [
                { "$ref": "#/components/parameters/Verbose" },
                { "name": "petId", "in": "path", "schema": { "type": "integer" } }
            ],
            "get": op
        }
    });
    let mut doc = doc_with(paths, json!({}));
    doc["components"]["parameters"] = json!({
        "Verbose": { "name": "verbose", "in": "query", "schema": { "type": "string" } }
    });

    let model = build_model(&doc, "").unwrap();
    let params = &model.operations[0].parameters;
    let summary: Vec<(&str, String, bool)> = params
        .iter()
        .map(|p| (p.name.as_str(), p.location.to_string(), p.required))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("verbose", "query".to_string(), true),
            ("petId", "path".to_string(), true),
            ("ownerId", "path".to_string(), true),
        ]
    );
    let verbose = params[0].schema.as_ref().unwrap();
    assert_eq!(verbose.schema_type.as_deref(), Some("boolean"));
}

#[test]
fn test_responses_resolve_refs_and_sort() {
    let mut op = get_op("createPet", "Pets");
    op["responses"] = json!({
        "default": { "$ref": "#/components/responses/Problem" },
        "201": {
            "description": "created",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } }
        },
        "400": { "$ref": "#/components/responses/Problem" }
    });
    op["requestBody"] = json!({ "$ref": "#/components/requestBodies/PetBody" });
    let mut doc = doc_with(
        json!({ "/pets": { "post": op } }),
        json!({ "Pet": { "type": "object", "properties": { "id": { "type": "string" } } } }),
    );
    doc["components"]["responses"] = json!({
        "Problem": {
            "description": "problem",
            "content": { "application/problem+json": { "schema": { "type": "object" } } }
        }
    });
    doc["components"]["requestBodies"] = json!({
        "PetBody": {
            "required": true,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } }
        }
    });

    let model = build_model(&doc, "").unwrap();
    let op = &model.operations[0];
    let statuses: Vec<&str> = op.responses.iter().map(|r| r.status.as_str()).collect();
    assert_eq!(statuses, vec!["201", "400", "default"]);
    assert_eq!(op.responses[1].description.as_deref(), Some("problem"));
    assert_eq!(
        op.success_response().unwrap().schema.as_ref().unwrap().reference.as_deref(),
        Some("Pet")
    );
    let body = op.request_body.as_ref().unwrap();
    assert!(body.required);
    assert_eq!(body.schema.as_ref().unwrap().reference.as_deref(), Some("Pet"));
}

#[test]
fn test_ownership_and_composition_app() {
    let mut billing = get_op("listInvoices", "Billing");
    billing["x-internal"] = json!("billing");
    let mut auth = get_op("login", "Auth");
    auth["x-internal"] = json!("auth");
    let schemas = json!({
        "Invoice": { "type": "object", "x-internal": "billing", "properties": { "id": { "type": "string" } } },
        "Session": { "type": "object", "x-internal": "ledger", "properties": { "id": { "type": "string" } } }
    });
    let doc = doc_with(
        json!({ "/invoices": { "get": billing }, "/login": { "post": auth } }),
        schemas,
    );

    let app = build_model(&doc, "platform").unwrap();
    assert!(app.is_composition_app());
    let packages: Vec<String> = app.composed_packages().into_iter().collect();
    assert_eq!(packages, vec!["auth", "billing", "ledger"]);

    let service = build_model(&doc, "billing").unwrap();
    assert!(!service.is_composition_app());
    let own: Vec<&str> = service.own_operations().map(|o| o.id.as_str()).collect();
    assert_eq!(own, vec!["listInvoices"]);
    let own_schemas: Vec<&str> = service.own_schemas().map(|s| s.name.as_str()).collect();
    assert_eq!(own_schemas, vec!["Invoice"]);
}

#[test]
fn test_tags_keep_document_order_then_undeclared() {
    let mut doc = doc_with(
        json!({
            "/pets": { "get": get_op("listPets", "Pets") },
            "/zoo": { "get": get_op("getZoo", "Zoo") }
        }),
        json!({}),
    );
    doc["tags"] = json!([{ "name": "Users" }, { "name": "Pets" }]);
    let model = build_model(&doc, "").unwrap();
    assert_eq!(model.tags, vec!["Users", "Pets", "Zoo"]);
}

#[test]
fn test_non_object_root_is_malformed() {
    let err = build_model(&json!([1, 2]), "").unwrap_err();
    assert!(matches!(err, SpecError::Malformed { .. }));
}
