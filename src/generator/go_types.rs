//! Mapping from IR schemas to Go declarations.

use crate::naming::{constant_case, pascal_case, sanitize_identifier, snake_case};
use crate::spec::{nested_type_name, SchemaDef};
use std::collections::BTreeSet;

pub const UUID_IMPORT: &str = "github.com/google/uuid";

/// Imports needed by a set of Go type expressions.
pub fn imports_for<'a>(types: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    let mut imports = BTreeSet::new();
    for ty in types {
        if ty.contains("uuid.UUID") {
            imports.insert(UUID_IMPORT.to_string());
        }
        if ty.contains("time.Time") {
            imports.insert("time".to_string());
        }
        if ty.contains("json.RawMessage") {
            imports.insert("encoding/json".to_string());
        }
    }
    imports
}

/// Go type of a scalar schema, ignoring optionality.
fn scalar_type(schema: &SchemaDef) -> Option<&'static str> {
    let format = schema.format.as_deref();
    let ty = match (schema.schema_type.as_deref()?, format) {
        ("string", Some("uuid")) => "uuid.UUID",
        ("string", Some("date-time" | "date")) => "time.Time",
        ("string", Some("binary" | "byte")) => "[]byte",
        ("string", _) => "string",
        ("integer", Some("int32")) => "int32",
        ("integer", Some("int64")) => "int64",
        ("integer", _) => "int",
        ("number", Some("float")) => "float32",
        ("number", _) => "float64",
        ("boolean", _) => "bool",
        _ => return None,
    };
    Some(ty)
}

/// Go type for `schema` used as property `prop` of the type named `parent`.
///
/// Inline objects and enums resolve to the synthesized `Parent+Prop` name;
/// `$ref`s resolve to the component's type, qualified with `qualifier` when
/// the declaration lives in another package.
pub fn go_type(schema: &SchemaDef, parent: &str, prop: &str, qualifier: &str) -> String {
    if let Some(target) = &schema.reference {
        return format!("{qualifier}{}", pascal_case(target));
    }
    if !schema.enum_values.is_empty() {
        return format!("{qualifier}{}", nested_type_name(parent, prop));
    }
    if schema.is_array() {
        return match schema.items.as_deref() {
            Some(items) => format!("[]{}", go_type(items, parent, prop, qualifier)),
            None => "[]any".to_string(),
        };
    }
    if schema.is_inline_object() {
        return format!("{qualifier}{}", nested_type_name(parent, prop));
    }
    match schema.schema_type.as_deref() {
        Some("object") => "map[string]any".to_string(),
        _ => scalar_type(schema).unwrap_or("any").to_string(),
    }
}

/// Field type honoring optionality: optional or nullable scalars and structs
/// become pointers, slices and maps stay as they are.
pub fn field_type(
    schema: &SchemaDef,
    parent: &str,
    prop: &str,
    required: bool,
    qualifier: &str,
) -> String {
    let base = go_type(schema, parent, prop, qualifier);
    let reference_like = base.starts_with("[]") || base.starts_with("map[") || base == "any";
    if (!required || schema.nullable) && !reference_like {
        format!("*{base}")
    } else {
        base
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoField {
    pub name: String,
    pub type_expr: String,
    pub json_tag: String,
    pub doc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoStruct {
    pub name: String,
    pub doc: String,
    pub fields: Vec<GoField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoEnumValue {
    pub const_name: String,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoEnum {
    pub name: String,
    pub base: String,
    pub values: Vec<GoEnumValue>,
}

/// `type Name Target`, for top-level arrays and scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoAlias {
    pub name: String,
    pub target: String,
    pub doc: String,
}

/// Every Go declaration produced for one component schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoDecls {
    pub structs: Vec<GoStruct>,
    pub enums: Vec<GoEnum>,
    pub aliases: Vec<GoAlias>,
}

impl GoDecls {
    pub fn imports(&self) -> BTreeSet<String> {
        let types = self
            .structs
            .iter()
            .flat_map(|s| s.fields.iter().map(|f| f.type_expr.as_str()))
            .chain(self.aliases.iter().map(|a| a.target.as_str()));
        imports_for(types)
    }
}

fn doc_line(description: Option<&str>) -> String {
    description
        .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn enum_decl(name: &str, schema: &SchemaDef) -> GoEnum {
    let base = scalar_type(schema).unwrap_or("string").to_string();
    let quoted = base == "string";
    GoEnum {
        name: name.to_string(),
        values: schema
            .enum_values
            .iter()
            .map(|v| GoEnumValue {
                const_name: format!("{name}{}", pascal_case(&constant_case(v).to_lowercase())),
                literal: if quoted { format!("{v:?}") } else { v.clone() },
            })
            .collect(),
        base,
    }
}

fn struct_decl(name: &str, schema: &SchemaDef, enums: &mut Vec<GoEnum>) -> GoStruct {
    let mut fields = Vec::new();
    for prop_name in schema.sorted_property_names() {
        let Some(prop) = schema.properties.get(&prop_name) else {
            continue;
        };
        let required = schema.is_required(&prop_name);
        let enum_source = if prop.enum_values.is_empty() {
            prop.items.as_deref().filter(|i| !i.enum_values.is_empty() && i.reference.is_none())
        } else if prop.reference.is_none() {
            Some(prop)
        } else {
            None
        };
        if let Some(source) = enum_source {
            enums.push(enum_decl(&nested_type_name(name, &prop_name), source));
        }
        let omit = if required { "" } else { ",omitempty" };
        fields.push(GoField {
            name: sanitize_identifier(&pascal_case(&prop_name)),
            type_expr: field_type(prop, name, &prop_name, required, ""),
            json_tag: format!("{prop_name}{omit}"),
            doc: doc_line(prop.description.as_deref()),
        });
    }
    GoStruct {
        name: name.to_string(),
        doc: doc_line(schema.description.as_deref()),
        fields,
    }
}

/// Declarations for a component schema and every type nested inside it.
pub fn declarations(schema: &SchemaDef) -> GoDecls {
    let name = pascal_case(&schema.name);
    let mut decls = GoDecls::default();

    if !schema.enum_values.is_empty() {
        decls.enums.push(enum_decl(&name, schema));
        return decls;
    }
    if schema.reference.is_some()
        || !schema.properties.is_empty()
        || schema.schema_type.as_deref() == Some("object")
    {
        if let Some(target) = &schema.reference {
            decls.aliases.push(GoAlias {
                name,
                target: pascal_case(target),
                doc: doc_line(schema.description.as_deref()),
            });
            return decls;
        }
        decls.structs.push(struct_decl(&name, schema, &mut decls.enums));
        let mut renamed = schema.clone();
        renamed.name = name;
        for nested in renamed.collect_nested_types() {
            decls.structs.push(struct_decl(&nested.name, &nested, &mut decls.enums));
        }
        return decls;
    }

    let target = go_type(schema, &name, "Item", "");
    if schema.is_array() {
        if let Some(items) = schema.items.as_deref() {
            if items.is_inline_object() {
                decls.structs.push(struct_decl(&format!("{name}Item"), items, &mut decls.enums));
            } else if !items.enum_values.is_empty() && items.reference.is_none() {
                decls.enums.push(enum_decl(&format!("{name}Item"), items));
            }
        }
    }
    decls.aliases.push(GoAlias {
        name,
        target,
        doc: doc_line(schema.description.as_deref()),
    });
    decls
}

/// Go package identifier for an ownership tag, e.g. `user-service` -> `userservice`.
pub fn package_name(tag: &str) -> String {
    let ident: String = snake_case(tag).chars().filter(|c| *c != '_').collect();
    if ident.is_empty() {
        "pkg".to_string()
    } else {
        ident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn scalar(ty: &str, format: Option<&str>) -> SchemaDef {
        SchemaDef {
            schema_type: Some(ty.to_string()),
            format: format.map(str::to_string),
            ..SchemaDef::default()
        }
    }

    #[test]
    fn test_scalar_mapping() {
        assert_eq!(go_type(&scalar("string", Some("uuid")), "U", "id", ""), "uuid.UUID");
        assert_eq!(go_type(&scalar("string", Some("date-time")), "U", "at", ""), "time.Time");
        assert_eq!(go_type(&scalar("integer", Some("int64")), "U", "n", ""), "int64");
        assert_eq!(go_type(&scalar("number", None), "U", "n", ""), "float64");
        assert_eq!(go_type(&SchemaDef::default(), "U", "x", ""), "any");
    }

    #[test]
    fn test_optional_fields_are_pointers() {
        let s = scalar("string", None);
        assert_eq!(field_type(&s, "U", "name", true, ""), "string");
        assert_eq!(field_type(&s, "U", "name", false, ""), "*string");
        let list = SchemaDef {
            schema_type: Some("array".into()),
            items: Some(Box::new(scalar("string", None))),
            ..SchemaDef::default()
        };
        assert_eq!(field_type(&list, "U", "tags", false, ""), "[]string");
    }

    #[test]
    fn test_declarations_for_entity() {
        let mut properties = BTreeMap::new();
        properties.insert("id".to_string(), scalar("string", Some("uuid")));
        properties.insert("name".to_string(), scalar("string", None));
        properties.insert(
            "status".to_string(),
            SchemaDef {
                enum_values: vec!["active".into(), "on-hold".into()],
                ..scalar("string", None)
            },
        );
        let mut address_props = BTreeMap::new();
        address_props.insert("city".to_string(), scalar("string", None));
        properties.insert(
            "address".to_string(),
            SchemaDef {
                properties: address_props,
                ..scalar("object", None)
            },
        );
        let schema = SchemaDef {
            name: "user".to_string(),
            properties,
            required: ["id".to_string()].into_iter().collect(),
            ..scalar("object", None)
        };

        let decls = declarations(&schema);
        let names: Vec<&str> = decls.structs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["User", "UserAddress"]);
        let user = &decls.structs[0];
        assert_eq!(user.fields[0].name, "ID");
        assert_eq!(user.fields[0].type_expr, "uuid.UUID");
        assert_eq!(user.fields[0].json_tag, "id");
        let status = user.fields.iter().find(|f| f.json_tag == "status,omitempty").unwrap();
        assert_eq!(status.type_expr, "*UserStatus");

        assert_eq!(decls.enums[0].name, "UserStatus");
        assert_eq!(decls.enums[0].values[1].const_name, "UserStatusOnHold");
        assert_eq!(decls.enums[0].values[1].literal, "\"on-hold\"");
        assert!(decls.imports().contains(UUID_IMPORT));
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("user-service"), "userservice");
        assert_eq!(package_name("Billing"), "billing");
        assert_eq!(package_name(""), "pkg");
    }
}
