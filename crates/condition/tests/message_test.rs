//! Tests for validation message templates

use nebula_condition::{
    MessageTemplate, ObjectType, Record, RecordResolver, Type, Value, format_message,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn account() -> Arc<ObjectType> {
    let owner = ObjectType::builder("Owner")
        .field_with_display("Name", Type::String, "Owner name")
        .build()
        .unwrap();
    ObjectType::builder("Account")
        .field_with_display("Balance", Type::Float, "Account balance")
        .field("Limit", Type::Int)
        .nullable_field("Owner", Type::Object(owner))
        .build()
        .unwrap()
}

fn record() -> Record {
    let account = account();
    let owner_type = account
        .field("Owner")
        .and_then(|(_, field)| match field.ty().underlying() {
            Type::Object(ty) => Some(Arc::clone(ty)),
            _ => None,
        })
        .unwrap();
    let owner = Record::builder(&owner_type)
        .set("Name", Value::string("Ada"))
        .unwrap()
        .build()
        .unwrap();
    Record::builder(&account)
        .set("Balance", Value::Float(12.5))
        .unwrap()
        .set("Limit", Value::Int(10))
        .unwrap()
        .set("Owner", Value::Object(owner))
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_live_placeholder_and_escaped_literal() {
    let parsed = MessageTemplate::parse("{Value} is invalid {{literal}}").unwrap();
    let live: Vec<&str> = parsed.live_items().map(|i| i.field_path.as_str()).collect();
    assert_eq!(live, vec!["Value"]);

    let rendered = parsed
        .render(&|path: &str| (path == "Value").then(|| "5".to_string()))
        .unwrap();
    assert_eq!(rendered, "5 is invalid {literal}");
}

#[test]
fn test_live_ids_hide_user_text_from_brace_handling() {
    let parsed = MessageTemplate::parse("{A} and {B}").unwrap();
    let ids: Vec<&str> = parsed.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids[0] != ids[1]);
    assert!(!parsed.template().contains("{A}"));

    let rendered = parsed
        .render(&|path: &str| Some(format!("{{{path}}}")))
        .unwrap();
    assert_eq!(rendered, "{A} and {B}");
}

#[test]
fn test_record_resolver_values_and_display_names() {
    let record = record();
    let resolver = RecordResolver::new(&record);
    let message = format_message(
        "{Balance:n} ({Balance}) exceeds {Limit:n} {Limit} for {Owner.Name:n} {Owner.Name}",
        &resolver,
    )
    .unwrap();
    assert_eq!(
        message,
        "Account balance (12.5) exceeds Limit 10 for Owner name Ada"
    );
}

#[test]
fn test_null_field_renders_empty() {
    let record = Record::builder(&account())
        .set("Balance", Value::Float(1.0))
        .unwrap()
        .set("Limit", Value::Int(0))
        .unwrap()
        .build()
        .unwrap();
    let message = format_message("[{Owner.Name}]", &RecordResolver::new(&record)).unwrap();
    assert_eq!(message, "[]");
}

#[test]
fn test_unknown_field_is_format_error() {
    let record = record();
    let err = format_message("{Missing}", &RecordResolver::new(&record)).unwrap_err();
    assert_eq!(err.code(), "COND:FORMAT");
}

#[test]
fn test_mismatched_escaping_depth() {
    for template in ["{{Value}", "{Value}}}", "{{{Value}}"] {
        let err = MessageTemplate::parse(template).unwrap_err();
        assert_eq!(err.code(), "COND:FORMAT", "{template}");
    }
}

#[test]
fn test_items_serialize_for_client_mirrors() {
    let parsed = MessageTemplate::parse("{Limit:n} {{x}}").unwrap();
    let json = serde_json::to_value(parsed.items()).unwrap();
    assert_eq!(json[0]["field_path"], "Limit");
    assert_eq!(json[0]["indicator"], "display_name");
    assert_eq!(json[1]["is_escaped"], true);
    assert_eq!(json[1]["substitution"], "x");
}
