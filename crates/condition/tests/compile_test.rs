//! Tests for compiling conditions against context types

use nebula_condition::{
    CoarseType, Compiler, CompilerConfig, EnumType, ObjectType, Toolchain, Type, Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

fn priority() -> Arc<EnumType> {
    EnumType::new("Priority", [("Low", 0), ("Normal", 1), ("High", 2)]).unwrap()
}

fn person() -> Arc<ObjectType> {
    let address = ObjectType::builder("Address")
        .field("City", Type::String)
        .nullable_field("Zip", Type::String)
        .build()
        .unwrap();
    ObjectType::builder("Person")
        .field("Age", Type::Int)
        .nullable_field("Country", Type::String)
        .field("Salary", Type::Float)
        .field("Active", Type::Bool)
        .field("Born", Type::DateTime)
        .field("Level", Type::Enum(priority()))
        .nullable_field("Address", Type::Object(address))
        .constant("MaxAge", Value::Int(65))
        .build()
        .unwrap()
}

fn compiler() -> Compiler {
    Compiler::with_config(
        Arc::new(Toolchain::with_builtins()),
        CompilerConfig::new().with_cache_capacity(0),
    )
}

#[test]
fn test_metadata_of_simple_rule() {
    let compiled = compiler()
        .compile(&person(), r#"Age > 5 && Country == "PL""#)
        .unwrap();

    let fields: Vec<(&str, CoarseType)> = compiled
        .metadata()
        .fields()
        .iter()
        .map(|(path, ty)| (path.as_str(), *ty))
        .collect();
    assert_eq!(
        fields,
        vec![("Age", CoarseType::Numeric), ("Country", CoarseType::String)]
    );
    assert!(compiled.metadata().consts().is_empty());
    assert_eq!(compiled.source(), r#"Age > 5 && Country == "PL""#);
}

#[test]
fn test_metadata_keeps_first_occurrence_order() {
    let compiled = compiler()
        .compile(
            &person(),
            "Address.City == 'Oslo' || Age < MaxAge && Address.City != '' && Level == Priority.High",
        )
        .unwrap();
    let metadata = compiled.metadata();

    let paths: Vec<&str> = metadata.fields().keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["Address.City", "Age", "Level"]);
    assert_eq!(metadata.fields()["Level"], CoarseType::Enum);

    let consts: Vec<&str> = metadata.consts().keys().map(String::as_str).collect();
    assert_eq!(consts, vec!["MaxAge", "Priority.High"]);
    assert_eq!(metadata.consts()["MaxAge"], Value::Int(65));
}

#[test]
fn test_metadata_serializes_enum_as_underlying_value() {
    let compiled = compiler()
        .compile(&person(), "Level == Priority.High && Age > 1")
        .unwrap();
    let json = serde_json::to_value(compiled.metadata()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "fields": { "Level": "enum", "Age": "numeric" },
            "consts": { "Priority.High": 2 },
        })
    );
}

#[test]
fn test_function_arguments_contribute_fields() {
    let compiled = compiler()
        .compile(&person(), "Length(Trim(Address.Zip)) == 5")
        .unwrap();
    let paths: Vec<&str> = compiled.metadata().fields().keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["Address.Zip"]);
}

#[test]
fn test_naming_collision_is_reported_at_compile_time() {
    let model = ObjectType::builder("Task")
        .field("Priority", Type::Enum(priority()))
        .build()
        .unwrap();
    let err = compiler()
        .compile(&model, "Priority == Priority.High")
        .unwrap_err();
    assert_eq!(err.code(), "COND:NAMING");
    assert!(err.is_compile_time());
    assert!(err.to_string().contains("segment 0"), "{err}");
}

#[rstest]
#[case("Age > 5")]
#[case("Age >= 5.5")]
#[case("Salary < 10")]
#[case("Age > null")]
#[case("null == Country")]
#[case("Age > '*'")]
#[case("Country == '*'")]
#[case("Born > '2020-01-01'")]
#[case("'2020-01-01 10:00:00' <= Born")]
#[case("Born > Date(2000, 1, 1)")]
#[case("Country > 'M'")]
#[case("Level != Priority.Low")]
#[case("Active == true")]
#[case("Active")]
#[case("!Active && Age == 3")]
#[case("(Active || Age > 1) && Salary > 0")]
#[case("Address.City == Country")]
#[case("Length(Country) > 2")]
#[case("Max(Age, Salary, 3) > 10")]
#[case("StartsWith(Country, 'P')")]
fn test_accepts(#[case] expression: &str) {
    let result = compiler().compile(&person(), expression);
    assert!(result.is_ok(), "{expression}: {:?}", result.err());
}

#[rstest]
#[case("Age > 'abc'", "COND:TYPE")]
#[case("Born > 'abc'", "COND:TYPE")]
#[case("Active > false", "COND:TYPE")]
#[case("Level > Priority.Low", "COND:TYPE")]
#[case("Age == Country", "COND:TYPE")]
#[case("Age", "COND:TYPE")]
#[case("Country && Active", "COND:TYPE")]
#[case("Trim(Country) == 'x' && Age", "COND:TYPE")]
#[case("Age > 1 > 0", "COND:SYNTAX")]
#[case("(Age > 1", "COND:SYNTAX")]
#[case("Age > 1)", "COND:SYNTAX")]
#[case("Age >", "COND:SYNTAX")]
#[case("&& Active", "COND:SYNTAX")]
#[case("Height > 1", "COND:SYNTAX")]
#[case("Address.Street == 'x'", "COND:SYNTAX")]
#[case("Priority.Urgent == Level", "COND:SYNTAX")]
#[case("Unknown(1) > 0", "COND:SYNTAX")]
#[case("Length(Age) > 0", "COND:SYNTAX")]
#[case("Age # 5", "COND:LEX")]
#[case("Age > 99999999999999999999", "COND:LEX")]
fn test_rejects(#[case] expression: &str, #[case] code: &str) {
    let err = compiler().compile(&person(), expression).unwrap_err();
    assert_eq!(err.code(), code, "{expression}: {err}");
    assert!(err.is_compile_time());
}

#[test]
fn test_lex_error_carries_residual_text() {
    let err = compiler().compile(&person(), "Age > 1 $ 2").unwrap_err();
    assert!(err.to_string().contains("$ 2"), "{err}");
    assert_eq!(err.span().map(|s| s.start), Some(8));
}

#[test]
fn test_missing_member_names_path() {
    let err = compiler()
        .compile(&person(), "Address.Street == 'x'")
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("missing member 'Street' in 'Address.Street' on type 'Person'"),
        "{err}"
    );
}

#[test]
fn test_unmatched_overload_lists_candidates() {
    let err = compiler().compile(&person(), "Substring(Age) == ''").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("no overload of 'Substring'"), "{message}");
    assert!(message.contains("candidates"), "{message}");
}

#[test]
fn test_registered_enum_without_field() {
    let model = ObjectType::builder("Ticket")
        .field("Code", Type::Int)
        .build()
        .unwrap();
    let status = EnumType::new("Status", [("Open", 10), ("Closed", 20)]).unwrap();

    let mut compiler = compiler();
    assert_eq!(
        compiler.compile(&model, "Code == Status.Open").unwrap_err().code(),
        "COND:SYNTAX"
    );

    compiler.register_enum(status);
    // An enum member and an int field are different underlying types
    assert_eq!(
        compiler.compile(&model, "Code == Status.Open").unwrap_err().code(),
        "COND:TYPE"
    );
    let compiled = compiler
        .compile(&model, "Status.Open != Status.Closed")
        .unwrap();
    assert_eq!(compiled.metadata().consts().len(), 2);
}

#[test]
fn test_depth_limit_from_config() {
    let compiler = Compiler::with_config(
        Arc::new(Toolchain::with_builtins()),
        CompilerConfig::new().with_max_depth(8).with_cache_capacity(0),
    );
    let shallow = format!("{}Active{}", "(".repeat(4), ")".repeat(4));
    assert!(compiler.compile(&person(), &shallow).is_ok());

    let deep = format!("{}Active{}", "(".repeat(32), ")".repeat(32));
    assert_eq!(
        compiler.compile(&person(), &deep).unwrap_err().code(),
        "COND:SYNTAX"
    );
}

#[test]
fn test_host_function_participates_in_type_checking() {
    let toolchain = Arc::new(Toolchain::with_builtins());
    toolchain
        .register_fn(
            "Double",
            nebula_condition::Signature::new([Type::Int], Type::Int),
            |args| match args {
                [Value::Int(v)] => Ok(Value::Int(v * 2)),
                _ => Ok(Value::Null),
            },
        )
        .unwrap();
    let compiler = Compiler::with_toolchain(toolchain);

    assert!(compiler.compile(&person(), "Double(Age) > 10").is_ok());
    assert_eq!(
        compiler
            .compile(&person(), "Double(Age) == 'x'")
            .unwrap_err()
            .code(),
        "COND:TYPE"
    );
}
