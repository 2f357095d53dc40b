//! Property-based tests for parsing, evaluation and comparison

use nebula_condition::{
    Compiler, CompilerConfig, ObjectType, Record, RelOp, Toolchain, Type, Value, compare,
};
use proptest::prelude::*;
use std::sync::Arc;

// Strategy for boolean-only infix expressions over true/false/!/&&/||/()
fn boolean_expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("true".to_string()),
        Just("false".to_string()),
        Just("!true".to_string()),
        Just("!false".to_string()),
    ];
    leaf.prop_recursive(5, 48, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| format!("({e})")),
            inner.clone().prop_map(|e| format!("!({e})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} && {b}")),
            (inner.clone(), inner).prop_map(|(a, b)| format!("{a} || {b}")),
        ]
    })
}

fn comparable_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::Int),
        prop::num::f64::NORMAL.prop_map(Value::Float),
        "[ a-cA-C*]{0,4}".prop_map(|s| Value::string(&s)),
    ]
}

// ===== REFERENCE EVALUATOR (shunting-yard to RPN) =====

fn lex(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let len = ["true", "false", "&&", "||", "!", "(", ")"]
            .iter()
            .find(|t| rest.starts_with(**t))
            .map(|t| t.len())
            .unwrap_or_else(|| panic!("unexpected input {rest}"));
        tokens.push(&rest[..len]);
        rest = rest[len..].trim_start();
    }
    tokens
}

fn precedence(op: &str) -> u8 {
    match op {
        "!" => 3,
        "&&" => 2,
        "||" => 1,
        _ => 0,
    }
}

fn to_rpn(tokens: &[&str]) -> Vec<String> {
    let mut output = Vec::new();
    let mut stack: Vec<&str> = Vec::new();
    for &token in tokens {
        match token {
            "true" | "false" => output.push(token.to_string()),
            "!" | "(" => stack.push(token),
            ")" => {
                while let Some(op) = stack.pop() {
                    if op == "(" {
                        break;
                    }
                    output.push(op.to_string());
                }
            }
            op => {
                // right-associative: pop only strictly tighter operators
                while let Some(&top) = stack.last() {
                    if top == "(" || precedence(top) <= precedence(op) {
                        break;
                    }
                    output.push(top.to_string());
                    stack.pop();
                }
                stack.push(op);
            }
        }
    }
    while let Some(op) = stack.pop() {
        output.push(op.to_string());
    }
    output
}

fn eval_rpn(rpn: &[String]) -> bool {
    let mut stack = Vec::new();
    for token in rpn {
        match token.as_str() {
            "true" => stack.push(true),
            "false" => stack.push(false),
            "!" => {
                let v = stack.pop().unwrap();
                stack.push(!v);
            }
            op => {
                let right = stack.pop().unwrap();
                let left = stack.pop().unwrap();
                stack.push(if op == "&&" { left && right } else { left || right });
            }
        }
    }
    assert_eq!(stack.len(), 1);
    stack[0]
}

fn evaluate_infix(compiler: &Compiler, model: &Arc<ObjectType>, expression: &str) -> bool {
    let compiled = compiler.compile(model, expression).unwrap();
    let record = Record::builder(model).build().unwrap();
    compiled.evaluate(&record).unwrap()
}

#[test]
fn reference_evaluator_examples() {
    assert!(!eval_rpn(&to_rpn(&lex("!true && false"))));
    assert!(eval_rpn(&to_rpn(&lex("!(true && false)"))));
}

// ===== INFIX VS RPN =====

proptest! {
    #[test]
    fn infix_matches_rpn(expression in boolean_expression()) {
        let model = ObjectType::builder("Empty").build().unwrap();
        let compiler = Compiler::with_config(
            Arc::new(Toolchain::new()),
            CompilerConfig::new().with_cache_capacity(0),
        );
        let expected = eval_rpn(&to_rpn(&lex(&expression)));
        prop_assert_eq!(evaluate_infix(&compiler, &model, &expression), expected, "{}", expression);
    }
}

// ===== COMPARER LAWS =====

proptest! {
    #[test]
    fn not_equal_is_negated_equal(a in comparable_value(), b in comparable_value(), cs in any::<bool>()) {
        let eq = compare(&a, &b, RelOp::Eq, cs).unwrap();
        let ne = compare(&a, &b, RelOp::Ne, cs).unwrap();
        prop_assert_eq!(ne, !eq);
    }

    #[test]
    fn ordering_complements(a in comparable_value(), b in comparable_value(), cs in any::<bool>()) {
        if let (Ok(lt), Ok(ge)) = (compare(&a, &b, RelOp::Lt, cs), compare(&a, &b, RelOp::Ge, cs)) {
            prop_assert_eq!(ge, !lt);
        }
        if let (Ok(gt), Ok(le)) = (compare(&a, &b, RelOp::Gt, cs), compare(&a, &b, RelOp::Le, cs)) {
            prop_assert_eq!(le, !gt);
        }
    }

    #[test]
    fn null_never_orders(v in comparable_value()) {
        prop_assert!(!compare(&Value::Null, &v, RelOp::Gt, true).unwrap());
        prop_assert!(!compare(&v, &Value::Null, RelOp::Lt, true).unwrap());
    }
}

// ===== DETERMINISTIC RECOMPILATION =====

proptest! {
    #[test]
    fn recompilation_agrees(low in -100_i64..100, high in -100_i64..100, age in -200_i64..200) {
        let model = ObjectType::builder("Person")
            .field("Age", Type::Int)
            .build()
            .unwrap();
        let expression = format!("Age > {low} && Age <= {high} || Age == 0");
        let record = Record::builder(&model)
            .set("Age", Value::Int(age))
            .unwrap()
            .build()
            .unwrap();

        let compiler = Compiler::with_config(
            Arc::new(Toolchain::new()),
            CompilerConfig::new().with_cache_capacity(0),
        );
        let first = compiler.compile(&model, &expression).unwrap();
        let second = compiler.compile(&model, &expression).unwrap();

        let expected = (age > low && age <= high) || age == 0;
        prop_assert_eq!(first.evaluate(&record).unwrap(), expected);
        prop_assert_eq!(second.evaluate(&record).unwrap(), expected);
        prop_assert_eq!(first.metadata(), second.metadata());
    }
}
