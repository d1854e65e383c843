#![cfg(feature = "z3")]

use dbuf_ast::{Ast, AstBuilder, BinaryOp};

mod common;
use common::check;

fn sized(b: &AstBuilder) -> dbuf_ast::Message {
    b.message(
        "Sized",
        vec![b.field("n", b.ty("Unsigned", vec![]))],
        vec![b.field("xs", b.ty("Array", vec![b.type_expr("Int", vec![]), b.var("n")]))],
    )
}

#[test]
fn lengths_equal_by_arithmetic_are_accepted() {
    let b = AstBuilder::new();
    let mut ast = Ast::new();
    ast.add_message(sized(&b));
    ast.add_function(b.function(
        "items",
        vec![
            b.param("n", b.ty("Unsigned", vec![])),
            b.param("s", b.ty("Sized", vec![b.binary(BinaryOp::Add, b.var("n"), b.uint(1))])),
        ],
        b.ty(
            "Array",
            vec![b.type_expr("Int", vec![]), b.binary(BinaryOp::Add, b.uint(1), b.var("n"))],
        ),
        Some(b.var("s.xs")),
    ));
    let (result, _, _) = check(ast, b);
    result.expect("n + 1u == 1u + n");
}

#[test]
fn lengths_differing_by_one_are_rejected() {
    let b = AstBuilder::new();
    let mut ast = Ast::new();
    ast.add_message(sized(&b));
    ast.add_function(b.function(
        "items",
        vec![
            b.param("n", b.ty("Unsigned", vec![])),
            b.param("s", b.ty("Sized", vec![b.var("n")])),
        ],
        b.ty(
            "Array",
            vec![b.type_expr("Int", vec![]), b.binary(BinaryOp::Add, b.var("n"), b.uint(1))],
        ),
        Some(b.var("s.xs")),
    ));
    let (result, _, _) = check(ast, b);
    let errors = result.expect_err("n is not n + 1u");
    assert!(
        errors[0].message.contains("Type parameter 1 mismatch"),
        "unexpected error: {}",
        errors[0].message
    );
}
