#![allow(dead_code)]

use dbuf_ast::{Ast, AstBuilder, BinaryOp, Interner};
use dbuf_core::{check_all_with, CheckOptions, ErrorList};
use tracing_subscriber::EnvFilter;

/// Installs a `RUST_LOG`-driven subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Runs the whole pipeline with the default options.
pub fn check(mut ast: Ast, b: AstBuilder) -> (Result<(), ErrorList>, Ast, Interner) {
    init_tracing();
    let interner = b.finish();
    let result = check_all_with(&mut ast, &interner, CheckOptions::default());
    (result, ast, interner)
}

pub fn messages(errors: &ErrorList) -> Vec<&str> {
    errors.iter().map(|e| e.message.as_str()).collect()
}

/// `enum List(n: Unsigned) { 0 => Nil {}; * => Cons { head: Int, tail: List(n - 1u) } }`
pub fn add_list(ast: &mut Ast, b: &AstBuilder) {
    ast.add_enum(b.enumeration(
        "List",
        vec![b.field("n", b.ty("Unsigned", vec![]))],
        vec![
            b.rule(vec![b.pattern(b.uint(0))], vec![b.constructor("Nil", vec![])]),
            b.rule(
                vec![b.star()],
                vec![b.constructor(
                    "Cons",
                    vec![
                        b.field("head", b.ty("Int", vec![])),
                        b.field(
                            "tail",
                            b.ty("List", vec![b.binary(BinaryOp::Sub, b.var("n"), b.uint(1))]),
                        ),
                    ],
                )],
            ),
        ],
    ));
}

/// `enum Nat { Zero {}, Succ { prev: Nat } }` and
/// `enum Vec(n: Nat) { Zero{} => Nil {}; Succ{prev: m} => Cons { head: Int, tail: Vec(m) } }`
pub fn add_nat_vec(ast: &mut Ast, b: &AstBuilder) {
    ast.add_enum(b.enumeration(
        "Nat",
        vec![],
        vec![b.rule(
            vec![],
            vec![
                b.constructor("Zero", vec![]),
                b.constructor("Succ", vec![b.field("prev", b.ty("Nat", vec![]))]),
            ],
        )],
    ));
    ast.add_enum(b.enumeration(
        "Vec",
        vec![b.field("n", b.ty("Nat", vec![]))],
        vec![
            b.rule(
                vec![b.pattern(b.ctor("Zero", vec![]))],
                vec![b.constructor("Nil", vec![])],
            ),
            b.rule(
                vec![b.pattern(b.ctor("Succ", vec![("prev", b.var("m"))]))],
                vec![b.constructor(
                    "Cons",
                    vec![
                        b.field("head", b.ty("Int", vec![])),
                        b.field("tail", b.ty("Vec", vec![b.var("m")])),
                    ],
                )],
            ),
        ],
    ));
}
