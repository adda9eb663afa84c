//! Shorthands for building trees in pass tests.

use crate::compiler::ast::{ArithOp, Ast, CmpOp, Kind, LogicOp, NodeId};

pub fn int(ast: &mut Ast, v: i32) -> NodeId {
    ast.leaf(Kind::Integer(v))
}

pub fn boolean(ast: &mut Ast, b: bool) -> NodeId {
    ast.leaf(Kind::Boolean(b))
}

pub fn ident(ast: &mut Ast, name: &str) -> NodeId {
    ast.leaf(Kind::Identifier(name.to_string()))
}

pub fn arith(ast: &mut Ast, op: ArithOp, lhs: NodeId, rhs: NodeId) -> NodeId {
    ast.node(Kind::ArithmeticExpr(op), [lhs, rhs])
}

pub fn cmp(ast: &mut Ast, op: CmpOp, lhs: NodeId, rhs: NodeId) -> NodeId {
    ast.node(Kind::ComparisonExpr(op), [lhs, rhs])
}

pub fn logic(ast: &mut Ast, op: LogicOp, lhs: NodeId, rhs: NodeId) -> NodeId {
    ast.node(Kind::LogicalExpr(op), [lhs, rhs])
}

pub fn assign(ast: &mut Ast, var: &str, rhs: NodeId) -> NodeId {
    ast.node(
        Kind::Assignment {
            varname: var.to_string(),
        },
        [rhs],
    )
}

pub fn decl(ast: &mut Ast, var: &str) -> NodeId {
    ast.leaf(Kind::VarDecl {
        name: var.to_string(),
        ty: "int".to_string(),
    })
}

pub fn block(ast: &mut Ast, stmts: &[NodeId]) -> NodeId {
    ast.node(Kind::CodeBlock, stmts.iter().copied())
}

pub fn cond(ast: &mut Ast, test: NodeId, then: NodeId, otherwise: Option<NodeId>) -> NodeId {
    ast.node(Kind::Condition, [test, then].into_iter().chain(otherwise))
}

pub fn cycle(ast: &mut Ast, test: NodeId, body: NodeId) -> NodeId {
    ast.node(Kind::Cycle, [test, body])
}

pub fn ret(ast: &mut Ast, expr: NodeId) -> NodeId {
    ast.node(Kind::ReturnStmt, [expr])
}

/// Returns a tree whose root is a method `name` with `body` as its children.
pub fn method(name: &str, build: impl FnOnce(&mut Ast) -> Vec<NodeId>) -> Ast {
    let mut ast = Ast::new(Kind::MethodDecl {
        name: name.to_string(),
    });
    let root = ast.root();

    for stmt in build(&mut ast) {
        ast.push(root, stmt).unwrap();
    }

    ast
}

/// Renders the children of the root, one tree per statement.
pub fn body(ast: &Ast) -> String {
    ast.to_string()
        .lines()
        .skip(1)
        .map(|l| format!("{}\n", &l[2..]))
        .collect()
}
