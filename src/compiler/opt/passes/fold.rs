//! Constant Folding
//!
//! Transforms an attributed abstract syntax tree (_AST_) by evaluating
//! constant expressions at compile-time, and removes the branches and loops
//! whose conditions fold to a constant.
//!
//! Integer arithmetic wraps around on 32 bits, as it does at run-time.

use log::{debug, trace};

use crate::compiler::ast::{ArithOp, Ast, CmpOp, Kind, Literal, LogicOp, NodeId};
use crate::{OptError, Result};

/// Name reported for expressions that sit outside any method.
const NO_METHOD: &str = "<none>";

/// Folds every constant expression of `ast` in place. Returns `true` if the
/// tree changed.
///
/// # Errors
///
/// Returns an error if a division by a literal zero is found, or if a
/// condition folds to an integer.
pub fn fold_constants(ast: &mut Ast) -> Result<bool> {
    let root = ast.root();
    let changed = fold(ast, root, NO_METHOD)?;

    debug!("constant folding: changed = {changed}");

    Ok(changed)
}

/// Folds the subtree at `id`, children first. On return `id` may have been
/// replaced or removed; callers re-read their children by position.
fn fold(ast: &mut Ast, id: NodeId, method: &str) -> Result<bool> {
    match ast.kind(id) {
        Kind::Condition => return fold_condition(ast, id, method),
        Kind::Cycle => return fold_cycle(ast, id, method),
        _ => {}
    }

    let name = ast.kind(id).method_name().map(str::to_string);
    let method = name.as_deref().unwrap_or(method);

    let mut changed = false;

    for child in ast.children(id).to_vec() {
        changed |= fold(ast, child, method)?;
    }

    if let Some(lit) = evaluate(ast, id, method)? {
        trace!("'{method}': folded '{}' to {lit}", ast.expr_text(id));

        let folded = ast.leaf(lit.to_kind());
        ast.replace(id, folded)?;
        changed = true;
    }

    Ok(changed)
}

fn fold_condition(ast: &mut Ast, id: NodeId, method: &str) -> Result<bool> {
    let test = ast.child(id, 0)?;
    let mut changed = fold(ast, test, method)?;

    match condition_value(ast, id)? {
        Some(taken) => {
            let index = if taken { 1 } else { 2 };

            // The surviving branch is folded before it takes the place of the
            // conditional.
            if let Some(&branch) = ast.children(id).get(index) {
                fold(ast, branch, method)?;
            }
            let branch = ast.children(id).get(index).copied();

            trace!("'{method}': condition is always {taken}");

            take_branch(ast, id, branch)?;
            Ok(true)
        }
        None => {
            for branch in ast.children(id)[1..].to_vec() {
                changed |= fold(ast, branch, method)?;
            }
            Ok(changed)
        }
    }
}

fn fold_cycle(ast: &mut Ast, id: NodeId, method: &str) -> Result<bool> {
    let test = ast.child(id, 0)?;
    let mut changed = fold(ast, test, method)?;

    if condition_value(ast, id)? == Some(false) {
        trace!("'{method}': removed loop that never runs");

        take_branch(ast, id, None)?;
        return Ok(true);
    }

    let body = ast.child(id, 1)?;
    changed |= fold(ast, body, method)?;

    Ok(changed)
}

/// Returns the value of the condition (first child) of a `Condition` or
/// `Cycle`, if it is a literal.
///
/// # Errors
///
/// Returns an error if the node has no condition or it is an integer literal.
pub(super) fn condition_value(ast: &Ast, id: NodeId) -> Result<Option<bool>> {
    match ast.literal(ast.child(id, 0)?) {
        Some(Literal::Bool(b)) => Ok(Some(b)),
        Some(Literal::Int(v)) => Err(OptError::malformed(format!(
            "{} {id} has integer condition {v}",
            ast.kind(id).name()
        ))),
        None => Ok(None),
    }
}

/// Puts `branch` in the place of the conditional statement `stmt`, or removes
/// `stmt` if there is no branch.
///
/// Inside a statement list a block branch is flattened, its statements taking
/// the place of `stmt` in order. Anywhere else (the branch or body of another
/// conditional or loop) the parent keeps one node in that slot: the branch
/// itself, or an empty block.
///
/// # Errors
///
/// Returns an error if `stmt` is the root of the tree.
pub(super) fn take_branch(ast: &mut Ast, stmt: NodeId, branch: Option<NodeId>) -> Result<()> {
    let in_list = ast
        .parent(stmt)
        .is_some_and(|p| ast.kind(p).is_statement_list());

    match branch {
        Some(branch) if in_list && *ast.kind(branch) == Kind::CodeBlock => {
            let stmts = ast.children(branch).to_vec();
            ast.splice(stmt, &stmts)
        }
        Some(branch) => ast.replace(stmt, branch),
        None if in_list => ast.delete(stmt),
        None => {
            let empty = ast.leaf(Kind::CodeBlock);
            ast.replace(stmt, empty)
        }
    }
}

/// Computes the literal an expression node folds to, if all its operands are
/// literals.
fn evaluate(ast: &Ast, id: NodeId, method: &str) -> Result<Option<Literal>> {
    let operand = |i: usize| ast.children(id).get(i).and_then(|&c| ast.literal(c));

    let lit = match (ast.kind(id), operand(0), operand(1)) {
        (Kind::ParenthesesExpr, Some(inner), _) => inner,
        (Kind::NegationExpr, Some(Literal::Bool(b)), _) => Literal::Bool(!b),
        (Kind::ArithmeticExpr(op), Some(Literal::Int(lhs)), Some(Literal::Int(rhs))) => {
            let val = eval_arith(*op, lhs, rhs).ok_or_else(|| OptError::DivisionByZero {
                method: method.to_string(),
                expr: ast.expr_text(id),
            })?;
            Literal::Int(val)
        }
        (Kind::ComparisonExpr(op), Some(Literal::Int(lhs)), Some(Literal::Int(rhs))) => {
            Literal::Bool(eval_cmp(*op, lhs, rhs))
        }
        (Kind::LogicalExpr(op), Some(Literal::Bool(lhs)), Some(Literal::Bool(rhs))) => {
            Literal::Bool(eval_logic(*op, lhs, rhs))
        }
        _ => return Ok(None),
    };

    Ok(Some(lit))
}

/// Evaluates an arithmetic operator on two constant integer operands, or
/// `None` when dividing by zero.
#[inline]
#[must_use]
pub fn eval_arith(op: ArithOp, lhs: i32, rhs: i32) -> Option<i32> {
    match op {
        ArithOp::Add => Some(lhs.wrapping_add(rhs)),
        ArithOp::Sub => Some(lhs.wrapping_sub(rhs)),
        ArithOp::Mul => Some(lhs.wrapping_mul(rhs)),
        ArithOp::Div if rhs == 0 => None,
        // `i32::MIN / -1` wraps to `i32::MIN`.
        ArithOp::Div => Some(lhs.wrapping_div(rhs)),
    }
}

#[inline]
#[must_use]
pub const fn eval_cmp(op: CmpOp, lhs: i32, rhs: i32) -> bool {
    match op {
        CmpOp::Less => lhs < rhs,
        CmpOp::Greater => lhs > rhs,
    }
}

#[inline]
#[must_use]
pub const fn eval_logic(op: LogicOp, lhs: bool, rhs: bool) -> bool {
    match op {
        LogicOp::And => lhs && rhs,
        LogicOp::Or => lhs || rhs,
    }
}
