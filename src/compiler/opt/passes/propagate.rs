//! Constant Propagation
//!
//! Transforms an attributed abstract syntax tree (_AST_) by replacing uses of
//! local variables whose value is a known literal with that literal.
//!
//! The environment of known values flows through each method body in
//! statement order: it is forked at a conditional and merged at the join, and
//! a loop first forgets every variable its body assigns. Nothing is carried
//! from one method to the next.

use std::collections::HashSet;

use log::{debug, trace};

use crate::Result;
use crate::compiler::ast::{Ast, Kind, Literal, NodeId};
use crate::compiler::opt::env::ConstEnv;
use crate::compiler::opt::passes::fold::{condition_value, take_branch};

/// Method being propagated through.
struct Scope<'a> {
    name: &'a str,
    /// Locals and parameters of the method. Fields are never bound, since any
    /// call may write them.
    locals: HashSet<String>,
}

impl<'a> Scope<'a> {
    fn new(ast: &Ast, method: NodeId, name: &'a str) -> Self {
        let locals = ast
            .preorder(method)
            .filter_map(|id| match ast.kind(id) {
                Kind::VarDecl { name, .. } | Kind::Param { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();

        Self { name, locals }
    }

    fn binds(&self, var: &str) -> bool {
        self.locals.contains(var)
    }
}

/// Propagates known-constant local variables through every method of `ast`.
/// Returns `true` if the tree changed.
///
/// # Errors
///
/// Returns an error if a statement is missing a child its kind requires, or
/// if a condition is an integer literal.
pub fn propagate_constants(ast: &mut Ast) -> Result<bool> {
    let methods: Vec<(NodeId, String)> = ast
        .preorder(ast.root())
        .filter_map(|id| {
            ast.kind(id)
                .method_name()
                .map(|name| (id, name.to_string()))
        })
        .collect();

    let mut changed = false;
    let mut env = ConstEnv::new();

    for (method, name) in &methods {
        let scope = Scope::new(ast, *method, name);
        env.clear();

        for stmt in ast.children(*method).to_vec() {
            let (next, c) = visit_stmt(ast, stmt, env, &scope)?;
            env = next;
            changed |= c;
        }
    }

    debug!(
        "constant propagation over {} methods: changed = {changed}",
        methods.len()
    );

    Ok(changed)
}

/// Visits statement `id` with the environment holding before it, returning
/// the environment holding after it.
fn visit_stmt(
    ast: &mut Ast,
    id: NodeId,
    mut env: ConstEnv,
    scope: &Scope<'_>,
) -> Result<(ConstEnv, bool)> {
    match ast.kind(id) {
        Kind::CodeBlock => {
            let mut changed = false;
            for stmt in ast.children(id).to_vec() {
                let (next, c) = visit_stmt(ast, stmt, env, scope)?;
                env = next;
                changed |= c;
            }
            Ok((env, changed))
        }
        Kind::Assignment { varname } => {
            let var = varname.clone();

            let rhs = ast.child(id, 0)?;
            let changed = visit_expr(ast, rhs, &env, scope)?;

            if scope.binds(&var) {
                match ast.literal(ast.child(id, 0)?) {
                    Some(lit) => {
                        env.insert(&var, lit);
                    }
                    None => {
                        env.remove(&var);
                    }
                }
            }

            Ok((env, changed))
        }
        Kind::Condition => visit_condition(ast, id, env, scope),
        Kind::Cycle => visit_cycle(ast, id, env, scope),
        Kind::VarDecl { .. } | Kind::Param { .. } => Ok((env, false)),
        _ => {
            let mut changed = false;
            for child in ast.children(id).to_vec() {
                changed |= visit_expr(ast, child, &env, scope)?;
            }
            Ok((env, changed))
        }
    }
}

fn visit_condition(
    ast: &mut Ast,
    id: NodeId,
    env: ConstEnv,
    scope: &Scope<'_>,
) -> Result<(ConstEnv, bool)> {
    let test = ast.child(id, 0)?;
    let changed = visit_expr(ast, test, &env, scope)?;

    if let Some(taken) = condition_value(ast, id)? {
        let index = if taken { 1 } else { 2 };

        let env = match ast.children(id).get(index) {
            Some(&branch) => visit_stmt(ast, branch, env, scope)?.0,
            None => env,
        };
        let branch = ast.children(id).get(index).copied();

        trace!("'{}': condition is always {taken}", scope.name);

        take_branch(ast, id, branch)?;
        return Ok((env, true));
    }

    let then = ast.child(id, 1)?;
    let (then_env, then_changed) = visit_stmt(ast, then, env.fork(), scope)?;

    let (else_env, else_changed) = match ast.children(id).get(2) {
        Some(&otherwise) => visit_stmt(ast, otherwise, env, scope)?,
        None => (env, false),
    };

    Ok((
        then_env.merge(&else_env),
        changed || then_changed || else_changed,
    ))
}

fn visit_cycle(
    ast: &mut Ast,
    id: NodeId,
    mut env: ConstEnv,
    scope: &Scope<'_>,
) -> Result<(ConstEnv, bool)> {
    // The condition and body see values from any iteration, so whatever the
    // body assigns is unknown from the loop entry onwards.
    for var in assigned_vars(ast, id) {
        if env.remove(&var).is_some() {
            trace!("'{}': '{var}' is reassigned in a loop", scope.name);
        }
    }

    let test = ast.child(id, 0)?;
    let mut changed = visit_expr(ast, test, &env, scope)?;

    if condition_value(ast, id)? == Some(false) {
        trace!("'{}': removed loop that never runs", scope.name);

        take_branch(ast, id, None)?;
        return Ok((env, true));
    }

    let body = ast.child(id, 1)?;
    changed |= visit_stmt(ast, body, env.fork(), scope)?.1;

    Ok((env, changed))
}

/// Replaces every bound identifier in expression `id` with its literal.
fn visit_expr(ast: &mut Ast, id: NodeId, env: &ConstEnv, scope: &Scope<'_>) -> Result<bool> {
    if let Kind::Identifier(var) = ast.kind(id) {
        let Some(lit) = env.get(var) else {
            return Ok(false);
        };

        trace!("'{}': '{var}' is {lit}", scope.name);

        substitute(ast, id, lit)?;
        return Ok(true);
    }

    let mut changed = false;
    for child in ast.children(id).to_vec() {
        changed |= visit_expr(ast, child, env, scope)?;
    }

    Ok(changed)
}

fn substitute(ast: &mut Ast, id: NodeId, lit: Literal) -> Result<()> {
    let node = ast.leaf(lit.to_kind());
    ast.replace(id, node)
}

/// Returns the variables assigned anywhere below `id`.
fn assigned_vars(ast: &Ast, id: NodeId) -> Vec<String> {
    ast.preorder(id)
        .filter_map(|n| match ast.kind(n) {
            Kind::Assignment { varname } => Some(varname.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::{ArithOp, CmpOp};
    use crate::compiler::opt::passes::tree::*;

    #[test]
    fn propagate_straight_line() {
        // int x; int y; x = 5; y = x + x; return y;
        let mut ast = method("f", |ast| {
            let (dx, dy) = (decl(ast, "x"), decl(ast, "y"));
            let five = int(ast, 5);
            let x5 = assign(ast, "x", five);
            let (a, b) = (ident(ast, "x"), ident(ast, "x"));
            let sum = arith(ast, ArithOp::Add, a, b);
            let y = assign(ast, "y", sum);
            let r = ident(ast, "y");
            vec![dx, dy, x5, y, ret(ast, r)]
        });

        assert!(propagate_constants(&mut ast).unwrap());
        assert_eq!(
            body(&ast),
            "VarDecl(int x)\nVarDecl(int y)\nAssignment(x)\n  Integer(5)\n\
             Assignment(y)\n  ArithmeticExpr(+)\n    Integer(5)\n    Integer(5)\n\
             ReturnStmt\n  Identifier(y)\n"
        );
    }

    #[test]
    fn propagate_does_not_bind_fields() {
        // `count` is not declared in the method, so it is a field.
        let mut ast = method("f", |ast| {
            let one = int(ast, 1);
            let set = assign(ast, "count", one);
            let r = ident(ast, "count");
            vec![set, ret(ast, r)]
        });

        assert!(!propagate_constants(&mut ast).unwrap());
    }

    #[test]
    fn propagate_assigned_param() {
        // f(int p) { p = 3; return p; }
        let mut ast = method("f", |ast| {
            let param = ast.leaf(Kind::Param {
                name: "p".into(),
                ty: "int".into(),
            });
            let three = int(ast, 3);
            let p3 = assign(ast, "p", three);
            let r = ident(ast, "p");
            vec![param, p3, ret(ast, r)]
        });

        assert!(propagate_constants(&mut ast).unwrap());
        assert_eq!(
            body(&ast),
            "Param(int p)\nAssignment(p)\n  Integer(3)\nReturnStmt\n  Integer(3)\n"
        );
    }

    #[test]
    fn propagate_param_unknown_at_entry() {
        // f(int p) { return p; }
        let mut ast = method("f", |ast| {
            let param = ast.leaf(Kind::Param {
                name: "p".into(),
                ty: "int".into(),
            });
            let r = ident(ast, "p");
            vec![param, ret(ast, r)]
        });

        assert!(!propagate_constants(&mut ast).unwrap());
        assert_eq!(body(&ast), "Param(int p)\nReturnStmt\n  Identifier(p)\n");
    }

    #[test]
    fn propagate_merge_keeps_agreeing_binding() {
        // x = 5; if (c) { y = 1; } else { y = 2; } return x + y;
        let mut ast = method("f", |ast| {
            let (dx, dy, dc) = (decl(ast, "x"), decl(ast, "y"), decl(ast, "c"));
            let five = int(ast, 5);
            let x5 = assign(ast, "x", five);
            let c = ident(ast, "c");
            let one = int(ast, 1);
            let y1 = assign(ast, "y", one);
            let then = block(ast, &[y1]);
            let two = int(ast, 2);
            let y2 = assign(ast, "y", two);
            let otherwise = block(ast, &[y2]);
            let branch = cond(ast, c, then, Some(otherwise));
            let (x, y) = (ident(ast, "x"), ident(ast, "y"));
            let sum = arith(ast, ArithOp::Add, x, y);
            vec![dx, dy, dc, x5, branch, ret(ast, sum)]
        });

        assert!(propagate_constants(&mut ast).unwrap());
        assert!(body(&ast).ends_with(
            "ReturnStmt\n  ArithmeticExpr(+)\n    Integer(5)\n    Identifier(y)\n"
        ));
    }

    #[test]
    fn propagate_merge_drops_binding_changed_in_one_branch() {
        // x = 5; if (c) { x = z; } return x;
        let mut ast = method("f", |ast| {
            let (dx, dz, dc) = (decl(ast, "x"), decl(ast, "z"), decl(ast, "c"));
            let five = int(ast, 5);
            let x5 = assign(ast, "x", five);
            let c = ident(ast, "c");
            let z = ident(ast, "z");
            let xz = assign(ast, "x", z);
            let then = block(ast, &[xz]);
            let branch = cond(ast, c, then, None);
            let x = ident(ast, "x");
            vec![dx, dz, dc, x5, branch, ret(ast, x)]
        });

        assert!(!propagate_constants(&mut ast).unwrap());
        assert!(body(&ast).ends_with("ReturnStmt\n  Identifier(x)\n"));
    }

    #[test]
    fn propagate_known_condition_splices_branch() {
        // b = true; if (b) { x = 1; } else { x = 2; } return x;
        let mut ast = method("f", |ast| {
            let (db, dx) = (decl(ast, "b"), decl(ast, "x"));
            let yes = boolean(ast, true);
            let b = assign(ast, "b", yes);
            let test = ident(ast, "b");
            let one = int(ast, 1);
            let x1 = assign(ast, "x", one);
            let then = block(ast, &[x1]);
            let two = int(ast, 2);
            let x2 = assign(ast, "x", two);
            let otherwise = block(ast, &[x2]);
            let branch = cond(ast, test, then, Some(otherwise));
            let x = ident(ast, "x");
            vec![db, dx, b, branch, ret(ast, x)]
        });

        assert!(propagate_constants(&mut ast).unwrap());
        assert_eq!(
            body(&ast),
            "VarDecl(int b)\nVarDecl(int x)\nAssignment(b)\n  Boolean(true)\n\
             Assignment(x)\n  Integer(1)\nReturnStmt\n  Integer(1)\n"
        );
    }

    #[test]
    fn propagate_loop_forgets_reassigned_variables() {
        // i = 0; n = 10; while (i < n) { i = i + 1; } return i + n;
        let mut ast = method("f", |ast| {
            let (di, dn) = (decl(ast, "i"), decl(ast, "n"));
            let zero = int(ast, 0);
            let i0 = assign(ast, "i", zero);
            let ten = int(ast, 10);
            let n10 = assign(ast, "n", ten);
            let (i, n) = (ident(ast, "i"), ident(ast, "n"));
            let test = cmp(ast, CmpOp::Less, i, n);
            let (i, one) = (ident(ast, "i"), int(ast, 1));
            let inc = arith(ast, ArithOp::Add, i, one);
            let step = assign(ast, "i", inc);
            let body = block(ast, &[step]);
            let lp = cycle(ast, test, body);
            let (i, n) = (ident(ast, "i"), ident(ast, "n"));
            let sum = arith(ast, ArithOp::Add, i, n);
            vec![di, dn, i0, n10, lp, ret(ast, sum)]
        });

        assert!(propagate_constants(&mut ast).unwrap());
        assert!(body(&ast).ends_with(
            "Cycle\n  ComparisonExpr(<)\n    Identifier(i)\n    Integer(10)\n\
             \x20 CodeBlock\n    Assignment(i)\n      ArithmeticExpr(+)\n        Identifier(i)\n        Integer(1)\n\
             ReturnStmt\n  ArithmeticExpr(+)\n    Identifier(i)\n    Integer(10)\n"
        ));
    }

    #[test]
    fn propagate_false_loop_is_removed() {
        // done = false; while (done) { x = 1; }
        let mut ast = method("f", |ast| {
            let (dd, dx) = (decl(ast, "done"), decl(ast, "x"));
            let no = boolean(ast, false);
            let done = assign(ast, "done", no);
            let test = ident(ast, "done");
            let one = int(ast, 1);
            let x1 = assign(ast, "x", one);
            let body = block(ast, &[x1]);
            vec![dd, dx, done, cycle(ast, test, body)]
        });

        assert!(propagate_constants(&mut ast).unwrap());
        assert_eq!(
            body(&ast),
            "VarDecl(int done)\nVarDecl(int x)\nAssignment(done)\n  Boolean(false)\n"
        );
    }

    #[test]
    fn propagate_resets_between_methods() {
        let mut ast = Ast::new(Kind::ClassDecl {
            name: "A".into(),
            extends: None,
        });
        let root = ast.root();

        let dx = decl(&mut ast, "x");
        let one = int(&mut ast, 1);
        let x1 = assign(&mut ast, "x", one);
        let first = ast.node(Kind::MethodDecl { name: "a".into() }, [dx, x1]);

        let dx = decl(&mut ast, "x");
        let x = ident(&mut ast, "x");
        let r = ret(&mut ast, x);
        let second = ast.node(Kind::MethodDecl { name: "b".into() }, [dx, r]);

        ast.push(root, first).unwrap();
        ast.push(root, second).unwrap();

        assert!(!propagate_constants(&mut ast).unwrap());
        assert_eq!(ast.kind(ast.child(r, 0).unwrap()), &Kind::Identifier("x".into()));
    }
}
