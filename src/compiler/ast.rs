//! Abstract Syntax Tree
//!
//! Arena-backed, attributed abstract syntax tree (_AST_) as handed over by
//! semantic analysis. Nodes are addressed by [`NodeId`]; a node's parent and
//! its position among siblings are lookups into the arena, so rewrites splice
//! child lists rather than moving owners around.

use std::fmt;
use std::str::FromStr;

use crate::{OptError, Result};

/// Index of a node within its [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

macro_rules! operator_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $sym:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Returns the source symbol of the operator.
            #[inline]
            #[must_use]
            pub const fn symbol(self) -> &'static str {
                match self {
                    $($name::$variant => $sym),+
                }
            }
        }

        impl FromStr for $name {
            type Err = OptError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($sym => Ok($name::$variant),)+
                    _ => Err(OptError::malformed(format!(
                        "unknown {} '{s}'",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.symbol())
            }
        }
    };
}

operator_enum! {
    /// Operators of `ArithmeticExpr`.
    ArithOp { Add => "+", Sub => "-", Mul => "*", Div => "/" }
}

operator_enum! {
    /// Operators of `ComparisonExpr`.
    CmpOp { Less => "<", Greater => ">" }
}

operator_enum! {
    /// Operators of `LogicalExpr`.
    LogicOp { And => "&&", Or => "||" }
}

/// Directly known value of an `Integer` or `Boolean` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i32),
    Bool(bool),
}

impl Literal {
    /// Returns the node kind holding this literal.
    #[inline]
    #[must_use]
    pub const fn to_kind(self) -> Kind {
        match self {
            Literal::Int(v) => Kind::Integer(v),
            Literal::Bool(b) => Kind::Boolean(b),
        }
    }
}

impl FromStr for Literal {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "true" => Ok(Literal::Bool(true)),
            "false" => Ok(Literal::Bool(false)),
            _ => s
                .parse::<i32>()
                .map(Literal::Int)
                .map_err(|_| OptError::malformed(format!("'{s}' is not a literal"))),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Shape of an _AST_ node, with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Program,
    ImportDecl {
        path: String,
    },
    ClassDecl {
        name: String,
        extends: Option<String>,
    },
    VarDecl {
        name: String,
        ty: String,
    },
    Param {
        name: String,
        ty: String,
    },
    MethodDecl {
        name: String,
    },
    VoidMethodDecl {
        name: String,
    },
    MainMethodDecl,
    /// `{ ... }`, an ordered statement list.
    CodeBlock,
    /// `if (cond) then else otherwise`; children are the condition, the true
    /// branch and an optional false branch.
    Condition,
    /// `while (cond) body`; children are the condition and the body.
    Cycle,
    ExprStmt,
    ReturnStmt,
    /// `varname = expr;`
    Assignment {
        varname: String,
    },
    /// `varname[index] = expr;`
    ArrayAssignment {
        varname: String,
    },
    ParenthesesExpr,
    NegationExpr,
    ArithmeticExpr(ArithOp),
    ComparisonExpr(CmpOp),
    LogicalExpr(LogicOp),
    ArrayAccess,
    Length,
    /// Children are the receiver followed by the arguments.
    MethodCall {
        method: String,
    },
    NewObject {
        class: String,
    },
    NewIntArray,
    This,
    Integer(i32),
    Boolean(bool),
    Identifier(String),
}

impl Kind {
    /// Returns the kind label used by the front-end.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Kind::Program => "Program",
            Kind::ImportDecl { .. } => "ImportDecl",
            Kind::ClassDecl { .. } => "ClassDecl",
            Kind::VarDecl { .. } => "VarDecl",
            Kind::Param { .. } => "Param",
            Kind::MethodDecl { .. } => "MethodDecl",
            Kind::VoidMethodDecl { .. } => "VoidMethodDecl",
            Kind::MainMethodDecl => "MainMethodDecl",
            Kind::CodeBlock => "CodeBlock",
            Kind::Condition => "Condition",
            Kind::Cycle => "Cycle",
            Kind::ExprStmt => "ExprStmt",
            Kind::ReturnStmt => "ReturnStmt",
            Kind::Assignment { .. } => "Assignment",
            Kind::ArrayAssignment { .. } => "ArrayAssignment",
            Kind::ParenthesesExpr => "ParenthesesExpr",
            Kind::NegationExpr => "NegationExpr",
            Kind::ArithmeticExpr(_) => "ArithmeticExpr",
            Kind::ComparisonExpr(_) => "ComparisonExpr",
            Kind::LogicalExpr(_) => "LogicalExpr",
            Kind::ArrayAccess => "ArrayAccess",
            Kind::Length => "Length",
            Kind::MethodCall { .. } => "MethodCall",
            Kind::NewObject { .. } => "NewObject",
            Kind::NewIntArray => "NewIntArray",
            Kind::This => "This",
            Kind::Integer(_) => "Integer",
            Kind::Boolean(_) => "Boolean",
            Kind::Identifier(_) => "Identifier",
        }
    }

    /// Returns the literal carried by `Integer` and `Boolean` kinds.
    #[inline]
    #[must_use]
    pub const fn literal(&self) -> Option<Literal> {
        match self {
            Kind::Integer(v) => Some(Literal::Int(*v)),
            Kind::Boolean(b) => Some(Literal::Bool(*b)),
            _ => None,
        }
    }

    /// Returns `true` for the three method declaration kinds.
    #[inline]
    #[must_use]
    pub const fn is_method(&self) -> bool {
        matches!(
            self,
            Kind::MethodDecl { .. } | Kind::VoidMethodDecl { .. } | Kind::MainMethodDecl
        )
    }

    /// Returns the name of a method declaration.
    #[must_use]
    pub fn method_name(&self) -> Option<&str> {
        match self {
            Kind::MethodDecl { name } | Kind::VoidMethodDecl { name } => Some(name),
            Kind::MainMethodDecl => Some("main"),
            _ => None,
        }
    }

    /// Returns `true` if children of this kind form an ordered statement list,
    /// into which several statements may be spliced.
    #[inline]
    #[must_use]
    pub const fn is_statement_list(&self) -> bool {
        matches!(self, Kind::CodeBlock) || self.is_method()
    }

    /// Returns the named attribute in its textual form.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        match (name, self) {
            ("value", Kind::Integer(_) | Kind::Boolean(_)) => self.literal().map(|l| l.to_string()),
            ("value", Kind::Identifier(ident)) => Some(ident.clone()),
            ("op", Kind::ArithmeticExpr(op)) => Some(op.to_string()),
            ("op", Kind::ComparisonExpr(op)) => Some(op.to_string()),
            ("op", Kind::LogicalExpr(op)) => Some(op.to_string()),
            ("varname", Kind::Assignment { varname } | Kind::ArrayAssignment { varname }) => {
                Some(varname.clone())
            }
            (
                "methodname",
                Kind::MethodDecl { name } | Kind::VoidMethodDecl { name } | Kind::MethodCall { method: name },
            ) => Some(name.clone()),
            ("methodname", Kind::MainMethodDecl) => Some("main".to_string()),
            (
                "name",
                Kind::ClassDecl { name, .. }
                | Kind::VarDecl { name, .. }
                | Kind::Param { name, .. }
                | Kind::NewObject { class: name }
                | Kind::ImportDecl { path: name },
            ) => Some(name.clone()),
            ("type", Kind::VarDecl { ty, .. } | Kind::Param { ty, .. }) => Some(ty.clone()),
            ("extends", Kind::ClassDecl { extends, .. }) => extends.clone(),
            _ => None,
        }
    }

    /// Sets the named attribute from its textual form.
    ///
    /// # Errors
    ///
    /// Returns an error if this kind has no such attribute or `value` does not
    /// parse for it.
    pub fn set_attr(&mut self, name: &str, value: &str) -> Result<()> {
        let kind_name = self.name();

        match (name, &mut *self) {
            ("value", Kind::Integer(v)) => {
                *v = value
                    .parse()
                    .map_err(|_| OptError::malformed(format!("'{value}' is not an integer")))?;
            }
            ("value", Kind::Boolean(b)) => {
                *b = value
                    .parse()
                    .map_err(|_| OptError::malformed(format!("'{value}' is not a boolean")))?;
            }
            ("value", Kind::Identifier(ident)) => *ident = value.to_string(),
            ("op", Kind::ArithmeticExpr(op)) => *op = value.parse()?,
            ("op", Kind::ComparisonExpr(op)) => *op = value.parse()?,
            ("op", Kind::LogicalExpr(op)) => *op = value.parse()?,
            ("varname", Kind::Assignment { varname } | Kind::ArrayAssignment { varname })
            | (
                "methodname",
                Kind::MethodDecl { name: varname }
                | Kind::VoidMethodDecl { name: varname }
                | Kind::MethodCall { method: varname },
            )
            | (
                "name",
                Kind::ClassDecl { name: varname, .. }
                | Kind::VarDecl { name: varname, .. }
                | Kind::Param { name: varname, .. }
                | Kind::NewObject { class: varname }
                | Kind::ImportDecl { path: varname },
            )
            | ("type", Kind::VarDecl { ty: varname, .. } | Kind::Param { ty: varname, .. }) => {
                *varname = value.to_string();
            }
            ("extends", Kind::ClassDecl { extends, .. }) => *extends = Some(value.to_string()),
            _ => {
                return Err(OptError::malformed(format!(
                    "{kind_name} has no attribute '{name}'"
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::ImportDecl { path: label }
            | Kind::ClassDecl { name: label, .. }
            | Kind::MethodDecl { name: label }
            | Kind::VoidMethodDecl { name: label }
            | Kind::Assignment { varname: label }
            | Kind::ArrayAssignment { varname: label }
            | Kind::MethodCall { method: label }
            | Kind::NewObject { class: label }
            | Kind::Identifier(label) => write!(f, "{}({label})", self.name()),
            Kind::VarDecl { name, ty } | Kind::Param { name, ty } => {
                write!(f, "{}({ty} {name})", self.name())
            }
            Kind::ArithmeticExpr(op) => write!(f, "{}({op})", self.name()),
            Kind::ComparisonExpr(op) => write!(f, "{}({op})", self.name()),
            Kind::LogicalExpr(op) => write!(f, "{}({op})", self.name()),
            Kind::Integer(v) => write!(f, "{}({v})", self.name()),
            Kind::Boolean(b) => write!(f, "{}({b})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Single arena slot.
#[derive(Debug, Clone)]
struct Node {
    kind: Kind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Attributed abstract syntax tree (_AST_).
///
/// Nodes removed from the tree stay in the arena, detached, so their IDs never
/// dangle; only nodes reachable from [`Ast::root`] are part of the program.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    /// Returns a new tree consisting of a single root node.
    #[must_use]
    pub fn new(root: Kind) -> Self {
        Self {
            nodes: vec![Node {
                kind: root,
                parent: None,
                children: vec![],
            }],
            root: NodeId(0),
        }
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Allocates a new node owning `children`, which are detached from any
    /// previous parent first. The new node itself is detached.
    pub fn node(&mut self, kind: Kind, children: impl IntoIterator<Item = NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: vec![],
        });

        for child in children {
            // A fresh node cannot be a descendant of anything, so attaching
            // cannot form a cycle.
            self.detach(child);
            self.nodes[child.0].parent = Some(id);
            self.nodes[id.0].children.push(child);
        }

        id
    }

    /// Allocates a new, childless, detached node.
    #[inline]
    pub fn leaf(&mut self, kind: Kind) -> NodeId {
        self.node(kind, [])
    }

    /// Appends `child` to the children of `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `child` is `parent` or one of its ancestors.
    pub fn push(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let len = self.children(parent).len();
        let len = if self.parent(child) == Some(parent) {
            len - 1
        } else {
            len
        };
        self.insert(parent, len, child)
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[inline]
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &Kind {
        &self.nodes[id.0].kind
    }

    #[inline]
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Returns the child of `id` at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` has no child at `index`.
    pub fn child(&self, id: NodeId, index: usize) -> Result<NodeId> {
        self.children(id).get(index).copied().ok_or_else(|| {
            OptError::malformed(format!(
                "{} {id} has no child at index {index}",
                self.kind(id).name()
            ))
        })
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Returns the position of `id` among its parent's children.
    #[must_use]
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Returns the literal held by `id`, if it is an `Integer` or `Boolean`.
    #[inline]
    #[must_use]
    pub fn literal(&self, id: NodeId) -> Option<Literal> {
        self.kind(id).literal()
    }

    /// Returns `true` if `id` is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Returns the textual value of the named attribute of `id`.
    #[inline]
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.kind(id).attr(name)
    }

    /// Sets the named attribute of `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the node's kind has no such attribute or the value
    /// does not parse.
    #[inline]
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.nodes[id.0].kind.set_attr(name, value)
    }

    /// Puts `new` in the place of `old`, detaching `old`.
    ///
    /// `new` may currently live inside `old` (e.g. replacing a parenthesized
    /// expression by its operand).
    ///
    /// # Errors
    ///
    /// Returns an error if `new` is an ancestor of `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if old == new {
            return Ok(());
        }

        if self.is_ancestor(new, old) {
            return Err(OptError::malformed(format!(
                "cannot replace {old} with its ancestor {new}"
            )));
        }

        self.detach(new);

        let Some(parent) = self.parent(old) else {
            if old == self.root {
                self.root = new;
            }
            return Ok(());
        };

        let index = self.index_of(old).ok_or_else(|| Self::inconsistent(old))?;

        self.nodes[parent.0].children[index] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;

        Ok(())
    }

    /// Removes `id` from its parent's children.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is the root.
    pub fn delete(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(OptError::malformed("cannot delete the root node"));
        }

        self.detach(id);
        Ok(())
    }

    /// Inserts `child` among the children of `parent` at `index`, detaching it
    /// from its current parent first.
    ///
    /// # Errors
    ///
    /// Returns an error if `child` is `parent` or one of its ancestors, or if
    /// `index` is past the end of the child list.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        if self.is_ancestor(child, parent) {
            return Err(OptError::malformed(format!(
                "cannot insert {child} below its own descendant {parent}"
            )));
        }

        self.detach(child);

        let children = &mut self.nodes[parent.0].children;
        if index > children.len() {
            return Err(OptError::malformed(format!(
                "insertion index {index} out of bounds for {parent} with {} children",
                children.len()
            )));
        }

        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);

        Ok(())
    }

    /// Replaces `target` with `replacements`, in order, at `target`'s position.
    /// An empty list deletes `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is detached or the root, or if any
    /// replacement is `target` or one of its ancestors.
    pub fn splice(&mut self, target: NodeId, replacements: &[NodeId]) -> Result<()> {
        let parent = self
            .parent(target)
            .ok_or_else(|| OptError::malformed(format!("cannot splice detached node {target}")))?;

        for &node in replacements {
            if self.is_ancestor(node, target) {
                return Err(OptError::malformed(format!(
                    "cannot splice {node} in place of its descendant {target}"
                )));
            }
        }

        for &node in replacements {
            self.detach(node);
        }

        let index = self
            .index_of(target)
            .ok_or_else(|| Self::inconsistent(target))?;

        self.nodes[parent.0]
            .children
            .splice(index..=index, replacements.iter().copied());

        for &node in replacements {
            self.nodes[node.0].parent = Some(parent);
        }
        self.nodes[target.0].parent = None;

        Ok(())
    }

    /// Returns a pre-order iterator over `id` and all nodes below it.
    #[must_use]
    pub fn preorder(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            ast: self,
            stack: vec![id],
        }
    }

    /// Renders the expression rooted at `id` in source form.
    #[must_use]
    pub fn expr_text(&self, id: NodeId) -> String {
        let child = |i: usize| {
            self.children(id)
                .get(i)
                .map_or_else(|| "?".to_string(), |&c| self.expr_text(c))
        };

        match self.kind(id) {
            Kind::Integer(v) => v.to_string(),
            Kind::Boolean(b) => b.to_string(),
            Kind::Identifier(ident) => ident.clone(),
            Kind::This => "this".to_string(),
            Kind::ParenthesesExpr => format!("({})", child(0)),
            Kind::NegationExpr => format!("!{}", child(0)),
            Kind::ArithmeticExpr(op) => format!("{} {op} {}", child(0), child(1)),
            Kind::ComparisonExpr(op) => format!("{} {op} {}", child(0), child(1)),
            Kind::LogicalExpr(op) => format!("{} {op} {}", child(0), child(1)),
            Kind::ArrayAccess => format!("{}[{}]", child(0), child(1)),
            Kind::Length => format!("{}.length", child(0)),
            Kind::NewIntArray => format!("new int[{}]", child(0)),
            Kind::NewObject { class } => format!("new {class}()"),
            Kind::MethodCall { method } => {
                let args = (1..self.children(id).len())
                    .map(child)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}.{method}({args})", child(0))
            }
            kind => kind.name().to_string(),
        }
    }

    /// Returns `true` if `ancestor` is `id` or lies on the path from `id` to
    /// its root.
    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(node) = cur {
            if node == ancestor {
                return true;
            }
            cur = self.parent(node);
        }
        false
    }

    /// Unlinks `id` from its parent, if any.
    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    fn inconsistent(id: NodeId) -> OptError {
        OptError::malformed(format!("node {id} is missing from its parent's children"))
    }

    fn fmt_with_indent(&self, f: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);

        writeln!(f, "{pad}{}", self.kind(id))?;

        for &child in self.children(id) {
            self.fmt_with_indent(f, child, indent + 1)?;
        }

        Ok(())
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_indent(f, self.root, 0)
    }
}

/// Pre-order, depth-first iterator over a subtree.
#[derive(Debug)]
pub struct Preorder<'a> {
    ast: &'a Ast,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.ast.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(ast: &mut Ast, name: &str) -> NodeId {
        ast.leaf(Kind::Identifier(name.to_string()))
    }

    fn int(ast: &mut Ast, v: i32) -> NodeId {
        ast.leaf(Kind::Integer(v))
    }

    fn assert_consistent(ast: &Ast) {
        for id in ast.preorder(ast.root()) {
            for (i, &child) in ast.children(id).iter().enumerate() {
                assert_eq!(ast.parent(child), Some(id));
                assert_eq!(ast.index_of(child), Some(i));
            }
        }
    }

    #[test]
    fn ast_replace_with_own_child() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let one = int(&mut ast, 1);
        let parens = ast.node(Kind::ParenthesesExpr, [one]);
        let stmt = ast.node(Kind::ExprStmt, [parens]);
        ast.push(ast.root(), stmt).unwrap();

        ast.replace(parens, one).unwrap();

        assert_eq!(ast.children(stmt), &[one]);
        assert_eq!(ast.parent(one), Some(stmt));
        assert_eq!(ast.parent(parens), None);
        assert!(!ast.is_attached(parens));
        assert_consistent(&ast);
    }

    #[test]
    fn ast_replace_rejects_ancestor() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let x = ident(&mut ast, "x");
        let stmt = ast.node(Kind::ExprStmt, [x]);
        ast.push(ast.root(), stmt).unwrap();

        assert!(matches!(ast.replace(x, stmt), Err(OptError::Malformed(_))));
    }

    #[test]
    fn ast_splice_preserves_order() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let before = ident(&mut ast, "before");
        let after = ident(&mut ast, "after");
        let a = ident(&mut ast, "a");
        let b = ident(&mut ast, "b");
        let block = ast.node(Kind::CodeBlock, [a, b]);

        let root = ast.root();
        ast.push(root, before).unwrap();
        ast.push(root, block).unwrap();
        ast.push(root, after).unwrap();

        let inner = ast.children(block).to_vec();
        ast.splice(block, &inner).unwrap();

        assert_eq!(ast.children(root), &[before, a, b, after]);
        assert_eq!(ast.parent(block), None);
        assert_consistent(&ast);
    }

    #[test]
    fn ast_splice_empty_deletes() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let x = ident(&mut ast, "x");
        ast.push(ast.root(), x).unwrap();

        ast.splice(x, &[]).unwrap();

        assert!(ast.children(ast.root()).is_empty());
    }

    #[test]
    fn ast_insert_and_delete() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let root = ast.root();
        let a = ident(&mut ast, "a");
        let c = ident(&mut ast, "c");
        ast.push(root, a).unwrap();
        ast.push(root, c).unwrap();

        let b = ident(&mut ast, "b");
        ast.insert(root, 1, b).unwrap();
        assert_eq!(ast.children(root), &[a, b, c]);
        assert_eq!(ast.index_of(b), Some(1));

        ast.delete(a).unwrap();
        assert_eq!(ast.children(root), &[b, c]);
        assert_eq!(ast.index_of(c), Some(1));

        let d = ident(&mut ast, "d");
        assert!(ast.insert(root, 5, d).is_err());
        assert!(ast.delete(root).is_err());
        assert_consistent(&ast);
    }

    #[test]
    fn ast_insert_rejects_cycle() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let x = ident(&mut ast, "x");
        let stmt = ast.node(Kind::ExprStmt, [x]);

        assert!(ast.insert(x, 0, stmt).is_err());
        assert!(ast.push(stmt, stmt).is_err());
    }

    #[test]
    fn ast_child_reports_missing_index() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let cond = ast.leaf(Kind::Condition);

        let err = ast.child(cond, 0).unwrap_err();
        assert!(err.to_string().contains("Condition"));
    }

    #[test]
    fn ast_attributes() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let five = int(&mut ast, 5);
        let x = ident(&mut ast, "x");
        let add = ast.node(Kind::ArithmeticExpr(ArithOp::Add), [five, x]);
        let assign = ast.node(
            Kind::Assignment {
                varname: "y".into(),
            },
            [add],
        );

        assert_eq!(ast.attr(five, "value").as_deref(), Some("5"));
        assert_eq!(ast.attr(x, "value").as_deref(), Some("x"));
        assert_eq!(ast.attr(add, "op").as_deref(), Some("+"));
        assert_eq!(ast.attr(assign, "varname").as_deref(), Some("y"));
        assert_eq!(ast.attr(assign, "op"), None);

        ast.set_attr(add, "op", "*").unwrap();
        assert_eq!(ast.kind(add), &Kind::ArithmeticExpr(ArithOp::Mul));

        ast.set_attr(five, "value", "-7").unwrap();
        assert_eq!(ast.literal(five), Some(Literal::Int(-7)));

        assert!(ast.set_attr(five, "value", "true").is_err());
        assert!(ast.set_attr(add, "op", "%").is_err());
        assert!(ast.set_attr(assign, "value", "1").is_err());
    }

    #[test]
    fn ast_expr_text() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let a = ident(&mut ast, "a");
        let two = int(&mut ast, 2);
        let mul = ast.node(Kind::ArithmeticExpr(ArithOp::Mul), [a, two]);
        let parens = ast.node(Kind::ParenthesesExpr, [mul]);
        let ten = int(&mut ast, 10);
        let lt = ast.node(Kind::ComparisonExpr(CmpOp::Less), [parens, ten]);

        assert_eq!(ast.expr_text(lt), "(a * 2) < 10");
    }

    #[test]
    fn ast_display_indents_children() {
        let mut ast = Ast::new(Kind::CodeBlock);
        let one = int(&mut ast, 1);
        let assign = ast.node(
            Kind::Assignment {
                varname: "x".into(),
            },
            [one],
        );
        ast.push(ast.root(), assign).unwrap();

        assert_eq!(ast.to_string(), "CodeBlock\n  Assignment(x)\n    Integer(1)\n");
    }

    #[test]
    fn literal_parse() {
        assert_eq!("true".parse::<Literal>().unwrap(), Literal::Bool(true));
        assert_eq!("-12".parse::<Literal>().unwrap(), Literal::Int(-12));
        assert!("2147483648".parse::<Literal>().is_err());
        assert_eq!(Literal::Bool(false).to_string(), "false");
    }
}
