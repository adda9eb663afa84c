//! Intermediate Representation
//!
//! Per-method, three-address intermediate representation (_IR_) produced from
//! the optimized _AST_. Register allocation reads the instructions and
//! rewrites the virtual registers recorded in each method's variable table.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::Result;
use crate::compiler::opt::cfg::Cfg;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    Greater,
    And,
    Or,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// _IR_ operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Constant value (32-bit, booleans as `0`/`1`).
    Const(i32),
    /// Named variable: local, parameter, `this` or field.
    Var(String),
    /// `array[index]`.
    ArrayElement { array: String, index: Box<Operand> },
}

impl Operand {
    /// Shorthand for [`Operand::Var`].
    #[inline]
    #[must_use]
    pub fn var(name: &str) -> Self {
        Operand::Var(name.to_string())
    }

    #[inline]
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Operand::Const(_))
    }

    /// Returns the variable name if the operand is a plain variable.
    #[inline]
    #[must_use]
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Operand::Var(name) => Some(name),
            _ => None,
        }
    }

    /// Returns every variable read when evaluating this operand (for an array
    /// element, the array and the variables of its index).
    #[must_use]
    pub fn read_vars(&self) -> Vec<&str> {
        match self {
            Operand::Const(_) => vec![],
            Operand::Var(name) => vec![name.as_str()],
            Operand::ArrayElement { array, index } => {
                let mut vars = vec![array.as_str()];
                vars.extend(index.read_vars());
                vars
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(v) => write!(f, "{v}"),
            Operand::Var(name) => write!(f, "{name}"),
            Operand::ArrayElement { array, index } => write!(f, "{array}[{index}]"),
        }
    }
}

/// How an instruction passes control to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow<'a> {
    /// Leaves the method.
    Return,
    /// Always continues at the labeled instruction.
    Jump(&'a str),
    /// Continues at the labeled instruction or falls through.
    CondJump(&'a str),
    /// Falls through to the next instruction.
    Next,
}

/// _IR_ instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Evaluates `rhs` and stores the result in `dst`.
    Assign {
        dst: Operand,
        rhs: Box<Instruction>,
    },
    /// Method invocation. For virtual calls the receiver is the first operand.
    Call {
        method: String,
        operands: Vec<Operand>,
    },
    Return(Option<Operand>),
    Unary {
        op: UnaryOp,
        operand: Operand,
    },
    Binary {
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Pass-through of a single operand.
    Single(Operand),
    PutField {
        object: Operand,
        field: String,
        value: Operand,
    },
    GetField {
        object: Operand,
        field: String,
    },
    Goto(String),
    /// Jumps to `target` if `cond` evaluates to true.
    Branch {
        cond: Box<Instruction>,
        target: String,
    },
}

impl Instruction {
    /// Shorthand for an assignment to a plain variable.
    #[must_use]
    pub fn assign(dst: &str, rhs: Instruction) -> Self {
        Instruction::Assign {
            dst: Operand::var(dst),
            rhs: Box::new(rhs),
        }
    }

    /// Returns the control-flow classification of this instruction.
    #[inline]
    #[must_use]
    pub fn flow(&self) -> Flow<'_> {
        match self {
            Instruction::Return(_) => Flow::Return,
            Instruction::Goto(target) => Flow::Jump(target),
            Instruction::Branch { target, .. } => Flow::CondJump(target),
            _ => Flow::Next,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Assign { dst, rhs } => write!(f, "{dst} := {rhs}"),
            Instruction::Call { method, operands } => {
                let args = operands
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{:<9}{method}({args})", "call")
            }
            Instruction::Return(Some(val)) => write!(f, "{:<9}{val}", "ret"),
            Instruction::Return(None) => write!(f, "ret"),
            Instruction::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "!{operand}"),
            },
            Instruction::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Instruction::Single(val) => write!(f, "{val}"),
            Instruction::PutField {
                object,
                field,
                value,
            } => write!(f, "{:<9}{object}.{field}, {value}", "putfield"),
            Instruction::GetField { object, field } => {
                write!(f, "{:<9}{object}.{field}", "getfield")
            }
            Instruction::Goto(target) => write!(f, "{:<9}{target}", "goto"),
            Instruction::Branch { cond, target } => {
                write!(f, "{:<9}({cond}) {target}", "if")
            }
        }
    }
}

/// Where a variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Local,
    Parameter,
    /// Implicit receiver of an instance method.
    This,
    Field,
}

/// Variable table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub scope: VarScope,
    virtual_reg: usize,
}

impl Descriptor {
    #[inline]
    #[must_use]
    pub const fn virtual_reg(&self) -> usize {
        self.virtual_reg
    }

    #[inline]
    pub const fn set_virtual_reg(&mut self, reg: usize) {
        self.virtual_reg = reg;
    }
}

/// _IR_ method definition.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub is_static: bool,
    pub params: Vec<String>,
    pub instructions: Vec<Instruction>,
    /// Maps each label to the index of the instruction it precedes.
    labels: HashMap<String, usize>,
    var_table: BTreeMap<String, Descriptor>,
}

impl Method {
    /// Returns a new, empty method. Instance methods reserve register `0` for
    /// `this`.
    #[must_use]
    pub fn new(name: &str, is_static: bool) -> Self {
        let mut method = Self {
            name: name.to_string(),
            is_static,
            params: vec![],
            instructions: vec![],
            labels: HashMap::default(),
            var_table: BTreeMap::default(),
        };

        if !is_static {
            method.declare("this", VarScope::This, 0);
        }

        method
    }

    /// Declares a formal parameter in the next reserved slot. Locals already
    /// declared move up one register to make room.
    pub fn add_param(&mut self, name: &str) -> &mut Self {
        if self.var_table.contains_key(name) {
            return self;
        }

        let slot = self.reserved_slots();
        for descriptor in self.var_table.values_mut() {
            if descriptor.scope == VarScope::Local {
                descriptor.virtual_reg += 1;
            }
        }

        self.params.push(name.to_string());
        self.declare(name, VarScope::Parameter, slot)
    }

    /// Declares a local variable, initially in its own register past the
    /// reserved slots.
    pub fn add_local(&mut self, name: &str) -> &mut Self {
        let slot = self.reserved_slots() + self.locals().count();
        self.declare(name, VarScope::Local, slot)
    }

    /// Declares a field accessed by this method. Fields hold no register.
    pub fn add_field(&mut self, name: &str) -> &mut Self {
        self.declare(name, VarScope::Field, 0)
    }

    /// Inserts `name` unless already declared; a redeclaration keeps the
    /// first descriptor.
    fn declare(&mut self, name: &str, scope: VarScope, virtual_reg: usize) -> &mut Self {
        self.var_table
            .entry(name.to_string())
            .or_insert(Descriptor {
                scope,
                virtual_reg,
            });
        self
    }

    /// Appends an instruction, returning its index.
    pub fn push(&mut self, inst: Instruction) -> usize {
        self.instructions.push(inst);
        self.instructions.len() - 1
    }

    /// Attaches `label` to the next instruction pushed.
    pub fn label(&mut self, label: &str) -> &mut Self {
        self.labels
            .insert(label.to_string(), self.instructions.len());
        self
    }

    /// Returns the index of the instruction labeled `label`.
    #[inline]
    #[must_use]
    pub fn label_target(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    #[inline]
    #[must_use]
    pub const fn var_table(&self) -> &BTreeMap<String, Descriptor> {
        &self.var_table
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&Descriptor> {
        self.var_table.get(name)
    }

    #[inline]
    pub fn descriptor_mut(&mut self, name: &str) -> Option<&mut Descriptor> {
        self.var_table.get_mut(name)
    }

    /// Number of leading registers held by `this` and the parameters.
    #[inline]
    #[must_use]
    pub fn reserved_slots(&self) -> usize {
        usize::from(!self.is_static) + self.params.len()
    }

    /// Returns `true` if `name` occupies a register slot (anything but a
    /// field), and so takes part in liveness.
    #[inline]
    #[must_use]
    pub fn is_tracked(&self, name: &str) -> bool {
        self.descriptor(name)
            .is_some_and(|d| d.scope != VarScope::Field)
    }

    /// Returns the local variables, in variable-table order.
    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.var_table
            .iter()
            .filter(|(_, d)| d.scope == VarScope::Local)
            .map(|(name, _)| name.as_str())
    }

    /// Builds the control-flow graph over the current instructions.
    ///
    /// # Errors
    ///
    /// Returns an error if a jump targets an undefined label.
    #[inline]
    pub fn build_cfg(&self) -> Result<Cfg> {
        Cfg::build(self)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.params.join(", ");
        let modifier = if self.is_static { "static " } else { "" };

        writeln!(f, "{modifier}Method {:?}({params})", self.name)?;

        let mut labels: Vec<_> = self.labels.iter().collect();
        labels.sort_by(|(a_name, a_idx), (b_name, b_idx)| {
            a_idx.cmp(b_idx).then_with(|| a_name.cmp(b_name))
        });

        for (i, inst) in self.instructions.iter().enumerate() {
            for (label, _) in labels.iter().filter(|(_, idx)| **idx == i) {
                writeln!(f, "{:4}{label}:", "")?;
            }
            writeln!(f, "{:8}{inst}", "")?;
        }

        Ok(())
    }
}
