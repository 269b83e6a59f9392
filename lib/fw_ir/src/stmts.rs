//! Statements of the three-address IR.

use crate::ids::{ClassId, FieldId, VarId};
use crate::program::Program;
use crate::types::Type;
use crate::PrettyPrint;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BinaryOp {
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    // bitwise
    And,
    Or,
    Xor,
    // shift
    Shl,
    Shr,
    Ushr,
    // condition
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Ushr => ">>>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    #[must_use]
    pub fn is_condition(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    /// Operators that may raise an arithmetic exception at runtime.
    #[must_use]
    pub fn can_throw(self) -> bool {
        matches!(self, Self::Div | Self::Rem)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryExp {
    pub op: BinaryOp,
    pub left: VarId,
    pub right: VarId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Literal {
    Int(i32),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Special => write!(f, "special"),
            Self::Virtual => write!(f, "virtual"),
            Self::Interface => write!(f, "interface"),
        }
    }
}

/// Method signature inside of its declaring class: name, parameter types
/// and return type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Subsignature {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
}

impl fmt::Display for Subsignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}(", self.ret, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ")")
    }
}

/// Symbolic reference to a method, as written at a call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodRef {
    pub class: ClassId,
    pub subsignature: Subsignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoke {
    pub result: Option<VarId>,
    pub kind: CallKind,
    pub method_ref: MethodRef,
    pub receiver: Option<VarId>,
    pub args: Vec<VarId>,
}

impl Invoke {
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == CallKind::Static
    }
}

/// IR statements. Jump targets are indexes in the enclosing method body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stmt {
    Nop,
    New {
        lvalue: VarId,
        ty: Type,
    },
    AssignLiteral {
        lvalue: VarId,
        literal: Literal,
    },
    Copy {
        lvalue: VarId,
        rvalue: VarId,
    },
    Cast {
        lvalue: VarId,
        ty: Type,
        rvalue: VarId,
    },
    Binary {
        lvalue: VarId,
        exp: BinaryExp,
    },
    /// Field load, `base` is `None` for static fields.
    LoadField {
        lvalue: VarId,
        base: Option<VarId>,
        field: FieldId,
    },
    /// Field store, `base` is `None` for static fields.
    StoreField {
        base: Option<VarId>,
        field: FieldId,
        rvalue: VarId,
    },
    LoadArray {
        lvalue: VarId,
        base: VarId,
        index: VarId,
    },
    StoreArray {
        base: VarId,
        index: VarId,
        rvalue: VarId,
    },
    Invoke(Invoke),
    If {
        cond: BinaryExp,
        target: usize,
    },
    Goto {
        target: usize,
    },
    Switch {
        var: VarId,
        cases: Vec<(i32, usize)>,
        default: usize,
    },
    Return {
        value: Option<VarId>,
    },
}

/// Per statement kind handlers, see [`Stmt::accept`].
///
/// Every handler defaults to a no-op so that implementors only write the
/// ones they care about.
pub trait StmtVisitor {
    fn visit_nop(&mut self) {}
    fn visit_new(&mut self, _lvalue: VarId, _ty: &Type) {}
    fn visit_assign_literal(&mut self, _lvalue: VarId, _literal: &Literal) {}
    fn visit_copy(&mut self, _lvalue: VarId, _rvalue: VarId) {}
    fn visit_cast(&mut self, _lvalue: VarId, _ty: &Type, _rvalue: VarId) {}
    fn visit_binary(&mut self, _lvalue: VarId, _exp: &BinaryExp) {}
    fn visit_load_field(&mut self, _lvalue: VarId, _base: Option<VarId>, _field: FieldId) {}
    fn visit_store_field(&mut self, _base: Option<VarId>, _field: FieldId, _rvalue: VarId) {}
    fn visit_load_array(&mut self, _lvalue: VarId, _base: VarId, _index: VarId) {}
    fn visit_store_array(&mut self, _base: VarId, _index: VarId, _rvalue: VarId) {}
    fn visit_invoke(&mut self, _invoke: &Invoke) {}
    fn visit_if(&mut self, _cond: &BinaryExp, _target: usize) {}
    fn visit_goto(&mut self, _target: usize) {}
    fn visit_switch(&mut self, _var: VarId, _cases: &[(i32, usize)], _default: usize) {}
    fn visit_return(&mut self, _value: Option<VarId>) {}
}

impl Stmt {
    /// Dispatches the statement to the visitor handler of its kind.
    pub fn accept<V: StmtVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Self::Nop => visitor.visit_nop(),
            Self::New { lvalue, ty } => visitor.visit_new(*lvalue, ty),
            Self::AssignLiteral { lvalue, literal } => visitor.visit_assign_literal(*lvalue, literal),
            Self::Copy { lvalue, rvalue } => visitor.visit_copy(*lvalue, *rvalue),
            Self::Cast { lvalue, ty, rvalue } => visitor.visit_cast(*lvalue, ty, *rvalue),
            Self::Binary { lvalue, exp } => visitor.visit_binary(*lvalue, exp),
            Self::LoadField {
                lvalue,
                base,
                field,
            } => visitor.visit_load_field(*lvalue, *base, *field),
            Self::StoreField {
                base,
                field,
                rvalue,
            } => visitor.visit_store_field(*base, *field, *rvalue),
            Self::LoadArray {
                lvalue,
                base,
                index,
            } => visitor.visit_load_array(*lvalue, *base, *index),
            Self::StoreArray {
                base,
                index,
                rvalue,
            } => visitor.visit_store_array(*base, *index, *rvalue),
            Self::Invoke(invoke) => visitor.visit_invoke(invoke),
            Self::If { cond, target } => visitor.visit_if(cond, *target),
            Self::Goto { target } => visitor.visit_goto(*target),
            Self::Switch {
                var,
                cases,
                default,
            } => visitor.visit_switch(*var, cases, *default),
            Self::Return { value } => visitor.visit_return(*value),
        }
    }

    /// The variable defined by this statement, if any.
    #[must_use]
    pub fn def(&self) -> Option<VarId> {
        match self {
            Self::New { lvalue, .. }
            | Self::AssignLiteral { lvalue, .. }
            | Self::Copy { lvalue, .. }
            | Self::Cast { lvalue, .. }
            | Self::Binary { lvalue, .. }
            | Self::LoadField { lvalue, .. }
            | Self::LoadArray { lvalue, .. } => Some(*lvalue),
            Self::Invoke(invoke) => invoke.result,
            _ => None,
        }
    }

    /// The variables read by this statement.
    #[must_use]
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Self::Nop
            | Self::New { .. }
            | Self::AssignLiteral { .. }
            | Self::Goto { .. }
            | Self::Return { value: None } => vec![],
            Self::Copy { rvalue, .. } | Self::Cast { rvalue, .. } => vec![*rvalue],
            Self::Binary { exp, .. } | Self::If { cond: exp, .. } => vec![exp.left, exp.right],
            Self::LoadField { base, .. } => base.iter().copied().collect(),
            Self::StoreField { base, rvalue, .. } => {
                base.iter().copied().chain(std::iter::once(*rvalue)).collect()
            }
            Self::LoadArray { base, index, .. } => vec![*base, *index],
            Self::StoreArray {
                base,
                index,
                rvalue,
            } => vec![*base, *index, *rvalue],
            Self::Invoke(invoke) => invoke
                .receiver
                .iter()
                .chain(invoke.args.iter())
                .copied()
                .collect(),
            Self::Switch { var, .. } => vec![*var],
            Self::Return { value: Some(var) } => vec![*var],
        }
    }

    /// Renames the variables of the statement: `def` maps the defined
    /// variable, `uses` maps every read one.
    pub(crate) fn rename_vars<D, U>(&mut self, mut def: D, mut uses: U)
    where
        D: FnMut(VarId) -> VarId,
        U: FnMut(VarId) -> VarId,
    {
        match self {
            Self::Nop | Self::Goto { .. } | Self::Return { value: None } => (),
            Self::New { lvalue, .. } | Self::AssignLiteral { lvalue, .. } => *lvalue = def(*lvalue),
            Self::Copy { lvalue, rvalue } | Self::Cast { lvalue, rvalue, .. } => {
                *rvalue = uses(*rvalue);
                *lvalue = def(*lvalue);
            }
            Self::Binary { lvalue, exp } => {
                exp.left = uses(exp.left);
                exp.right = uses(exp.right);
                *lvalue = def(*lvalue);
            }
            Self::LoadField { lvalue, base, .. } => {
                if let Some(base) = base {
                    *base = uses(*base);
                }
                *lvalue = def(*lvalue);
            }
            Self::StoreField { base, rvalue, .. } => {
                if let Some(base) = base {
                    *base = uses(*base);
                }
                *rvalue = uses(*rvalue);
            }
            Self::LoadArray {
                lvalue,
                base,
                index,
            } => {
                *base = uses(*base);
                *index = uses(*index);
                *lvalue = def(*lvalue);
            }
            Self::StoreArray {
                base,
                index,
                rvalue,
            } => {
                *base = uses(*base);
                *index = uses(*index);
                *rvalue = uses(*rvalue);
            }
            Self::Invoke(invoke) => {
                if let Some(receiver) = &mut invoke.receiver {
                    *receiver = uses(*receiver);
                }
                for arg in &mut invoke.args {
                    *arg = uses(*arg);
                }
                if let Some(result) = &mut invoke.result {
                    *result = def(*result);
                }
            }
            Self::If { cond, .. } => {
                cond.left = uses(cond.left);
                cond.right = uses(cond.right);
            }
            Self::Switch { var, .. } => *var = uses(*var),
            Self::Return { value: Some(var) } => *var = uses(*var),
        }
    }

    /// Indexes of the statements control may flow to after this one, in a
    /// body of `len` statements. Falling off the body is not a successor.
    #[must_use]
    pub fn successors(&self, index: usize, len: usize) -> Vec<usize> {
        let mut succs = match self {
            Self::If { target, .. } | Self::Goto { target } => vec![*target],
            Self::Switch { cases, default, .. } => cases
                .iter()
                .map(|(_, target)| *target)
                .chain(std::iter::once(*default))
                .collect(),
            _ => vec![],
        };
        if self.can_fall_through() && index + 1 < len {
            succs.push(index + 1);
        }
        succs
    }

    #[must_use]
    pub fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            Self::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }

    /// Returns `false` for statements after which control never falls
    /// through to the next statement.
    #[must_use]
    pub fn can_fall_through(&self) -> bool {
        !matches!(
            self,
            Self::Goto { .. } | Self::Switch { .. } | Self::Return { .. }
        )
    }
}

fn pp_vars(f: &mut fmt::Formatter, vars: &[VarId], program: &Program) -> fmt::Result {
    for (i, var) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", program.var(*var).name())?;
    }
    Ok(())
}

impl PrettyPrint for BinaryExp {
    fn pp(&self, f: &mut fmt::Formatter, program: &Program) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            program.var(self.left).name(),
            self.op,
            program.var(self.right).name()
        )
    }
}

impl PrettyPrint for Invoke {
    fn pp(&self, f: &mut fmt::Formatter, program: &Program) -> fmt::Result {
        if let Some(result) = self.result {
            write!(f, "{} = ", program.var(result).name())?;
        }
        write!(f, "invoke{} ", self.kind)?;
        if let Some(receiver) = self.receiver {
            write!(f, "{}.", program.var(receiver).name())?;
        }
        write!(
            f,
            "<{}: {}>(",
            program.class(self.method_ref.class).name(),
            self.method_ref.subsignature
        )?;
        pp_vars(f, &self.args, program)?;
        write!(f, ")")
    }
}

impl PrettyPrint for Stmt {
    fn pp(&self, f: &mut fmt::Formatter, program: &Program) -> fmt::Result {
        let name = |var: &VarId| program.var(*var).name();
        let field_access = |base: &Option<VarId>, field: &FieldId| {
            let field = program.field(*field);
            match base {
                Some(base) => format!("{}.{}", name(base), field.name()),
                None => format!("{}::{}", program.class(field.class()).name(), field.name()),
            }
        };
        match self {
            Self::Nop => write!(f, "nop"),
            Self::New { lvalue, ty } => write!(f, "{} = new {ty}", name(lvalue)),
            Self::AssignLiteral { lvalue, literal } => match literal {
                Literal::Int(i) => write!(f, "{} = {i}", name(lvalue)),
                Literal::Null => write!(f, "{} = null", name(lvalue)),
            },
            Self::Copy { lvalue, rvalue } => write!(f, "{} = {}", name(lvalue), name(rvalue)),
            Self::Cast { lvalue, ty, rvalue } => {
                write!(f, "{} = ({ty}) {}", name(lvalue), name(rvalue))
            }
            Self::Binary { lvalue, exp } => {
                write!(f, "{} = ", name(lvalue))?;
                exp.pp(f, program)
            }
            Self::LoadField {
                lvalue,
                base,
                field,
            } => write!(f, "{} = {}", name(lvalue), field_access(base, field)),
            Self::StoreField {
                base,
                field,
                rvalue,
            } => write!(f, "{} = {}", field_access(base, field), name(rvalue)),
            Self::LoadArray {
                lvalue,
                base,
                index,
            } => write!(f, "{} = {}[{}]", name(lvalue), name(base), name(index)),
            Self::StoreArray {
                base,
                index,
                rvalue,
            } => write!(f, "{}[{}] = {}", name(base), name(index), name(rvalue)),
            Self::Invoke(invoke) => invoke.pp(f, program),
            Self::If { cond, target } => {
                write!(f, "if ")?;
                cond.pp(f, program)?;
                write!(f, " goto @{target}")
            }
            Self::Goto { target } => write!(f, "goto @{target}"),
            Self::Switch {
                var,
                cases,
                default,
            } => {
                write!(f, "switch {} {{ ", name(var))?;
                for (value, target) in cases {
                    write!(f, "{value} -> @{target}, ")?;
                }
                write!(f, "default -> @{default} }}")
            }
            Self::Return { value: None } => write!(f, "return"),
            Self::Return { value: Some(var) } => write!(f, "return {}", name(var)),
        }
    }
}
