//! Textual IR parsers.
//!
//! The parsers only build a syntax tree: names (classes, fields, variables,
//! labels) are resolved afterwards, when lowering the tree into a
//! [`Program`](crate::program::Program).

use crate::errors::{IrError, IrResult};
use crate::stmts::{BinaryOp, CallKind, Literal};
use crate::types::Type;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_while};
use nom::character::complete::{char, digit1, multispace1, satisfy};
use nom::combinator::{eof, map, map_opt, not, opt, recognize, value, verify};
use nom::multi::{many0, separated_list0, separated_list1};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::{Finish, IResult};

type PResult<'a, T> = IResult<&'a str, T, IrError>;

#[derive(Debug, Clone)]
pub(crate) struct AstProgram {
    pub(crate) classes: Vec<AstClass>,
    pub(crate) entries: Vec<AstMethodRef>,
}

#[derive(Debug, Clone)]
pub(crate) struct AstClass {
    pub(crate) name: String,
    pub(crate) is_interface: bool,
    pub(crate) is_abstract: bool,
    pub(crate) extends: Vec<String>,
    pub(crate) implements: Vec<String>,
    pub(crate) fields: Vec<AstField>,
    pub(crate) methods: Vec<AstMethod>,
}

#[derive(Debug, Clone)]
pub(crate) struct AstField {
    pub(crate) name: String,
    pub(crate) ty: Type,
    pub(crate) is_static: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AstMethod {
    pub(crate) name: String,
    pub(crate) params: Vec<(Type, String)>,
    pub(crate) ret: Type,
    pub(crate) is_static: bool,
    pub(crate) is_abstract: bool,
    pub(crate) body: Option<AstBody>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AstBody {
    pub(crate) vars: Vec<(Type, String)>,
    pub(crate) stmts: Vec<AstStmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AstMethodRef {
    pub(crate) class: String,
    pub(crate) name: String,
    pub(crate) params: Vec<Type>,
    pub(crate) ret: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AstInvoke {
    pub(crate) kind: CallKind,
    pub(crate) receiver: Option<String>,
    pub(crate) method: AstMethodRef,
    pub(crate) args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AstFieldAccess {
    Instance { base: String, field: String },
    Static { class: String, field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AstRhs {
    New(Type),
    Literal(Literal),
    Var(String),
    Cast(Type, String),
    Binary(BinaryOp, String, String),
    Field(AstFieldAccess),
    Array(String, String),
    Invoke(AstInvoke),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AstStmtKind {
    Nop,
    Assign(String, AstRhs),
    StoreField(AstFieldAccess, String),
    StoreArray(String, String, String),
    Invoke(AstInvoke),
    If(BinaryOp, String, String, String),
    Goto(String),
    Switch(String, Vec<(i32, String)>, String),
    Return(Option<String>),
}

#[derive(Debug, Clone)]
pub(crate) struct AstStmt {
    pub(crate) label: Option<String>,
    pub(crate) kind: AstStmtKind,
}

/// Parses a whole program text into its syntax tree.
pub(crate) fn parse_program(input: &str) -> IrResult<AstProgram> {
    log::trace!("parsing program...");
    let (_, program) = program(input).finish()?;
    log::debug!(
        "parsed {} classes, {} entries",
        program.classes.len(),
        program.entries.len()
    );
    Ok(program)
}

// blanks and line comments
fn sp(input: &str) -> PResult<()> {
    value(
        (),
        many0(alt((
            multispace1,
            recognize(pair(tag("//"), opt(is_not("\n")))),
        ))),
    )(input)
}

fn token<'a>(t: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    preceded(sp, tag(t))
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn keyword<'a>(k: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    preceded(sp, terminated(tag(k), not(satisfy(is_ident_char))))
}

fn ident(input: &str) -> PResult<&str> {
    preceded(
        sp,
        recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))),
    )(input)
}

fn class_name(input: &str) -> PResult<&str> {
    preceded(
        sp,
        recognize(pair(
            satisfy(is_ident_start),
            take_while(|c| is_ident_char(c) || c == '/'),
        )),
    )(input)
}

fn primitive_type(input: &str) -> PResult<Type> {
    alt((
        value(Type::Void, keyword("void")),
        value(Type::Boolean, keyword("boolean")),
        value(Type::Byte, keyword("byte")),
        value(Type::Short, keyword("short")),
        value(Type::Char, keyword("char")),
        value(Type::Int, keyword("int")),
        value(Type::Long, keyword("long")),
        value(Type::Float, keyword("float")),
        value(Type::Double, keyword("double")),
    ))(input)
}

fn typ(input: &str) -> PResult<Type> {
    let (input, base) = alt((
        primitive_type,
        map(class_name, |name| Type::Class(name.to_string())),
    ))(input)?;
    let (input, dims) = many0(pair(token("["), token("]")))(input)?;
    let typ = dims
        .into_iter()
        .fold(base, |typ, _| Type::Array(Box::new(typ)));
    Ok((input, typ))
}

fn int_literal(input: &str) -> PResult<i32> {
    preceded(
        sp,
        map_opt(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            s.parse::<i32>().ok()
        }),
    )(input)
}

fn binary_op(input: &str) -> PResult<BinaryOp> {
    // longest operators first
    alt((
        value(BinaryOp::Ushr, token(">>>")),
        value(BinaryOp::Shl, token("<<")),
        value(BinaryOp::Shr, token(">>")),
        value(BinaryOp::Le, token("<=")),
        value(BinaryOp::Ge, token(">=")),
        value(BinaryOp::Eq, token("==")),
        value(BinaryOp::Ne, token("!=")),
        value(BinaryOp::Lt, token("<")),
        value(BinaryOp::Gt, token(">")),
        value(BinaryOp::Add, token("+")),
        value(BinaryOp::Sub, token("-")),
        value(BinaryOp::Mul, token("*")),
        value(BinaryOp::Div, token("/")),
        value(BinaryOp::Rem, token("%")),
        value(BinaryOp::And, token("&")),
        value(BinaryOp::Or, token("|")),
        value(BinaryOp::Xor, token("^")),
    ))(input)
}

fn method_ref(input: &str) -> PResult<AstMethodRef> {
    map(
        tuple((
            token("<"),
            class_name,
            token(":"),
            typ,
            ident,
            delimited(
                token("("),
                separated_list0(token(","), typ),
                token(")"),
            ),
            token(">"),
        )),
        |(_, class, _, ret, name, params, _)| AstMethodRef {
            class: class.to_string(),
            name: name.to_string(),
            params,
            ret,
        },
    )(input)
}

fn args(input: &str) -> PResult<Vec<String>> {
    map(
        delimited(
            token("("),
            separated_list0(token(","), ident),
            token(")"),
        ),
        |args| args.into_iter().map(str::to_string).collect(),
    )(input)
}

fn instance_call_kind(input: &str) -> PResult<CallKind> {
    alt((
        value(CallKind::Virtual, keyword("invokevirtual")),
        value(CallKind::Special, keyword("invokespecial")),
        value(CallKind::Interface, keyword("invokeinterface")),
    ))(input)
}

fn invoke(input: &str) -> PResult<AstInvoke> {
    alt((
        map(
            preceded(keyword("invokestatic"), pair(method_ref, args)),
            |(method, args)| AstInvoke {
                kind: CallKind::Static,
                receiver: None,
                method,
                args,
            },
        ),
        map(
            tuple((instance_call_kind, ident, token("."), method_ref, args)),
            |(kind, receiver, _, method, args)| AstInvoke {
                kind,
                receiver: Some(receiver.to_string()),
                method,
                args,
            },
        ),
    ))(input)
}

fn field_access(input: &str) -> PResult<AstFieldAccess> {
    alt((
        map(
            separated_pair(class_name, token("::"), ident),
            |(class, field)| AstFieldAccess::Static {
                class: class.to_string(),
                field: field.to_string(),
            },
        ),
        map(separated_pair(ident, token("."), ident), |(base, field)| {
            AstFieldAccess::Instance {
                base: base.to_string(),
                field: field.to_string(),
            }
        }),
    ))(input)
}

fn array_access(input: &str) -> PResult<(String, String)> {
    map(
        tuple((ident, token("["), ident, token("]"))),
        |(base, _, index, _)| (base.to_string(), index.to_string()),
    )(input)
}

fn rhs(input: &str) -> PResult<AstRhs> {
    alt((
        map(preceded(keyword("new"), typ), AstRhs::New),
        map(invoke, AstRhs::Invoke),
        map(
            pair(delimited(token("("), typ, token(")")), ident),
            |(ty, var)| AstRhs::Cast(ty, var.to_string()),
        ),
        map(int_literal, |i| AstRhs::Literal(Literal::Int(i))),
        map(keyword("null"), |_| AstRhs::Literal(Literal::Null)),
        map(field_access, AstRhs::Field),
        map(array_access, |(base, index)| AstRhs::Array(base, index)),
        map(tuple((ident, binary_op, ident)), |(left, op, right)| {
            AstRhs::Binary(op, left.to_string(), right.to_string())
        }),
        map(ident, |var| AstRhs::Var(var.to_string())),
    ))(input)
}

enum SwitchEntry {
    Case(i32, String),
    Default(String),
}

fn switch_entry(input: &str) -> PResult<SwitchEntry> {
    alt((
        map(
            separated_pair(keyword("default"), token("->"), ident),
            |(_, label)| SwitchEntry::Default(label.to_string()),
        ),
        map(
            separated_pair(int_literal, token("->"), ident),
            |(value, label)| SwitchEntry::Case(value, label.to_string()),
        ),
    ))(input)
}

fn switch(input: &str) -> PResult<AstStmtKind> {
    let (rest, (_, var, entries)) = tuple((
        keyword("switch"),
        ident,
        delimited(
            token("{"),
            separated_list1(token(","), switch_entry),
            token("}"),
        ),
    ))(input)?;

    let mut cases = Vec::new();
    let mut defaults = Vec::new();
    for entry in entries {
        match entry {
            SwitchEntry::Case(value, label) => cases.push((value, label)),
            SwitchEntry::Default(label) => defaults.push(label),
        }
    }
    match defaults.pop() {
        Some(default) if defaults.is_empty() => {
            Ok((rest, AstStmtKind::Switch(var.to_string(), cases, default)))
        }
        _ => Err(nom::Err::Failure(IrError::Invalid(format!(
            "switch on {var} must have exactly one default"
        )))),
    }
}

fn stmt_kind(input: &str) -> PResult<AstStmtKind> {
    alt((
        map(keyword("nop"), |_| AstStmtKind::Nop),
        map(preceded(keyword("return"), opt(ident)), |var| {
            AstStmtKind::Return(var.map(str::to_string))
        }),
        map(preceded(keyword("goto"), ident), |label| {
            AstStmtKind::Goto(label.to_string())
        }),
        map(
            tuple((
                keyword("if"),
                ident,
                verify(binary_op, |op: &BinaryOp| op.is_condition()),
                ident,
                keyword("goto"),
                ident,
            )),
            |(_, left, op, right, _, label)| {
                AstStmtKind::If(op, left.to_string(), right.to_string(), label.to_string())
            },
        ),
        switch,
        map(invoke, AstStmtKind::Invoke),
        map(
            separated_pair(field_access, token("="), ident),
            |(access, var)| AstStmtKind::StoreField(access, var.to_string()),
        ),
        map(
            separated_pair(array_access, token("="), ident),
            |((base, index), var)| AstStmtKind::StoreArray(base, index, var.to_string()),
        ),
        map(separated_pair(ident, token("="), rhs), |(var, rhs)| {
            AstStmtKind::Assign(var.to_string(), rhs)
        }),
    ))(input)
}

fn label(input: &str) -> PResult<&str> {
    terminated(ident, pair(token(":"), not(char(':'))))(input)
}

fn stmt(input: &str) -> PResult<AstStmt> {
    map(
        terminated(pair(opt(label), stmt_kind), token(";")),
        |(label, kind)| AstStmt {
            label: label.map(str::to_string),
            kind,
        },
    )(input)
}

fn var_decl(input: &str) -> PResult<Vec<(Type, String)>> {
    map(
        delimited(
            keyword("var"),
            pair(typ, separated_list1(token(","), ident)),
            token(";"),
        ),
        |(ty, names)| {
            names
                .into_iter()
                .map(|name| (ty.clone(), name.to_string()))
                .collect()
        },
    )(input)
}

enum BodyItem {
    Vars(Vec<(Type, String)>),
    Stmt(AstStmt),
}

fn body(input: &str) -> PResult<AstBody> {
    let (input, items) = delimited(
        token("{"),
        many0(alt((map(var_decl, BodyItem::Vars), map(stmt, BodyItem::Stmt)))),
        token("}"),
    )(input)?;
    let mut body = AstBody::default();
    for item in items {
        match item {
            BodyItem::Vars(vars) => body.vars.extend(vars),
            BodyItem::Stmt(stmt) => body.stmts.push(stmt),
        }
    }
    Ok((input, body))
}

fn field_decl(input: &str) -> PResult<AstField> {
    map(
        tuple((
            opt(keyword("static")),
            keyword("field"),
            typ,
            ident,
            token(";"),
        )),
        |(is_static, _, ty, name, _)| AstField {
            name: name.to_string(),
            ty,
            is_static: is_static.is_some(),
        },
    )(input)
}

fn method_decl(input: &str) -> PResult<AstMethod> {
    let (input, modifiers) = many0(alt((keyword("static"), keyword("abstract"))))(input)?;
    let (input, _) = keyword("method")(input)?;
    let (input, name) = ident(input)?;
    let (input, params) = delimited(
        token("("),
        separated_list0(token(","), pair(typ, ident)),
        token(")"),
    )(input)?;
    let (input, ret) = preceded(token(":"), typ)(input)?;
    let (input, body) = alt((map(token(";"), |_| None), map(body, Some)))(input)?;
    let method = AstMethod {
        name: name.to_string(),
        params: params
            .into_iter()
            .map(|(ty, name)| (ty, name.to_string()))
            .collect(),
        ret,
        is_static: modifiers.contains(&"static"),
        is_abstract: modifiers.contains(&"abstract"),
        body,
    };
    Ok((input, method))
}

enum Member {
    Field(AstField),
    Method(AstMethod),
}

fn class_decl(input: &str) -> PResult<AstClass> {
    let (input, is_abstract) = map(opt(keyword("abstract")), |kw| kw.is_some())(input)?;
    let (input, is_interface) = alt((
        value(false, keyword("class")),
        value(true, keyword("interface")),
    ))(input)?;
    let (input, name) = class_name(input)?;
    let (input, extends) = opt(preceded(
        keyword("extends"),
        separated_list1(token(","), class_name),
    ))(input)?;
    let (input, implements) = opt(preceded(
        keyword("implements"),
        separated_list1(token(","), class_name),
    ))(input)?;
    let (input, members) = delimited(
        token("{"),
        many0(alt((
            map(field_decl, Member::Field),
            map(method_decl, Member::Method),
        ))),
        token("}"),
    )(input)?;

    let to_strings = |names: Option<Vec<&str>>| -> Vec<String> {
        names
            .unwrap_or_default()
            .into_iter()
            .map(str::to_string)
            .collect()
    };
    let mut class = AstClass {
        name: name.to_string(),
        is_interface,
        is_abstract,
        extends: to_strings(extends),
        implements: to_strings(implements),
        fields: Vec::new(),
        methods: Vec::new(),
    };
    for member in members {
        match member {
            Member::Field(field) => class.fields.push(field),
            Member::Method(method) => class.methods.push(method),
        }
    }
    Ok((input, class))
}

enum Item {
    Class(AstClass),
    Entry(AstMethodRef),
}

fn program(input: &str) -> PResult<AstProgram> {
    let (input, items) = many0(alt((
        map(class_decl, Item::Class),
        map(
            delimited(keyword("entry"), method_ref, token(";")),
            Item::Entry,
        ),
    )))(input)?;
    let (input, _) = preceded(sp, eof)(input)?;

    let mut program = AstProgram {
        classes: Vec::new(),
        entries: Vec::new(),
    };
    for item in items {
        match item {
            Item::Class(class) => program.classes.push(class),
            Item::Entry(entry) => program.entries.push(entry),
        }
    }
    Ok((input, program))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(input: &str) -> AstStmtKind {
        stmt(input).unwrap().1.kind
    }

    #[test]
    fn types_parser() {
        assert_eq!(typ("int").unwrap().1, Type::Int);
        assert_eq!(
            typ("java/lang/String").unwrap().1,
            Type::Class("java/lang/String".to_string())
        );
        assert_eq!(
            typ("integer").unwrap().1,
            Type::Class("integer".to_string())
        );
        assert_eq!(
            typ("byte[][]").unwrap().1,
            Type::Array(Box::new(Type::Array(Box::new(Type::Byte))))
        );
    }

    #[test]
    fn assignments_parser() {
        assert_eq!(
            kind("x = new A;"),
            AstStmtKind::Assign("x".to_string(), AstRhs::New(Type::Class("A".to_string())))
        );
        assert_eq!(
            kind("x = -3;"),
            AstStmtKind::Assign("x".to_string(), AstRhs::Literal(Literal::Int(-3)))
        );
        assert_eq!(
            kind("x = a >>> b;"),
            AstStmtKind::Assign(
                "x".to_string(),
                AstRhs::Binary(BinaryOp::Ushr, "a".to_string(), "b".to_string())
            )
        );
        assert_eq!(
            kind("x = a - b;"),
            AstStmtKind::Assign(
                "x".to_string(),
                AstRhs::Binary(BinaryOp::Sub, "a".to_string(), "b".to_string())
            )
        );
        assert_eq!(
            kind("newer = y;"),
            AstStmtKind::Assign("newer".to_string(), AstRhs::Var("y".to_string()))
        );
        assert_eq!(
            kind("x = (B) y;"),
            AstStmtKind::Assign(
                "x".to_string(),
                AstRhs::Cast(Type::Class("B".to_string()), "y".to_string())
            )
        );
        assert_eq!(
            kind("x = a[i];"),
            AstStmtKind::Assign(
                "x".to_string(),
                AstRhs::Array("a".to_string(), "i".to_string())
            )
        );
    }

    #[test]
    fn field_accesses_parser() {
        assert_eq!(
            kind("y.f = x;"),
            AstStmtKind::StoreField(
                AstFieldAccess::Instance {
                    base: "y".to_string(),
                    field: "f".to_string()
                },
                "x".to_string()
            )
        );
        assert_eq!(
            kind("a/B::count = x;"),
            AstStmtKind::StoreField(
                AstFieldAccess::Static {
                    class: "a/B".to_string(),
                    field: "count".to_string()
                },
                "x".to_string()
            )
        );
        assert_eq!(
            kind("x = y.f;"),
            AstStmtKind::Assign(
                "x".to_string(),
                AstRhs::Field(AstFieldAccess::Instance {
                    base: "y".to_string(),
                    field: "f".to_string()
                })
            )
        );
    }

    #[test]
    fn labels_parser() {
        let (_, labeled) = stmt("L1: goto L2;").unwrap();
        assert_eq!(labeled.label.as_deref(), Some("L1"));
        assert_eq!(labeled.kind, AstStmtKind::Goto("L2".to_string()));

        let (_, unlabeled) = stmt("B::f = x;").unwrap();
        assert!(unlabeled.label.is_none());
    }

    #[test]
    fn control_parser() {
        assert_eq!(
            kind("if c > four goto L1;"),
            AstStmtKind::If(
                BinaryOp::Gt,
                "c".to_string(),
                "four".to_string(),
                "L1".to_string()
            )
        );
        assert!(stmt("if c + four goto L1;").is_err());
        assert_eq!(
            kind("switch x { 1 -> A, -2 -> B, default -> C };"),
            AstStmtKind::Switch(
                "x".to_string(),
                vec![(1, "A".to_string()), (-2, "B".to_string())],
                "C".to_string()
            )
        );
        assert!(stmt("switch x { 1 -> A };").is_err());
        assert_eq!(kind("return;"), AstStmtKind::Return(None));
        assert_eq!(
            kind("return r;"),
            AstStmtKind::Return(Some("r".to_string()))
        );
    }

    #[test]
    fn invoke_parser() {
        let expected = AstInvoke {
            kind: CallKind::Virtual,
            receiver: Some("b".to_string()),
            method: AstMethodRef {
                class: "Box".to_string(),
                name: "set".to_string(),
                params: vec![Type::Class(crate::types::JAVA_LANG_OBJECT.to_string())],
                ret: Type::Void,
            },
            args: vec!["o".to_string()],
        };
        assert_eq!(
            kind("invokevirtual b.<Box: void set(java/lang/Object)>(o);"),
            AstStmtKind::Invoke(expected.clone())
        );
        assert_eq!(
            kind("r = invokestatic <Main: int id(int)>(a);"),
            AstStmtKind::Assign(
                "r".to_string(),
                AstRhs::Invoke(AstInvoke {
                    kind: CallKind::Static,
                    receiver: None,
                    method: AstMethodRef {
                        class: "Main".to_string(),
                        name: "id".to_string(),
                        params: vec![Type::Int],
                        ret: Type::Int,
                    },
                    args: vec!["a".to_string()],
                })
            )
        );
    }

    #[test]
    fn program_parser() {
        let program = parse_program(
            r"
            // a small program
            interface I { abstract method m() : void; }
            abstract class A implements I {
                field int x;
                static field A inst;
            }
            class Main {
                static method main() : void {
                    var int a, b;
                    a = 1; // first
                    b = a;
                    return;
                }
            }
            entry <Main: void main()>;
            ",
        )
        .unwrap();
        assert_eq!(program.classes.len(), 3);
        assert!(program.classes[0].is_interface);
        assert!(program.classes[0].methods[0].body.is_none());
        assert!(program.classes[1].is_abstract);
        assert_eq!(program.classes[1].implements, vec!["I".to_string()]);
        assert_eq!(program.classes[1].fields.len(), 2);
        assert!(program.classes[1].fields[1].is_static);
        let main = &program.classes[2].methods[0];
        assert!(main.is_static);
        let body = main.body.as_ref().unwrap();
        assert_eq!(body.vars.len(), 2);
        assert_eq!(body.stmts.len(), 3);
        assert_eq!(program.entries.len(), 1);
    }

    #[test]
    fn program_parser_error() {
        assert!(matches!(
            parse_program("class A { method m() : void { x = ; } }"),
            Err(IrError::Parsing(_, _))
        ));
    }
}
