//! Lowering of parsed syntax trees into a name-resolved [`Program`].

use crate::errors::{IrError, IrResult};
use crate::ids::{ClassId, FieldId, MethodId, StmtRef, VarId};
use crate::parsers::{
    AstBody, AstClass, AstFieldAccess, AstInvoke, AstMethod, AstMethodRef, AstProgram, AstRhs,
    AstStmtKind,
};
use crate::program::{Class, ClassFlags, Field, Method, MethodFlags, Program, Var};
use crate::split::split_locals;
use crate::stmts::{BinaryExp, Invoke, MethodRef, Stmt, Subsignature};
use crate::types::{Type, JAVA_LANG_OBJECT};
use std::collections::BTreeMap;

pub(crate) fn build(ast: &AstProgram) -> IrResult<Program> {
    let mut program = Program::default();

    // the root class always exists, even when not declared
    let root = add_class(&mut program, JAVA_LANG_OBJECT, ClassFlags::empty());
    let mut root_declared = false;
    for class in &ast.classes {
        if class.name == JAVA_LANG_OBJECT && !root_declared {
            root_declared = true;
            continue;
        }
        if program.class_by_name(&class.name).is_some() {
            return Err(IrError::Duplicate(format!("class {}", class.name)));
        }
        let mut flags = ClassFlags::empty();
        flags.set(ClassFlags::INTERFACE, class.is_interface);
        flags.set(ClassFlags::ABSTRACT, class.is_abstract);
        add_class(&mut program, &class.name, flags);
    }

    for class in &ast.classes {
        link_class(&mut program, class, root)?;
    }
    check_superclass_chains(&program)?;

    for class in &ast.classes {
        let id = class_id(&program, &class.name)?;
        for field in &class.fields {
            check_type(&program, &field.ty)?;
            if program.class(id).declared_field(&field.name).is_some() {
                return Err(IrError::Duplicate(format!(
                    "field {}::{}",
                    class.name, field.name
                )));
            }
            let field_id = FieldId(program.fields.len());
            program.fields.push(Field {
                id: field_id,
                class: id,
                name: field.name.clone(),
                ty: field.ty.clone(),
                is_static: field.is_static,
            });
            program.classes[id.0]
                .fields
                .insert(field.name.clone(), field_id);
        }
    }

    for class in &ast.classes {
        let id = class_id(&program, &class.name)?;
        for method in &class.methods {
            add_method(&mut program, id, method)?;
        }
    }

    program.entries = if ast.entries.is_empty() {
        program
            .methods
            .iter()
            .filter(|method| method.is_static() && method.name() == "main")
            .map(Method::id)
            .collect()
    } else {
        ast.entries
            .iter()
            .map(|entry| {
                let method_ref = method_ref(&program, entry)?;
                program
                    .class(method_ref.class)
                    .declared_method(&method_ref.subsignature)
                    .ok_or_else(|| {
                        IrError::MethodNotFound(format!(
                            "<{}: {}>",
                            entry.class, method_ref.subsignature
                        ))
                    })
            })
            .collect::<IrResult<_>>()?
    };
    if program.entries.is_empty() {
        log::warn!("program has no entry method");
    }

    log::debug!(
        "program built with {} classes, {} methods, {} fields, {} variables",
        program.nb_classes(),
        program.nb_methods(),
        program.nb_fields(),
        program.nb_vars()
    );
    Ok(program)
}

fn add_class(program: &mut Program, name: &str, flags: ClassFlags) -> ClassId {
    let id = ClassId(program.classes.len());
    program.classes.push(Class::new(id, name, flags));
    program.class_ids.insert(name.to_string(), id);
    id
}

fn class_id(program: &Program, name: &str) -> IrResult<ClassId> {
    program
        .class_by_name(name)
        .ok_or_else(|| IrError::ClassNotFound(name.to_string()))
}

fn interface_id(program: &Program, name: &str) -> IrResult<ClassId> {
    let id = class_id(program, name)?;
    if program.class(id).is_interface() {
        Ok(id)
    } else {
        Err(IrError::Invalid(format!("{name} is not an interface")))
    }
}

fn link_class(program: &mut Program, class: &AstClass, root: ClassId) -> IrResult<()> {
    let id = class_id(program, &class.name)?;
    let (superclass, interfaces) = if class.is_interface {
        if !class.implements.is_empty() {
            return Err(IrError::Invalid(format!(
                "interface {} cannot implement interfaces",
                class.name
            )));
        }
        let interfaces = class
            .extends
            .iter()
            .map(|name| interface_id(program, name))
            .collect::<IrResult<Vec<_>>>()?;
        (None, interfaces)
    } else {
        let superclass = match class.extends.as_slice() {
            [] if id == root => None,
            [] => Some(root),
            [name] => {
                let superclass = class_id(program, name)?;
                if program.class(superclass).is_interface() {
                    return Err(IrError::Invalid(format!(
                        "class {} cannot extend interface {name}",
                        class.name
                    )));
                }
                Some(superclass)
            }
            _ => {
                return Err(IrError::Invalid(format!(
                    "class {} extends several classes",
                    class.name
                )))
            }
        };
        let interfaces = class
            .implements
            .iter()
            .map(|name| interface_id(program, name))
            .collect::<IrResult<Vec<_>>>()?;
        (superclass, interfaces)
    };
    program.classes[id.0].superclass = superclass;
    program.classes[id.0].interfaces = interfaces;
    Ok(())
}

fn check_superclass_chains(program: &Program) -> IrResult<()> {
    for class in program.iter_classes() {
        let mut current = class.superclass();
        let mut steps = 0;
        while let Some(id) = current {
            steps += 1;
            if steps > program.nb_classes() {
                return Err(IrError::Invalid(format!(
                    "cyclic inheritance involving {}",
                    class.name()
                )));
            }
            current = program.class(id).superclass();
        }
    }
    Ok(())
}

fn check_type(program: &Program, ty: &Type) -> IrResult<()> {
    match ty.base_type() {
        Type::Class(name) => class_id(program, name).map(|_| ()),
        _ => Ok(()),
    }
}

fn method_ref(program: &Program, method: &AstMethodRef) -> IrResult<MethodRef> {
    check_type(program, &method.ret)?;
    for param in &method.params {
        check_type(program, param)?;
    }
    Ok(MethodRef {
        class: class_id(program, &method.class)?,
        subsignature: Subsignature {
            name: method.name.clone(),
            params: method.params.clone(),
            ret: method.ret.clone(),
        },
    })
}

fn add_method(program: &mut Program, class: ClassId, method: &AstMethod) -> IrResult<()> {
    let subsignature = Subsignature {
        name: method.name.clone(),
        params: method.params.iter().map(|(ty, _)| ty.clone()).collect(),
        ret: method.ret.clone(),
    };
    let class_name = program.class(class).name().to_string();
    if program.class(class).declared_method(&subsignature).is_some() {
        return Err(IrError::Duplicate(format!(
            "method <{class_name}: {subsignature}>"
        )));
    }
    if method.is_abstract == method.body.is_some() || (method.is_abstract && method.is_static) {
        return Err(IrError::Invalid(format!(
            "method <{class_name}: {subsignature}> must either be abstract or have a body"
        )));
    }
    check_type(program, &method.ret)?;

    let mut flags = MethodFlags::empty();
    flags.set(MethodFlags::STATIC, method.is_static);
    flags.set(MethodFlags::ABSTRACT, method.is_abstract);
    let id = MethodId(program.methods.len());
    program.methods.push(Method {
        id,
        class,
        subsignature: subsignature.clone(),
        flags,
        this: None,
        params: Vec::new(),
        vars: Vec::new(),
        stmts: Vec::new(),
        ret_vars: Vec::new(),
    });
    program.classes[class.0].methods.insert(subsignature, id);

    let mut lowering = MethodLowering {
        program,
        method: id,
        var_ids: BTreeMap::new(),
        labels: BTreeMap::new(),
    };
    if !method.is_static {
        let this = lowering.new_var("this", Type::Class(class_name))?;
        lowering.program.methods[id.0].this = Some(this);
    }
    for (ty, name) in &method.params {
        let param = lowering.new_var(name, ty.clone())?;
        lowering.program.methods[id.0].params.push(param);
    }
    if let Some(body) = &method.body {
        lowering.lower_body(body)?;
    }
    Ok(())
}

struct MethodLowering<'p> {
    program: &'p mut Program,
    method: MethodId,
    var_ids: BTreeMap<String, VarId>,
    labels: BTreeMap<String, usize>,
}

impl<'p> MethodLowering<'p> {
    fn new_var(&mut self, name: &str, ty: Type) -> IrResult<VarId> {
        check_type(self.program, &ty)?;
        if self.var_ids.contains_key(name) {
            return Err(IrError::Duplicate(format!(
                "variable {name} in {}",
                self.program.method_signature(self.method)
            )));
        }
        let id = VarId(self.program.vars.len());
        self.program.vars.push(Var::new(id, self.method, name, ty));
        self.program.methods[self.method.0].vars.push(id);
        self.var_ids.insert(name.to_string(), id);
        Ok(id)
    }

    fn var(&self, name: &str) -> IrResult<VarId> {
        self.var_ids.get(name).copied().ok_or_else(|| {
            IrError::VarNotFound(format!(
                "{name} in {}",
                self.program.method_signature(self.method)
            ))
        })
    }

    fn label(&self, name: &str) -> IrResult<usize> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| IrError::LabelNotFound(name.to_string()))
    }

    fn lower_body(&mut self, body: &AstBody) -> IrResult<()> {
        for (ty, name) in &body.vars {
            self.new_var(name, ty.clone())?;
        }
        for (index, stmt) in body.stmts.iter().enumerate() {
            if let Some(label) = &stmt.label {
                if self.labels.insert(label.clone(), index).is_some() {
                    return Err(IrError::Duplicate(format!("label {label}")));
                }
            }
        }
        for stmt in &body.stmts {
            let stmt = self.lower_stmt(&stmt.kind)?;
            self.program.methods[self.method.0].stmts.push(stmt);
        }
        split_locals(self.program, self.method);

        let stmts = std::mem::take(&mut self.program.methods[self.method.0].stmts);
        for (index, stmt) in stmts.iter().enumerate() {
            self.register(StmtRef::new(self.method, index), stmt);
        }
        self.program.methods[self.method.0].stmts = stmts;
        Ok(())
    }

    // indexes memory accessing statements on their base variable
    fn register(&mut self, site: StmtRef, stmt: &Stmt) {
        let vars = &mut self.program.vars;
        match stmt {
            Stmt::StoreField {
                base: Some(base), ..
            } => vars[base.0].store_fields.push(site),
            Stmt::LoadField {
                base: Some(base), ..
            } => vars[base.0].load_fields.push(site),
            Stmt::StoreArray { base, .. } => vars[base.0].store_arrays.push(site),
            Stmt::LoadArray { base, .. } => vars[base.0].load_arrays.push(site),
            Stmt::Invoke(Invoke {
                receiver: Some(receiver),
                ..
            }) => vars[receiver.0].invokes.push(site),
            Stmt::Return { value: Some(var) } => {
                let method = &mut self.program.methods[self.method.0];
                if !method.ret_vars.contains(var) {
                    method.ret_vars.push(*var);
                }
            }
            _ => (),
        }
    }

    fn field(&self, access: &AstFieldAccess) -> IrResult<(Option<VarId>, FieldId)> {
        let (base, class, name, want_static) = match access {
            AstFieldAccess::Instance { base, field } => {
                let base = self.var(base)?;
                let class = match self.program.var(base).ty() {
                    Type::Class(class) => class_id(self.program, class)?,
                    ty => {
                        return Err(IrError::Invalid(format!(
                            "field {field} accessed on non-class type {ty}"
                        )))
                    }
                };
                (Some(base), class, field, false)
            }
            AstFieldAccess::Static { class, field } => {
                (None, class_id(self.program, class)?, field, true)
            }
        };

        // fields are inherited from superclasses
        let mut current = Some(class);
        while let Some(id) = current {
            let class = self.program.class(id);
            if let Some(field) = class.declared_field(name) {
                if self.program.field(field).is_static() != want_static {
                    return Err(IrError::Invalid(format!(
                        "bad static/instance access to field {}::{name}",
                        class.name()
                    )));
                }
                return Ok((base, field));
            }
            current = class.superclass();
        }
        Err(IrError::FieldNotFound(format!(
            "{}::{name}",
            self.program.class(class).name()
        )))
    }

    fn invoke(&self, result: Option<VarId>, invoke: &AstInvoke) -> IrResult<Invoke> {
        let method_ref = method_ref(self.program, &invoke.method)?;
        if method_ref.subsignature.params.len() != invoke.args.len() {
            return Err(IrError::Invalid(format!(
                "bad arguments count when calling {}",
                method_ref.subsignature
            )));
        }
        Ok(Invoke {
            result,
            kind: invoke.kind,
            method_ref,
            receiver: invoke
                .receiver
                .as_ref()
                .map(|name| self.var(name))
                .transpose()?,
            args: invoke
                .args
                .iter()
                .map(|name| self.var(name))
                .collect::<IrResult<_>>()?,
        })
    }

    fn lower_stmt(&self, kind: &AstStmtKind) -> IrResult<Stmt> {
        let stmt = match kind {
            AstStmtKind::Nop => Stmt::Nop,
            AstStmtKind::Assign(lvalue, rhs) => {
                let lvalue = self.var(lvalue)?;
                match rhs {
                    AstRhs::New(ty) => {
                        check_type(self.program, ty)?;
                        Stmt::New {
                            lvalue,
                            ty: ty.clone(),
                        }
                    }
                    AstRhs::Literal(literal) => Stmt::AssignLiteral {
                        lvalue,
                        literal: literal.clone(),
                    },
                    AstRhs::Var(rvalue) => Stmt::Copy {
                        lvalue,
                        rvalue: self.var(rvalue)?,
                    },
                    AstRhs::Cast(ty, rvalue) => {
                        check_type(self.program, ty)?;
                        Stmt::Cast {
                            lvalue,
                            ty: ty.clone(),
                            rvalue: self.var(rvalue)?,
                        }
                    }
                    AstRhs::Binary(op, left, right) => Stmt::Binary {
                        lvalue,
                        exp: BinaryExp {
                            op: *op,
                            left: self.var(left)?,
                            right: self.var(right)?,
                        },
                    },
                    AstRhs::Field(access) => {
                        let (base, field) = self.field(access)?;
                        Stmt::LoadField {
                            lvalue,
                            base,
                            field,
                        }
                    }
                    AstRhs::Array(base, index) => Stmt::LoadArray {
                        lvalue,
                        base: self.var(base)?,
                        index: self.var(index)?,
                    },
                    AstRhs::Invoke(invoke) => Stmt::Invoke(self.invoke(Some(lvalue), invoke)?),
                }
            }
            AstStmtKind::StoreField(access, rvalue) => {
                let (base, field) = self.field(access)?;
                Stmt::StoreField {
                    base,
                    field,
                    rvalue: self.var(rvalue)?,
                }
            }
            AstStmtKind::StoreArray(base, index, rvalue) => Stmt::StoreArray {
                base: self.var(base)?,
                index: self.var(index)?,
                rvalue: self.var(rvalue)?,
            },
            AstStmtKind::Invoke(invoke) => Stmt::Invoke(self.invoke(None, invoke)?),
            AstStmtKind::If(op, left, right, label) => Stmt::If {
                cond: BinaryExp {
                    op: *op,
                    left: self.var(left)?,
                    right: self.var(right)?,
                },
                target: self.label(label)?,
            },
            AstStmtKind::Goto(label) => Stmt::Goto {
                target: self.label(label)?,
            },
            AstStmtKind::Switch(var, cases, default) => Stmt::Switch {
                var: self.var(var)?,
                cases: cases
                    .iter()
                    .map(|(value, label)| Ok((*value, self.label(label)?)))
                    .collect::<IrResult<_>>()?,
                default: self.label(default)?,
            },
            AstStmtKind::Return(value) => Stmt::Return {
                value: value.as_ref().map(|name| self.var(name)).transpose()?,
            },
        };
        Ok(stmt)
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use crate::stmts::{CallKind, Stmt};
    use crate::types::JAVA_LANG_OBJECT;

    const PROGRAM: &str = r"
        interface Shape { abstract method area() : int; }
        class Base { field int side; static field Base last; }
        class Square extends Base implements Shape {
            method area() : int {
                var int s, r;
                s = this.side;
                r = s * s;
                return r;
            }
        }
        class Main {
            static method main() : void {
                var Shape sh; var Square sq; var int a;
                sq = new Square;
                Base::last = sq;
                sh = sq;
                a = invokeinterface sh.<Shape: int area()>();
                if a > a goto End;
                a = invokeinterface sh.<Shape: int area()>();
            End:
                return;
            }
        }
    ";

    #[test]
    fn hierarchy_links() {
        let program = parse(PROGRAM).unwrap();
        let object = program.class_by_name(JAVA_LANG_OBJECT).unwrap();
        let shape = program.class_by_name("Shape").unwrap();
        let base = program.class_by_name("Base").unwrap();
        let square = program.class(program.class_by_name("Square").unwrap());
        assert_eq!(square.superclass(), Some(base));
        assert_eq!(square.interfaces(), &[shape]);
        assert_eq!(program.class(base).superclass(), Some(object));
        assert_eq!(program.class(shape).superclass(), None);
        assert_eq!(program.class(object).superclass(), None);
    }

    #[test]
    fn inherited_field_and_relations() {
        let program = parse(PROGRAM).unwrap();
        let area = program.find_method("Square", "area").unwrap();
        let this = program.method(area).this().unwrap();
        let side = program.find_field("Base", "side").unwrap();
        assert_eq!(program.var(this).load_fields().len(), 1);
        assert!(matches!(
            program.stmt(program.var(this).load_fields()[0]),
            Stmt::LoadField { field, .. } if *field == side
        ));
        let r = program.var_by_name(area, "r").unwrap();
        assert_eq!(program.method(area).ret_vars(), &[r]);

        let main = program.find_method("Main", "main").unwrap();
        assert_eq!(program.entry_methods(), &[main]);
        let sh = program.var_by_name(main, "sh").unwrap();
        assert_eq!(program.var(sh).invokes().len(), 2);
        let call = program.stmt(program.var(sh).invokes()[0]).as_invoke().unwrap();
        assert_eq!(call.kind, CallKind::Interface);
        assert!(matches!(
            program.method(main).stmt(4),
            Stmt::If { target: 6, .. }
        ));
    }

    #[test]
    fn resolution_errors() {
        assert!(parse("class A extends B {}").is_err());
        assert!(parse("class A {} class A {}").is_err());
        assert!(parse("class A extends B {} class B extends A {}").is_err());
        assert!(parse("class A { static method m() : void { var int x; y = x; } }").is_err());
        assert!(parse("class A { static method m() : void { goto L; } }").is_err());
        assert!(parse("class A { method m() : void; }").is_err());
        assert!(
            parse("class A { field int f; static method m() : void { var int x; x = A::f; } }")
                .is_err()
        );
    }

    #[test]
    fn explicit_entry() {
        let program = parse(
            r"
            class A { static method run() : void { return; } }
            entry <A: void run()>;
            ",
        )
        .unwrap();
        let run = program.find_method("A", "run").unwrap();
        assert_eq!(program.entry_methods(), &[run]);
        assert!(parse("class A { } entry <A: void run()>;").is_err());
    }
}
