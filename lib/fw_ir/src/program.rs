//! Whole program representation: classes, methods, fields and variables,
//! stored in arenas indexed by their ids.

use crate::ids::{ClassId, FieldId, MethodId, StmtRef, VarId};
use crate::stmts::{Stmt, Subsignature};
use crate::types::Type;
use bitflags::bitflags;
use std::collections::BTreeMap;
use std::fmt;

bitflags! {
    pub struct ClassFlags: u32 {
        const INTERFACE = 0x1;
        const ABSTRACT  = 0x2;
    }
}

bitflags! {
    pub struct MethodFlags: u32 {
        const STATIC   = 0x1;
        const ABSTRACT = 0x2;
    }
}

#[derive(Debug)]
pub struct Class {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    pub(crate) flags: ClassFlags,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) interfaces: Vec<ClassId>,
    pub(crate) methods: BTreeMap<Subsignature, MethodId>,
    pub(crate) fields: BTreeMap<String, FieldId>,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Class {
    pub(crate) fn new(id: ClassId, name: &str, flags: ClassFlags) -> Self {
        Self {
            id,
            name: name.to_string(),
            flags,
            superclass: None,
            interfaces: Vec::new(),
            methods: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ClassId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags
            .intersects(ClassFlags::ABSTRACT | ClassFlags::INTERFACE)
    }

    /// Superclass of the class, `None` for interfaces and for the root class.
    #[inline]
    #[must_use]
    pub fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    /// Directly implemented interfaces, or directly extended ones when
    /// `self` is an interface.
    #[inline]
    #[must_use]
    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    #[must_use]
    pub fn declared_method(&self, subsignature: &Subsignature) -> Option<MethodId> {
        self.methods.get(subsignature).copied()
    }

    pub fn iter_methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.methods.values().copied()
    }

    #[must_use]
    pub fn declared_field(&self, name: &str) -> Option<FieldId> {
        self.fields.get(name).copied()
    }

    pub fn iter_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields.values().copied()
    }
}

#[derive(Debug)]
pub struct Method {
    pub(crate) id: MethodId,
    pub(crate) class: ClassId,
    pub(crate) subsignature: Subsignature,
    pub(crate) flags: MethodFlags,
    pub(crate) this: Option<VarId>,
    pub(crate) params: Vec<VarId>,
    pub(crate) vars: Vec<VarId>,
    pub(crate) stmts: Vec<Stmt>,
    pub(crate) ret_vars: Vec<VarId>,
}

impl Method {
    #[inline]
    #[must_use]
    pub fn id(&self) -> MethodId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.subsignature.name
    }

    #[inline]
    #[must_use]
    pub fn subsignature(&self) -> &Subsignature {
        &self.subsignature
    }

    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    /// Abstract methods are the only ones without a body.
    #[inline]
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.is_abstract()
    }

    /// The receiver variable, `None` for static methods.
    #[inline]
    #[must_use]
    pub fn this(&self) -> Option<VarId> {
        self.this
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &[VarId] {
        &self.params
    }

    /// All variables of the method, including `this` and parameters.
    #[inline]
    #[must_use]
    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }

    #[inline]
    #[must_use]
    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    #[inline]
    #[must_use]
    pub fn stmt(&self, index: usize) -> &Stmt {
        &self.stmts[index]
    }

    /// Variables returned by the `return` statements of the method.
    #[inline]
    #[must_use]
    pub fn ret_vars(&self) -> &[VarId] {
        &self.ret_vars
    }

    pub fn iter_stmt_refs(&self) -> impl Iterator<Item = StmtRef> + '_ {
        (0..self.stmts.len()).map(|index| StmtRef::new(self.id, index))
    }
}

#[derive(Debug)]
pub struct Field {
    pub(crate) id: FieldId,
    pub(crate) class: ClassId,
    pub(crate) name: String,
    pub(crate) ty: Type,
    pub(crate) is_static: bool,
}

impl Field {
    #[inline]
    #[must_use]
    pub fn id(&self) -> FieldId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

/// A method local variable, with the index of the statements that access
/// memory through it.
#[derive(Debug)]
pub struct Var {
    pub(crate) id: VarId,
    pub(crate) method: MethodId,
    pub(crate) name: String,
    pub(crate) ty: Type,
    pub(crate) store_fields: Vec<StmtRef>,
    pub(crate) load_fields: Vec<StmtRef>,
    pub(crate) store_arrays: Vec<StmtRef>,
    pub(crate) load_arrays: Vec<StmtRef>,
    pub(crate) invokes: Vec<StmtRef>,
}

impl Var {
    pub(crate) fn new(id: VarId, method: MethodId, name: &str, ty: Type) -> Self {
        Self {
            id,
            method,
            name: name.to_string(),
            ty,
            store_fields: Vec::new(),
            load_fields: Vec::new(),
            store_arrays: Vec::new(),
            load_arrays: Vec::new(),
            invokes: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> VarId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> MethodId {
        self.method
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Instance field stores `v.f = x` where `v` is this variable.
    #[inline]
    #[must_use]
    pub fn store_fields(&self) -> &[StmtRef] {
        &self.store_fields
    }

    /// Instance field loads `x = v.f` where `v` is this variable.
    #[inline]
    #[must_use]
    pub fn load_fields(&self) -> &[StmtRef] {
        &self.load_fields
    }

    /// Array stores `v[i] = x` where `v` is this variable.
    #[inline]
    #[must_use]
    pub fn store_arrays(&self) -> &[StmtRef] {
        &self.store_arrays
    }

    /// Array loads `x = v[i]` where `v` is this variable.
    #[inline]
    #[must_use]
    pub fn load_arrays(&self) -> &[StmtRef] {
        &self.load_arrays
    }

    /// Instance call sites whose receiver is this variable.
    #[inline]
    #[must_use]
    pub fn invokes(&self) -> &[StmtRef] {
        &self.invokes
    }
}

#[derive(Debug, Default)]
pub struct Program {
    pub(crate) classes: Vec<Class>,
    pub(crate) methods: Vec<Method>,
    pub(crate) fields: Vec<Field>,
    pub(crate) vars: Vec<Var>,
    pub(crate) class_ids: BTreeMap<String, ClassId>,
    pub(crate) entries: Vec<MethodId>,
}

impl Program {
    #[inline]
    #[must_use]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    #[inline]
    #[must_use]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    #[inline]
    #[must_use]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    #[inline]
    #[must_use]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.0]
    }

    #[inline]
    #[must_use]
    pub fn stmt(&self, stmt: StmtRef) -> &Stmt {
        self.method(stmt.method).stmt(stmt.index)
    }

    pub fn iter_classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    pub fn iter_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    pub fn iter_vars(&self) -> impl Iterator<Item = &Var> {
        self.vars.iter()
    }

    #[must_use]
    pub fn nb_classes(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn nb_methods(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn nb_fields(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn nb_vars(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_ids.get(name).copied()
    }

    /// Finds the first method named `name` declared in class `class`.
    #[must_use]
    pub fn find_method(&self, class: &str, name: &str) -> Option<MethodId> {
        let class = self.class(self.class_by_name(class)?);
        class
            .iter_methods()
            .find(|id| self.method(*id).name() == name)
    }

    /// Finds a variable of method `method` by its name.
    #[must_use]
    pub fn var_by_name(&self, method: MethodId, name: &str) -> Option<VarId> {
        self.method(method)
            .vars()
            .iter()
            .copied()
            .find(|id| self.var(*id).name() == name)
    }

    /// Finds a field declared in class `class` by its name.
    #[must_use]
    pub fn find_field(&self, class: &str, name: &str) -> Option<FieldId> {
        self.class(self.class_by_name(class)?).declared_field(name)
    }

    /// The methods from which whole program analyses start.
    #[inline]
    #[must_use]
    pub fn entry_methods(&self) -> &[MethodId] {
        &self.entries
    }

    /// Full method signature, in the `<Class: ret name(params)>` form.
    #[must_use]
    pub fn method_signature(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!(
            "<{}: {}>",
            self.class(method.class()).name(),
            method.subsignature()
        )
    }
}
