use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Stable identity of a type constructor, used to key typeclass instance tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub const UNIT: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const FLOAT: TypeId = TypeId(3);
    pub const TEXT: TypeId = TypeId(4);
    pub const LIST: TypeId = TypeId(5);
    pub const TUPLE: TypeId = TypeId(6);
    pub const FUNCTION: TypeId = TypeId(7);

    const FIRST_DECLARED: u32 = 64;

    fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(TypeId::FIRST_DECLARED);
        TypeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A named type constructor. Equality is by [`TypeId`] only.
#[derive(Clone)]
pub struct TypeCon {
    id: TypeId,
    name: Rc<str>,
}

impl TypeCon {
    /// Declares a new constructor with its own, never reused, id.
    pub fn declare(name: &str) -> Self {
        Self {
            id: TypeId::next(),
            name: Rc::from(name),
        }
    }

    fn builtin(id: TypeId, name: &str) -> Self {
        Self {
            id,
            name: Rc::from(name),
        }
    }

    pub fn unit() -> Self {
        Self::builtin(TypeId::UNIT, "Unit")
    }

    pub fn bool() -> Self {
        Self::builtin(TypeId::BOOL, "Bool")
    }

    pub fn int() -> Self {
        Self::builtin(TypeId::INT, "Int")
    }

    pub fn float() -> Self {
        Self::builtin(TypeId::FLOAT, "Float")
    }

    pub fn text() -> Self {
        Self::builtin(TypeId::TEXT, "Text")
    }

    pub fn list() -> Self {
        Self::builtin(TypeId::LIST, "List")
    }

    pub fn tuple() -> Self {
        Self::builtin(TypeId::TUPLE, "Tuple")
    }

    pub fn function() -> Self {
        Self::builtin(TypeId::FUNCTION, "->")
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for TypeCon {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeCon {}

impl Hash for TypeCon {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

impl fmt::Display for TypeCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

struct VarCell {
    id: u32,
    instance: RefCell<Option<Type>>,
    name: OnceCell<String>,
    names: Rc<Cell<u32>>,
}

/// A type variable. Clones share identity; equality and hashing are by identity.
#[derive(Clone)]
pub struct TypeVar(Rc<VarCell>);

impl TypeVar {
    pub fn id(&self) -> u32 {
        self.0.id
    }

    /// The term this variable has been unified with, if any.
    pub fn instance(&self) -> Option<Type> {
        self.0.instance.borrow().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.0.instance.borrow().is_some()
    }

    pub(crate) fn bind(&self, ty: Type) {
        *self.0.instance.borrow_mut() = Some(ty);
    }

    /// Display name, drawn from the owning supply's sequence on first use.
    pub fn name(&self) -> &str {
        self.0.name.get_or_init(|| {
            let index = self.0.names.get();
            self.0.names.set(index + 1);
            letter_name(index)
        })
    }
}

fn letter_name(index: u32) -> String {
    let letter = char::from(b'a' + (index % 26) as u8);
    match index / 26 {
        0 => letter.to_string(),
        round => format!("{letter}{round}"),
    }
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeVar {}

impl Hash for TypeVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance() {
            Some(ty) => write!(f, "t{} := {:?}", self.0.id, ty),
            None => write!(f, "t{}", self.0.id),
        }
    }
}

/// Allocator for type variables. One supply per inference session.
pub struct VarSupply {
    next_id: u32,
    names: Rc<Cell<u32>>,
}

impl Default for VarSupply {
    fn default() -> Self {
        Self::new()
    }
}

impl VarSupply {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            names: Rc::new(Cell::new(0)),
        }
    }

    pub fn fresh(&mut self) -> TypeVar {
        let id = self.next_id;
        self.next_id += 1;
        TypeVar(Rc::new(VarCell {
            id,
            instance: RefCell::new(None),
            name: OnceCell::new(),
            names: self.names.clone(),
        }))
    }

    pub fn fresh_type(&mut self) -> Type {
        Type::Var(self.fresh())
    }

    pub fn allocated(&self) -> u32 {
        self.next_id
    }
}

#[derive(Clone)]
pub struct TypeOp {
    pub con: TypeCon,
    pub args: Vec<Type>,
}

#[derive(Clone)]
pub enum Type {
    Var(TypeVar),
    Op(TypeOp),
}

impl Type {
    pub fn op(con: TypeCon, args: Vec<Type>) -> Self {
        Type::Op(TypeOp { con, args })
    }

    pub fn con(con: TypeCon) -> Self {
        Self::op(con, Vec::new())
    }

    pub fn function(domain: Type, codomain: Type) -> Self {
        Self::op(TypeCon::function(), vec![domain, codomain])
    }

    /// `p1 -> p2 -> ... -> ret`; just `ret` when there are no parameters.
    pub fn function_chain(params: &[Type], ret: Type) -> Self {
        params
            .iter()
            .rev()
            .fold(ret, |acc, param| Self::function(param.clone(), acc))
    }

    pub fn unit() -> Self {
        Self::con(TypeCon::unit())
    }

    pub fn bool() -> Self {
        Self::con(TypeCon::bool())
    }

    pub fn int() -> Self {
        Self::con(TypeCon::int())
    }

    pub fn float() -> Self {
        Self::con(TypeCon::float())
    }

    pub fn text() -> Self {
        Self::con(TypeCon::text())
    }

    pub fn list(elem: Type) -> Self {
        Self::op(TypeCon::list(), vec![elem])
    }

    pub fn tuple(items: Vec<Type>) -> Self {
        Self::op(TypeCon::tuple(), items)
    }

    /// Domain and codomain when this (pruned) term is a function type.
    pub fn as_function(&self) -> Option<(Type, Type)> {
        match prune(self) {
            Type::Op(TypeOp { con, args }) if con.id() == TypeId::FUNCTION && args.len() == 2 => {
                let mut args = args.into_iter();
                let domain = args.next()?;
                let codomain = args.next()?;
                Some((domain, codomain))
            }
            _ => None,
        }
    }

    /// Unbound variables reachable from this term, in first-occurrence order.
    pub fn free_vars(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        collect_free_vars(self, &mut out);
        out
    }
}

fn collect_free_vars(ty: &Type, out: &mut Vec<TypeVar>) {
    match prune(ty) {
        Type::Var(var) => {
            if !out.contains(&var) {
                out.push(var);
            }
        }
        Type::Op(op) => {
            for arg in &op.args {
                collect_free_vars(arg, out);
            }
        }
    }
}

/// Follows instance links to the representative term, compressing the chain
/// so every visited variable points straight at it.
pub fn prune(ty: &Type) -> Type {
    match ty {
        Type::Var(var) => match var.instance() {
            Some(inner) => {
                let pruned = prune(&inner);
                var.bind(pruned.clone());
                pruned
            }
            None => ty.clone(),
        },
        Type::Op(_) => ty.clone(),
    }
}

/// Structural equality after pruning; variables compare by identity.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (prune(self), prune(other)) {
            (Type::Var(a), Type::Var(b)) => a == b,
            (Type::Op(a), Type::Op(b)) => a.con == b.con && a.args == b.args,
            _ => false,
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Var(var) => write!(f, "{var:?}"),
            Type::Op(op) if op.args.is_empty() => write!(f, "{:?}", op.con),
            Type::Op(op) => write!(f, "{:?}{:?}", op.con, op.args),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self, Prec::Top))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Top,
    ArrowLeft,
    AppArg,
}

fn render(ty: &Type, prec: Prec) -> String {
    match prune(ty) {
        Type::Var(var) => var.name().to_string(),
        Type::Op(op) => {
            if op.con.id() == TypeId::FUNCTION && op.args.len() == 2 {
                let text = format!(
                    "{} -> {}",
                    render(&op.args[0], Prec::ArrowLeft),
                    render(&op.args[1], Prec::Top)
                );
                return if prec > Prec::Top {
                    format!("({text})")
                } else {
                    text
                };
            }
            if op.con.id() == TypeId::TUPLE {
                let items: Vec<String> = op.args.iter().map(|a| render(a, Prec::Top)).collect();
                return format!("({})", items.join(", "));
            }
            if op.args.is_empty() {
                return op.con.name().to_string();
            }
            let mut text = op.con.name().to_string();
            for arg in &op.args {
                text.push(' ');
                text.push_str(&render(arg, Prec::AppArg));
            }
            if prec == Prec::AppArg {
                format!("({text})")
            } else {
                text
            }
        }
    }
}
