use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::config::{trace_enabled, TraceConcern};
use crate::error::ClassError;
use crate::types::{TypeCon, TypeId};
use crate::values::Value;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

pub type Deriver = Rc<dyn Fn(&TypeCon, &Registry) -> Result<MethodRecord, ClassError>>;

/// Implementations of a class's operations for one type.
#[derive(Clone, Default)]
pub struct MethodRecord {
    methods: BTreeMap<String, Value>,
}

impl MethodRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, imp: Value) -> Self {
        self.methods.insert(name.to_string(), imp);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.methods.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

/// Declaration of a typeclass before it is entered into a [`Registry`].
pub struct ClassDecl {
    name: String,
    superclasses: Vec<ClassId>,
    methods: Vec<String>,
    deriver: Option<Deriver>,
}

impl ClassDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            superclasses: Vec::new(),
            methods: Vec::new(),
            deriver: None,
        }
    }

    pub fn superclass(mut self, class: ClassId) -> Self {
        self.superclasses.push(class);
        self
    }

    pub fn method(mut self, name: &str) -> Self {
        self.methods.push(name.to_string());
        self
    }

    pub fn deriving(
        mut self,
        deriver: impl Fn(&TypeCon, &Registry) -> Result<MethodRecord, ClassError> + 'static,
    ) -> Self {
        self.deriver = Some(Rc::new(deriver));
        self
    }
}

pub struct Typeclass {
    pub id: ClassId,
    pub name: String,
    pub superclasses: Vec<ClassId>,
    pub methods: Vec<String>,
    deriver: Option<Deriver>,
}

impl Typeclass {
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|method| method == name)
    }

    pub fn is_derivable(&self) -> bool {
        self.deriver.is_some()
    }
}

struct ClassEntry {
    class: Typeclass,
    instances: HashMap<TypeId, Rc<MethodRecord>>,
}

/// Instance tables for every declared class. Populated during start-up, then
/// sealed and shared read-only.
#[derive(Default)]
pub struct Registry {
    classes: Vec<ClassEntry>,
    by_name: HashMap<String, ClassId>,
    sealed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, decl: ClassDecl) -> Result<ClassId, ClassError> {
        self.ensure_open()?;
        if self.by_name.contains_key(&decl.name) {
            return Err(ClassError::DuplicateClass(decl.name));
        }
        for superclass in &decl.superclasses {
            self.entry(*superclass)?;
        }
        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(decl.name.clone(), id);
        self.classes.push(ClassEntry {
            class: Typeclass {
                id,
                name: decl.name,
                superclasses: decl.superclasses,
                methods: decl.methods,
                deriver: decl.deriver,
            },
            instances: HashMap::new(),
        });
        Ok(id)
    }

    pub fn class(&self, id: ClassId) -> Result<&Typeclass, ClassError> {
        self.entry(id).map(|entry| &entry.class)
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn register_instance(
        &mut self,
        class: ClassId,
        ty: &TypeCon,
        methods: MethodRecord,
    ) -> Result<(), ClassError> {
        self.ensure_open()?;
        let entry = self.entry(class)?;
        for dependency in &entry.class.superclasses {
            if !self.has_instance(ty, *dependency) {
                return Err(ClassError::MissingDependency {
                    class: entry.class.name.clone(),
                    dependency: self.class(*dependency)?.name.clone(),
                    ty: ty.to_string(),
                });
            }
        }
        if entry.instances.contains_key(&ty.id()) {
            return Err(ClassError::DuplicateInstance {
                class: entry.class.name.clone(),
                ty: ty.to_string(),
            });
        }
        if let Some(missing) = entry
            .class
            .methods
            .iter()
            .find(|method| methods.get(method).is_none())
        {
            return Err(ClassError::IncompleteInstance {
                class: entry.class.name.clone(),
                ty: ty.to_string(),
                method: missing.clone(),
            });
        }
        if let Some(extra) = methods.names().find(|name| !entry.class.has_method(name)) {
            return Err(ClassError::UnknownMethod {
                class: entry.class.name.clone(),
                method: extra.to_string(),
            });
        }

        if trace_enabled(TraceConcern::Registry) {
            tracing::debug!(
                target: "polydispatch::registry",
                class = %entry.class.name,
                ty = %ty,
                "registered instance"
            );
        }
        self.classes[class.0 as usize]
            .instances
            .insert(ty.id(), Rc::new(methods));
        Ok(())
    }

    /// Registers the instance the class's deriver synthesizes for `ty`.
    pub fn derive_instance(&mut self, class: ClassId, ty: &TypeCon) -> Result<(), ClassError> {
        let entry = self.entry(class)?;
        let Some(deriver) = entry.class.deriver.clone() else {
            return Err(ClassError::NotDerivable {
                class: entry.class.name.clone(),
                ty: ty.to_string(),
            });
        };
        let methods = deriver(ty, self)?;
        self.register_instance(class, ty, methods)
    }

    pub fn lookup(&self, class: ClassId, ty: &TypeCon) -> Result<Rc<MethodRecord>, ClassError> {
        let entry = self.entry(class)?;
        entry
            .instances
            .get(&ty.id())
            .cloned()
            .ok_or_else(|| ClassError::MissingInstance {
                class: entry.class.name.clone(),
                ty: ty.to_string(),
            })
    }

    pub fn has_instance(&self, ty: &TypeCon, class: ClassId) -> bool {
        self.entry(class)
            .is_ok_and(|entry| entry.instances.contains_key(&ty.id()))
    }

    pub fn instance_count(&self, class: ClassId) -> usize {
        self.entry(class).map_or(0, |entry| entry.instances.len())
    }

    /// Closes the tables; every later declaration or registration fails.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn ensure_open(&self) -> Result<(), ClassError> {
        if self.sealed {
            return Err(ClassError::Sealed);
        }
        Ok(())
    }

    fn entry(&self, id: ClassId) -> Result<&ClassEntry, ClassError> {
        self.classes
            .get(id.0 as usize)
            .ok_or(ClassError::UnknownClass(id.0))
    }
}
