use crate::{
    error::Error,
    member::{classify, Member, MemberDef, MemberKind, MemberTable, Property, Slot},
    super_proxy::SuperProxy,
    unpatched::{Category, UnpatchedStore},
    value::Value,
};
use serde::Serialize;
use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    rc::Rc,
};

/// Hook run when a subclass of the class is defined, receiving the new
/// subclass. The patch engine composes its ledger reset behind any hook
/// the class already carries.
pub type SubclassHook = Rc<dyn Fn(&Class)>;

pub(crate) struct ClassInner {
    pub(crate) name: String,
    pub(crate) builtin: bool,
    pub(crate) bases: Vec<Class>,
    pub(crate) members: MemberTable,
    pub(crate) patches: Vec<Class>,
    pub(crate) unpatched: UnpatchedStore,
    pub(crate) subclass_hook: Option<SubclassHook>,
    pub(crate) reset_hook_installed: bool,
}

///
/// Class
///
/// A first-class open-class registry: the member table the host program
/// consults instead of native dispatch. Members are replaceable after
/// definition, and the engine-managed patch ledger (`patches`,
/// `unpatched`) is own state of each class, never inherited.
///
/// Handles are cheap clones of one shared registry. The whole model is
/// single-threaded by construction (`Rc`/`RefCell`); patching is an
/// initialization-phase activity.
///

#[derive(Clone)]
pub struct Class(pub(crate) Rc<RefCell<ClassInner>>);

impl Class {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            builtin: false,
            bases: Vec::new(),
            defs: Vec::new(),
        }
    }

    /// Start a builder for a subclass of this class.
    #[must_use]
    pub fn subclass(&self, name: impl Into<String>) -> ClassBuilder {
        Self::builder(name).base(self)
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.0.borrow().builtin
    }

    #[must_use]
    pub fn bases(&self) -> Vec<Self> {
        self.0.borrow().bases.clone()
    }

    /// Identity comparison: two handles to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Patch definitions applied to this class so far, in order.
    #[must_use]
    pub fn patches(&self) -> Vec<Self> {
        self.0.borrow().patches.clone()
    }

    /// Number of recorded prior implementations for `name` in `category`.
    #[must_use]
    pub fn unpatched_depth(&self, category: Category, name: &str) -> usize {
        self.0.borrow().unpatched.depth(category, name)
    }

    /// Returns `true` if nothing has been patched over on this class.
    #[must_use]
    pub fn unpatched_is_empty(&self) -> bool {
        self.0.borrow().unpatched.is_empty()
    }

    /// Member defined directly on this class, ignoring bases.
    #[must_use]
    pub fn own_member(&self, name: &str) -> Option<Member> {
        self.0.borrow().members.get(name).cloned()
    }

    /// Resolve `name` through this class and then its bases, depth-first
    /// in declaration order.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Member> {
        if let Some(member) = self.own_member(name) {
            return Some(member);
        }
        self.resolve_from_bases(name)
    }

    /// Resolve `name` through the bases only, skipping this class's own
    /// table. Super resolution for a member's own name starts here.
    #[must_use]
    pub fn resolve_from_bases(&self, name: &str) -> Option<Member> {
        let bases = self.bases();
        for base in bases {
            if let Some(member) = base.resolve(name) {
                return Some(member);
            }
        }
        None
    }

    /// Class-level read: plain attributes by value, hybrid properties via
    /// their expression slot.
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        let member = self
            .resolve(name)
            .ok_or_else(|| Error::not_found(self.name(), name))?;
        member_get(&member, self, None, name)
    }

    /// Class-level invocation: classmethods bind to this class,
    /// staticmethods run as-is, instance methods fail unbound.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let member = self
            .resolve(name)
            .ok_or_else(|| Error::not_found(self.name(), name))?;
        member_call(&member, self, None, name, args)
    }

    /// Create an instance with an empty attribute dictionary.
    #[must_use]
    pub fn instantiate(&self) -> Instance {
        Instance(Rc::new(InstanceInner {
            class: self.clone(),
            attrs: RefCell::new(BTreeMap::new()),
        }))
    }

    /// Replace the subclass hook. Any ledger reset already installed by
    /// the patch engine is re-composed behind the new hook.
    pub fn set_subclass_hook<F>(&self, hook: F)
    where
        F: Fn(&Self) + 'static,
    {
        let reinstall = {
            let mut inner = self.0.borrow_mut();
            inner.subclass_hook = Some(Rc::new(hook));
            let reinstall = inner.reset_hook_installed;
            inner.reset_hook_installed = false;
            reinstall
        };
        if reinstall {
            self.ensure_patch_reset_hook();
        }
    }

    /// Serializable introspection snapshot.
    #[must_use]
    pub fn report(&self) -> ClassReport {
        let inner = self.0.borrow();
        ClassReport {
            name: inner.name.clone(),
            builtin: inner.builtin,
            bases: inner.bases.iter().map(Class::name).collect(),
            members: inner
                .members
                .iter()
                .map(|(name, member)| (name.to_string(), member.kind()))
                .collect(),
            patches: inner.patches.iter().map(Class::name).collect(),
            unpatched: inner.unpatched.summary(),
        }
    }

    // Bind a declared member to this class: a fresh proxy pointing at the
    // ledger entry immediately beneath the install (none for first
    // installs and freshly built classes).
    pub(crate) fn bind_member(&self, name: &str, def: MemberDef) -> Member {
        let category = Category::of(classify(&def));
        let below = self.0.borrow().unpatched.depth(category, name).checked_sub(1);
        Member {
            def,
            sup: SuperProxy::bind(self, category, name, below),
        }
    }

    pub(crate) fn install_member(&self, name: &str, def: MemberDef) {
        let member = self.bind_member(name, def);
        self.0.borrow_mut().members.insert(name, member);
    }

    // Install the subclass-ledger reset exactly once, composed after any
    // pre-existing hook so that hook still runs first.
    pub(crate) fn ensure_patch_reset_hook(&self) {
        let mut inner = self.0.borrow_mut();
        if inner.reset_hook_installed {
            return;
        }
        let previous = inner.subclass_hook.take();
        inner.subclass_hook = Some(Rc::new(move |subclass: &Self| {
            if let Some(previous) = &previous {
                previous(subclass);
            }
            subclass.clear_patch_state();
        }));
        inner.reset_hook_installed = true;
    }

    // Fresh ledger for a newly defined subclass.
    pub(crate) fn clear_patch_state(&self) {
        let mut inner = self.0.borrow_mut();
        inner.patches.clear();
        inner.unpatched.clear();
    }

    // Nearest subclass hook in the base chains, first base wins.
    fn inherited_subclass_hook(&self) -> Option<SubclassHook> {
        if let Some(hook) = self.0.borrow().subclass_hook.clone() {
            return Some(hook);
        }
        for base in self.bases() {
            if let Some(hook) = base.inherited_subclass_hook() {
                return Some(hook);
            }
        }
        None
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        write!(f, "Class({}, {} members)", inner.name, inner.members.len())
    }
}

///
/// ClassBuilder
///
/// Declares a class: bases, builtin flag, and members. `build` wires
/// every member with a super proxy for the new class and then runs the
/// nearest base's subclass hook.
///

pub struct ClassBuilder {
    name: String,
    builtin: bool,
    bases: Vec<Class>,
    defs: Vec<(String, MemberDef)>,
}

impl ClassBuilder {
    #[must_use]
    pub fn base(mut self, base: &Class) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Mark the class as a runtime built-in. Built-ins reject patching.
    #[must_use]
    pub const fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defs
            .push((name.into(), MemberDef::Attribute(value.into())));
        self
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.defs
            .push((name.into(), MemberDef::Property(property)));
        self
    }

    #[must_use]
    pub fn hybrid_property(
        mut self,
        name: impl Into<String>,
        property: Property,
    ) -> Self {
        self.defs
            .push((name.into(), MemberDef::HybridProperty(property)));
        self
    }

    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SuperProxy, &Instance, &[Value]) -> Result<Value, Error> + 'static,
    {
        self.defs.push((name.into(), MemberDef::Method(Rc::new(f))));
        self
    }

    #[must_use]
    pub fn classmethod<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SuperProxy, &Class, &[Value]) -> Result<Value, Error> + 'static,
    {
        self.defs
            .push((name.into(), MemberDef::ClassMethod(Rc::new(f))));
        self
    }

    #[must_use]
    pub fn staticmethod<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SuperProxy, &[Value]) -> Result<Value, Error> + 'static,
    {
        self.defs
            .push((name.into(), MemberDef::StaticMethod(Rc::new(f))));
        self
    }

    #[must_use]
    pub fn build(self) -> Class {
        let class = Class(Rc::new(RefCell::new(ClassInner {
            name: self.name,
            builtin: self.builtin,
            bases: self.bases,
            members: MemberTable::new(),
            patches: Vec::new(),
            unpatched: UnpatchedStore::new(),
            subclass_hook: None,
            reset_hook_installed: false,
        })));

        for (name, def) in self.defs {
            class.install_member(&name, def);
        }

        // Subclass-definition hook of the nearest base chain, after the
        // class is fully assembled.
        let hook = class
            .bases()
            .into_iter()
            .find_map(|base| base.inherited_subclass_hook());
        if let Some(hook) = hook {
            hook(&class);
        }

        class
    }
}

struct InstanceInner {
    class: Class,
    attrs: RefCell<BTreeMap<String, Value>>,
}

///
/// Instance
///
/// An object of a `Class`: its own attribute dictionary plus ordinary
/// resolution through the class hierarchy.
///

#[derive(Clone)]
pub struct Instance(Rc<InstanceInner>);

impl Instance {
    #[must_use]
    pub fn class(&self) -> Class {
        self.0.class.clone()
    }

    /// Attribute set directly on this instance, ignoring the class.
    #[must_use]
    pub fn own_attr(&self, name: &str) -> Option<Value> {
        self.0.attrs.borrow().get(name).cloned()
    }

    /// Write straight into the instance dictionary, bypassing property
    /// setters. This is the backing-store write a setter body uses.
    pub fn set_own_attr(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.attrs.borrow_mut().insert(name.into(), value.into());
    }

    /// Ordinary read: instance dictionary, then class resolution
    /// (attributes by value, properties via their getter).
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        if let Some(value) = self.own_attr(name) {
            return Ok(value);
        }
        let class = self.class();
        let member = class
            .resolve(name)
            .ok_or_else(|| Error::not_found(class.name(), name))?;
        member_get(&member, &class, Some(self), name)
    }

    /// Ordinary write: property setters win over the instance dictionary.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        let class = self.class();
        match class.resolve(name) {
            Some(Member {
                def: MemberDef::Property(property) | MemberDef::HybridProperty(property),
                sup,
            }) => match &property.set {
                Some(setter) => setter(&sup, self, value),
                None => Err(Error::MissingSlot {
                    class: class.name(),
                    name: name.to_string(),
                    slot: Slot::Set,
                }),
            },
            _ => {
                self.0.attrs.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    /// Ordinary delete: property deleters win over the instance
    /// dictionary; deleting an absent attribute is an error.
    pub fn delete(&self, name: &str) -> Result<(), Error> {
        let class = self.class();
        match class.resolve(name) {
            Some(Member {
                def: MemberDef::Property(property) | MemberDef::HybridProperty(property),
                sup,
            }) => match &property.delete {
                Some(deleter) => deleter(&sup, self),
                None => Err(Error::MissingSlot {
                    class: class.name(),
                    name: name.to_string(),
                    slot: Slot::Delete,
                }),
            },
            _ => self
                .0
                .attrs
                .borrow_mut()
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| Error::not_found(class.name(), name)),
        }
    }

    /// Invoke a method-like member with this instance's conventions.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let class = self.class();
        let member = class
            .resolve(name)
            .ok_or_else(|| Error::not_found(class.name(), name))?;
        member_call(&member, &class, Some(self), name, args)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.0.class.name())
    }
}

///
/// ClassReport
///
/// Serializable introspection snapshot of a class registry.
///

#[derive(Clone, Debug, Serialize)]
pub struct ClassReport {
    pub name: String,
    pub builtin: bool,
    pub bases: Vec<String>,
    pub members: BTreeMap<String, MemberKind>,
    pub patches: Vec<String>,
    pub unpatched: BTreeMap<&'static str, BTreeMap<String, usize>>,
}

// Shared member invocation used by ordinary resolution and by super
// resolution. `class` is the class the access happens through (the bind
// target for classmethods and hybrid expressions).
pub(crate) fn member_get(
    member: &Member,
    class: &Class,
    instance: Option<&Instance>,
    name: &str,
) -> Result<Value, Error> {
    match &member.def {
        MemberDef::Attribute(value) => Ok(value.clone()),
        MemberDef::Property(property) => match (instance, &property.get) {
            (Some(instance), Some(getter)) => getter(&member.sup, instance),
            (Some(_), None) => Err(Error::MissingSlot {
                class: class.name(),
                name: name.to_string(),
                slot: Slot::Get,
            }),
            (None, _) => Err(Error::RequiresInstance {
                class: class.name(),
                name: name.to_string(),
            }),
        },
        MemberDef::HybridProperty(property) => match instance {
            Some(instance) => match &property.get {
                Some(getter) => getter(&member.sup, instance),
                None => Err(Error::MissingSlot {
                    class: class.name(),
                    name: name.to_string(),
                    slot: Slot::Get,
                }),
            },
            // Class-level access to a hybrid goes through its expression.
            None => match &property.expression {
                Some(expression) => expression(&member.sup, class),
                None => Err(Error::MissingSlot {
                    class: class.name(),
                    name: name.to_string(),
                    slot: Slot::Expression,
                }),
            },
        },
        MemberDef::Method(_) | MemberDef::ClassMethod(_) | MemberDef::StaticMethod(_) => {
            Err(Error::NotReadable {
                class: class.name(),
                name: name.to_string(),
            })
        }
    }
}

pub(crate) fn member_call(
    member: &Member,
    class: &Class,
    instance: Option<&Instance>,
    name: &str,
    args: &[Value],
) -> Result<Value, Error> {
    match &member.def {
        MemberDef::Method(f) => match instance {
            Some(instance) => f(&member.sup, instance, args),
            None => Err(Error::RequiresInstance {
                class: class.name(),
                name: name.to_string(),
            }),
        },
        MemberDef::ClassMethod(f) => f(&member.sup, class, args),
        MemberDef::StaticMethod(f) => f(&member.sup, args),
        MemberDef::Attribute(_) | MemberDef::Property(_) | MemberDef::HybridProperty(_) => {
            Err(Error::NotCallable {
                class: class.name(),
                name: name.to_string(),
            })
        }
    }
}

///
/// TESTS
///
