use crate::{
    class::{Class, Instance},
    error::Error,
    super_proxy::SuperProxy,
    value::Value,
};
use derive_more::Deref;
use serde::Serialize;
use std::{fmt, rc::Rc};

/// Calling conventions for member functions. Every callable receives the
/// super proxy wired for it at install time as an explicit first argument.
pub type MethodFn = Rc<dyn Fn(&SuperProxy, &Instance, &[Value]) -> Result<Value, Error>>;
pub type ClassMethodFn = Rc<dyn Fn(&SuperProxy, &Class, &[Value]) -> Result<Value, Error>>;
pub type StaticMethodFn = Rc<dyn Fn(&SuperProxy, &[Value]) -> Result<Value, Error>>;
pub type GetterFn = Rc<dyn Fn(&SuperProxy, &Instance) -> Result<Value, Error>>;
pub type SetterFn = Rc<dyn Fn(&SuperProxy, &Instance, Value) -> Result<(), Error>>;
pub type DeleterFn = Rc<dyn Fn(&SuperProxy, &Instance) -> Result<(), Error>>;
pub type ExpressionFn = Rc<dyn Fn(&SuperProxy, &Class) -> Result<Value, Error>>;

/// Slots a plain property accepts.
pub const PROPERTY_SLOTS: &[Slot] = &[Slot::Get, Slot::Set, Slot::Delete];

/// Slots a hybrid property accepts.
pub const HYBRID_PROPERTY_SLOTS: &[Slot] = &[Slot::Get, Slot::Set, Slot::Delete, Slot::Expression];

///
/// Slot
///
/// Accessor slots of a property-like member. `Expression` is the
/// class-level slot that makes a property hybrid.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Slot {
    Get,
    Set,
    Delete,
    Expression,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Delete => "delete",
            Self::Expression => "expression",
        };
        write!(f, "{name}")
    }
}

///
/// Property
///
/// Accessor slots of a property-like member. A plain property uses
/// get/set/delete; a hybrid property additionally carries the class-level
/// expression slot.
///

#[derive(Clone, Default)]
pub struct Property {
    pub get: Option<GetterFn>,
    pub set: Option<SetterFn>,
    pub delete: Option<DeleterFn>,
    pub expression: Option<ExpressionFn>,
}

impl Property {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn getter<F>(mut self, f: F) -> Self
    where
        F: Fn(&SuperProxy, &Instance) -> Result<Value, Error> + 'static,
    {
        self.get = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&SuperProxy, &Instance, Value) -> Result<(), Error> + 'static,
    {
        self.set = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn deleter<F>(mut self, f: F) -> Self
    where
        F: Fn(&SuperProxy, &Instance) -> Result<(), Error> + 'static,
    {
        self.delete = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn expression<F>(mut self, f: F) -> Self
    where
        F: Fn(&SuperProxy, &Class) -> Result<Value, Error> + 'static,
    {
        self.expression = Some(Rc::new(f));
        self
    }

    /// List the slots that are populated, in declaration order.
    #[must_use]
    pub fn slots(&self) -> Vec<Slot> {
        let mut slots = Vec::new();
        if self.get.is_some() {
            slots.push(Slot::Get);
        }
        if self.set.is_some() {
            slots.push(Slot::Set);
        }
        if self.delete.is_some() {
            slots.push(Slot::Delete);
        }
        if self.expression.is_some() {
            slots.push(Slot::Expression);
        }
        slots
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({:?})", self.slots())
    }
}

///
/// MemberDef
///
/// A declared member before it is wired into a class. Patch definitions
/// and class builders both speak in `MemberDef`s; installation binds each
/// one with a `SuperProxy` for the class it lands on.
///

#[derive(Clone)]
pub enum MemberDef {
    Attribute(Value),
    Property(Property),
    HybridProperty(Property),
    Method(MethodFn),
    ClassMethod(ClassMethodFn),
    StaticMethod(StaticMethodFn),
}

///
/// MemberKind
///
/// Pure classification of a member. The hybrid arm precedes the plain
/// property and function arms: hybrid accessors are themselves plain
/// functions, so order of inspection is part of the contract.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum MemberKind {
    Attribute,
    Property,
    HybridProperty,
    Method,
    ClassMethod,
    StaticMethod,
}

/// Classify a declared member. Pure, no side effects.
#[must_use]
pub const fn classify(def: &MemberDef) -> MemberKind {
    match def {
        MemberDef::HybridProperty(_) => MemberKind::HybridProperty,
        MemberDef::Property(_) => MemberKind::Property,
        MemberDef::Method(_) => MemberKind::Method,
        MemberDef::ClassMethod(_) => MemberKind::ClassMethod,
        MemberDef::StaticMethod(_) => MemberKind::StaticMethod,
        MemberDef::Attribute(_) => MemberKind::Attribute,
    }
}

///
/// Member
///
/// A member installed on a class: the declaration plus the super proxy it
/// was wired with. Each install owns an independent proxy, so replacing a
/// member never disturbs the binding of an earlier layer.
///

#[derive(Clone)]
pub struct Member {
    pub def: MemberDef,
    pub(crate) sup: SuperProxy,
}

impl Member {
    #[must_use]
    pub const fn kind(&self) -> MemberKind {
        classify(&self.def)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({:?})", self.kind())
    }
}

///
/// MemberTable
///
/// Deterministic name-ordered member map. Enforces unique names and sorts
/// by ascending name order.
///

#[derive(Clone, Debug, Default, Deref)]
pub struct MemberTable(Vec<(String, Member)>);

impl MemberTable {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Return the member for `name` if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.find_index(name).ok().map(|idx| &self.0[idx].1)
    }

    /// Insert or replace the member for `name`, returning the old one if present.
    pub fn insert(&mut self, name: impl Into<String>, member: Member) -> Option<Member> {
        let name = name.into();
        match self.find_index(&name) {
            Ok(index) => Some(std::mem::replace(&mut self.0[index].1, member)),
            Err(index) => {
                self.0.insert(index, (name, member));
                None
            }
        }
    }

    /// Return an iterator over `(name, member)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.0.iter().map(|(name, member)| (name.as_str(), member))
    }

    // Locate a name in the sorted table.
    fn find_index(&self, name: &str) -> Result<usize, usize> {
        self.0
            .binary_search_by(|(candidate, _)| candidate.as_str().cmp(name))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_every_variant() {
        assert_eq!(
            classify(&MemberDef::Attribute(Value::Null)),
            MemberKind::Attribute
        );
        assert_eq!(
            classify(&MemberDef::Property(Property::new())),
            MemberKind::Property
        );
        assert_eq!(
            classify(&MemberDef::HybridProperty(Property::new())),
            MemberKind::HybridProperty
        );
        assert_eq!(
            classify(&MemberDef::Method(Rc::new(|_, _, _| Ok(Value::Null)))),
            MemberKind::Method
        );
        assert_eq!(
            classify(&MemberDef::ClassMethod(Rc::new(|_, _, _| Ok(Value::Null)))),
            MemberKind::ClassMethod
        );
        assert_eq!(
            classify(&MemberDef::StaticMethod(Rc::new(|_, _| Ok(Value::Null)))),
            MemberKind::StaticMethod
        );
    }

    #[test]
    fn property_slots_report_declaration_order() {
        let prop = Property::new()
            .getter(|_, _| Ok(Value::Null))
            .deleter(|_, _| Ok(()));
        assert_eq!(prop.slots(), vec![Slot::Get, Slot::Delete]);

        let hybrid = Property::new()
            .getter(|_, _| Ok(Value::Null))
            .expression(|_, _| Ok(Value::Null));
        assert_eq!(hybrid.slots(), vec![Slot::Get, Slot::Expression]);
    }

    #[test]
    fn hybrid_slot_set_is_a_superset_of_property_slots() {
        assert!(PROPERTY_SLOTS.iter().all(|s| HYBRID_PROPERTY_SLOTS.contains(s)));
        assert!(!PROPERTY_SLOTS.contains(&Slot::Expression));
    }
}
