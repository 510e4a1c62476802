use crate::{
    class::{member_call, member_get, Class, ClassInner, Instance},
    error::Error,
    member::Member,
    unpatched::Category,
    value::Value,
};
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

// Proxy lookup consults these categories, in this order, taking the most
// recent history entry of each. Plain attributes are not consulted; they
// resolve through the ordinary fallback like any other untouched member.
const LOOKUP_ORDER: [Category; 5] = [
    Category::Properties,
    Category::HybridProperties,
    Category::Methods,
    Category::ClassMethods,
    Category::StaticMethods,
];

///
/// SuperProxy
///
/// Resolves "the implementation this override replaced" against the
/// target class it was created for. One proxy is wired per installed
/// member; it remembers which name it serves and the ledger position
/// immediately beneath that install, so chained patches of the same
/// member each reach the layer below themselves rather than the top of
/// the history.
///
/// The handle is weak: proxies live inside members which live inside the
/// class, and a strong reference would leak the whole registry.
///

#[derive(Clone)]
pub struct SuperProxy {
    target: Weak<RefCell<ClassInner>>,
    owner: Owner,
}

#[derive(Clone, Debug)]
struct Owner {
    category: Category,
    name: String,
    below: Option<usize>,
}

// Outcome of a ledger lookup for one name.
enum Lookup {
    Recorded(Member),
    // The proxy's own name with nothing recorded beneath it: resolve from
    // the target's bases only, never its own table (which would be the
    // caller itself).
    BasesOnly,
    Ordinary,
}

impl SuperProxy {
    pub(crate) fn bind(
        target: &Class,
        category: Category,
        name: impl Into<String>,
        below: Option<usize>,
    ) -> Self {
        Self {
            target: Rc::downgrade(&target.0),
            owner: Owner {
                category,
                name: name.into(),
                below,
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn dangling() -> Self {
        Self {
            target: Weak::new(),
            owner: Owner {
                category: Category::Attributes,
                name: String::new(),
                below: None,
            },
        }
    }

    /// The class this proxy resolves against.
    pub fn target(&self) -> Result<Class, Error> {
        self.target.upgrade().map(Class).ok_or(Error::DanglingSuper)
    }

    /// Read `name` through the ledger: recorded properties and hybrids
    /// resolve via their getter, recorded attributes by value; anything
    /// not on record falls back to ordinary lookup on the instance (if
    /// present) or the target class.
    pub fn get(&self, instance: Option<&Instance>, name: &str) -> Result<Value, Error> {
        let class = self.target()?;
        match self.lookup(&class, name) {
            Lookup::Recorded(member) => member_get(&member, &class, instance, name),
            Lookup::BasesOnly => {
                let member = class
                    .resolve_from_bases(name)
                    .ok_or_else(|| Error::not_found(class.name(), name))?;
                member_get(&member, &class, instance, name)
            }
            Lookup::Ordinary => match instance {
                Some(instance) => instance.get(name),
                None => class.get(name),
            },
        }
    }

    /// Invoke `name` through the ledger: recorded methods bind to the
    /// instance, classmethods to the proxy's target class, staticmethods
    /// run as-is. Unrecorded names fall back to ordinary resolution.
    pub fn call(&self, instance: Option<&Instance>, name: &str, args: &[Value]) -> Result<Value, Error> {
        let class = self.target()?;
        match self.lookup(&class, name) {
            Lookup::Recorded(member) => member_call(&member, &class, instance, name, args),
            Lookup::BasesOnly => {
                let member = class
                    .resolve_from_bases(name)
                    .ok_or_else(|| Error::not_found(class.name(), name))?;
                member_call(&member, &class, instance, name, args)
            }
            Lookup::Ordinary => match instance {
                Some(instance) => instance.call(name, args),
                None => class.call(name, args),
            },
        }
    }

    /// Write through the proxy. Known quirk, preserved for compatibility:
    /// a write resolves exactly like a read of the prior layer's getter,
    /// and the written value is discarded.
    pub fn set(&self, instance: Option<&Instance>, name: &str, value: Value) -> Result<Value, Error> {
        let _ = value;
        self.get(instance, name)
    }

    fn lookup(&self, class: &Class, name: &str) -> Lookup {
        let inner = class.0.borrow();

        if name == self.owner.name {
            return self
                .owner
                .below
                .and_then(|index| inner.unpatched.entry(self.owner.category, name, index))
                .cloned()
                .map_or(Lookup::BasesOnly, Lookup::Recorded);
        }

        for category in LOOKUP_ORDER {
            if let Some(member) = inner.unpatched.latest(category, name) {
                return Lookup::Recorded(member.clone());
            }
        }

        Lookup::Ordinary
    }
}

impl fmt::Debug for SuperProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self
            .target
            .upgrade()
            .map_or_else(|| "<dropped>".to_string(), |inner| inner.borrow().name.clone());
        write!(
            f,
            "SuperProxy({target}, {}:{})",
            self.owner.category, self.owner.name
        )
    }
}

///
/// TESTS
///
/// Scenario coverage for super resolution lives with the class patch
/// engine tests; this module only checks the proxy's own edges.
///
