use crate::{class::Class, error::Error, member::MemberTable, patcher::patch_member};

/// Members never transferred from a patch definition: host-runtime
/// internal slots and ORM bookkeeping names. Anything else, including
/// opaque mapped-column values, is fair game.
pub const SKIPPED_MEMBERS: &[&str] = &[
    // runtime internals
    "__dict__",
    "__doc__",
    "__module__",
    "__weakref__",
    // ORM bookkeeping
    "__mapper__",
    "_sa_class_manager",
];

///
/// Class Patch Engine
///
/// Two-stage application: `patch_class` validates the target and returns
/// the engine handle; `apply` merges one patch definition into it.
///

pub fn patch_class(target: &Class) -> Result<ClassPatch, Error> {
    if target.is_builtin() {
        return Err(Error::BuiltinClass(target.name()));
    }
    Ok(ClassPatch {
        target: target.clone(),
    })
}

///
/// ClassPatch
///
/// Second stage of class patching, bound to a validated target.
///

#[derive(Debug)]
pub struct ClassPatch {
    target: Class,
}

impl ClassPatch {
    #[must_use]
    pub const fn target(&self) -> &Class {
        &self.target
    }

    /// Merge the members of `patch` (and of its own bases, more-derived
    /// winning) into the target, then make sure future subclasses of the
    /// target start with a clean patch ledger.
    pub fn apply(&self, patch: &Class) -> Result<(), Error> {
        self.target.0.borrow_mut().patches.push(patch.clone());

        for (name, member) in collect_members(patch).iter() {
            if SKIPPED_MEMBERS.contains(&name) {
                continue;
            }
            patch_member(&self.target, name, member)?;
        }

        self.target.ensure_patch_reset_hook();

        Ok(())
    }
}

// Merge a patch definition's own members with those of its bases,
// root-to-leaf: own members override base members, earlier bases
// override later ones.
pub(crate) fn collect_members(class: &Class) -> MemberTable {
    let mut table = MemberTable::new();

    for base in class.bases().iter().rev() {
        for (name, member) in collect_members(base).iter() {
            table.insert(name, member.clone());
        }
    }
    let inner = class.0.borrow();
    for (name, member) in inner.members.iter() {
        table.insert(name, member.clone());
    }

    table
}

///
/// TESTS
///
