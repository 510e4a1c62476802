use crate::{
    class::Class,
    error::Error,
    member::{Member, MemberDef, Property, HYBRID_PROPERTY_SLOTS, PROPERTY_SLOTS},
    unpatched::Category,
};

///
/// Member Patcher
///
/// Installs one member of a patch definition onto a target class:
/// validates the replacement, records the prior implementation in the
/// unpatched ledger, and rewires the member's super binding to the
/// target. Validation always precedes mutation, so a rejected member
/// leaves the target untouched.
///

pub(crate) fn patch_member(target: &Class, name: &str, member: &Member) -> Result<(), Error> {
    match &member.def {
        MemberDef::Property(property) => {
            patch_propertylike(target, name, property, Category::Properties)
        }
        MemberDef::HybridProperty(property) => {
            patch_propertylike(target, name, property, Category::HybridProperties)
        }
        MemberDef::Method(_) => patch_methodlike(target, name, &member.def, Category::Methods),
        MemberDef::ClassMethod(_) => {
            patch_methodlike(target, name, &member.def, Category::ClassMethods)
        }
        MemberDef::StaticMethod(_) => {
            patch_methodlike(target, name, &member.def, Category::StaticMethods)
        }
        MemberDef::Attribute(_) => {
            patch_attribute(target, name, &member.def);
            Ok(())
        }
    }
}

// Plain attributes carry no super wiring; ORM-ish opaque values ride
// through here untouched.
fn patch_attribute(target: &Class, name: &str, def: &MemberDef) {
    store_unpatched(target, Category::Attributes, name);
    target.install_member(name, def.clone());
}

fn patch_propertylike(
    target: &Class,
    name: &str,
    property: &Property,
    category: Category,
) -> Result<(), Error> {
    let supported = match category {
        Category::Properties => PROPERTY_SLOTS,
        Category::HybridProperties => HYBRID_PROPERTY_SLOTS,
        other => return Err(Error::UnsupportedCategory(other)),
    };
    if let Some(slot) = property.slots().into_iter().find(|s| !supported.contains(s)) {
        return Err(Error::UnsupportedSlot(slot));
    }

    store_unpatched(target, category, name);

    // Rebuild the property around the same slot functions; installation
    // wires a fresh super proxy for the target, leaving the source
    // member's own binding alone.
    let def = match category {
        Category::Properties => MemberDef::Property(property.clone()),
        _ => MemberDef::HybridProperty(property.clone()),
    };
    target.install_member(name, def);

    Ok(())
}

fn patch_methodlike(
    target: &Class,
    name: &str,
    def: &MemberDef,
    category: Category,
) -> Result<(), Error> {
    if !matches!(
        category,
        Category::Methods | Category::ClassMethods | Category::StaticMethods
    ) {
        return Err(Error::UnsupportedCategory(category));
    }

    store_unpatched(target, category, name);
    target.install_member(name, def.clone());

    Ok(())
}

// Record the member currently defined directly on the target (inherited
// members are not recorded) under the incoming member's category.
fn store_unpatched(target: &Class, category: Category, name: &str) {
    if let Some(previous) = target.own_member(name) {
        target.0.borrow_mut().unpatched.record(category, name, previous);
    }
}

///
/// TESTS
///
