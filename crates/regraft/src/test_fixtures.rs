use crate::{
    class::Class,
    member::{Member, MemberDef, Property},
    super_proxy::SuperProxy,
    value::Value,
};

/// A member bound to no class at all, for store-level tests.
pub(crate) fn orphan_member(def: MemberDef) -> Member {
    Member {
        def,
        sup: SuperProxy::dangling(),
    }
}

/// The canonical fixture class: one member of every kind.
pub(crate) fn fool() -> Class {
    Class::builder("Fool")
        .attribute("attr", "fool.attr")
        .property("prop", Property::new().getter(|_, _| Ok(Value::from("fool.prop"))))
        .hybrid_property(
            "hprop",
            Property::new()
                .getter(|_, _| Ok(Value::from("fool.hprop")))
                .expression(|_, cls| Ok(Value::from(format!("expr({})", cls.name())))),
        )
        .method("meth", |_, _, _| Ok(Value::from("fool.meth")))
        .classmethod("cmeth", |_, cls, _| {
            Ok(Value::from(format!("fool.cmeth({})", cls.name())))
        })
        .staticmethod("smeth", |_, _| Ok(Value::from("fool.smeth")))
        .build()
}

/// A patch definition overriding every fixture member through super.
pub(crate) fn fool_patch() -> Class {
    Class::builder("FoolPatch")
        .attribute("attr", "patch.attr")
        .property(
            "prop",
            Property::new().getter(|sup, this| {
                let below = sup.get(Some(this), "prop")?;
                Ok(Value::from(format!("patched({below})")))
            }),
        )
        .method("meth", |sup, this, args| {
            let below = sup.call(Some(this), "meth", args)?;
            Ok(Value::from(format!("patched({below})")))
        })
        .classmethod("cmeth", |sup, _, args| {
            let below = sup.call(None, "cmeth", args)?;
            Ok(Value::from(format!("patched({below})")))
        })
        .staticmethod("smeth", |sup, args| {
            let below = sup.call(None, "smeth", args)?;
            Ok(Value::from(format!("patched({below})")))
        })
        .build()
}
