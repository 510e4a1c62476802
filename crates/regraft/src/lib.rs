//! Runtime patching for class-like and enum-like registries: replace members
//! on a live `Class`, extend an `Enum` in place, and reach the pre-patch
//! behavior through an explicit super proxy.
#![warn(unreachable_pub)]

pub mod class;
pub mod classes;
pub mod dispatch;
pub mod enums;
pub mod error;
pub mod member;
pub mod super_proxy;
pub mod unpatched;
pub mod value;

pub(crate) mod patcher;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::Error;

///
/// Prelude
///
/// Prelude contains the patching vocabulary only.
/// Internal stores and resolution helpers are not re-exported here.
///

pub mod prelude {
    pub use crate::{
        class::{Class, ClassBuilder, Instance},
        classes::patch_class,
        dispatch::{patch, patch_with, Patcher, Target, TargetKind},
        enums::{patch_enum, Enum, EnumBuilder, EnumPatchOptions},
        error::Error,
        member::{Member, MemberDef, MemberKind, Property, Slot},
        super_proxy::SuperProxy,
        unpatched::Category,
        value::Value,
    };
}
