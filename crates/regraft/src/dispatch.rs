use crate::{
    class::Class,
    classes::{patch_class, ClassPatch},
    enums::{patch_enum, Enum, EnumPatch, EnumPatchOptions},
    error::Error,
    value::Value,
};
use std::fmt;

///
/// Target
///
/// Anything a caller may hand to the dispatcher. Plain values are
/// representable precisely so they can be rejected with the right error
/// instead of a type mismatch at the call site.
///

#[derive(Clone, Debug)]
pub enum Target {
    Class(Class),
    Enum(Enum),
    Value(Value),
}

impl Target {
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        match self {
            Self::Class(_) => TargetKind::Class,
            Self::Enum(_) => TargetKind::Enum,
            Self::Value(_) => TargetKind::Value,
        }
    }
}

impl From<Class> for Target {
    fn from(class: Class) -> Self {
        Self::Class(class)
    }
}

impl From<Enum> for Target {
    fn from(enumeration: Enum) -> Self {
        Self::Enum(enumeration)
    }
}

impl From<Value> for Target {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

///
/// TargetKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetKind {
    Class,
    Enum,
    Value,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Class => "a class",
            Self::Enum => "an enum",
            Self::Value => "a plain value",
        };
        write!(f, "{name}")
    }
}

///
/// Dispatcher
///
/// Routes a target to the class or enum patch engine by kind. `patch`
/// uses default enum options; `patch_with` threads explicit ones (valid
/// for enum targets only).
///

pub fn patch(target: &Target) -> Result<Patcher, Error> {
    patch_with(target, EnumPatchOptions::default())
}

pub fn patch_with(target: &Target, options: EnumPatchOptions) -> Result<Patcher, Error> {
    match target {
        Target::Class(class) => {
            if options != EnumPatchOptions::default() {
                return Err(Error::UnexpectedOptions);
            }
            Ok(Patcher::Class(patch_class(class)?))
        }
        Target::Enum(enumeration) => Ok(Patcher::Enum(patch_enum(enumeration, options)?)),
        Target::Value(_) => Err(Error::ValueTarget),
    }
}

///
/// Patcher
///
/// Second stage returned by the dispatcher: feed it the patch definition.
///

#[derive(Debug)]
pub enum Patcher {
    Class(ClassPatch),
    Enum(EnumPatch),
}

impl Patcher {
    pub fn apply(&self, patch: &Target) -> Result<(), Error> {
        match (self, patch) {
            (Self::Class(engine), Target::Class(class)) => engine.apply(class),
            (Self::Enum(engine), Target::Enum(enumeration)) => engine.apply(enumeration),
            (Self::Class(_), other) => Err(Error::TargetMismatch {
                expected: TargetKind::Class,
                found: other.kind(),
            }),
            (Self::Enum(_), other) => Err(Error::TargetMismatch {
                expected: TargetKind::Enum,
                found: other.kind(),
            }),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{fool, fool_patch};

    #[test]
    fn plain_values_are_rejected() {
        for value in [Value::Null, Value::from(3), Value::from("nope")] {
            assert!(matches!(
                patch(&Target::from(value)),
                Err(Error::ValueTarget)
            ));
        }
    }

    #[test]
    fn class_targets_route_to_the_class_engine() {
        let target = fool();
        let patcher = patch(&Target::from(target.clone())).unwrap();
        patcher.apply(&Target::from(fool_patch())).unwrap();
        assert_eq!(target.patches().len(), 1);
    }

    #[test]
    fn enum_targets_route_to_the_enum_engine() {
        let season = Enum::builder("Season").member("a", 0).build();
        let addition = Enum::builder("SeasonPatch").member("b", 3).build();

        let patcher = patch_with(
            &Target::from(season.clone()),
            EnumPatchOptions::default().with_padding(10),
        )
        .unwrap();
        patcher.apply(&Target::from(addition)).unwrap();

        assert_eq!(season.value_of("b"), Some(13));
    }

    #[test]
    fn engine_handles_are_debuggable() {
        let class_patcher = patch(&Target::from(fool())).unwrap();
        assert!(format!("{class_patcher:?}").starts_with("Class"));

        let season = Enum::builder("Season").build();
        let enum_patcher = patch(&Target::from(season)).unwrap();
        assert!(format!("{enum_patcher:?}").starts_with("Enum"));
    }

    #[test]
    fn kind_mismatches_are_rejected_at_apply_time() {
        let class = fool();
        let season = Enum::builder("Season").build();

        let class_patcher = patch(&Target::from(class.clone())).unwrap();
        assert!(matches!(
            class_patcher.apply(&Target::from(season.clone())),
            Err(Error::TargetMismatch {
                expected: TargetKind::Class,
                found: TargetKind::Enum,
            })
        ));

        let enum_patcher = patch(&Target::from(season)).unwrap();
        assert!(matches!(
            enum_patcher.apply(&Target::from(class)),
            Err(Error::TargetMismatch {
                expected: TargetKind::Enum,
                found: TargetKind::Class,
            })
        ));
    }

    #[test]
    fn enum_options_on_a_class_target_are_rejected() {
        let class = fool();
        let err = patch_with(
            &Target::from(class),
            EnumPatchOptions::default().with_padding(4),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnexpectedOptions));
    }
}
