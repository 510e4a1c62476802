use crate::{dispatch::TargetKind, member::Slot, unpatched::Category};
use thiserror::Error as ThisError;

///
/// Error
///
/// Crate-wide error type. Every failure is synchronous: patch-time
/// validation errors are raised before any mutation of the target,
/// while unresolvable super references surface at call time as
/// `AttributeNotFound` (late-bound by design).
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("cannot patch a plain value")]
    ValueTarget,

    #[error("cannot patch built-in class '{0}'")]
    BuiltinClass(String),

    #[error("target mismatch: the patcher expects {expected}, got {found}")]
    TargetMismatch {
        expected: TargetKind,
        found: TargetKind,
    },

    #[error("enum patch options are not valid for a class target")]
    UnexpectedOptions,

    #[error("padding cannot be negative (got {0})")]
    NegativePadding(i64),

    #[error("rich attributes require a rich enum target ('{0}' is not rich)")]
    NotRichEnum(String),

    #[error("padding {padding} overflows the value of member '{name}'")]
    PaddingOverflow { name: String, padding: i64 },

    #[error("attribute '{0}' is already reserved for rich metadata")]
    RichAttrCollision(String),

    #[error("unsupported member category '{0}'")]
    UnsupportedCategory(Category),

    #[error("unsupported property slot '{0}'")]
    UnsupportedSlot(Slot),

    #[error("enum '{target}' already defines member '{name}'")]
    DuplicateEnumMember { target: String, name: String },

    #[error("'{class}' has no attribute '{name}'")]
    AttributeNotFound { class: String, name: String },

    #[error("attribute '{name}' of '{class}' is not callable")]
    NotCallable { class: String, name: String },

    #[error("attribute '{name}' of '{class}' cannot be read as a value")]
    NotReadable { class: String, name: String },

    #[error("property '{name}' of '{class}' has no {slot} slot")]
    MissingSlot {
        class: String,
        name: String,
        slot: Slot,
    },

    #[error("member '{name}' of '{class}' requires an instance")]
    RequiresInstance { class: String, name: String },

    /// Raised by member bodies themselves; the engine passes argument
    /// slices through unchecked.
    #[error("member '{name}' of '{class}' takes {expected} arguments, got {found}")]
    Arity {
        class: String,
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("super proxy target class has been dropped")]
    DanglingSuper,
}

impl Error {
    /// Shorthand for the late-bound lookup failure used across resolution paths.
    pub(crate) fn not_found(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            class: class.into(),
            name: name.into(),
        }
    }
}
