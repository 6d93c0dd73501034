use thiserror::Error;

/// Errors that can occur while writing a mirrored property
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyDiffError {
    /// The property is not part of the mirrored object's schema
    #[error("Property '{name}' is not mirrored by this object")]
    UnknownProperty { name: String },

    /// The property is owned by the paired context and can only change from there
    #[error("Property '{name}' is read-only on this side and should never be written locally")]
    ReadOnly { name: String },
}
