use thiserror::Error;

use orb_shared::{ObserverError, PropertyDiffError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// The shadow refused a method call
    #[error(transparent)]
    Observer(#[from] ObserverError),

    /// The shadow refused a property write
    #[error(transparent)]
    Property(#[from] PropertyDiffError),
}
