pub mod diff_mask;
pub mod error;
pub mod mirrored_properties;
