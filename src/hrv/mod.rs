//! Beat-to-beat interval analysis

pub mod intervals;
pub mod lorenz;

pub use intervals::compute;
pub use lorenz::{PoincareDescriptors, descriptors, project};
