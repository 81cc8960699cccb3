pub mod registry;

pub use registry::{NodeRegistry, UNKNOWN_REGION};
