pub mod node;
pub mod pool;
pub mod subscription;

pub use node::*;
pub use pool::*;
pub use subscription::*;
