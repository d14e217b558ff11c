pub mod frame;
pub mod metrics;
pub mod retry;
pub mod scheduler;

pub use frame::*;
pub use metrics::*;
pub use retry::*;
pub use scheduler::*;
