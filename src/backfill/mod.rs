pub mod orchestrator;
pub mod pipeline;

pub use orchestrator::*;
pub use pipeline::*;
