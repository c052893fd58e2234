pub mod codec;
pub mod fetch;

pub use codec::*;
pub use fetch::*;
