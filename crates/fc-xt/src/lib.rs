pub mod backend;
pub mod discovery;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod snapshot;

#[cfg(test)]
mod fake;

pub use backend::*;
pub use discovery::*;
pub use error::*;
pub use plan::*;
pub use reconciler::*;
pub use snapshot::*;
