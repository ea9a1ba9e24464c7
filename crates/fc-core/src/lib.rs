pub mod chain;
pub mod config;
pub mod error;
pub mod policy;
pub mod record;
pub mod resource;

pub use chain::*;
pub use config::*;
pub use error::*;
pub use policy::*;
pub use record::*;
pub use resource::*;
