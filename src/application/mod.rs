// Application layer - use cases and orchestration

mod config;
mod error;
mod identity;
mod service;
pub mod validation;

pub use config::*;
pub use error::*;
pub use identity::*;
pub use service::*;
