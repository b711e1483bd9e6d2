mod log;
mod registry;

pub use log::*;
pub use registry::*;
