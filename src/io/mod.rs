// Presentation adapters: CSV operation scripts in, CSV/JSON exports out

pub mod export;
pub mod script;

pub use export::*;
pub use script::*;
