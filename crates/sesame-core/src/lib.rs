pub mod config;
pub mod error;
pub mod presets;
pub mod store;

pub use error::{SesameError, SesameResult};
pub use store::{EnvelopeStore, FileStore, MemoryStore};
