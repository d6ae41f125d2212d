//! Ingestion pipeline: decryption, parsing, selection, import

pub mod commit;
pub mod decrypt;
pub mod orchestrator;
pub mod parser;
pub mod selection;

pub use commit::*;
pub use decrypt::*;
pub use orchestrator::*;
pub use parser::*;
pub use selection::*;
