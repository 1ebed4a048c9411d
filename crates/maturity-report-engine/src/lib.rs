pub mod editing;
pub mod io;
pub mod models;
pub mod pacing;
pub mod refine;
pub mod report;
pub mod store;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::*;
pub use models::*;
pub use pacing::{Delays, NoPacer, Pacer, RecordingPacer, ThreadPacer};
pub use refine::{CommandRefiner, Prompts, RefineTask, TextRefiner, refine_report};
pub use report::{Labels, ReportOptions, ReportWriter, WriteSummary, write_report};
pub use store::{DocumentContent, DocumentStore, MemoryStore, StoreError};
