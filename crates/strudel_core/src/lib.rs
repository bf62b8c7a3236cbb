//! Ambient pattern core library
//!
//! This crate owns the pattern file dialect (parse, validate, render), the
//! read-only views derived from a pattern (analysis and mood suggestions),
//! the pattern text store, and the delayed change queue. HTTP, chat and
//! command line surfaces belong in the server and CLI crates.

#[macro_use]
extern crate lazy_static;

pub mod analysis;
pub mod dialect;
pub mod error;
pub mod mood;
pub mod note;
pub mod pattern;
pub mod queue;
pub mod schema;
pub mod store;

// Re-export commonly used items
pub use analysis::{PatternAnalysis, analyze};
pub use dialect::{ParseError, parse, render};
pub use error::{Error, ErrorKind};
pub use mood::{Mood, MoodSuggestions, suggest};
pub use note::{NoteError, REST, validate_note};
pub use pattern::{ChordSection, DrumSection, MelodySection, Pattern, TimeInterval, Waveform};
pub use queue::{
    CancelOutcome, ChangeQueue, ChangeRequest, ChangeStatus, ExecutionMethod, ExecutionReport,
    FallbackAgent, Outcome, QueuedChange, Scheduled,
};
pub use schema::{SchemaViolation, validate};
pub use store::PatternStore;
