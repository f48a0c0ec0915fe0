//! Course memory lifecycle: save, find, promote, recall and summarize.
//!
//! Components work against [`scholar_rs_memory::MemoryStore`] and branch on
//! its optional vector capability. [`MemoryService`] wraps them behind an
//! API that never returns errors.

pub mod embedding;
pub mod error;
pub mod history;
pub mod matcher;
pub mod promoter;
pub mod recall;
pub mod service;
mod settings;
pub mod summarizer;
pub mod writer;

pub use embedding::LlmEmbedder;
pub use error::{CoreError, NotFoundReason};
pub use history::{SessionHistory, Turn};
pub use matcher::MemoryMatcher;
pub use promoter::{
    ForgetOutcome, MemoryPromoter, PromoteOutcome, PromoteTarget, long_term_course_key,
};
pub use recall::{MemoryRecaller, Recall, format_context};
pub use service::{
    DEFAULT_DB_PATH, FindOutcome, MemoryService, MemoryServiceBuilder, open_sqlite_store,
};
pub use summarizer::{CourseSummarizer, SummaryCadence, SummaryOutcome};
pub use writer::MemoryWriter;
