//! CLI command handlers, one per file.

mod cached;
mod course;
mod forget;

pub use cached::run_cached;
pub use course::run_course;
pub use forget::run_forget;
