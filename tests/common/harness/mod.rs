//! Test harness for CLI integration tests.
//!
//! Provides isolated test environments backed by a temporary host database,
//! programmatic lesson creation, and CLI assertion helpers using `assert_cmd`.

mod command;
mod env;
mod lesson;

// Re-export main types for external use
#[allow(unused_imports)]
pub use command::LessonCommand;
#[allow(unused_imports)]
pub use env::TestEnv;
#[allow(unused_imports)]
pub use lesson::TestLesson;
