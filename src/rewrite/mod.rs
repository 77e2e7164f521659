//! Per-page HTML rewriting: navigation links, answers and media references.

mod answers;
mod links;
mod media;

pub use answers::{answer_block, append_answers};
pub use links::{LinkRewrite, LinkRewriter, page_target};
pub use media::{MediaRef, MediaResolver};
