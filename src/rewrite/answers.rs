//! Appends printable answer blocks to question pages.

use crate::domain::{AnswerRole, Page, PageKind};

/// Returns the answer block for a page, or `None` when nothing is appended.
///
/// Plain and content-only pages never get a block. Matching questions only
/// print the answer half of each pair; response-role records are skipped.
/// Answers keep their input order.
pub fn answer_block(page: &Page) -> Option<String> {
    if !page.kind.is_question() {
        return None;
    }

    let tag = page.kind.as_str();
    let items: Vec<String> = page
        .answers
        .iter()
        .filter(|a| page.kind != PageKind::Matching || a.role == AnswerRole::Answer)
        .map(|a| {
            format!(
                r#"<div class="lessonexport-answer lessonexport-answer-{tag}">{}</div>"#,
                a.answer
            )
        })
        .collect();

    if items.is_empty() {
        return None;
    }

    Some(format!(
        r#"<div class="lessonexport-answers">{}</div>"#,
        items.concat()
    ))
}

/// Appends the answer block to the page contents, returning true if anything
/// was added.
pub fn append_answers(page: &mut Page) -> bool {
    match answer_block(page) {
        Some(block) => {
            page.contents.push_str(&block);
            true
        }
        None => false,
    }
}
