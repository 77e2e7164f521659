//! Lesson pages and their answer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{PageId, UserId};

/// The kind of a lesson page.
///
/// Structural pages (branch ends, clusters) carry no printable answers. The
/// content page type ("branch table") uses its answers as navigation buttons,
/// so they are not printed either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Plain page without a question.
    Plain,
    /// Content-only page whose answers are jump buttons.
    BranchTable,
    EndOfBranch,
    Cluster,
    EndOfCluster,
    ShortAnswer,
    TrueFalse,
    MultiChoice,
    Matching,
    Numerical,
    Essay,
}

impl PageKind {
    /// Returns the stable tag used in markup and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Plain => "plain",
            PageKind::BranchTable => "branchtable",
            PageKind::EndOfBranch => "endofbranch",
            PageKind::Cluster => "cluster",
            PageKind::EndOfCluster => "endofcluster",
            PageKind::ShortAnswer => "shortanswer",
            PageKind::TrueFalse => "truefalse",
            PageKind::MultiChoice => "multichoice",
            PageKind::Matching => "matching",
            PageKind::Numerical => "numerical",
            PageKind::Essay => "essay",
        }
    }

    /// Returns true when the page asks a question whose answers get printed.
    pub fn is_question(&self) -> bool {
        !matches!(
            self,
            PageKind::Plain
                | PageKind::BranchTable
                | PageKind::EndOfBranch
                | PageKind::Cluster
                | PageKind::EndOfCluster
        )
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a page kind tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page kind '{0}'")]
pub struct ParsePageKindError(pub String);

impl FromStr for PageKind {
    type Err = ParsePageKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "" | "plain" => PageKind::Plain,
            "branchtable" => PageKind::BranchTable,
            "endofbranch" => PageKind::EndOfBranch,
            "cluster" => PageKind::Cluster,
            "endofcluster" => PageKind::EndOfCluster,
            "shortanswer" => PageKind::ShortAnswer,
            "truefalse" => PageKind::TrueFalse,
            "multichoice" => PageKind::MultiChoice,
            "matching" => PageKind::Matching,
            "numerical" => PageKind::Numerical,
            "essay" => PageKind::Essay,
            other => return Err(ParsePageKindError(other.to_string())),
        };
        Ok(kind)
    }
}

/// Which half of a matched pair an answer record holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerRole {
    #[default]
    Answer,
    Response,
}

/// One answer attached to a question page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: i64,
    /// Answer HTML as stored by the host.
    pub answer: String,
    /// Optional feedback/response HTML.
    pub response: Option<String>,
    #[serde(default)]
    pub role: AnswerRole,
}

impl AnswerRecord {
    /// Creates an answer-role record.
    pub fn new(id: i64, answer: impl Into<String>) -> Self {
        Self {
            id,
            answer: answer.into(),
            response: None,
            role: AnswerRole::Answer,
        }
    }

    /// Marks the record as the response half of a matched pair.
    pub fn as_response(mut self) -> Self {
        self.role = AnswerRole::Response;
        self
    }
}

/// A page as delivered by the host, before any rewriting.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: PageId,
    pub title: String,
    pub contents: String,
    pub kind: PageKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub modified_by: Option<UserId>,
}

/// A page loaded for export, with its manual position.
///
/// `contents` is rewritten in place as the page moves through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub contents: String,
    pub kind: PageKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub modified_by: Option<UserId>,
    pub position: i64,
    pub answers: Vec<AnswerRecord>,
}

impl Page {
    /// Builds an export page from a host record at the given position.
    pub fn from_record(record: PageRecord, position: i64) -> Self {
        Self {
            id: record.id,
            title: record.title,
            contents: record.contents,
            kind: record.kind,
            created: record.created,
            modified: record.modified,
            modified_by: record.modified_by,
            position,
            answers: Vec::new(),
        }
    }

    /// Returns the destination name registered for this page.
    pub fn destination(&self) -> String {
        format!("pageid-{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_kind_round_trips_through_tag() {
        for kind in [PageKind::TrueFalse, PageKind::Matching, PageKind::BranchTable] {
            assert_eq!(kind.as_str().parse::<PageKind>().unwrap(), kind);
        }
    }

    #[test]
    fn empty_tag_is_plain() {
        assert_eq!("".parse::<PageKind>().unwrap(), PageKind::Plain);
    }

    #[test]
    fn structural_pages_are_not_questions() {
        assert!(!PageKind::Plain.is_question());
        assert!(!PageKind::BranchTable.is_question());
        assert!(!PageKind::Cluster.is_question());
        assert!(PageKind::Essay.is_question());
        assert!(PageKind::Matching.is_question());
    }

    #[test]
    fn response_builder_sets_role() {
        let record = AnswerRecord::new(1, "Paris").as_response();
        assert_eq!(record.role, AnswerRole::Response);
    }
}
