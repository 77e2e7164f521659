//! Builder for test lessons with sensible defaults.

#![allow(dead_code)]

use rusqlite::{Connection, params};

/// A page row of a [`TestLesson`].
#[derive(Debug, Clone)]
pub struct TestPage {
    pub id: i64,
    pub title: String,
    pub contents: String,
    pub qtype: String,
    pub modified: i64,
    pub answers: Vec<String>,
}

/// Builder for a lesson, its course module and its pages.
///
/// The course module id is `lesson id + 100` and the context id is
/// `lesson id + 200`.
#[derive(Debug, Clone)]
pub struct TestLesson {
    id: i64,
    name: String,
    intro: String,
    group_mode: i64,
    modified_by: Option<i64>,
    has_module: bool,
    pages: Vec<TestPage>,
}

impl TestLesson {
    /// Creates an empty lesson.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            intro: String::new(),
            group_mode: 0,
            modified_by: None,
            has_module: true,
            pages: Vec::new(),
        }
    }

    /// The "Intro" lesson: a welcome page then a true/false question whose
    /// only answer is "True".
    pub fn intro() -> Self {
        Self::new(1, "Intro")
            .with_intro("<p>Getting started</p>")
            .page(10, "Welcome", "<p>Hello class</p>")
            .question(11, "Quiz", "<p>Is it?</p>", "truefalse", &["True"])
    }

    pub fn with_intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = intro.into();
        self
    }

    pub fn group_mode(mut self, mode: i64) -> Self {
        self.group_mode = mode;
        self
    }

    /// Leaves the lesson without a course module, so it cannot be exported.
    pub fn without_module(mut self) -> Self {
        self.has_module = false;
        self
    }

    /// Sets the last modifier of every page.
    pub fn modified_by(mut self, user: i64) -> Self {
        self.modified_by = Some(user);
        self
    }

    /// Adds a plain content page.
    pub fn page(self, id: i64, title: &str, contents: &str) -> Self {
        self.question(id, title, contents, "plain", &[])
    }

    /// Adds a page of the given question type with its answers.
    pub fn question(
        mut self,
        id: i64,
        title: &str,
        contents: &str,
        qtype: &str,
        answers: &[&str],
    ) -> Self {
        self.pages.push(TestPage {
            id,
            title: title.to_string(),
            contents: contents.to_string(),
            qtype: qtype.to_string(),
            modified: 1_000,
            answers: answers.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn module_id(&self) -> i64 {
        self.id + 100
    }

    pub fn context_id(&self) -> i64 {
        self.id + 200
    }

    /// Inserts the lesson into host tables.
    pub fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO lessons (id, name, intro) VALUES (?1, ?2, ?3)",
            params![self.id, self.name, self.intro],
        )?;
        if self.has_module {
            conn.execute(
                "INSERT INTO course_modules (id, lesson_id, context_id, group_mode)
                 VALUES (?1, ?2, ?3, ?4)",
                params![self.module_id(), self.id, self.context_id(), self.group_mode],
            )?;
        }

        for page in &self.pages {
            conn.execute(
                "INSERT INTO lesson_pages
                    (id, lesson_id, title, contents, qtype, time_created, time_modified, modified_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)",
                params![
                    page.id,
                    self.id,
                    page.title,
                    page.contents,
                    page.qtype,
                    page.modified,
                    self.modified_by
                ],
            )?;
            for answer in &page.answers {
                conn.execute(
                    "INSERT INTO lesson_answers (page_id, answer) VALUES (?1, ?2)",
                    params![page.id, answer],
                )?;
            }
        }
        Ok(())
    }
}
