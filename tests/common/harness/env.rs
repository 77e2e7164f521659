//! Isolated test environment with temp directory.

#![allow(dead_code)]

use super::{LessonCommand, TestLesson};
use lessonexport::host::SqliteHost;
use rusqlite::params;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SITE_URL: &str = "https://school.example";

/// Isolated test environment: a host database, a config file and an
/// output directory inside one temporary directory.
pub struct TestEnv {
    /// The temporary directory (kept for lifetime management)
    _temp_dir: TempDir,
    root: PathBuf,
    publish_email: Option<String>,
}

impl TestEnv {
    /// Creates a new environment with an empty host database and a config
    /// that leaves PDFs unprotected.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        let env = Self {
            _temp_dir: temp_dir,
            root,
            publish_email: None,
        };
        env.host();
        env.write_config();
        env
    }

    /// Sets the publish address used by the sweep.
    pub fn with_publish_email(mut self, email: &str) -> Self {
        self.publish_email = Some(email.to_string());
        self.write_config();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join("site.db")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Directory scheduled exports are written to.
    pub fn export_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    fn write_config(&self) {
        let mut config = format!(
            "site_url = \"{SITE_URL}\"\npdf_blocked_permissions = []\ntemp_dir = '{}'\n",
            self.export_dir().display()
        );
        if let Some(email) = &self.publish_email {
            config.push_str(&format!("publish_email = \"{email}\"\n"));
        }
        std::fs::write(self.config_path(), config).expect("Failed to write config");
    }

    /// Opens the host database.
    pub fn host(&self) -> SqliteHost {
        SqliteHost::open(&self.database_path(), SITE_URL).expect("Failed to open host database")
    }

    /// Inserts a lesson with its pages.
    pub fn add_lesson(&self, lesson: &TestLesson) {
        lesson
            .insert(self.host().conn())
            .expect("Failed to insert lesson");
    }

    pub fn add_user(&self, id: i64, first: &str, last: &str) {
        self.host()
            .conn()
            .execute(
                "INSERT INTO users (id, firstname, lastname) VALUES (?1, ?2, ?3)",
                params![id, first, last],
            )
            .expect("Failed to insert user");
    }

    /// Grants a capability site-wide.
    pub fn grant(&self, user: i64, capability: &str) {
        self.host()
            .conn()
            .execute(
                "INSERT INTO user_capabilities (user_id, capability) VALUES (?1, ?2)",
                params![user, capability],
            )
            .expect("Failed to grant capability");
    }

    /// Sets the modification time of a page.
    pub fn touch_page(&self, page: i64, modified: i64) {
        self.host()
            .conn()
            .execute(
                "UPDATE lesson_pages SET time_modified = ?1 WHERE id = ?2",
                params![modified, page],
            )
            .expect("Failed to touch page");
    }

    /// Creates a LessonCommand configured for this environment.
    pub fn cmd(&self) -> LessonCommand {
        LessonCommand::new()
            .config(&self.config_path())
            .database(&self.database_path())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
