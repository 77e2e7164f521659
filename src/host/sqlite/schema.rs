//! Host tables.

use rusqlite::Connection;

/// Creates the host tables.
///
/// Idempotent; calling it on an existing database is safe. Timestamps are
/// unix seconds, as the host stores them.
///
/// # Tables Created
/// - `lessons` - Lesson name and intro
/// - `course_modules` - Placement of each lesson: module, context, group mode
/// - `lesson_pages` - Page title, contents, question type and timestamps
/// - `lesson_answers` - Answers of question pages
/// - `users` - Display names
/// - `user_capabilities` - Granted capabilities, site-wide when `context_id` is NULL
/// - `group_members` - Group membership
/// - `files` - Stored files addressed like media URLs
pub fn create_host_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL DEFAULT 1,
            name TEXT NOT NULL,
            intro TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS course_modules (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL UNIQUE REFERENCES lessons(id),
            context_id INTEGER NOT NULL,
            group_mode INTEGER NOT NULL DEFAULT 0
        );",
    )?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS lesson_pages (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL REFERENCES lessons(id),
            title TEXT NOT NULL,
            contents TEXT NOT NULL DEFAULT '',
            qtype TEXT NOT NULL DEFAULT 'plain',
            time_created INTEGER NOT NULL DEFAULT 0,
            time_modified INTEGER NOT NULL DEFAULT 0,
            modified_by INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_lesson_pages_lesson ON lesson_pages(lesson_id);
        CREATE INDEX IF NOT EXISTS idx_lesson_pages_modified ON lesson_pages(time_modified);

        CREATE TABLE IF NOT EXISTS lesson_answers (
            id INTEGER PRIMARY KEY,
            page_id INTEGER NOT NULL REFERENCES lesson_pages(id),
            answer TEXT NOT NULL DEFAULT '',
            response TEXT,
            role TEXT NOT NULL DEFAULT 'answer' CHECK (role IN ('answer', 'response'))
        );",
    )?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            firstname TEXT NOT NULL DEFAULT '',
            lastname TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS user_capabilities (
            user_id INTEGER NOT NULL,
            capability TEXT NOT NULL,
            context_id INTEGER
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            PRIMARY KEY (group_id, user_id)
        );",
    )?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY,
            context_id INTEGER NOT NULL,
            component TEXT NOT NULL,
            file_area TEXT NOT NULL,
            item_id INTEGER NOT NULL DEFAULT 0,
            file_path TEXT NOT NULL DEFAULT '/',
            file_name TEXT NOT NULL,
            mime_type TEXT,
            content BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_files_name ON files(context_id, file_name);",
    )?;

    Ok(())
}
