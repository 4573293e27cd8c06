use rusqlite::types::Value;
use rusqlite::vtab::array::{self, Array};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const STORE_FILE: &str = "lms.sqlite3";

/// Moodle context level for courses.
pub const CONTEXT_COURSE: i64 = 50;

// Mirrors the host platform's tables, trimmed to the columns reports read.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS course(
        id INTEGER PRIMARY KEY,
        fullname TEXT NOT NULL,
        shortname TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS course_sections(
        id INTEGER PRIMARY KEY,
        course INTEGER NOT NULL,
        section INTEGER NOT NULL,
        name TEXT
    )",
    "CREATE TABLE IF NOT EXISTS user(
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL,
        firstname TEXT NOT NULL,
        lastname TEXT NOT NULL,
        email TEXT NOT NULL DEFAULT '',
        suspended INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS role(
        id INTEGER PRIMARY KEY,
        shortname TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS context(
        id INTEGER PRIMARY KEY,
        contextlevel INTEGER NOT NULL,
        instanceid INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS role_assignments(
        id INTEGER PRIMARY KEY,
        roleid INTEGER NOT NULL,
        contextid INTEGER NOT NULL,
        userid INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS enrol(
        id INTEGER PRIMARY KEY,
        courseid INTEGER NOT NULL,
        status INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS user_enrolments(
        id INTEGER PRIMARY KEY,
        enrolid INTEGER NOT NULL,
        userid INTEGER NOT NULL,
        status INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS user_lastaccess(
        id INTEGER PRIMARY KEY,
        userid INTEGER NOT NULL,
        courseid INTEGER NOT NULL,
        timeaccess INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS modules(
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS course_modules(
        id INTEGER PRIMARY KEY,
        course INTEGER NOT NULL,
        module INTEGER NOT NULL,
        instance INTEGER NOT NULL,
        section INTEGER NOT NULL,
        visible INTEGER NOT NULL DEFAULT 1,
        deletioninprogress INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS grade_items(
        id INTEGER PRIMARY KEY,
        courseid INTEGER NOT NULL,
        itemtype TEXT NOT NULL,
        itemmodule TEXT,
        iteminstance INTEGER,
        itemname TEXT,
        grademax REAL NOT NULL DEFAULT 100
    )",
    "CREATE TABLE IF NOT EXISTS grade_grades(
        id INTEGER PRIMARY KEY,
        itemid INTEGER NOT NULL,
        userid INTEGER NOT NULL,
        finalgrade REAL,
        usermodified INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS logstore_standard_log(
        id INTEGER PRIMARY KEY,
        action TEXT NOT NULL,
        crud TEXT NOT NULL DEFAULT 'r',
        origin TEXT NOT NULL DEFAULT 'web',
        contextinstanceid INTEGER,
        userid INTEGER NOT NULL DEFAULT 0,
        courseid INTEGER NOT NULL,
        ip TEXT,
        timecreated INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS quiz(
        id INTEGER PRIMARY KEY,
        course INTEGER NOT NULL,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS quiz_attempts(
        id INTEGER PRIMARY KEY,
        quiz INTEGER NOT NULL,
        userid INTEGER NOT NULL,
        attempt INTEGER NOT NULL,
        state TEXT NOT NULL,
        timestart INTEGER NOT NULL DEFAULT 0,
        timefinish INTEGER NOT NULL DEFAULT 0,
        preview INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_course_sections_course ON course_sections(course)",
    "CREATE INDEX IF NOT EXISTS idx_context_instance ON context(contextlevel, instanceid)",
    "CREATE INDEX IF NOT EXISTS idx_role_assignments_context ON role_assignments(contextid, roleid)",
    "CREATE INDEX IF NOT EXISTS idx_course_modules_course ON course_modules(course, section)",
    "CREATE INDEX IF NOT EXISTS idx_grade_items_course ON grade_items(courseid)",
    "CREATE INDEX IF NOT EXISTS idx_grade_grades_item ON grade_grades(itemid, userid)",
    "CREATE INDEX IF NOT EXISTS idx_log_course_action ON logstore_standard_log(courseid, action)",
    "CREATE INDEX IF NOT EXISTS idx_quiz_attempts_quiz ON quiz_attempts(quiz, userid)",
];

pub fn store_path(dir: &Path) -> PathBuf {
    dir.join(STORE_FILE)
}

/// Opens (creating if needed) the store under `dir` and makes sure the
/// mirrored tables exist. Report code never writes through this handle.
pub fn open_db(dir: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(dir)?;
    let conn = Connection::open(store_path(dir))?;
    prepare(&conn)?;
    Ok(conn)
}

/// Registers `rarray()` and creates any missing tables. Every connection
/// report code reads through must pass here first.
pub fn prepare(conn: &Connection) -> rusqlite::Result<()> {
    array::load_module(conn)?;
    ensure_schema(conn)
}

pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    for stmt in SCHEMA {
        conn.execute(stmt, [])?;
    }
    Ok(())
}

/// One bound parameter for `col IN rarray(?)`, however many ids there are.
pub fn id_set(ids: &[i64]) -> Array {
    Rc::new(ids.iter().copied().map(Value::Integer).collect())
}

pub fn text_set<S: AsRef<str>>(items: &[S]) -> Array {
    Rc::new(items.iter().map(|s| Value::Text(s.as_ref().to_string())).collect())
}
