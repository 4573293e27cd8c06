#![allow(dead_code)]

use rusqlite::{params, Connection};
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const STUDENT_ROLE: i64 = 5;
pub const EDITING_TEACHER_ROLE: i64 = 3;
pub const CONTEXT_COURSE: i64 = 50;

/// 2024-03-01T00:00:00Z.
pub const MAR_1: i64 = 1_709_251_200;
pub const HOUR: i64 = 3_600;
pub const DAY: i64 = 86_400;

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// Starts the sidecar with a config file written into `dir`, so nothing
/// from the user's environment leaks in.
pub fn spawn_sidecar(dir: &Path) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let config = dir.join("coursestatsd.toml");
    std::fs::write(
        &config,
        "[logging]\nlevel = \"warn\"\n\n[reports]\nutc_offset = \"+00:00\"\n",
    )
    .expect("write config");

    let exe = env!("CARGO_BIN_EXE_coursestatsd");
    let mut child = Command::new(exe)
        .arg("--config")
        .arg(&config)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn coursestatsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn send_line(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    line: &str,
) -> serde_json::Value {
    writeln!(stdin, "{}", line).expect("write request");
    stdin.flush().expect("flush request");
    let mut out = String::new();
    reader.read_line(&mut out).expect("read response line");
    assert!(!out.trim().is_empty(), "empty response for {}", line);
    serde_json::from_str(out.trim()).expect("parse response json")
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_line(stdin, reader, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().expect("result")
}

/// Returns the error code.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
        .to_string()
}

/// Direct writer for the store the sidecar reads. Open it after
/// `store.open` so the schema exists.
pub struct Seed {
    pub conn: Connection,
}

impl Seed {
    pub fn open(dir: &Path) -> Self {
        let conn = Connection::open(dir.join("lms.sqlite3")).expect("open store");
        conn.execute_batch(
            "INSERT OR IGNORE INTO role(id, shortname) VALUES
                (1, 'manager'), (3, 'editingteacher'), (4, 'teacher'), (5, 'student');
             INSERT OR IGNORE INTO modules(id, name) VALUES
                (1, 'assign'), (2, 'quiz'), (3, 'resource'), (4, 'forum'), (5, 'page');",
        )
        .expect("seed roles");
        Self { conn }
    }

    pub fn course(&self, id: i64, fullname: &str, shortname: &str) {
        self.conn
            .execute(
                "INSERT INTO course(id, fullname, shortname) VALUES (?, ?, ?)",
                params![id, fullname, shortname],
            )
            .expect("course");
        self.conn
            .execute(
                "INSERT INTO context(id, contextlevel, instanceid) VALUES (?, ?, ?)",
                params![1000 + id, CONTEXT_COURSE, id],
            )
            .expect("context");
        self.conn
            .execute(
                "INSERT INTO enrol(id, courseid, status) VALUES (?, ?, 0)",
                params![id, id],
            )
            .expect("enrol");
    }

    pub fn section(&self, id: i64, course_id: i64, number: i64, name: Option<&str>) {
        self.conn
            .execute(
                "INSERT INTO course_sections(id, course, section, name) VALUES (?, ?, ?, ?)",
                params![id, course_id, number, name],
            )
            .expect("section");
    }

    fn user(&self, id: i64, firstname: &str, lastname: &str) {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO user(id, username, firstname, lastname, email)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    id,
                    format!("user{id}"),
                    firstname,
                    lastname,
                    format!("user{id}@example.test")
                ],
            )
            .expect("user");
    }

    fn role(&self, course_id: i64, user_id: i64, role_id: i64) {
        self.conn
            .execute(
                "INSERT INTO role_assignments(roleid, contextid, userid) VALUES (?, ?, ?)",
                params![role_id, 1000 + course_id, user_id],
            )
            .expect("role assignment");
    }

    pub fn student(&self, course_id: i64, user_id: i64, firstname: &str, lastname: &str) {
        self.user(user_id, firstname, lastname);
        self.role(course_id, user_id, STUDENT_ROLE);
        self.conn
            .execute(
                "INSERT INTO user_enrolments(enrolid, userid, status) VALUES (?, ?, 0)",
                params![course_id, user_id],
            )
            .expect("enrolment");
    }

    pub fn students(&self, course_id: i64, first_id: i64, n: i64) -> Vec<i64> {
        (first_id..first_id + n)
            .map(|id| {
                self.student(course_id, id, &format!("First{id}"), &format!("Last{id:04}"));
                id
            })
            .collect()
    }

    pub fn teacher(&self, course_id: i64, user_id: i64) {
        self.user(user_id, "Tess", "Teacher");
        self.role(course_id, user_id, EDITING_TEACHER_ROLE);
    }

    /// Course module plus grade item (grademax 100); instance is the cmid.
    pub fn activity(&self, cmid: i64, item_id: i64, course_id: i64, section_id: i64, modname: &str, name: &str) {
        self.module(cmid, course_id, section_id, modname);
        self.conn
            .execute(
                "INSERT INTO grade_items(id, courseid, itemtype, itemmodule, iteminstance, itemname, grademax)
                 VALUES (?, ?, 'mod', ?, ?, ?, 100)",
                params![item_id, course_id, modname, cmid, name],
            )
            .expect("grade item");
    }

    pub fn module(&self, cmid: i64, course_id: i64, section_id: i64, modname: &str) {
        self.conn
            .execute(
                "INSERT INTO course_modules(id, course, module, instance, section)
                 SELECT ?, ?, id, ?, ? FROM modules WHERE name = ?",
                params![cmid, course_id, cmid, section_id, modname],
            )
            .expect("course module");
    }

    pub fn graded(&self, item_id: i64, user_id: i64, finalgrade: f64) {
        self.conn
            .execute(
                "INSERT INTO grade_grades(itemid, userid, finalgrade, usermodified) VALUES (?, ?, ?, ?)",
                params![item_id, user_id, finalgrade, user_id],
            )
            .expect("grade");
    }

    pub fn log(&self, course_id: i64, user_id: i64, action: &str, cmid: Option<i64>, ip: Option<&str>, at: i64) {
        let crud = if action == "viewed" { "r" } else { "c" };
        self.conn
            .execute(
                "INSERT INTO logstore_standard_log(action, crud, origin, contextinstanceid, userid, courseid, ip, timecreated)
                 VALUES (?, ?, 'web', ?, ?, ?, ?, ?)",
                params![action, crud, cmid, user_id, course_id, ip, at],
            )
            .expect("log");
    }

    pub fn quiz(&self, quiz_id: i64, cmid: i64, course_id: i64, section_id: i64, name: &str) {
        self.conn
            .execute(
                "INSERT INTO quiz(id, course, name) VALUES (?, ?, ?)",
                params![quiz_id, course_id, name],
            )
            .expect("quiz");
        self.conn
            .execute(
                "INSERT INTO course_modules(id, course, module, instance, section)
                 SELECT ?, ?, id, ?, ? FROM modules WHERE name = 'quiz'",
                params![cmid, course_id, quiz_id, section_id],
            )
            .expect("quiz module");
    }

    pub fn attempt(&self, quiz_id: i64, user_id: i64, number: i64, start: i64, minutes: i64) {
        self.conn
            .execute(
                "INSERT INTO quiz_attempts(quiz, userid, attempt, state, timestart, timefinish, preview)
                 VALUES (?, ?, ?, 'finished', ?, ?, 0)",
                params![quiz_id, user_id, number, start, start + minutes * 60],
            )
            .expect("attempt");
    }
}

/// Raw response line, for byte-level comparisons.
pub fn request_raw(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut out = String::new();
    reader.read_line(&mut out).expect("read response line");
    out.trim_end().to_string()
}
