//! In-memory store seeding for unit tests.

use crate::db::{prepare, CONTEXT_COURSE};
use rusqlite::{params, Connection};

pub const STUDENT_ROLE: i64 = 5;
pub const EDITING_TEACHER_ROLE: i64 = 3;

pub struct Fixture {
    pub conn: Connection,
}

fn context_id(course_id: i64) -> i64 {
    1000 + course_id
}

impl Fixture {
    /// Schema only.
    pub fn bare() -> Self {
        let conn = Connection::open_in_memory().expect("open in-memory store");
        prepare(&conn).expect("schema");
        Self { conn }
    }

    /// Schema plus the stock roles and module types.
    pub fn new() -> Self {
        let fx = Self::bare();
        fx.conn
            .execute_batch(
                "INSERT INTO role(id, shortname) VALUES
                    (1, 'manager'), (3, 'editingteacher'), (4, 'teacher'), (5, 'student');
                 INSERT INTO modules(id, name) VALUES
                    (1, 'assign'), (2, 'quiz'), (3, 'resource'), (4, 'forum'), (5, 'page');",
            )
            .expect("seed roles");
        fx
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
                params![context_id(id), CONTEXT_COURSE, id],
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

    fn assign_role(&self, course_id: i64, user_id: i64, role_id: i64) {
        self.conn
            .execute(
                "INSERT INTO role_assignments(roleid, contextid, userid) VALUES (?, ?, ?)",
                params![role_id, context_id(course_id), user_id],
            )
            .expect("role assignment");
    }

    /// Enrolled, active student.
    pub fn student(&self, course_id: i64, user_id: i64, firstname: &str, lastname: &str) {
        self.user(user_id, firstname, lastname);
        self.assign_role(course_id, user_id, STUDENT_ROLE);
        self.conn
            .execute(
                "INSERT INTO user_enrolments(enrolid, userid, status) VALUES (?, ?, 0)",
                params![course_id, user_id],
            )
            .expect("enrolment");
    }

    /// `n` students with ids `first_id..first_id + n`.
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
        self.assign_role(course_id, user_id, EDITING_TEACHER_ROLE);
    }

    pub fn last_access(&self, course_id: i64, user_id: i64, at: i64) {
        self.conn
            .execute(
                "INSERT INTO user_lastaccess(userid, courseid, timeaccess) VALUES (?, ?, ?)",
                params![user_id, course_id, at],
            )
            .expect("lastaccess");
    }

    fn module_id(&self, modname: &str) -> i64 {
        self.conn
            .execute("INSERT OR IGNORE INTO modules(name) VALUES (?)", [modname])
            .expect("module type");
        self.conn
            .query_row("SELECT id FROM modules WHERE name = ?", [modname], |r| {
                r.get(0)
            })
            .expect("module id")
    }

    /// A course module without a grade item. Its instance id is the cmid.
    pub fn module(&self, cmid: i64, course_id: i64, section_id: i64, modname: &str) {
        let module = self.module_id(modname);
        self.conn
            .execute(
                "INSERT INTO course_modules(id, course, module, instance, section)
                 VALUES (?, ?, ?, ?, ?)",
                params![cmid, course_id, module, cmid, section_id],
            )
            .expect("course module");
    }

    /// A course module plus its grade item (grademax 100).
    pub fn activity(
        &self,
        cmid: i64,
        item_id: i64,
        course_id: i64,
        section_id: i64,
        modname: &str,
        name: &str,
    ) {
        self.module(cmid, course_id, section_id, modname);
        self.conn
            .execute(
                "INSERT INTO grade_items(id, courseid, itemtype, itemmodule, iteminstance, itemname, grademax)
                 VALUES (?, ?, 'mod', ?, ?, ?, 100)",
                params![item_id, course_id, modname, cmid, name],
            )
            .expect("grade item");
    }

    pub fn manual_grade_item(&self, item_id: i64, course_id: i64, name: &str) {
        self.conn
            .execute(
                "INSERT INTO grade_items(id, courseid, itemtype, itemname) VALUES (?, ?, 'manual', ?)",
                params![item_id, course_id, name],
            )
            .expect("manual item");
    }

    pub fn set_grademax(&self, item_id: i64, grademax: f64) {
        self.conn
            .execute(
                "UPDATE grade_items SET grademax = ? WHERE id = ?",
                params![grademax, item_id],
            )
            .expect("grademax");
    }

    pub fn hide_module(&self, cmid: i64) {
        self.conn
            .execute("UPDATE course_modules SET visible = 0 WHERE id = ?", [cmid])
            .expect("hide");
    }

    pub fn mark_deleting(&self, cmid: i64) {
        self.conn
            .execute(
                "UPDATE course_modules SET deletioninprogress = 1 WHERE id = ?",
                [cmid],
            )
            .expect("deleting");
    }

    pub fn grade(&self, item_id: i64, user_id: i64, finalgrade: Option<f64>, modifier: Option<i64>) {
        self.conn
            .execute(
                "INSERT INTO grade_grades(itemid, userid, finalgrade, usermodified) VALUES (?, ?, ?, ?)",
                params![item_id, user_id, finalgrade, modifier],
            )
            .expect("grade");
    }

    /// Graded and submitted by the student themselves.
    pub fn graded(&self, item_id: i64, user_id: i64, finalgrade: f64) {
        self.grade(item_id, user_id, Some(finalgrade), Some(user_id));
    }

    pub fn log(&self, entry: LogEntry<'_>) {
        self.conn
            .execute(
                "INSERT INTO logstore_standard_log(action, crud, origin, contextinstanceid, userid, courseid, ip, timecreated)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    entry.action,
                    entry.crud,
                    entry.origin,
                    entry.cmid,
                    entry.user_id,
                    entry.course_id,
                    entry.ip,
                    entry.at
                ],
            )
            .expect("log");
    }

    pub fn quiz(&self, quiz_id: i64, course_id: i64, name: &str) {
        self.conn
            .execute(
                "INSERT INTO quiz(id, course, name) VALUES (?, ?, ?)",
                params![quiz_id, course_id, name],
            )
            .expect("quiz");
    }

    pub fn quiz_module(&self, cmid: i64, course_id: i64, section_id: i64, quiz_id: i64) {
        let module = self.module_id("quiz");
        self.conn
            .execute(
                "INSERT INTO course_modules(id, course, module, instance, section)
                 VALUES (?, ?, ?, ?, ?)",
                params![cmid, course_id, module, quiz_id, section_id],
            )
            .expect("quiz module");
    }

    pub fn attempt(&self, a: Attempt<'_>) {
        self.conn
            .execute(
                "INSERT INTO quiz_attempts(quiz, userid, attempt, state, timestart, timefinish, preview)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    a.quiz_id,
                    a.user_id,
                    a.number,
                    a.state,
                    a.start,
                    a.finish,
                    a.preview as i64
                ],
            )
            .expect("attempt");
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LogEntry<'a> {
    pub course_id: i64,
    pub user_id: i64,
    pub cmid: Option<i64>,
    pub action: &'a str,
    pub crud: &'a str,
    pub origin: &'a str,
    pub ip: Option<&'a str>,
    pub at: i64,
}

impl<'a> LogEntry<'a> {
    /// A web "viewed" read event.
    pub fn view(course_id: i64, user_id: i64, at: i64) -> Self {
        Self {
            course_id,
            user_id,
            cmid: None,
            action: "viewed",
            crud: "r",
            origin: "web",
            ip: None,
            at,
        }
    }

    pub fn on(mut self, cmid: i64) -> Self {
        self.cmid = Some(cmid);
        self
    }

    pub fn from_ip(mut self, ip: &'a str) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn action(mut self, action: &'a str, crud: &'a str) -> Self {
        self.action = action;
        self.crud = crud;
        self
    }

    pub fn origin(mut self, origin: &'a str) -> Self {
        self.origin = origin;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub quiz_id: i64,
    pub user_id: i64,
    pub number: i64,
    pub state: &'a str,
    pub start: i64,
    pub finish: i64,
    pub preview: bool,
}

impl<'a> Attempt<'a> {
    pub fn finished(quiz_id: i64, user_id: i64, number: i64, start: i64, minutes: i64) -> Self {
        Self {
            quiz_id,
            user_id,
            number,
            state: "finished",
            start,
            finish: start + minutes * 60,
            preview: false,
        }
    }
}
