use crate::db::{id_set, text_set};
use crate::error::Result;
use rusqlite::{params_from_iter, Connection, ToSql};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub user_id: i64,
    pub cmid: Option<i64>,
    pub ip: Option<String>,
    pub crud: String,
    pub timecreated: i64,
}

/// Filters for one bulk read of the standard log. Unset filters do not
/// restrict; an empty set matches nothing.
#[derive(Debug, Clone)]
pub struct LogQuery<'a> {
    pub course_id: i64,
    pub actions: Option<&'a [&'a str]>,
    pub cmids: Option<&'a [i64]>,
    pub user_ids: Option<&'a [i64]>,
    pub origin: Option<&'a str>,
    pub window: Option<(i64, i64)>,
    pub ip_not_null: bool,
}

impl<'a> LogQuery<'a> {
    pub fn new(course_id: i64) -> Self {
        Self {
            course_id,
            actions: None,
            cmids: None,
            user_ids: None,
            origin: None,
            window: None,
            ip_not_null: false,
        }
    }

    pub fn actions(mut self, actions: &'a [&'a str]) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn on_modules(mut self, cmids: &'a [i64]) -> Self {
        self.cmids = Some(cmids);
        self
    }

    pub fn by_users(mut self, user_ids: &'a [i64]) -> Self {
        self.user_ids = Some(user_ids);
        self
    }

    pub fn origin(mut self, origin: &'a str) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Inclusive on both ends.
    pub fn between(mut self, start: i64, end: i64) -> Self {
        self.window = Some((start, end));
        self
    }

    pub fn with_ip(mut self) -> Self {
        self.ip_not_null = true;
        self
    }

    fn matches_nothing(&self) -> bool {
        self.actions.is_some_and(|a| a.is_empty())
            || self.cmids.is_some_and(|c| c.is_empty())
            || self.user_ids.is_some_and(|u| u.is_empty())
    }
}

type Params = Vec<Box<dyn ToSql>>;

fn push_ids(clauses: &mut Vec<String>, values: &mut Params, column: &str, ids: &[i64]) {
    clauses.push(format!("{column} IN rarray(?)"));
    values.push(Box::new(id_set(ids)));
}

pub fn fetch_logs(conn: &Connection, q: &LogQuery<'_>) -> Result<Vec<LogRecord>> {
    if q.matches_nothing() {
        return Ok(Vec::new());
    }

    let mut clauses = vec!["courseid = ?".to_string()];
    let mut values: Params = Vec::new();
    values.push(Box::new(q.course_id));
    if let Some(actions) = q.actions {
        clauses.push("action IN rarray(?)".to_string());
        values.push(Box::new(text_set(actions)));
    }
    if let Some(cmids) = q.cmids {
        push_ids(&mut clauses, &mut values, "contextinstanceid", cmids);
    }
    if let Some(users) = q.user_ids {
        push_ids(&mut clauses, &mut values, "userid", users);
    }
    if let Some(origin) = q.origin {
        clauses.push("origin = ?".to_string());
        values.push(Box::new(origin.to_string()));
    }
    if let Some((start, end)) = q.window {
        clauses.push("timecreated BETWEEN ? AND ?".to_string());
        values.push(Box::new(start));
        values.push(Box::new(end));
    }
    if q.ip_not_null {
        clauses.push("ip IS NOT NULL".to_string());
    }

    let sql = format!(
        "SELECT userid, contextinstanceid, ip, crud, timecreated
         FROM logstore_standard_log
         WHERE {}
         ORDER BY timecreated, id",
        clauses.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |r| {
            Ok(LogRecord {
                user_id: r.get(0)?,
                cmid: r.get(1)?,
                ip: r.get(2)?,
                crud: r.get(3)?,
                timecreated: r.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    tracing::debug!(course_id = q.course_id, count = rows.len(), "log records fetched");
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeRecord {
    pub item_id: i64,
    pub user_id: i64,
    pub finalgrade: Option<f64>,
    pub modifier: Option<i64>,
}

pub fn fetch_grades(conn: &Connection, item_ids: &[i64]) -> Result<Vec<GradeRecord>> {
    if item_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(
        "SELECT itemid, userid, finalgrade, usermodified
         FROM grade_grades
         WHERE itemid IN rarray(?)
         ORDER BY itemid, userid, id",
    )?;
    let rows = stmt
        .query_map([id_set(item_ids)], |r| {
            Ok(GradeRecord {
                item_id: r.get(0)?,
                user_id: r.get(1)?,
                finalgrade: r.get(2)?,
                modifier: r.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Grade rows keyed by (grade-item id, user id).
#[derive(Debug, Default)]
pub struct GradeIndex {
    by_key: BTreeMap<(i64, i64), GradeRecord>,
}

impl GradeIndex {
    pub fn new(records: Vec<GradeRecord>) -> Self {
        let by_key = records
            .into_iter()
            .map(|g| ((g.item_id, g.user_id), g))
            .collect();
        Self { by_key }
    }

    pub fn get(&self, user_id: i64, item_id: i64) -> Option<&GradeRecord> {
        self.by_key.get(&(item_id, user_id))
    }

    pub fn final_grade(&self, user_id: i64, item_id: i64) -> Option<f64> {
        self.get(user_id, item_id).and_then(|g| g.finalgrade)
    }

    pub fn submitted(&self, user_id: i64, item_id: i64) -> bool {
        self.get(user_id, item_id)
            .is_some_and(|g| g.modifier.is_some())
    }

    /// Rows for one grade item, in user id order.
    pub fn for_item(&self, item_id: i64) -> impl Iterator<Item = &GradeRecord> {
        self.by_key
            .range((item_id, i64::MIN)..=(item_id, i64::MAX))
            .map(|(_, g)| g)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizAttempt {
    pub quiz_id: i64,
    pub user_id: i64,
    pub number: i64,
    pub timestart: i64,
    pub timefinish: i64,
}

#[derive(Debug, Clone, Copy)]
pub enum AttemptScope<'a> {
    Quizzes(&'a [i64]),
    /// Every quiz whose course module sits in the section, visible or not.
    Section(i64),
}

/// Non-preview attempts in state finished or inprogress by the given users.
#[derive(Debug, Clone, Copy)]
pub struct AttemptQuery<'a> {
    pub scope: AttemptScope<'a>,
    pub user_ids: &'a [i64],
    pub finished_only: bool,
}

pub fn fetch_quiz_attempts(conn: &Connection, q: &AttemptQuery<'_>) -> Result<Vec<QuizAttempt>> {
    if q.user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut clauses = vec![
        "qa.preview = 0".to_string(),
        "qa.state IN ('finished', 'inprogress')".to_string(),
    ];
    let mut values: Params = Vec::new();
    match q.scope {
        AttemptScope::Quizzes(ids) => {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            push_ids(&mut clauses, &mut values, "qa.quiz", ids);
        }
        AttemptScope::Section(section_id) => {
            clauses.push(
                "qa.quiz IN (
                    SELECT cm.instance FROM course_modules cm
                    JOIN modules m ON m.id = cm.module
                    WHERE m.name = 'quiz' AND cm.section = ?
                )"
                .to_string(),
            );
            values.push(Box::new(section_id));
        }
    }
    push_ids(&mut clauses, &mut values, "qa.userid", q.user_ids);
    if q.finished_only {
        clauses.push("qa.timefinish > 0".to_string());
    }

    let sql = format!(
        "SELECT qa.quiz, qa.userid, qa.attempt, qa.timestart, qa.timefinish
         FROM quiz_attempts qa
         WHERE {}
         ORDER BY qa.quiz, qa.userid, qa.attempt, qa.id",
        clauses.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |r| {
            Ok(QuizAttempt {
                quiz_id: r.get(0)?,
                user_id: r.get(1)?,
                number: r.get(2)?,
                timestart: r.get(3)?,
                timefinish: r.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
