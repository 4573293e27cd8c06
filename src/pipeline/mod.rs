//! One function per report: resolve scope, check the caller, read, bucket,
//! assemble.

pub mod course;
pub mod section;

use crate::config::{AccessConfig, Config, ReportsConfig};
use crate::error::{AnalyticsError, Result};
use crate::scope::{self, Caller, Course, RosterFilter, Section, Student};
use chrono::FixedOffset;
use rusqlite::Connection;

/// Everything a report needs, passed in explicitly.
pub struct ReportContext<'a> {
    pub conn: &'a Connection,
    pub caller: Option<Caller>,
    pub settings: &'a ReportsConfig,
    pub access: &'a AccessConfig,
    pub offset: FixedOffset,
}

impl<'a> ReportContext<'a> {
    pub fn new(conn: &'a Connection, caller: Option<Caller>, config: &'a Config) -> Result<Self> {
        let offset = config
            .reports
            .offset()
            .map_err(|e| AnalyticsError::invalid(format!("reports.utc_offset: {e}")))?;
        Ok(Self {
            conn,
            caller,
            settings: &config.reports,
            access: &config.access,
            offset,
        })
    }

    /// Resolves the course and checks the caller may report on it.
    pub fn course_scope(&self, course_id: i64) -> Result<Course> {
        let course = scope::resolve_course(self.conn, course_id)?;
        scope::authorize(self.conn, self.caller, course.id, self.access)?;
        Ok(course)
    }

    /// Resolves the section and its course, then checks the caller.
    pub fn section_scope(&self, section_id: i64) -> Result<(Section, Course)> {
        let section = scope::resolve_section(self.conn, section_id)?;
        let course = scope::resolve_course(self.conn, section.course_id)?;
        scope::authorize(self.conn, self.caller, course.id, self.access)?;
        Ok((section, course))
    }

    pub fn students(&self, course_id: i64, filter: RosterFilter) -> Result<Vec<Student>> {
        let role = scope::student_role_id(self.conn, self.settings.student_role_fallback_id);
        scope::students_in(self.conn, course_id, role, filter)
    }
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> i64) -> Vec<i64> {
    let mut out: Vec<i64> = items.iter().map(id).collect();
    out.sort_unstable();
    out.dedup();
    out
}

pub(crate) fn student_ids(students: &[Student]) -> Vec<i64> {
    ids(students, |s| s.id)
}

pub(crate) fn item_ids(activities: &[crate::catalog::Activity]) -> Vec<i64> {
    ids(activities, |a| a.grade_item_id)
}
