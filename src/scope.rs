use crate::config::AccessConfig;
use crate::db::{text_set, CONTEXT_COURSE};
use crate::error::{AnalyticsError, Result};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: i64,
    pub fullname: String,
    pub shortname: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: i64,
    pub course_id: i64,
    /// Ordinal position within the course (0 is the general section).
    pub number: i64,
    pub name: Option<String>,
}

impl Section {
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("Section {}", self.number),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub lastaccess: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterFilter {
    /// Only students with an active enrolment in an enabled enrolment
    /// method and an unsuspended account.
    pub active_enrolment_only: bool,
}

impl RosterFilter {
    pub fn role_holders() -> Self {
        Self::default()
    }

    pub fn actively_enrolled() -> Self {
        Self {
            active_enrolment_only: true,
        }
    }
}

/// The user a report is being run for, taken from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

pub fn resolve_course(conn: &Connection, course_id: i64) -> Result<Course> {
    conn.query_row(
        "SELECT id, fullname, shortname FROM course WHERE id = ?",
        [course_id],
        |r| {
            Ok(Course {
                id: r.get(0)?,
                fullname: r.get(1)?,
                shortname: r.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| AnalyticsError::NotFound(format!("course {course_id}")))
}

pub fn resolve_section(conn: &Connection, section_id: i64) -> Result<Section> {
    conn.query_row(
        "SELECT id, course, section, name FROM course_sections WHERE id = ?",
        [section_id],
        |r| {
            Ok(Section {
                id: r.get(0)?,
                course_id: r.get(1)?,
                number: r.get(2)?,
                name: r.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| AnalyticsError::NotFound(format!("section {section_id}")))
}

/// Role id for shortname "student". Falls back to `fallback` when the row
/// is missing or the lookup itself fails.
pub fn student_role_id(conn: &Connection, fallback: i64) -> i64 {
    let found = conn
        .query_row(
            "SELECT id FROM role WHERE shortname = 'student'",
            [],
            |r| r.get::<_, i64>(0),
        )
        .optional();
    match found {
        Ok(Some(id)) => id,
        Ok(None) => fallback,
        Err(e) => {
            tracing::warn!(error = %e, fallback, "student role lookup failed");
            fallback
        }
    }
}

/// Every holder of `role_id` in the course context, ordered by name.
pub fn students_in(
    conn: &Connection,
    course_id: i64,
    role_id: i64,
    filter: RosterFilter,
) -> Result<Vec<Student>> {
    let enrolment_clause = if filter.active_enrolment_only {
        "AND u.suspended = 0
         AND EXISTS (
             SELECT 1 FROM user_enrolments ue
             JOIN enrol e ON e.id = ue.enrolid
             WHERE ue.userid = u.id AND e.courseid = ?1 AND ue.status = 0 AND e.status = 0
         )"
    } else {
        ""
    };
    let sql = format!(
        "SELECT DISTINCT u.id, u.username, u.firstname, u.lastname, u.email, ula.timeaccess
         FROM role_assignments ra
         JOIN context ctx ON ctx.id = ra.contextid
             AND ctx.contextlevel = ?3
             AND ctx.instanceid = ?1
         JOIN user u ON u.id = ra.userid
         LEFT JOIN user_lastaccess ula ON ula.userid = u.id AND ula.courseid = ?1
         WHERE ra.roleid = ?2
         {enrolment_clause}
         ORDER BY u.lastname, u.firstname, u.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![course_id, role_id, CONTEXT_COURSE], |r| {
            Ok(Student {
                id: r.get(0)?,
                username: r.get(1)?,
                firstname: r.get(2)?,
                lastname: r.get(3)?,
                email: r.get(4)?,
                lastaccess: r.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Permission gate run once per report, after the scope resolved.
pub fn authorize(
    conn: &Connection,
    caller: Option<Caller>,
    course_id: i64,
    access: &AccessConfig,
) -> Result<Caller> {
    let caller = caller.ok_or(AnalyticsError::Unauthenticated)?;
    if access.site_admins.contains(&caller.user_id) {
        return Ok(caller);
    }
    if access.report_roles.is_empty() {
        return Err(AnalyticsError::Forbidden {
            caller_id: caller.user_id,
            course_id,
        });
    }

    let granted: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM role_assignments ra
         JOIN role r ON r.id = ra.roleid
         JOIN context ctx ON ctx.id = ra.contextid
         WHERE ra.userid = ?1 AND ctx.contextlevel = ?2 AND ctx.instanceid = ?3
           AND r.shortname IN rarray(?4)",
        params![
            caller.user_id,
            CONTEXT_COURSE,
            course_id,
            text_set(&access.report_roles)
        ],
        |r| r.get(0),
    )?;
    if granted > 0 {
        Ok(caller)
    } else {
        Err(AnalyticsError::Forbidden {
            caller_id: caller.user_id,
            course_id,
        })
    }
}
