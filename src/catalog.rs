use crate::error::Result;
use rusqlite::{params_from_iter, types::Value, Connection};

/// A module-backed grade item and the course module carrying it.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub grade_item_id: i64,
    pub name: Option<String>,
    pub modname: String,
    pub instance: i64,
    pub cmid: i64,
    pub grademax: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseModule {
    pub cmid: i64,
    pub instance: i64,
    pub modname: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizModule {
    pub cmid: i64,
    pub quiz_id: i64,
    pub name: String,
}

/// Which grade items count as gradable activities for a report.
///
/// Reports built at different times filter the same join differently; each
/// report picks one of the named presets so the differences stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogFilter {
    pub section_id: Option<i64>,
    pub visible_only: bool,
    pub exclude_pending_deletion: bool,
    pub match_instance: bool,
    pub require_grademax: bool,
}

impl CatalogFilter {
    /// Visible, live, instance-matched items.
    pub fn visible() -> Self {
        Self {
            section_id: None,
            visible_only: true,
            exclude_pending_deletion: true,
            match_instance: true,
            require_grademax: false,
        }
    }

    /// Live items whatever their visibility.
    pub fn any_visibility() -> Self {
        Self {
            visible_only: false,
            ..Self::visible()
        }
    }

    /// Every course module whose module type has a grade item in the
    /// course, paired with each such item. No visibility, deletion or
    /// instance filtering.
    pub fn module_type_wide() -> Self {
        Self {
            section_id: None,
            visible_only: false,
            exclude_pending_deletion: false,
            match_instance: false,
            require_grademax: false,
        }
    }

    pub fn in_section(mut self, section_id: i64) -> Self {
        self.section_id = Some(section_id);
        self
    }

    pub fn with_positive_grademax(mut self) -> Self {
        self.require_grademax = true;
        self
    }
}

/// Gradable activities of a course, one row per (grade item, course
/// module) pair, ordered by item name.
pub fn activities_in(
    conn: &Connection,
    course_id: i64,
    filter: &CatalogFilter,
) -> Result<Vec<Activity>> {
    let mut join = String::from("cm.module = m.id AND cm.course = gi.courseid");
    if filter.match_instance {
        join.push_str(" AND cm.instance = gi.iteminstance");
    }

    let mut clauses = vec![
        "gi.courseid = ?".to_string(),
        "gi.itemtype = 'mod'".to_string(),
        "gi.itemmodule IS NOT NULL".to_string(),
    ];
    let mut values: Vec<Value> = vec![Value::Integer(course_id)];
    if filter.visible_only {
        clauses.push("cm.visible = 1".to_string());
    }
    if filter.exclude_pending_deletion {
        clauses.push("cm.deletioninprogress = 0".to_string());
    }
    if let Some(section_id) = filter.section_id {
        clauses.push("cm.section = ?".to_string());
        values.push(Value::Integer(section_id));
    }
    if filter.require_grademax {
        clauses.push("gi.grademax > 0".to_string());
    }

    let sql = format!(
        "SELECT DISTINCT gi.id, gi.itemname, gi.itemmodule, COALESCE(gi.iteminstance, 0), cm.id, gi.grademax
         FROM grade_items gi
         JOIN modules m ON m.name = gi.itemmodule
         JOIN course_modules cm ON {join}
         WHERE {}
         ORDER BY gi.itemname, gi.id, cm.id",
        clauses.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), |r| {
            Ok(Activity {
                grade_item_id: r.get(0)?,
                name: r.get(1)?,
                modname: r.get(2)?,
                instance: r.get(3)?,
                cmid: r.get(4)?,
                grademax: r.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    tracing::debug!(course_id, ?filter, count = rows.len(), "activity catalog built");
    Ok(rows)
}

/// Live course modules of any type, optionally limited to one section.
pub fn course_modules_in(
    conn: &Connection,
    course_id: i64,
    section_id: Option<i64>,
    visible_only: bool,
) -> Result<Vec<CourseModule>> {
    let mut sql = String::from(
        "SELECT cm.id, cm.instance, m.name
         FROM course_modules cm
         JOIN modules m ON m.id = cm.module
         WHERE cm.course = ? AND cm.deletioninprogress = 0",
    );
    let mut values: Vec<Value> = vec![Value::Integer(course_id)];
    if let Some(section_id) = section_id {
        sql.push_str(" AND cm.section = ?");
        values.push(Value::Integer(section_id));
    }
    if visible_only {
        sql.push_str(" AND cm.visible = 1");
    }
    sql.push_str(" ORDER BY cm.id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), |r| {
            Ok(CourseModule {
                cmid: r.get(0)?,
                instance: r.get(1)?,
                modname: r.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Visible, live quizzes placed in a section, ordered by quiz id.
pub fn quizzes_in_section(conn: &Connection, section_id: i64) -> Result<Vec<QuizModule>> {
    let mut stmt = conn.prepare(
        "SELECT cm.id, q.id, q.name
         FROM course_modules cm
         JOIN modules m ON m.id = cm.module
         JOIN quiz q ON q.id = cm.instance
         WHERE cm.section = ?
           AND cm.visible = 1
           AND cm.deletioninprogress = 0
           AND m.name = 'quiz'
         ORDER BY q.id",
    )?;
    let rows = stmt
        .query_map([section_id], |r| {
            Ok(QuizModule {
                cmid: r.get(0)?,
                quiz_id: r.get(1)?,
                name: r.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
