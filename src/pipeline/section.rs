//! Section-scoped reports. Enrolment is always taken from the owning course.

use super::{item_ids, student_ids, ReportContext};
use crate::catalog::{self, CatalogFilter};
use crate::engine::competency::{self, Thresholds};
use crate::engine::{access, quiz};
use crate::error::Result;
use crate::fetch::{self, AttemptQuery, AttemptScope, GradeIndex, LogQuery};
use crate::report::*;
use crate::scope::RosterFilter;

pub fn modules_info(ctx: &ReportContext<'_>, section_id: i64) -> Result<ModulesInfoReport> {
    let (section, course) = ctx.section_scope(section_id)?;
    let mut report = ModulesInfoReport {
        section: ModulesInfoSection {
            id: section.id,
            name: section.display_name(),
            courseid: course.id,
            modules: Vec::new(),
        },
    };
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    if students.is_empty() {
        return Ok(report);
    }

    let modules = catalog::course_modules_in(ctx.conn, course.id, Some(section.id), true)?;
    let cmids: Vec<i64> = modules.iter().map(|m| m.cmid).collect();
    let users = student_ids(&students);
    let records = fetch::fetch_logs(
        ctx.conn,
        &LogQuery::new(course.id)
            .actions(&["viewed"])
            .on_modules(&cmids)
            .by_users(&users),
    )?;
    let views = access::module_views(&records);

    report.section.modules = modules
        .iter()
        .map(|m| {
            let v = views.get(&m.cmid).copied().unwrap_or_default();
            ModuleInfoRow {
                cmid: m.cmid,
                total_viewed: v.views,
                users_viewed: v.viewers,
                total_users: students.len(),
            }
        })
        .collect();
    tracing::info!(section_id, modules = modules.len(), "section modules report");
    Ok(report)
}

pub fn graded_activities(ctx: &ReportContext<'_>, section_id: i64) -> Result<SectionGradedReport> {
    let (section, course) = ctx.section_scope(section_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    if students.is_empty() {
        return Ok(SectionGradedReport {
            section: SectionGradedBody::new(&section, &course, Vec::new()),
        });
    }

    let mut activities = catalog::activities_in(
        ctx.conn,
        course.id,
        &CatalogFilter::any_visibility().in_section(section.id),
    )?;
    activities.sort_by(|a, b| {
        a.modname
            .cmp(&b.modname)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.grade_item_id.cmp(&b.grade_item_id))
    });
    activities.dedup_by_key(|a| a.grade_item_id);
    let grades = GradeIndex::new(fetch::fetch_grades(ctx.conn, &item_ids(&activities))?);

    let rows = activities
        .iter()
        .map(|a| {
            let cov = competency::coverage(a.grade_item_id, &grades);
            SectionGradedRow {
                id: a.instance,
                name: a
                    .name
                    .clone()
                    .unwrap_or_else(|| "Unnamed activity".to_string()),
                module: a.modname.clone(),
                total_students: students.len(),
                students_submitted: cov.submitted,
                students_graded: cov.graded,
            }
        })
        .collect();
    tracing::info!(section_id, activities = activities.len(), "section graded report");
    Ok(SectionGradedReport {
        section: SectionGradedBody::new(&section, &course, rows),
    })
}

pub fn quiz_attempt_frequency(
    ctx: &ReportContext<'_>,
    section_id: i64,
) -> Result<QuizFrequencyReport> {
    let (section, course) = ctx.section_scope(section_id)?;
    let mut report = QuizFrequencyReport {
        courseid: course.id,
        sectionid: section.id,
        quiz: Vec::new(),
    };
    let quizzes = catalog::quizzes_in_section(ctx.conn, section.id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    if quizzes.is_empty() || students.is_empty() {
        return Ok(report);
    }

    let mut quiz_ids: Vec<i64> = quizzes.iter().map(|q| q.quiz_id).collect();
    quiz_ids.dedup();
    let users = student_ids(&students);
    let attempts = fetch::fetch_quiz_attempts(
        ctx.conn,
        &AttemptQuery {
            scope: AttemptScope::Quizzes(&quiz_ids),
            user_ids: &users,
            finished_only: false,
        },
    )?;
    let mut frequencies = quiz::attempt_frequencies(&attempts);

    // Quizzes nobody attempted are left out.
    report.quiz = quiz_ids
        .iter()
        .filter_map(|id| {
            let rows = frequencies.remove(id)?;
            let name = quizzes
                .iter()
                .find(|q| q.quiz_id == *id)
                .map(|q| q.name.clone())
                .unwrap_or_default();
            Some(QuizFrequencyRow {
                quizid: *id,
                quizname: name,
                frequencies: rows
                    .into_iter()
                    .map(|f| FrequencyRow {
                        attempt_count: f.attempt_count,
                        total_users: f.users,
                    })
                    .collect(),
            })
        })
        .collect();
    tracing::info!(
        section_id,
        quizzes = quiz_ids.len(),
        attempts = attempts.len(),
        "quiz frequency report"
    );
    Ok(report)
}

pub fn quiz_attempt_average_time(
    ctx: &ReportContext<'_>,
    section_id: i64,
) -> Result<QuizDurationReport> {
    let (section, course) = ctx.section_scope(section_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    let users = student_ids(&students);
    let attempts = fetch::fetch_quiz_attempts(
        ctx.conn,
        &AttemptQuery {
            scope: AttemptScope::Section(section.id),
            user_ids: &users,
            finished_only: true,
        },
    )?;
    let rows = quiz::average_durations(&attempts)
        .into_iter()
        .map(|d| AttemptDurationRow {
            attempt_number: d.attempt_number,
            avg_duration_minutes: round2(d.avg_minutes),
            total_attempts: d.total,
        })
        .collect();
    tracing::info!(section_id, attempts = attempts.len(), "quiz duration report");
    Ok(QuizDurationReport {
        courseid: course.id,
        sectionid: section.id,
        attempts: rows,
    })
}

pub fn grade_distribution(
    ctx: &ReportContext<'_>,
    section_id: i64,
) -> Result<GradeDistributionReport> {
    let (section, course) = ctx.section_scope(section_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    let activities = catalog::activities_in(
        ctx.conn,
        course.id,
        &CatalogFilter::visible()
            .in_section(section.id)
            .with_positive_grademax(),
    )?;
    let mut items: Vec<(i64, f64)> = activities
        .iter()
        .map(|a| (a.grade_item_id, a.grademax))
        .collect();
    items.sort_by_key(|(id, _)| *id);
    items.dedup_by_key(|(id, _)| *id);
    let ids: Vec<i64> = items.iter().map(|(id, _)| *id).collect();
    let grades = GradeIndex::new(fetch::fetch_grades(ctx.conn, &ids)?);

    let grades_out = competency::grade_distribution(&students, &items, &grades)
        .into_iter()
        .map(|(band, total_students)| {
            let (min, max) = band.bounds();
            GradeRangeRow {
                grade_range: band.label().to_string(),
                min,
                max,
                total_students,
            }
        })
        .collect();
    tracing::info!(
        section_id,
        students = students.len(),
        items = items.len(),
        "grade distribution report"
    );
    Ok(GradeDistributionReport {
        courseid: course.id,
        sectionid: section.id,
        grades: grades_out,
    })
}

pub fn competent_percentage(
    ctx: &ReportContext<'_>,
    section_id: i64,
    grade_threshold: Option<f64>,
    competent_activity_rate: Option<f64>,
    inactive_activity_rate: Option<f64>,
) -> Result<SectionCompetentReport> {
    let thresholds = Thresholds {
        grade: grade_threshold.unwrap_or(ctx.settings.competency_threshold),
        competent_rate: competent_activity_rate.unwrap_or(ctx.settings.min_activity_rate),
        inactive_rate: Some(inactive_activity_rate.unwrap_or(ctx.settings.inactive_activity_rate)),
    };
    let (section, course) = ctx.section_scope(section_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    let activities = catalog::activities_in(
        ctx.conn,
        course.id,
        &CatalogFilter::visible().in_section(section.id),
    )?;
    let items = item_ids(&activities);
    let grades = GradeIndex::new(fetch::fetch_grades(ctx.conn, &items)?);
    let tally = competency::tally(&students, &items, &grades, &thresholds);
    tracing::info!(
        section_id,
        students = tally.total,
        competent = tally.competent,
        inactive = tally.inactive,
        "section competent report"
    );
    Ok(SectionCompetentReport {
        section: SectionCompetentBody {
            id: section.id,
            name: section.display_name(),
            sectionnumber: section.number,
            courseid: course.id,
            coursename: course.fullname.clone(),
            students: SectionCompetentCounts {
                total: tally.total,
                competent: tally.competent,
                incompetent: tally.incompetent,
                inactive: tally.inactive,
            },
        },
    })
}

/// Level bands are not defined yet; the report always carries zeros once
/// the section resolves and the caller is allowed.
pub fn competency_level(ctx: &ReportContext<'_>, section_id: i64) -> Result<CompetencyLevelReport> {
    let (section, course) = ctx.section_scope(section_id)?;
    Ok(CompetencyLevelReport {
        courseid: course.id,
        sectionid: section.id,
        levels: CompetencyLevels::default(),
    })
}
