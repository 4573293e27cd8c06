//! Course-scoped reports.

use super::{item_ids, student_ids, ReportContext};
use crate::catalog::{self, CatalogFilter};
use crate::engine::calendar::{self, Period, StatsWindow};
use crate::engine::access;
use crate::engine::competency::{self, Thresholds};
use crate::error::Result;
use crate::fetch::{self, GradeIndex, LogQuery};
use crate::report::*;
use crate::scope::RosterFilter;

const VIEWED: &[&str] = &["viewed"];
const ATTEMPTED: &[&str] = &["attempted", "submitted"];
const WEB: &str = "web";

pub fn access_by_ip_group(
    ctx: &ReportContext<'_>,
    course_id: i64,
    unique_by_user: bool,
) -> Result<CourseReport<IpGroups>> {
    let course = ctx.course_scope(course_id)?;
    let records = fetch::fetch_logs(
        ctx.conn,
        &LogQuery::new(course.id).actions(VIEWED).with_ip(),
    )?;
    let ip_groups: Vec<IpGroupRow> = access::ip_groups(&records, unique_by_user)
        .into_iter()
        .map(|g| IpGroupRow {
            ip: g.ip,
            access_count: g.count,
        })
        .collect();
    tracing::info!(course_id, unique_by_user, groups = ip_groups.len(), "ip access report");
    Ok(CourseReport::new(&course, IpGroups { ip_groups }))
}

pub fn access_by_time_period(
    ctx: &ReportContext<'_>,
    course_id: i64,
    unique_by_user: bool,
    periods: &[Period],
) -> Result<CourseReport<TimePeriods>> {
    let course = ctx.course_scope(course_id)?;
    let records = fetch::fetch_logs(ctx.conn, &LogQuery::new(course.id).actions(VIEWED))?;
    let counts = calendar::count_by_period(&records, periods, &ctx.offset, unique_by_user);
    let time_periods = periods
        .iter()
        .zip(counts)
        .map(|(p, access_count)| TimePeriodRow {
            period: p.name.clone(),
            access_count,
        })
        .collect();
    tracing::info!(course_id, records = records.len(), "time period report");
    Ok(CourseReport::new(&course, TimePeriods { time_periods }))
}

pub fn module_access_percentage(
    ctx: &ReportContext<'_>,
    course_id: i64,
) -> Result<ModuleAccessReport> {
    let course = ctx.course_scope(course_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    let mut report = ModuleAccessReport {
        course: ModuleAccessCourse {
            id: course.id,
            name: course.fullname.clone(),
            shortname: course.shortname.clone(),
            modules: Vec::new(),
        },
    };
    if students.is_empty() {
        return Ok(report);
    }

    let modules = catalog::course_modules_in(ctx.conn, course.id, None, false)?;
    if modules.is_empty() {
        return Ok(report);
    }
    let cmids: Vec<i64> = modules.iter().map(|m| m.cmid).collect();
    let users = student_ids(&students);
    let records = fetch::fetch_logs(
        ctx.conn,
        &LogQuery::new(course.id)
            .actions(VIEWED)
            .on_modules(&cmids)
            .by_users(&users),
    )?;
    let views = access::module_views(&records);

    report.course.modules = modules
        .into_iter()
        .map(|m| {
            let viewers = views.get(&m.cmid).map_or(0, |v| v.viewers);
            ModuleAccessRow {
                cmid: m.cmid,
                modname: m.modname,
                total_viewed: viewers,
                percentage_viewed: round2(competency::percent(viewers as usize, students.len())),
            }
        })
        .collect();
    tracing::info!(
        course_id,
        students = students.len(),
        modules = report.course.modules.len(),
        "module access report"
    );
    Ok(report)
}

pub fn course_stats(
    ctx: &ReportContext<'_>,
    course_id: i64,
    start_date: &str,
    end_date: &str,
) -> Result<CourseReport<CourseStats>> {
    let window = StatsWindow::parse(start_date, end_date, &ctx.offset)?;
    let course = ctx.course_scope(course_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    if students.is_empty() {
        return Ok(CourseReport::new(
            &course,
            CourseStats {
                statsmode: String::new(),
                stats: Vec::new(),
            },
        ));
    }

    let users = student_ids(&students);
    let records = fetch::fetch_logs(
        ctx.conn,
        &LogQuery::new(course.id)
            .by_users(&users)
            .origin(WEB)
            .between(window.start, window.end),
    )?;
    let (mode, buckets) = calendar::calendar_stats(&records, &window, &ctx.offset);
    tracing::info!(
        course_id,
        mode = mode.as_str(),
        records = records.len(),
        buckets = buckets.len(),
        "course stats report"
    );
    Ok(CourseReport::new(
        &course,
        CourseStats {
            statsmode: mode.as_str().to_string(),
            stats: buckets
                .into_iter()
                .map(|b| StatsRow {
                    label: b.label,
                    views: b.views,
                    posts: b.posts,
                })
                .collect(),
        },
    ))
}

pub fn inactive_students(
    ctx: &ReportContext<'_>,
    course_id: i64,
    inactive_rate: Option<f64>,
) -> Result<CourseReport<InactiveStudents>> {
    let rate = inactive_rate.unwrap_or(ctx.settings.inactive_activity_rate);
    let course = ctx.course_scope(course_id)?;
    let students = ctx.students(course.id, RosterFilter::actively_enrolled())?;
    let activities = catalog::activities_in(ctx.conn, course.id, &CatalogFilter::visible())?;
    let items = item_ids(&activities);
    let grades = GradeIndex::new(fetch::fetch_grades(ctx.conn, &items)?);

    let rows: Vec<InactiveStudentRow> =
        competency::inactive_students(&students, &items, &grades, rate)
            .into_iter()
            .map(|(s, p)| InactiveStudentRow {
                id: s.id,
                firstname: s.firstname.clone(),
                lastname: s.lastname.clone(),
                email: s.email.clone(),
                lastaccess: s.lastaccess,
                participatedactivities: p.participated,
                totalactivities: p.total,
                participationrate: round2(p.participation_rate()),
            })
            .collect();
    tracing::info!(
        course_id,
        students = students.len(),
        activities = items.len(),
        inactive = rows.len(),
        "inactive students report"
    );
    Ok(CourseReport::new(&course, InactiveStudents { students: rows }))
}

pub fn competent_percentage(
    ctx: &ReportContext<'_>,
    course_id: i64,
    threshold: Option<f64>,
    min_activity_rate: Option<f64>,
) -> Result<CourseReport<CompetentPercentage>> {
    let thresholds = Thresholds {
        grade: threshold.unwrap_or(ctx.settings.competency_threshold),
        competent_rate: min_activity_rate.unwrap_or(ctx.settings.min_activity_rate),
        inactive_rate: None,
    };
    let course = ctx.course_scope(course_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    if students.is_empty() {
        return Ok(CourseReport::new(
            &course,
            CompetentPercentage {
                students: CompetentCounts {
                    total: 0,
                    competent: 0,
                    incompetent: 0,
                },
                percentage: CompetentShares {
                    competent: 0.0,
                    incompetent: 0.0,
                },
            },
        ));
    }

    let activities = catalog::activities_in(ctx.conn, course.id, &CatalogFilter::visible())?;
    let items = item_ids(&activities);
    let grades = GradeIndex::new(fetch::fetch_grades(ctx.conn, &items)?);
    let tally = competency::tally(&students, &items, &grades, &thresholds);
    let competent = round2(tally.competent_percentage());
    tracing::info!(
        course_id,
        students = tally.total,
        competent = tally.competent,
        "competent percentage report"
    );
    Ok(CourseReport::new(
        &course,
        CompetentPercentage {
            students: CompetentCounts {
                total: tally.total,
                competent: tally.competent,
                incompetent: tally.incompetent,
            },
            percentage: CompetentShares {
                competent,
                incompetent: round2(100.0 - competent),
            },
        },
    ))
}

pub fn underperforming_activities(
    ctx: &ReportContext<'_>,
    course_id: i64,
    grade_threshold: Option<f64>,
    max_competent_percentage: Option<f64>,
) -> Result<CourseReport<UnderperformingActivities>> {
    let pass_mark = grade_threshold.unwrap_or(ctx.settings.competency_threshold);
    let max_competent = max_competent_percentage.unwrap_or(ctx.settings.max_competent_percentage);
    let course = ctx.course_scope(course_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    if students.is_empty() {
        return Ok(CourseReport::new(
            &course,
            UnderperformingActivities {
                activities: Vec::new(),
            },
        ));
    }

    let activities = catalog::activities_in(ctx.conn, course.id, &CatalogFilter::visible())?;
    let grades = GradeIndex::new(fetch::fetch_grades(ctx.conn, &item_ids(&activities))?);
    let flagged: Vec<UnderperformingRow> = activities
        .iter()
        .filter_map(|a| {
            let outcome =
                competency::activity_outcome(a.grade_item_id, &students, &grades, pass_mark);
            if !outcome.underperforming(students.len(), max_competent) {
                return None;
            }
            Some(UnderperformingRow {
                id: a.cmid,
                name: a.name.clone().unwrap_or_default(),
                module: a.modname.clone(),
                total_students: students.len(),
                students_submitted: outcome.submitted,
                students_competent: outcome.competent,
                students_incompetent: outcome
                    .not_competent
                    .into_iter()
                    .map(StudentContact::from)
                    .collect(),
            })
        })
        .collect();
    tracing::info!(
        course_id,
        activities = activities.len(),
        flagged = flagged.len(),
        "underperforming activities report"
    );
    Ok(CourseReport::new(
        &course,
        UnderperformingActivities {
            activities: flagged,
        },
    ))
}

pub fn graded_activities(
    ctx: &ReportContext<'_>,
    course_id: i64,
) -> Result<CourseReport<GradedActivities>> {
    let course = ctx.course_scope(course_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    let mut activities =
        catalog::activities_in(ctx.conn, course.id, &CatalogFilter::any_visibility())?;
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
            let graded = competency::coverage(a.grade_item_id, &grades).graded;
            GradedActivityRow {
                id: a.instance,
                name: a
                    .name
                    .clone()
                    .unwrap_or_else(|| "Unnamed activity".to_string()),
                module: a.modname.clone(),
                percentage_graded: round2(competency::percent(graded, students.len())),
            }
        })
        .collect();
    tracing::info!(course_id, activities = activities.len(), "graded activities report");
    Ok(CourseReport::new(&course, GradedActivities { activities: rows }))
}

pub fn never_attempted_tasks(
    ctx: &ReportContext<'_>,
    course_id: i64,
) -> Result<CourseReport<NeverAttempted>> {
    let course = ctx.course_scope(course_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    let activities =
        catalog::activities_in(ctx.conn, course.id, &CatalogFilter::module_type_wide())?;
    let mut cmids: Vec<i64> = activities.iter().map(|a| a.cmid).collect();
    cmids.sort_unstable();
    cmids.dedup();
    if cmids.is_empty() {
        tracing::info!(course_id, "never attempted report: no gradable modules");
        return Ok(CourseReport::new(
            &course,
            NeverAttempted {
                students: Vec::new(),
            },
        ));
    }

    let users = student_ids(&students);
    let records = fetch::fetch_logs(
        ctx.conn,
        &LogQuery::new(course.id)
            .actions(ATTEMPTED)
            .on_modules(&cmids)
            .by_users(&users),
    )?;
    let rows: Vec<NeverAttemptedRow> = access::students_without_events(&students, &records)
        .into_iter()
        .map(|s| NeverAttemptedRow {
            id: s.id,
            username: s.username.clone(),
            firstname: s.firstname.clone(),
            lastname: s.lastname.clone(),
            email: s.email.clone(),
            role: "student".to_string(),
        })
        .collect();
    tracing::info!(
        course_id,
        modules = cmids.len(),
        never_attempted = rows.len(),
        "never attempted report"
    );
    Ok(CourseReport::new(&course, NeverAttempted { students: rows }))
}

pub fn uncompetent_activities(
    ctx: &ReportContext<'_>,
    course_id: i64,
    threshold: Option<f64>,
) -> Result<CourseReport<UncompetentActivities>> {
    let threshold = threshold.unwrap_or(ctx.settings.competency_threshold);
    let course = ctx.course_scope(course_id)?;
    let students = ctx.students(course.id, RosterFilter::role_holders())?;
    if students.is_empty() {
        return Ok(CourseReport::new(
            &course,
            UncompetentActivities {
                activities: Vec::new(),
            },
        ));
    }

    let activities = catalog::activities_in(ctx.conn, course.id, &CatalogFilter::visible())?;
    let grades = GradeIndex::new(fetch::fetch_grades(ctx.conn, &item_ids(&activities))?);
    let rows: Vec<UncompetentRow> = activities
        .iter()
        .filter_map(|a| {
            let pct = round2(competency::uncompetent_percentage(
                a.grade_item_id,
                &students,
                &grades,
                threshold,
            ));
            (pct == 100.0).then(|| UncompetentRow {
                cmid: a.cmid,
                modname: a.modname.clone(),
                itemname: a.name.clone().unwrap_or_default(),
                percent_uncompetent: pct,
            })
        })
        .collect();
    tracing::info!(course_id, flagged = rows.len(), "uncompetent activities report");
    Ok(CourseReport::new(
        &course,
        UncompetentActivities { activities: rows },
    ))
}
