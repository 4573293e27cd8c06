use super::report;
use crate::engine::calendar::Period;
use crate::ipc::params::{bool_or, optional_f64, periods, required_int, required_str};
use crate::ipc::types::{AppState, Request};
use crate::pipeline::course;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "course.accessByIpGroup" => report(state, req, |ctx, p| {
            let course_id = required_int(p, "courseId")?;
            let unique = bool_or(p, "uniqueByUser", true)?;
            course::access_by_ip_group(ctx, course_id, unique)
        }),
        "course.accessByTimePeriod" => report(state, req, |ctx, p| {
            let course_id = required_int(p, "courseId")?;
            let unique = bool_or(p, "uniqueByUser", true)?;
            let bands: Vec<Period> = periods(p)?;
            course::access_by_time_period(ctx, course_id, unique, &bands)
        }),
        "course.moduleAccessPercentage" => report(state, req, |ctx, p| {
            course::module_access_percentage(ctx, required_int(p, "courseId")?)
        }),
        "course.stats" => report(state, req, |ctx, p| {
            let course_id = required_int(p, "courseId")?;
            let start = required_str(p, "startDate")?;
            let end = required_str(p, "endDate")?;
            course::course_stats(ctx, course_id, &start, &end)
        }),
        "course.inactiveStudents" => report(state, req, |ctx, p| {
            let course_id = required_int(p, "courseId")?;
            let rate = optional_f64(p, "inactiveActivityRate")?;
            course::inactive_students(ctx, course_id, rate)
        }),
        "course.competentPercentage" => report(state, req, |ctx, p| {
            let course_id = required_int(p, "courseId")?;
            let threshold = optional_f64(p, "threshold")?;
            let min_rate = optional_f64(p, "minActivityRate")?;
            course::competent_percentage(ctx, course_id, threshold, min_rate)
        }),
        "course.underperformingActivities" => report(state, req, |ctx, p| {
            let course_id = required_int(p, "courseId")?;
            let threshold = optional_f64(p, "competencyGradeThreshold")?;
            let max = optional_f64(p, "maxCompetentPercentage")?;
            course::underperforming_activities(ctx, course_id, threshold, max)
        }),
        "course.gradedActivities" => report(state, req, |ctx, p| {
            course::graded_activities(ctx, required_int(p, "courseId")?)
        }),
        "course.neverAttemptedTasks" => report(state, req, |ctx, p| {
            course::never_attempted_tasks(ctx, required_int(p, "courseId")?)
        }),
        "course.uncompetentActivities" => report(state, req, |ctx, p| {
            let course_id = required_int(p, "courseId")?;
            let threshold = optional_f64(p, "threshold")?;
            course::uncompetent_activities(ctx, course_id, threshold)
        }),
        _ => return None,
    };
    Some(resp)
}
