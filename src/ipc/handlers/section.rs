use super::report;
use crate::ipc::params::{optional_f64, required_int};
use crate::ipc::types::{AppState, Request};
use crate::pipeline::section;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "section.modulesInfo" => report(state, req, |ctx, p| {
            section::modules_info(ctx, required_int(p, "sectionId")?)
        }),
        "section.gradedActivities" => report(state, req, |ctx, p| {
            section::graded_activities(ctx, required_int(p, "sectionId")?)
        }),
        "section.quizAttemptFrequency" => report(state, req, |ctx, p| {
            section::quiz_attempt_frequency(ctx, required_int(p, "sectionId")?)
        }),
        "section.quizAttemptAverageTime" => report(state, req, |ctx, p| {
            section::quiz_attempt_average_time(ctx, required_int(p, "sectionId")?)
        }),
        "section.gradeDistribution" => report(state, req, |ctx, p| {
            section::grade_distribution(ctx, required_int(p, "sectionId")?)
        }),
        "section.competentPercentage" => report(state, req, |ctx, p| {
            let section_id = required_int(p, "sectionId")?;
            let grade = optional_f64(p, "gradeThreshold")?;
            let competent = optional_f64(p, "competentActivityRate")?;
            let inactive = optional_f64(p, "inactiveActivityRate")?;
            section::competent_percentage(ctx, section_id, grade, competent, inactive)
        }),
        "section.competencyLevel" => report(state, req, |ctx, p| {
            section::competency_level(ctx, required_int(p, "sectionId")?)
        }),
        _ => return None,
    };
    Some(resp)
}
