//! Result records, one per report. Field names are the wire keys.

use crate::scope::{Course, Section, Student};
use serde::Serialize;

/// Half away from zero, two decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `{"course": {id, fullname, shortname, ...body}}`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseReport<T> {
    pub course: CourseBody<T>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseBody<T> {
    pub id: i64,
    pub fullname: String,
    pub shortname: String,
    #[serde(flatten)]
    pub body: T,
}

impl<T> CourseReport<T> {
    pub fn new(course: &Course, body: T) -> Self {
        Self {
            course: CourseBody {
                id: course.id,
                fullname: course.fullname.clone(),
                shortname: course.shortname.clone(),
                body,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IpGroups {
    pub ip_groups: Vec<IpGroupRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IpGroupRow {
    pub ip: String,
    pub access_count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimePeriods {
    pub time_periods: Vec<TimePeriodRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimePeriodRow {
    pub period: String,
    pub access_count: u64,
}

/// Uses `name` rather than `fullname` for the course title.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleAccessReport {
    pub course: ModuleAccessCourse,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleAccessCourse {
    pub id: i64,
    pub name: String,
    pub shortname: String,
    pub modules: Vec<ModuleAccessRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleAccessRow {
    pub cmid: i64,
    pub modname: String,
    pub total_viewed: u64,
    pub percentage_viewed: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CourseStats {
    /// Empty when the course has no students.
    pub statsmode: String,
    pub stats: Vec<StatsRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatsRow {
    pub label: String,
    pub views: u64,
    pub posts: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InactiveStudents {
    pub students: Vec<InactiveStudentRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InactiveStudentRow {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastaccess: Option<i64>,
    pub participatedactivities: usize,
    pub totalactivities: usize,
    pub participationrate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompetentPercentage {
    pub students: CompetentCounts,
    pub percentage: CompetentShares,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompetentCounts {
    pub total: usize,
    pub competent: usize,
    pub incompetent: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompetentShares {
    pub competent: f64,
    pub incompetent: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnderperformingActivities {
    pub activities: Vec<UnderperformingRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnderperformingRow {
    /// Course-module id.
    pub id: i64,
    pub name: String,
    pub module: String,
    pub total_students: usize,
    pub students_submitted: usize,
    pub students_competent: usize,
    pub students_incompetent: Vec<StudentContact>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StudentContact {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

impl From<&Student> for StudentContact {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id,
            firstname: s.firstname.clone(),
            lastname: s.lastname.clone(),
            email: s.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GradedActivities {
    pub activities: Vec<GradedActivityRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GradedActivityRow {
    /// Module instance id.
    pub id: i64,
    pub name: String,
    pub module: String,
    pub percentage_graded: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NeverAttempted {
    pub students: Vec<NeverAttemptedRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NeverAttemptedRow {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UncompetentActivities {
    pub activities: Vec<UncompetentRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UncompetentRow {
    pub cmid: i64,
    pub modname: String,
    pub itemname: String,
    pub percent_uncompetent: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModulesInfoReport {
    pub section: ModulesInfoSection,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModulesInfoSection {
    pub id: i64,
    pub name: String,
    pub courseid: i64,
    pub modules: Vec<ModuleInfoRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModuleInfoRow {
    pub cmid: i64,
    pub total_viewed: u64,
    pub users_viewed: u64,
    pub total_users: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionGradedReport {
    pub section: SectionGradedBody,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionGradedBody {
    pub id: i64,
    pub name: String,
    pub section_number: i64,
    pub courseid: i64,
    pub coursename: String,
    pub courseshortname: String,
    pub activities: Vec<SectionGradedRow>,
}

impl SectionGradedBody {
    pub fn new(section: &Section, course: &Course, activities: Vec<SectionGradedRow>) -> Self {
        Self {
            id: section.id,
            name: section.display_name(),
            section_number: section.number,
            courseid: course.id,
            coursename: course.fullname.clone(),
            courseshortname: course.shortname.clone(),
            activities,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SectionGradedRow {
    pub id: i64,
    pub name: String,
    pub module: String,
    pub total_students: usize,
    pub students_submitted: usize,
    pub students_graded: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuizFrequencyReport {
    pub courseid: i64,
    pub sectionid: i64,
    pub quiz: Vec<QuizFrequencyRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuizFrequencyRow {
    pub quizid: i64,
    pub quizname: String,
    pub frequencies: Vec<FrequencyRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FrequencyRow {
    pub attempt_count: u64,
    pub total_users: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuizDurationReport {
    pub courseid: i64,
    pub sectionid: i64,
    pub attempts: Vec<AttemptDurationRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttemptDurationRow {
    pub attempt_number: i64,
    pub avg_duration_minutes: f64,
    pub total_attempts: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GradeDistributionReport {
    pub courseid: i64,
    pub sectionid: i64,
    pub grades: Vec<GradeRangeRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GradeRangeRow {
    pub grade_range: String,
    pub min: u32,
    pub max: u32,
    pub total_students: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionCompetentReport {
    pub section: SectionCompetentBody,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionCompetentBody {
    pub id: i64,
    pub name: String,
    pub sectionnumber: i64,
    pub courseid: i64,
    pub coursename: String,
    pub students: SectionCompetentCounts,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SectionCompetentCounts {
    pub total: usize,
    pub competent: usize,
    pub incompetent: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompetencyLevelReport {
    pub courseid: i64,
    pub sectionid: i64,
    pub levels: CompetencyLevels,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CompetencyLevels {
    pub competent: u64,
    pub partially_competent: u64,
    pub not_competent: u64,
}
