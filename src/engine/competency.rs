//! Grade-based classification of students and activities.

use crate::fetch::GradeIndex;
use crate::scope::Student;

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum final grade that counts as a pass.
    pub grade: f64,
    /// Minimum pass rate, in percent, for a competent student.
    pub competent_rate: f64,
    /// Participation rate at or below which a student is inactive. `None`
    /// when the report has no inactive class.
    pub inactive_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Competency {
    Competent,
    Incompetent,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participation {
    /// Activities with a final grade.
    pub participated: usize,
    /// Activities graded at or above the pass mark.
    pub passed: usize,
    pub total: usize,
}

impl Participation {
    pub fn of(student_id: i64, item_ids: &[i64], grades: &GradeIndex, pass_mark: f64) -> Self {
        let mut participated = 0;
        let mut passed = 0;
        for &item in item_ids {
            if let Some(grade) = grades.final_grade(student_id, item) {
                participated += 1;
                if grade >= pass_mark {
                    passed += 1;
                }
            }
        }
        Self {
            participated,
            passed,
            total: item_ids.len(),
        }
    }

    pub fn participation_rate(&self) -> f64 {
        percent(self.participated, self.total)
    }

    pub fn pass_rate(&self) -> f64 {
        percent(self.passed, self.total)
    }

    /// Inactivity is checked first, then competence. With nothing to grade
    /// every student is competent.
    pub fn classify(&self, t: &Thresholds) -> Competency {
        if self.total == 0 {
            return Competency::Competent;
        }
        if let Some(rate) = t.inactive_rate {
            if self.participation_rate() <= rate {
                return Competency::Inactive;
            }
        }
        if self.pass_rate() >= t.competent_rate {
            Competency::Competent
        } else {
            Competency::Incompetent
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompetencyTally {
    pub total: usize,
    pub competent: usize,
    pub incompetent: usize,
    pub inactive: usize,
}

impl CompetencyTally {
    pub fn competent_percentage(&self) -> f64 {
        percent(self.competent, self.total)
    }
}

pub fn tally(
    students: &[Student],
    item_ids: &[i64],
    grades: &GradeIndex,
    t: &Thresholds,
) -> CompetencyTally {
    let mut out = CompetencyTally {
        total: students.len(),
        ..Default::default()
    };
    for student in students {
        match Participation::of(student.id, item_ids, grades, t.grade).classify(t) {
            Competency::Competent => out.competent += 1,
            Competency::Incompetent => out.incompetent += 1,
            Competency::Inactive => out.inactive += 1,
        }
    }
    out
}

/// Students whose participation rate is at or below `rate`, in roster
/// order. Nothing is reported when there are no activities.
pub fn inactive_students<'a>(
    students: &'a [Student],
    item_ids: &[i64],
    grades: &GradeIndex,
    rate: f64,
) -> Vec<(&'a Student, Participation)> {
    if item_ids.is_empty() {
        return Vec::new();
    }
    students
        .iter()
        .map(|s| (s, Participation::of(s.id, item_ids, grades, f64::INFINITY)))
        .filter(|(_, p)| p.participation_rate() <= rate)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityOutcome<'a> {
    pub submitted: usize,
    pub competent: usize,
    /// Everyone not at or above the pass mark, in roster order.
    pub not_competent: Vec<&'a Student>,
}

impl ActivityOutcome<'_> {
    /// Flagged when the competent share is at or below `max_competent`.
    pub fn underperforming(&self, total_students: usize, max_competent: f64) -> bool {
        total_students > 0 && percent(self.competent, total_students) <= max_competent
    }
}

pub fn activity_outcome<'a>(
    item_id: i64,
    students: &'a [Student],
    grades: &GradeIndex,
    pass_mark: f64,
) -> ActivityOutcome<'a> {
    let mut outcome = ActivityOutcome {
        submitted: 0,
        competent: 0,
        not_competent: Vec::new(),
    };
    for student in students {
        if grades.submitted(student.id, item_id) {
            outcome.submitted += 1;
        }
        match grades.final_grade(student.id, item_id) {
            Some(g) if g >= pass_mark => outcome.competent += 1,
            _ => outcome.not_competent.push(student),
        }
    }
    outcome
}

/// Share of students with no grade or a grade at or below `threshold`.
pub fn uncompetent_percentage(
    item_id: i64,
    students: &[Student],
    grades: &GradeIndex,
    threshold: f64,
) -> f64 {
    let uncompetent = students
        .iter()
        .filter(|s| {
            grades
                .final_grade(s.id, item_id)
                .map_or(true, |g| g <= threshold)
        })
        .count();
    percent(uncompetent, students.len())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Distinct users with a final grade.
    pub graded: usize,
    /// Distinct users with a recorded modifier.
    pub submitted: usize,
}

/// Grade coverage of one item across every user holding a grade row.
pub fn coverage(item_id: i64, grades: &GradeIndex) -> Coverage {
    // One row per user per item in the index.
    grades.for_item(item_id).fold(Coverage::default(), |mut c, g| {
        c.graded += usize::from(g.finalgrade.is_some());
        c.submitted += usize::from(g.modifier.is_some());
        c
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GradeBand {
    A,
    B,
    C,
    D,
    E,
}

impl GradeBand {
    pub const ALL: [GradeBand; 5] = [
        GradeBand::A,
        GradeBand::B,
        GradeBand::C,
        GradeBand::D,
        GradeBand::E,
    ];

    /// Closed lower bounds: 90 is A, 89.999 is B.
    pub fn for_percentage(p: f64) -> Self {
        if p >= 90.0 {
            GradeBand::A
        } else if p >= 80.0 {
            GradeBand::B
        } else if p >= 70.0 {
            GradeBand::C
        } else if p >= 60.0 {
            GradeBand::D
        } else {
            GradeBand::E
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GradeBand::A => "A",
            GradeBand::B => "B",
            GradeBand::C => "C",
            GradeBand::D => "D",
            GradeBand::E => "E",
        }
    }

    /// Nominal (min, max) shown to users.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            GradeBand::A => (90, 100),
            GradeBand::B => (80, 89),
            GradeBand::C => (70, 79),
            GradeBand::D => (60, 69),
            GradeBand::E => (0, 59),
        }
    }
}

/// Mean of `finalgrade / grademax * 100` over the items the student has a
/// grade for. `None` when there is none.
pub fn average_percentage(
    student_id: i64,
    items: &[(i64, f64)],
    grades: &GradeIndex,
) -> Option<f64> {
    let scores: Vec<f64> = items
        .iter()
        .filter(|(_, grademax)| *grademax > 0.0)
        .filter_map(|&(item, grademax)| {
            grades
                .final_grade(student_id, item)
                .map(|g| g / grademax * 100.0)
        })
        .collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// Students per band, in A..E order. Students without any grade are not
/// counted.
pub fn grade_distribution(
    students: &[Student],
    items: &[(i64, f64)],
    grades: &GradeIndex,
) -> Vec<(GradeBand, usize)> {
    let mut counts = [0usize; 5];
    for student in students {
        if let Some(avg) = average_percentage(student.id, items, grades) {
            counts[GradeBand::for_percentage(avg) as usize] += 1;
        }
    }
    GradeBand::ALL.iter().map(|b| (*b, counts[*b as usize])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::GradeRecord;

    fn student(id: i64) -> Student {
        Student {
            id,
            username: format!("u{id}"),
            firstname: format!("F{id}"),
            lastname: format!("L{id}"),
            email: format!("u{id}@example.test"),
            lastaccess: None,
        }
    }

    fn grade(user_id: i64, item_id: i64, finalgrade: Option<f64>) -> GradeRecord {
        GradeRecord {
            item_id,
            user_id,
            finalgrade,
            modifier: finalgrade.map(|_| user_id),
        }
    }

    fn thresholds(inactive: Option<f64>) -> Thresholds {
        Thresholds {
            grade: 80.0,
            competent_rate: 80.0,
            inactive_rate: inactive,
        }
    }

    #[test]
    fn inactivity_takes_priority_over_competence() {
        let p = Participation {
            participated: 1,
            passed: 1,
            total: 10,
        };
        // 10 % participation, even though every graded item passed.
        assert_eq!(p.classify(&thresholds(Some(20.0))), Competency::Inactive);
        assert_eq!(p.classify(&thresholds(None)), Competency::Incompetent);

        let p = Participation {
            participated: 20,
            passed: 19,
            total: 20,
        };
        assert_eq!(p.classify(&thresholds(Some(20.0))), Competency::Competent);
    }

    #[test]
    fn participation_at_the_inactive_rate_is_inactive() {
        let p = Participation {
            participated: 1,
            passed: 1,
            total: 5,
        };
        assert_eq!(p.participation_rate(), 20.0);
        assert_eq!(p.classify(&thresholds(Some(20.0))), Competency::Inactive);
    }

    #[test]
    fn zero_activities_make_everyone_competent() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let t = tally(&students, &[], &GradeIndex::default(), &thresholds(Some(20.0)));
        assert_eq!(
            t,
            CompetencyTally {
                total: 3,
                competent: 3,
                incompetent: 0,
                inactive: 0
            }
        );
        assert_eq!(t.competent_percentage(), 100.0);
    }

    #[test]
    fn tally_splits_three_ways() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let items = [100, 101];
        let grades = GradeIndex::new(vec![
            grade(1, 100, Some(90.0)),
            grade(1, 101, Some(85.0)),
            grade(2, 100, Some(50.0)),
            grade(2, 101, Some(95.0)),
        ]);
        let t = tally(&students, &items, &grades, &thresholds(Some(20.0)));
        assert_eq!((t.competent, t.incompetent, t.inactive), (1, 1, 1));
        let t = tally(&students, &items, &grades, &thresholds(None));
        assert_eq!((t.competent, t.incompetent, t.inactive), (1, 2, 0));
    }

    #[test]
    fn absent_grade_is_not_zero() {
        let grades = GradeIndex::new(vec![grade(1, 100, Some(0.0)), grade(2, 100, None)]);
        let zero = Participation::of(1, &[100], &grades, 80.0);
        let absent = Participation::of(2, &[100], &grades, 80.0);
        assert_eq!(zero.participated, 1);
        assert_eq!(absent.participated, 0);
    }

    #[test]
    fn inactive_list_uses_rate_and_ignores_empty_catalog() {
        let students: Vec<Student> = (1..=2).map(student).collect();
        let grades = GradeIndex::new(vec![grade(1, 100, Some(10.0))]);
        let listed = inactive_students(&students, &[100, 101], &grades, 20.0);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0.id, 2);
        assert_eq!(listed[0].1.participation_rate(), 0.0);
        assert!(inactive_students(&students, &[], &grades, 20.0).is_empty());
    }

    #[test]
    fn ten_students_four_competent_is_underperforming() {
        let students: Vec<Student> = (1..=10).map(student).collect();
        let grades = GradeIndex::new((1..=4).map(|id| grade(id, 100, Some(80.0))).collect());
        let outcome = activity_outcome(100, &students, &grades, 80.0);
        assert_eq!(outcome.competent, 4);
        assert_eq!(outcome.submitted, 4);
        assert_eq!(outcome.not_competent.len(), 6);
        assert_eq!(outcome.not_competent[0].id, 5);
        assert!(outcome.underperforming(10, 50.0));
        assert!(!outcome.underperforming(10, 39.0));
        assert!(!outcome.underperforming(0, 50.0));
    }

    #[test]
    fn uncompetent_counts_missing_and_threshold_grades() {
        let students: Vec<Student> = (1..=2).map(student).collect();
        let grades = GradeIndex::new(vec![grade(1, 100, Some(80.0))]);
        assert_eq!(uncompetent_percentage(100, &students, &grades, 80.0), 100.0);
        let grades = GradeIndex::new(vec![grade(1, 100, Some(80.5))]);
        assert_eq!(uncompetent_percentage(100, &students, &grades, 80.0), 50.0);
    }

    #[test]
    fn coverage_counts_distinct_users() {
        let grades = GradeIndex::new(vec![
            grade(1, 100, Some(70.0)),
            GradeRecord {
                item_id: 100,
                user_id: 2,
                finalgrade: None,
                modifier: Some(2),
            },
            grade(3, 101, Some(70.0)),
        ]);
        assert_eq!(
            coverage(100, &grades),
            Coverage {
                graded: 1,
                submitted: 2
            }
        );
    }

    #[test]
    fn grade_band_boundaries() {
        assert_eq!(GradeBand::for_percentage(90.0), GradeBand::A);
        assert_eq!(GradeBand::for_percentage(89.999), GradeBand::B);
        assert_eq!(GradeBand::for_percentage(80.0), GradeBand::B);
        assert_eq!(GradeBand::for_percentage(60.0), GradeBand::D);
        assert_eq!(GradeBand::for_percentage(59.0), GradeBand::E);
        assert_eq!(GradeBand::for_percentage(0.0), GradeBand::E);
        assert_eq!(GradeBand::for_percentage(104.0), GradeBand::A);
    }

    #[test]
    fn distribution_averages_percentages_and_skips_ungraded() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let items = [(100, 50.0), (101, 100.0), (102, 0.0)];
        let grades = GradeIndex::new(vec![
            // 100 % and 80 % average to 90 %.
            grade(1, 100, Some(50.0)),
            grade(1, 101, Some(80.0)),
            grade(1, 102, Some(3.0)),
            grade(2, 101, Some(59.0)),
        ]);
        assert_eq!(average_percentage(1, &items, &grades), Some(90.0));
        assert_eq!(average_percentage(3, &items, &grades), None);
        let dist = grade_distribution(&students, &items, &grades);
        assert_eq!(
            dist,
            vec![
                (GradeBand::A, 1),
                (GradeBand::B, 0),
                (GradeBand::C, 0),
                (GradeBand::D, 0),
                (GradeBand::E, 1),
            ]
        );
    }
}
