use crate::fetch::QuizAttempt;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequency {
    pub attempt_count: u64,
    pub users: u64,
}

/// For each quiz: how many users made exactly N attempts, ordered by N.
pub fn attempt_frequencies(attempts: &[QuizAttempt]) -> BTreeMap<i64, Vec<Frequency>> {
    let mut per_user: BTreeMap<(i64, i64), u64> = BTreeMap::new();
    for a in attempts {
        *per_user.entry((a.quiz_id, a.user_id)).or_default() += 1;
    }

    let mut per_count: BTreeMap<i64, BTreeMap<u64, u64>> = BTreeMap::new();
    for ((quiz_id, _), n) in per_user {
        *per_count.entry(quiz_id).or_default().entry(n).or_default() += 1;
    }

    per_count
        .into_iter()
        .map(|(quiz_id, counts)| {
            let rows = counts
                .into_iter()
                .map(|(attempt_count, users)| Frequency {
                    attempt_count,
                    users,
                })
                .collect();
            (quiz_id, rows)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptDuration {
    pub attempt_number: i64,
    pub avg_minutes: f64,
    pub total: u64,
}

/// Mean time taken per attempt ordinal, in minutes.
pub fn average_durations(attempts: &[QuizAttempt]) -> Vec<AttemptDuration> {
    let mut by_number: BTreeMap<i64, (i64, u64)> = BTreeMap::new();
    for a in attempts {
        let slot = by_number.entry(a.number).or_default();
        slot.0 += a.timefinish - a.timestart;
        slot.1 += 1;
    }
    by_number
        .into_iter()
        .map(|(attempt_number, (secs, total))| AttemptDuration {
            attempt_number,
            avg_minutes: secs as f64 / 60.0 / total as f64,
            total,
        })
        .collect()
}
