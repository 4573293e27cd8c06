//! Access-log aggregation: by IP, by module, and absence of events.

use crate::fetch::LogRecord;
use crate::scope::Student;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpCount {
    pub ip: String,
    pub count: u64,
}

/// Access counts per IP, busiest first, ties by IP. Records without an IP
/// are ignored.
pub fn ip_groups(records: &[LogRecord], unique_by_user: bool) -> Vec<IpCount> {
    let mut raw: BTreeMap<&str, u64> = BTreeMap::new();
    let mut users: BTreeMap<&str, BTreeSet<i64>> = BTreeMap::new();
    for record in records {
        let Some(ip) = record.ip.as_deref() else {
            continue;
        };
        *raw.entry(ip).or_default() += 1;
        let seen = users.entry(ip).or_default();
        if record.user_id > 0 {
            seen.insert(record.user_id);
        }
    }

    // In unique mode an IP seen only from guests has no users and is left out.
    let mut groups: Vec<IpCount> = raw
        .into_iter()
        .map(|(ip, n)| IpCount {
            ip: ip.to_string(),
            count: if unique_by_user {
                users.get(ip).map_or(0, |u| u.len() as u64)
            } else {
                n
            },
        })
        .filter(|g| g.count > 0)
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ip.cmp(&b.ip)));
    groups
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleViews {
    /// Raw view events.
    pub views: u64,
    /// Distinct users behind those events.
    pub viewers: u64,
}

/// View counts keyed by course-module id. Records with no module are
/// skipped.
pub fn module_views(records: &[LogRecord]) -> BTreeMap<i64, ModuleViews> {
    let mut raw: BTreeMap<i64, u64> = BTreeMap::new();
    let mut users: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for record in records {
        let Some(cmid) = record.cmid else {
            continue;
        };
        *raw.entry(cmid).or_default() += 1;
        users.entry(cmid).or_default().insert(record.user_id);
    }
    raw.into_iter()
        .map(|(cmid, views)| {
            let viewers = users.get(&cmid).map_or(0, |u| u.len() as u64);
            (cmid, ModuleViews { views, viewers })
        })
        .collect()
}

/// Students with no record at all, in roster order.
pub fn students_without_events<'a>(
    students: &'a [Student],
    records: &[LogRecord],
) -> Vec<&'a Student> {
    let active: BTreeSet<i64> = records.iter().map(|r| r.user_id).collect();
    students.iter().filter(|s| !active.contains(&s.id)).collect()
}
