use serde_json::json;
use thiserror::Error;

/// Failures a report call can surface. Every variant is terminal: a report
/// is either complete or not produced at all.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{message}")]
    InvalidParameter {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("callerId is required")]
    Unauthenticated,

    #[error("caller {caller_id} may not view reports for course {course_id}")]
    Forbidden { caller_id: i64, course_id: i64 },

    #[error("open a store first")]
    NoStore,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl AnalyticsError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AnalyticsError::InvalidParameter {
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        AnalyticsError::InvalidParameter {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Wire error code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            AnalyticsError::NotFound(_) => "not_found",
            AnalyticsError::InvalidParameter { .. } => "bad_params",
            AnalyticsError::Unauthenticated => "unauthenticated",
            AnalyticsError::Forbidden { .. } => "forbidden",
            AnalyticsError::NoStore => "no_store",
            AnalyticsError::Database(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AnalyticsError::InvalidParameter { details, .. } => details.clone(),
            AnalyticsError::Forbidden {
                caller_id,
                course_id,
            } => Some(json!({ "callerId": caller_id, "courseId": course_id })),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_contract() {
        assert_eq!(AnalyticsError::NotFound("course 3".into()).code(), "not_found");
        assert_eq!(AnalyticsError::invalid("bad date").code(), "bad_params");
        assert_eq!(AnalyticsError::Unauthenticated.code(), "unauthenticated");
        assert_eq!(AnalyticsError::NoStore.code(), "no_store");
        assert_eq!(
            AnalyticsError::Database(rusqlite::Error::QueryReturnedNoRows).code(),
            "db_query_failed"
        );
    }

    #[test]
    fn forbidden_carries_ids_in_details() {
        let e = AnalyticsError::Forbidden {
            caller_id: 7,
            course_id: 2,
        };
        assert_eq!(e.code(), "forbidden");
        let d = e.details().expect("details");
        assert_eq!(d["callerId"], 7);
        assert_eq!(d["courseId"], 2);
        assert_eq!(e.to_string(), "caller 7 may not view reports for course 2");
    }
}
