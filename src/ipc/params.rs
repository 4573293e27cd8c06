//! Request parameter parsing. Every failure is a `bad_params` error naming
//! the offending key.

use serde_json::{json, Value};

use crate::engine::calendar::{default_periods, Period, TimeOfDay};
use crate::error::{AnalyticsError, Result};
use crate::scope::Caller;

fn field<'a>(params: &'a Value, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn required_int(params: &Value, key: &str) -> Result<i64> {
    let v = field(params, key).ok_or_else(|| AnalyticsError::invalid(format!("missing {key}")))?;
    as_int(v).ok_or_else(|| {
        AnalyticsError::invalid_with(format!("{key} must be an integer"), json!({ key: v }))
    })
}

pub fn required_str(params: &Value, key: &str) -> Result<String> {
    field(params, key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AnalyticsError::invalid(format!("missing {key}")))
}

pub fn optional_f64(params: &Value, key: &str) -> Result<Option<f64>> {
    let Some(v) = field(params, key) else {
        return Ok(None);
    };
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(AnalyticsError::invalid_with(
            format!("{key} must be a number"),
            json!({ key: v }),
        )),
    }
}

pub fn bool_or(params: &Value, key: &str, default: bool) -> Result<bool> {
    match field(params, key) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) if n.as_i64() == Some(0) => Ok(false),
        Some(Value::Number(n)) if n.as_i64() == Some(1) => Ok(true),
        Some(v) => Err(AnalyticsError::invalid_with(
            format!("{key} must be a boolean"),
            json!({ key: v }),
        )),
    }
}

/// `callerId` is optional at parse time; its absence surfaces as
/// `unauthenticated` once the scope has resolved.
pub fn caller(params: &Value) -> Result<Option<Caller>> {
    match field(params, "callerId") {
        None => Ok(None),
        Some(_) => Ok(Some(Caller {
            user_id: required_int(params, "callerId")?,
        })),
    }
}

fn time_field(entry: &Value, key: &str, period: &str, default: Option<TimeOfDay>) -> Result<TimeOfDay> {
    match entry.get(key).filter(|v| !v.is_null()) {
        Some(Value::String(s)) => TimeOfDay::parse(s),
        Some(v) => Err(AnalyticsError::invalid_with(
            format!("periods.{period}.{key} must be HH:MM"),
            json!({ "period": period, key: v }),
        )),
        None => default.ok_or_else(|| {
            AnalyticsError::invalid(format!("periods.{period}.{key} is required"))
        }),
    }
}

/// Time-of-day periods.
///
/// Accepts an object keyed by period name (`{"pagi": {"start", "end"}}`),
/// which always carries every built-in period (bounds default field by
/// field) plus any extra names, or an array of `{"name", "start", "end"}` kept in the given
/// order. Omitted or empty means the built-in periods.
pub fn periods(params: &Value) -> Result<Vec<Period>> {
    let defaults = default_periods();
    match field(params, "periods") {
        None => Ok(defaults),
        Some(Value::Object(map)) if map.is_empty() => Ok(defaults),
        Some(Value::Array(items)) if items.is_empty() => Ok(defaults),
        Some(Value::Object(map)) => {
            // Built-in names first in their usual order, then the rest by key.
            let mut out = Vec::with_capacity(defaults.len() + map.len());
            for d in &defaults {
                let period = match map.get(&d.name) {
                    Some(entry) => Period::new(
                        d.name.clone(),
                        time_field(entry, "start", &d.name, Some(d.start))?,
                        time_field(entry, "end", &d.name, Some(d.end))?,
                    ),
                    None => d.clone(),
                };
                out.push(period);
            }
            for (name, entry) in map {
                if defaults.iter().any(|d| &d.name == name) {
                    continue;
                }
                out.push(Period::new(
                    name.clone(),
                    time_field(entry, "start", name, None)?,
                    time_field(entry, "end", name, None)?,
                ));
            }
            Ok(out)
        }
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, entry)| -> Result<Period> {
                let name = entry
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AnalyticsError::invalid(format!("periods[{i}].name is required")))?;
                Ok(Period::new(
                    name,
                    time_field(entry, "start", name, None)?,
                    time_field(entry, "end", name, None)?,
                ))
            })
            .collect(),
        Some(v) => Err(AnalyticsError::invalid_with(
            "periods must be an object or an array",
            json!({ "periods": v }),
        )),
    }
}
