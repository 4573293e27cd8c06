//! Pure bucketing and classification policies over fetched records.
//!
//! Nothing here touches the store or the clock; every function is a
//! deterministic function of its inputs. Maps are ordered so that equal
//! inputs always produce equal outputs.

pub mod access;
pub mod calendar;
pub mod competency;
pub mod quiz;
