//! JSON-lines request handling: one request per line in, one response out.

mod error;
mod handlers;
mod params;
mod router;
mod types;

pub use error::err;
pub use handlers::core::open_store;
pub use router::handle_request;
pub use types::{AppState, Request};
