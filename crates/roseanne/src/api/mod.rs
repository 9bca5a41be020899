//! HTTP API.

pub mod error;
pub mod extract;
pub mod handlers;
mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
