//! HTTP gateway for the index API.

pub mod auth;
pub mod routes;
pub mod server;
pub mod state;

pub use server::start_http_server;
pub use state::ApiState;
