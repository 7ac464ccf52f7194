//! Inbound interfaces - how the outside world talks to the service

pub mod http;

pub use http::create_api_router;
