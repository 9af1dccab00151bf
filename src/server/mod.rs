pub mod http_api;

pub use http_api::{router, start_http_server};
