//! HTTP adapter for the model backend

mod transport;

pub use transport::{
    DEFAULT_BASE_URL, HttpBackendConfig, HttpModelTransport, map_status, parse_body,
};
