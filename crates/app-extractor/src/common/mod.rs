pub mod credentials;
pub mod headers;
pub mod request;
