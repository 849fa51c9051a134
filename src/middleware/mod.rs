pub mod cors;
pub mod headers;
