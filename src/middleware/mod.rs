//! 中间件 / Extractor

pub mod auth;

pub use auth::RequireApiKey;
