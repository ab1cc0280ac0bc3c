pub mod metrics;
pub mod validate;
