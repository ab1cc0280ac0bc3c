pub mod cursor;
pub mod error;
pub mod handlers;
pub mod update;
