pub mod collection;
pub mod consts;
pub mod cursor;
pub mod database;
pub mod model;
