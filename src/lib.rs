pub mod clients;
pub mod config;
pub mod consts;
pub mod handlers;
pub mod middleware;
pub mod model;
