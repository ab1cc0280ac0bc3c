pub mod message;
pub mod person;
pub mod validation;
