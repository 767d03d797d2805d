pub mod api;
pub mod expense;
pub mod job;
pub mod statement;
pub mod transaction;
