pub mod application;
pub mod audit_log;
pub mod bulk_job;
pub mod candidate;
pub mod email;
pub mod interview;
pub mod job;
pub mod screening_token;
pub mod user;
