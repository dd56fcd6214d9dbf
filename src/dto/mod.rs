pub mod application_dto;
pub mod auth_dto;
pub mod bulk_dto;
pub mod candidate_dto;
pub mod interview_dto;
pub mod job_dto;
pub mod screening_dto;
pub mod webhook_dto;
