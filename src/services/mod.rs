pub mod ai_interview_client;
pub mod ai_service;
pub mod application_service;
pub mod audit_service;
pub mod bulk_service;
pub mod candidate_service;
pub mod email_service;
pub mod evaluation_service;
pub mod export_service;
pub mod interview_service;
pub mod job_service;
pub mod llm_client;
pub mod maintenance;
pub mod matching;
pub mod resume_extractor;
pub mod screening_service;
pub mod stats_service;
pub mod user_service;
