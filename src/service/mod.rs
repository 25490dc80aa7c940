pub mod background_jobs;
pub mod booking_service;
pub mod error;
pub mod negotiation_service;
pub mod notification_service;
