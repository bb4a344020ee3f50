pub mod admin_service;
pub mod otp_service;
pub mod report_service;
