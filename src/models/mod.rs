pub mod admin;
pub mod otp;
pub mod pagination;
pub mod report;
