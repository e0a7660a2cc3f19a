pub mod root;
pub mod auth;
pub mod announcements;
pub mod students;
pub mod email_logs;
pub mod admins;
pub mod notifications;
