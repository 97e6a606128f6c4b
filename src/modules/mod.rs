pub mod coordinator;
pub mod student;
pub mod submission;
pub mod work_views;
