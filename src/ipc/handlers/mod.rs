pub mod auth;
pub mod calendar;
pub mod core;
pub mod student;
pub mod timetable;
