// src/timesheet/mod.rs — Timesheet domain: form, sessions, submission, reminders

pub mod card;
pub mod reminder;
pub mod session;
pub mod submission;
pub mod types;
pub mod values;
