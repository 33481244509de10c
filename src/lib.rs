// src/lib.rs — Library root for the timesheet bot

pub mod api;
pub mod bot;
pub mod cli;
pub mod infra;
pub mod store;
pub mod timesheet;
