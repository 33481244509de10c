// src/bot/mod.rs — Bot Framework surface: activities, actions, delivery, turns

pub mod action;
pub mod activity;
pub mod connector;
pub mod handler;

pub use handler::TimesheetBot;
