//! Terminal rendering for the summary and history commands.

pub mod history;
pub mod summary;
pub mod ui;
