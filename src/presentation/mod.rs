// Presentation layer - Command line surface, prompts and reports
pub mod app_state;
pub mod cli;
pub mod handlers;
pub mod prompt;
pub mod report;
