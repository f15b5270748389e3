//! Bridge between the egui thread and the tokio-backed deployment client.

pub mod commands;
pub mod runtime;
