//! UI layer for the desktop GUI: the single-page app shell.

pub mod app;

pub use app::DeploydeckApp;
