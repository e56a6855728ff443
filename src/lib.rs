pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod host;
pub mod logger;
pub mod scan;
pub mod script;
pub mod shell;
pub mod store;
pub mod system;
pub mod theme;
pub mod timer;
pub mod web;

pub use config::ShellConfig;
pub use error::ShellError;
pub use host::{Clock, HeadlessHost, Host, ManualClock};
pub use shell::Session;
pub use store::FileStore;
pub use system::System;
