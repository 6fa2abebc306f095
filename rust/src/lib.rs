pub mod config_store;
pub mod download;
pub mod generation;
pub mod main_ui_html;
pub mod path_utils;
pub mod preview;
pub mod prompt;
pub mod server;
pub mod session;
