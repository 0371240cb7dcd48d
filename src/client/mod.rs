pub mod commands;
pub mod http;
pub mod render;
pub mod session;
pub mod state;
pub mod views;
