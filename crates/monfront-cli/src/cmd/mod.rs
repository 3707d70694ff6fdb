pub mod actions;
pub mod check;
pub mod config;
pub mod init;
pub mod serve;
