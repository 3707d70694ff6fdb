pub mod actions;
pub mod dispatch;
pub mod flash;
pub mod health;
