//! Command implementations for the x431 CLI

pub mod connect;
pub mod login;

pub use connect::connect;
pub use login::login;
