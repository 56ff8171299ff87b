pub mod config;
pub mod consts;
pub mod errors;
pub mod handler;
pub mod server;

pub use config::RtmpSessionConfig;
pub use handler::{SessionDenied, SessionHandler};
pub use server::{ServerSession, SessionStat};
