//! Operator-facing I/O: the console and the outbound mail transport.

pub mod cli;
pub mod email;

pub use cli::{Console, StdConsole};
pub use email::SmtpMailer;
