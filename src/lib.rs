//! Scholar Outreach: research a professor, draft an email, send it after
//! human approval.

pub mod agent;
pub mod browser;
pub mod channels;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod research;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
