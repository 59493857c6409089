pub mod actor;
pub mod counters;
pub mod engagement;
pub mod error;
pub mod gate;
pub mod locks;
pub mod moderation;
pub mod policy;
pub mod rate_limiter;
pub mod references;
pub mod session;
pub mod submissions;
pub mod views;
