pub mod guard;
pub mod inflight;
pub mod password;
pub mod session;
