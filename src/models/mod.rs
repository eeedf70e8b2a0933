pub mod daily_stat;
pub mod meal;
pub mod profile;
pub mod user;
