pub mod admin;
pub mod ask;
pub mod funds;
pub mod health;
pub mod search;
