pub mod categories;
pub mod core;
pub mod local;
pub mod search;
pub mod setup;
