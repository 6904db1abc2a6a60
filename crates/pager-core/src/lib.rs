pub mod cache;
pub mod error;
pub mod event_bus;
pub mod pager;
pub mod state;
