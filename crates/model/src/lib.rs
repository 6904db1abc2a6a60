pub mod events;
pub mod pagination;
