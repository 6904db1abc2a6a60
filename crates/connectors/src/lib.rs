pub mod error;
pub mod eval;
pub mod file;
pub mod message;
pub mod rest;
pub mod transport;
