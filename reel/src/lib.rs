pub mod remote;
pub mod session;
pub mod store;

pub use reel_api as api;
