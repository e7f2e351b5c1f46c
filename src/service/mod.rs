pub mod catalog;
pub mod object_store;
pub mod session;
pub mod store;
pub mod surface;
