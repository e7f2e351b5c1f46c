pub mod api;
pub mod config;
pub mod error;
pub mod logger;
pub mod model;
pub mod seed;
pub mod service;
pub mod time;
pub mod timeline;
pub mod viewers;

mod macros;

pub trait Located {
    fn location(&self) -> snafu::Location;
}
