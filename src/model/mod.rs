pub use chat::*;
pub use cta::*;
pub use error::*;
pub use offset::*;
pub use schedule::*;
pub use user::*;
pub use webinar::*;

pub use crate::time::Timestamp;

mod chat;
mod cta;
mod error;
mod offset;
mod schedule;
mod user;
mod webinar;
