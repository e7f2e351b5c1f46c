use std::ops::Deref;

use derive_new::new;

use crate::model::{User, Webinar};
use crate::service::catalog::Catalog;
use crate::service::object_store::LocalObjectStore;
use crate::service::session::SessionManager;
use crate::service::store::MemoryStore;

pub type Sessions = SessionManager<MemoryStore<Webinar>, MemoryStore<User>, LocalObjectStore>;

/// Shared by every handler.
#[derive(Debug, Clone, new)]
pub struct App {
    pub sessions: Sessions,
    /// Who the HTTP surface acts as.
    #[new(value = "User::system()")]
    pub actor: User,
}

impl App {
    pub fn catalog(&self) -> &Catalog {
        self.sessions.catalog()
    }
}

impl Deref for App {
    type Target = Sessions;

    fn deref(&self) -> &Self::Target {
        &self.sessions
    }
}
