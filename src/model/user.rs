use derive_new::new;
use serde::{Deserialize, Serialize};

crate::define_id!(UserId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct User {
    #[new(value = "UserId::random()")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

crate::define_record!("users" : User = id as UserId);

impl User {
    /// The operator the HTTP surface acts as, authentication being somebody else's job.
    pub fn system() -> Self {
        Self {
            id: "system".into(),
            name: "system".to_string(),
            email: "system@localhost".to_string(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Collaborator,
}
