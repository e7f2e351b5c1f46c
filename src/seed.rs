use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use snafu::ResultExt as _;

use crate::error::{
    ApplicationError, DuplicateSeedIdSnafu, DuplicateSeedSlugSnafu, ParseSeedSnafu, ReadSeedSnafu,
    SeedVideoKeySnafu, UnknownSeedOwnerSnafu,
};
use crate::model::{User, Webinar};
use crate::service::object_store::validate_key;
use crate::service::store::MemoryStore;

/// Records the server starts with, read from a JSON file:
///
/// ```json
/// { "users": [ ... ], "webinars": [ ... ] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub webinars: Vec<Webinar>,
}

impl Seed {
    #[tracing::instrument]
    pub async fn load(path: &Path) -> Result<Seed, ApplicationError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .context(ReadSeedSnafu { path })?;

        serde_json::from_str(&content).context(ParseSeedSnafu { path })
    }

    /// The stores to serve from. The system user is always present.
    ///
    /// Webinars get the checks a newly created one would: unique ids and slugs, a known owner and a
    /// usable video key.
    pub fn into_stores(self) -> Result<(MemoryStore<Webinar>, MemoryStore<User>), ApplicationError> {
        let users: Vec<User> = std::iter::once(User::system()).chain(self.users).collect();
        let owners: HashSet<_> = users.iter().map(|user| &user.id).collect();

        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();
        for webinar in &self.webinars {
            snafu::ensure!(ids.insert(&webinar.id), DuplicateSeedIdSnafu { id: webinar.id.clone() });
            snafu::ensure!(
                slugs.insert(&webinar.slug),
                DuplicateSeedSlugSnafu {
                    slug: webinar.slug.clone()
                }
            );
            snafu::ensure!(
                owners.contains(&webinar.owner),
                UnknownSeedOwnerSnafu {
                    webinar: webinar.id.clone(),
                    owner: webinar.owner.clone(),
                }
            );
            validate_key(&webinar.video.key).context(SeedVideoKeySnafu {
                webinar: webinar.id.clone(),
            })?;
        }

        Ok((MemoryStore::seeded(self.webinars), MemoryStore::seeded(users)))
    }
}
