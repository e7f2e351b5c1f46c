use std::net::SocketAddr;
use std::path::PathBuf;

use snafu::{Location, Snafu};

use crate::model::{Slug, UserId, WebinarId};
use crate::service::object_store::ObjectStoreError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApplicationError {
    /// could not parse the configuration from the environment
    ConfigLoad {
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// `{url}` is not a usable public url
    PublicUrl {
        url: String,
        source: url::ParseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not create the storage directory `{path:?}`
    CreateStorage {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not read the seed file `{path:?}`
    ReadSeed {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// The seed file `{path:?}` is not valid
    ParseSeed {
        path: PathBuf,
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// The seed has more than one webinar `{id}`
    DuplicateSeedId {
        id: WebinarId,
        #[snafu(implicit)]
        location: Location,
    },

    /// The seed has more than one webinar at `{slug}`
    DuplicateSeedSlug {
        slug: Slug,
        #[snafu(implicit)]
        location: Location,
    },

    /// Seeded webinar `{webinar}` belongs to `{owner}`, who is not a seeded user
    UnknownSeedOwner {
        webinar: WebinarId,
        owner: UserId,
        #[snafu(implicit)]
        location: Location,
    },

    /// Seeded webinar `{webinar}` has an unusable video key
    SeedVideoKey {
        webinar: WebinarId,
        source: ObjectStoreError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not serve the application
    WebServer {
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not bind to the given address, check if it's already in use
    BindAddress {
        address: SocketAddr,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    InitializeLogger {
        source: tracing::subscriber::SetGlobalDefaultError,
        #[snafu(implicit)]
        location: Location,
    },
}
