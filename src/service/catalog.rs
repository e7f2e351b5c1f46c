use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snafu::{Location, OptionExt as _, ResultExt as _, Snafu};
use tracing::instrument;
use url::Url;

use super::object_store::{LocalObjectStore, ObjectStore, ObjectStoreError};
use super::store::{MemoryStore, Store, StoreError};
use crate::model::*;
use crate::time::Clock;
use crate::timeline::PlaybackState;
use crate::Located;

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CatalogError {
    #[snafu(transparent)]
    Store { source: StoreError },

    #[snafu(transparent)]
    Objects { source: ObjectStoreError },

    #[snafu(display("the webinar is invalid: {source}"))]
    InvalidWebinar {
        source: ModelError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("no webinar is published at `{slug}`"))]
    UnknownSlug {
        slug: Slug,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("the slug `{slug}` is already taken"))]
    SlugTaken {
        slug: Slug,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("user `{user}` cannot manage webinar `{webinar}`"))]
    Forbidden {
        user: UserId,
        webinar: WebinarId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("webinar `{id}` is {status}, its chat can only change before it starts"))]
    ChatLocked {
        id: WebinarId,
        status: WebinarStatus,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("webinar `{id}` is {status}, its start time can no longer move"))]
    StartLocked {
        id: WebinarId,
        status: WebinarStatus,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("webinar `{id}` has ended and can no longer change"))]
    AlreadyEnded {
        id: WebinarId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("webinar `{id}` is {status}, its video can only change before it starts"))]
    VideoLocked {
        id: WebinarId,
        status: WebinarStatus,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("webinar `{id}` is live and cannot be deleted mid-broadcast"))]
    DeleteWhileLive {
        id: WebinarId,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for CatalogError {
    fn location(&self) -> Location {
        match self {
            CatalogError::Store { source } => source.location(),
            CatalogError::Objects { source } => source.location(),
            CatalogError::InvalidWebinar { location, .. }
            | CatalogError::UnknownSlug { location, .. }
            | CatalogError::SlugTaken { location, .. }
            | CatalogError::Forbidden { location, .. }
            | CatalogError::ChatLocked { location, .. }
            | CatalogError::StartLocked { location, .. }
            | CatalogError::AlreadyEnded { location, .. }
            | CatalogError::VideoLocked { location, .. }
            | CatalogError::DeleteWhileLive { location, .. } => *location,
        }
    }
}

/// What is needed to schedule a new webinar. The slug is derived from the title when left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebinarDraft {
    pub title: String,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(default)]
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(default)]
    pub chat: ChatLog,
    #[serde(default)]
    pub ctas: CtaSet,
    pub video: VideoAsset,
}

/// A webinar together with its timeline evaluated at `at`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub webinar: Webinar,
    pub at: Timestamp,
    pub playback: PlaybackState,
}

/// Every webinar and the rules for changing them.
#[derive(Debug)]
pub struct Catalog<W = MemoryStore<Webinar>, U = MemoryStore<User>, O = LocalObjectStore> {
    webinars: W,
    users: U,
    objects: Arc<O>,
    clock: Arc<dyn Clock>,
}

impl<W: Clone, U: Clone, O> Clone for Catalog<W, U, O> {
    fn clone(&self) -> Self {
        Self {
            webinars: self.webinars.clone(),
            users: self.users.clone(),
            objects: Arc::clone(&self.objects),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<W, U, O> Catalog<W, U, O>
where
    W: Store<Webinar>,
    U: Store<User>,
    O: ObjectStore,
{
    pub fn new(webinars: W, users: U, objects: O, clock: Arc<dyn Clock>) -> Self {
        Self {
            webinars,
            users,
            objects: Arc::new(objects),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[instrument(skip(self, actor, draft), fields(actor = %actor.id, title = %draft.title))]
    pub async fn create(&self, actor: &User, draft: WebinarDraft) -> Result<Webinar> {
        let owner = self.users.get(&actor.id).await?;
        let schedule =
            WebinarSchedule::new(draft.start_time, draft.end_time).context(InvalidWebinarSnafu)?;

        let slug = match draft.slug {
            Some(slug) => slug,
            None => Slug::from_title(&draft.title).context(InvalidWebinarSnafu)?,
        };

        let taken = self
            .webinars
            .list(|webinar| webinar.slug == slug)
            .await?;
        snafu::ensure!(taken.is_empty(), SlugTakenSnafu { slug });

        let webinar = Webinar {
            id: WebinarId::random(),
            owner: owner.id,
            slug,
            title: draft.title,
            description: draft.description,
            schedule,
            chat: draft.chat,
            ctas: draft.ctas,
            video: draft.video,
            analytics: Analytics::default(),
            created_at: self.clock.now(),
        };

        self.webinars.put(webinar.clone()).await?;
        tracing::info!(webinar_id = %webinar.id, slug = %webinar.slug, "scheduled webinar `{}`", webinar.title);

        Ok(webinar)
    }

    pub async fn get(&self, id: &WebinarId) -> Result<Webinar> {
        Ok(self.webinars.get(id).await?)
    }

    pub async fn by_slug(&self, slug: &Slug) -> Result<Webinar> {
        self.webinars
            .list(|webinar| &webinar.slug == slug)
            .await?
            .into_iter()
            .next()
            .context(UnknownSlugSnafu { slug: slug.clone() })
    }

    /// Admins see every webinar, collaborators only their own.
    pub async fn list_for(&self, actor: &User) -> Result<Vec<Webinar>> {
        let admin = actor.is_admin();
        let id = actor.id.clone();

        Ok(self
            .webinars
            .list(move |webinar| admin || webinar.owner == id)
            .await?)
    }

    /// Replaces the chat log. Once the webinar has started its chat is frozen so replays stay identical.
    #[instrument(skip(self, actor, chat), fields(actor = %actor.id, messages = chat.len()))]
    pub async fn replace_chat(&self, actor: &User, id: &WebinarId, chat: ChatLog) -> Result<Webinar> {
        let mut webinar = self.managed(actor, id).await?;

        let status = webinar.status(self.clock.now());
        snafu::ensure!(
            status == WebinarStatus::Scheduled,
            ChatLockedSnafu {
                id: id.clone(),
                status
            }
        );

        webinar.chat = chat;
        self.webinars.put(webinar.clone()).await?;
        Ok(webinar)
    }

    #[instrument(skip(self, actor, ctas), fields(actor = %actor.id, ctas = ctas.len()))]
    pub async fn replace_ctas(&self, actor: &User, id: &WebinarId, ctas: CtaSet) -> Result<Webinar> {
        let mut webinar = self.changeable(actor, id).await?;

        webinar.ctas = ctas;
        self.webinars.put(webinar.clone()).await?;
        Ok(webinar)
    }

    /// Moves the broadcast. Once it has started only the end time may change.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn reschedule(
        &self, actor: &User, id: &WebinarId, start_time: Timestamp, end_time: Timestamp,
    ) -> Result<Webinar> {
        let mut webinar = self.changeable(actor, id).await?;

        let status = webinar.status(self.clock.now());
        snafu::ensure!(
            status == WebinarStatus::Scheduled || start_time == webinar.schedule.start_time(),
            StartLockedSnafu {
                id: id.clone(),
                status
            }
        );

        webinar.schedule = WebinarSchedule::new(start_time, end_time).context(InvalidWebinarSnafu)?;
        self.webinars.put(webinar.clone()).await?;

        tracing::info!(start_time = %start_time, end_time = %end_time, "rescheduled webinar `{}`", webinar.title);
        Ok(webinar)
    }

    /// Uploads a new video as `<uuid>.<extension>`, removing the one it replaces.
    #[instrument(skip(self, actor, bytes), fields(actor = %actor.id, size = bytes.len()))]
    pub async fn attach_video(
        &self, actor: &User, id: &WebinarId, extension: &str, bytes: Vec<u8>,
        duration: Option<Offset>,
    ) -> Result<Webinar> {
        let mut webinar = self.managed(actor, id).await?;

        let status = webinar.status(self.clock.now());
        snafu::ensure!(
            status == WebinarStatus::Scheduled,
            VideoLockedSnafu {
                id: id.clone(),
                status
            }
        );

        let key = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        self.objects.put(&key, bytes).await?;

        let previous = std::mem::replace(&mut webinar.video, VideoAsset::new(key, duration));
        self.webinars.put(webinar.clone()).await?;

        if let Err(err) = self.objects.delete(&previous.key).await {
            tracing::warn!(error = %err, "could not remove the replaced video `{}`", previous.key);
        }

        Ok(webinar)
    }

    /// Removes the webinar, its analytics and its video. Never while it is live.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete(&self, actor: &User, id: &WebinarId) -> Result<Webinar> {
        let webinar = self.managed(actor, id).await?;

        snafu::ensure!(
            webinar.status(self.clock.now()) != WebinarStatus::Live,
            DeleteWhileLiveSnafu { id: id.clone() }
        );

        self.webinars.delete(id).await?;
        if let Err(err) = self.objects.delete(&webinar.video.key).await {
            tracing::warn!(error = %err, "could not remove the video `{}`", webinar.video.key);
        }

        tracing::info!(slug = %webinar.slug, "deleted webinar `{}`", webinar.title);
        Ok(webinar)
    }

    pub async fn record_view(&self, id: &WebinarId) -> Result<Webinar> {
        let mut webinar = self.webinars.get(id).await?;

        webinar.analytics.record_view(self.clock.now());
        self.webinars.put(webinar.clone()).await?;
        Ok(webinar)
    }

    pub fn playable_url(&self, webinar: &Webinar) -> Result<Url> {
        Ok(self.objects.url(&webinar.video.key)?)
    }

    /// The timeline at this instant, before any player has reported on the media.
    pub async fn state(&self, slug: &Slug) -> Result<Snapshot> {
        let webinar = self.by_slug(slug).await?;
        let at = self.clock.now();
        let playback = webinar.playback(webinar.media(), at);

        Ok(Snapshot {
            webinar,
            at,
            playback,
        })
    }

    async fn managed(&self, actor: &User, id: &WebinarId) -> Result<Webinar> {
        let webinar = self.webinars.get(id).await?;

        snafu::ensure!(
            webinar.can_be_managed_by(actor),
            ForbiddenSnafu {
                user: actor.id.clone(),
                webinar: id.clone(),
            }
        );

        Ok(webinar)
    }

    async fn changeable(&self, actor: &User, id: &WebinarId) -> Result<Webinar> {
        let webinar = self.managed(actor, id).await?;

        snafu::ensure!(
            webinar.status(self.clock.now()) != WebinarStatus::Ended,
            AlreadyEndedSnafu { id: id.clone() }
        );

        Ok(webinar)
    }
}
