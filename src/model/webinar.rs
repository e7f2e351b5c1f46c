use derive_new::new;
use serde::{Deserialize, Serialize};

use super::*;
use crate::timeline::{self, MediaStatus, PlaybackState};

crate::define_id!(WebinarId);

/// A scheduled fake-live broadcast and everything that happens on its timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webinar {
    pub id: WebinarId,
    pub owner: UserId,
    pub slug: Slug,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub schedule: WebinarSchedule,
    #[serde(default)]
    pub chat: ChatLog,
    #[serde(default)]
    pub ctas: CtaSet,
    pub video: VideoAsset,
    #[serde(default)]
    pub analytics: Analytics,
    pub created_at: Timestamp,
}

crate::define_record!("webinars" : Webinar = id as WebinarId);

impl Webinar {
    pub fn status(&self, now: Timestamp) -> WebinarStatus {
        self.schedule.status(now)
    }

    pub fn can_be_managed_by(&self, user: &User) -> bool {
        user.is_admin() || self.owner == user.id
    }

    /// What the media is known to be before a player reports anything.
    pub fn media(&self) -> MediaStatus {
        MediaStatus::new(self.video.duration, false)
    }

    pub fn playback(&self, media: MediaStatus, now: Timestamp) -> PlaybackState {
        timeline::evaluate_with_media(&self.schedule, &self.chat, &self.ctas, media, now)
    }
}

/// The pre-recorded video behind a webinar, addressed by its object store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct VideoAsset {
    pub key: String,
    #[serde(default, rename = "duration_seconds")]
    pub duration: Option<Offset>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub views: u64,
    pub last_viewed_at: Option<Timestamp>,
}

impl Analytics {
    pub fn record_view(&mut self, now: Timestamp) {
        self.views += 1;
        self.last_viewed_at = Some(now);
    }
}

/// The public address of a webinar page: lowercase ascii letters, digits and single dashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn new(text: impl Into<String>) -> Result<Self, ModelError> {
        let text = text.into();
        let valid = !text.is_empty()
            && !text.starts_with('-')
            && !text.ends_with('-')
            && !text.contains("--")
            && text
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

        snafu::ensure!(valid, InvalidSlugSnafu { text });
        Ok(Self(text))
    }

    /// Derives a slug from a human title, e.g. `"Lançamento 2024!"` becomes `lan-amento-2024`.
    pub fn from_title(title: &str) -> Result<Self, ModelError> {
        let mut slug = String::with_capacity(title.len());
        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }

        while slug.ends_with('-') {
            slug.pop();
        }

        if slug.is_empty() {
            return InvalidSlugSnafu { text: title }.fail();
        }

        Self::new(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Slug {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
