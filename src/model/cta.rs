use std::ops::Range;

use serde::{Deserialize, Serialize};
use snafu::ResultExt as _;
use url::Url;

use super::*;

crate::define_id!(CtaId);

/// A clickable overlay shown during `[show_at, show_at + duration)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CtaData")]
pub struct CtaButton {
    pub id: CtaId,
    pub text: String,
    pub url: Url,
    pub color: String,
    #[serde(rename = "show_at_offset_seconds")]
    pub show_at: Offset,
    #[serde(rename = "duration_seconds")]
    pub duration: Offset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerDecoration>,
}

#[derive(Deserialize)]
struct CtaData {
    id: CtaId,
    text: String,
    url: Url,
    color: String,
    show_at_offset_seconds: Offset,
    duration_seconds: Offset,
    #[serde(default)]
    timer: Option<TimerDecoration>,
}

impl TryFrom<CtaData> for CtaButton {
    type Error = ModelError;

    fn try_from(data: CtaData) -> Result<Self, Self::Error> {
        snafu::ensure!(
            !data.duration_seconds.is_zero(),
            EmptyCtaWindowSnafu { id: data.id }
        );

        Ok(Self {
            id: data.id,
            text: data.text,
            url: data.url,
            color: data.color,
            show_at: data.show_at_offset_seconds,
            duration: data.duration_seconds,
            timer: data.timer,
        })
    }
}

impl CtaButton {
    pub fn new(
        text: impl Into<String>, url: &str, color: impl Into<String>, show_at: Offset,
        duration: Offset,
    ) -> Result<Self, ModelError> {
        let id = CtaId::random();
        snafu::ensure!(!duration.is_zero(), EmptyCtaWindowSnafu { id });

        let url = Url::parse(url).context(InvalidUrlSnafu { url })?;

        Ok(Self {
            id,
            text: text.into(),
            url,
            color: color.into(),
            show_at,
            duration,
            timer: None,
        })
    }

    pub fn with_timer(mut self, timer: TimerDecoration) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Half-open: the CTA is gone at exactly `show_at + duration`.
    pub fn window(&self) -> Range<Offset> {
        self.show_at..self.show_at.saturating_add(self.duration)
    }

    pub fn is_active(&self, elapsed: Offset) -> bool {
        self.window().contains(&elapsed)
    }

    /// Time left before the CTA expires, if it is active at `elapsed`.
    pub fn remaining(&self, elapsed: Offset) -> Option<Offset> {
        let window = self.window();
        window
            .contains(&elapsed)
            .then(|| window.end.saturating_sub(elapsed))
    }
}

/// The countdown pill rendered next to a CTA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDecoration {
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default)]
    pub opacity_percent: Opacity,
    #[serde(default)]
    pub position: TimerPosition,
}

fn default_background() -> String {
    "#000000".to_string()
}

impl Default for TimerDecoration {
    fn default() -> Self {
        Self {
            background_color: default_background(),
            opacity_percent: Opacity::default(),
            position: TimerPosition::default(),
        }
    }
}

impl TimerDecoration {
    /// The background colour with the opacity appended as a two digit hex alpha, e.g. `#00000066`.
    pub fn css_background(&self) -> String {
        let alpha = (f64::from(self.opacity_percent.get()) * 2.55).round() as u8;
        format!("{}{:02x}", self.background_color, alpha)
    }
}

/// A percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Opacity(u8);

impl Opacity {
    pub fn new(percent: u8) -> Result<Self, ModelError> {
        snafu::ensure!(percent <= 100, InvalidOpacitySnafu { value: percent });
        Ok(Self(percent))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(40)
    }
}

impl TryFrom<u8> for Opacity {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Opacity> for u8 {
    fn from(value: Opacity) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPosition {
    #[default]
    Above,
    Below,
    Left,
    Right,
}

/// The CTAs of a webinar. Ids are unique, iteration keeps the order they were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CtaButton>", into = "Vec<CtaButton>")]
pub struct CtaSet {
    buttons: Vec<CtaButton>,
}

impl CtaSet {
    pub fn new(buttons: Vec<CtaButton>) -> Result<Self, ModelError> {
        if let Some(id) = super::chat::first_duplicate(buttons.iter().map(|button| &button.id)) {
            return DuplicateCtaSnafu { id }.fail();
        }

        Ok(Self { buttons })
    }

    pub fn insert(&mut self, button: CtaButton) -> Result<(), ModelError> {
        if self.buttons.iter().any(|existing| existing.id == button.id) {
            return DuplicateCtaSnafu { id: button.id }.fail();
        }

        self.buttons.push(button);
        Ok(())
    }

    /// Every CTA whose window contains `elapsed`. Overlapping windows are all returned.
    pub fn active_at(&self, elapsed: Offset) -> impl Iterator<Item = &CtaButton> {
        self.buttons
            .iter()
            .filter(move |button| button.is_active(elapsed))
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }
}

impl TryFrom<Vec<CtaButton>> for CtaSet {
    type Error = ModelError;

    fn try_from(value: Vec<CtaButton>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CtaSet> for Vec<CtaButton> {
    fn from(value: CtaSet) -> Self {
        value.buttons
    }
}
