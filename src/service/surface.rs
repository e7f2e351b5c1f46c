use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snafu::Snafu;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

use crate::model::Offset;

/// Called once when the media plays through to its natural end.
pub type EndedCallback = Arc<dyn Fn() + Send + Sync>;

/// The player refused to start, e.g. an autoplay policy wants a user gesture first.
///
/// This is a transient condition reported alongside the playback state, never a reason to end the
/// broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Snafu)]
#[snafu(display("playback was blocked: {reason}"))]
pub struct PlaybackBlocked {
    pub reason: String,
}

impl PlaybackBlocked {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Whatever actually shows the video. The session issues commands, it does not own playback.
pub trait VideoSurface: Send + 'static {
    fn load(&mut self, url: &Url);

    fn seek(&mut self, position: Offset);

    fn play(&mut self) -> Result<(), PlaybackBlocked>;

    fn pause(&mut self);

    /// Replaces any callback registered before.
    fn on_ended(&mut self, callback: EndedCallback);

    fn current_time(&self) -> Offset;

    /// Length of the loaded media, if known.
    fn duration(&self) -> Option<Offset>;
}

/// A player without a screen: keeps the position on the tokio clock and fires the ended callback
/// when a known duration is reached.
pub struct HeadlessSurface {
    source: Option<Url>,
    duration: Option<Offset>,
    position: Offset,
    playing_since: Option<Instant>,
    blocked_plays: usize,
    on_ended: Option<EndedCallback>,
    end_timer: Option<JoinHandle<()>>,
}

impl HeadlessSurface {
    pub fn new(duration: Option<Offset>) -> Self {
        Self {
            source: None,
            duration,
            position: Offset::ZERO,
            playing_since: None,
            blocked_plays: 0,
            on_ended: None,
            end_timer: None,
        }
    }

    /// Refuses the first `count` calls to [play](VideoSurface::play), like a browser waiting for a click.
    pub fn blocking_first_plays(mut self, count: usize) -> Self {
        self.blocked_plays = count;
        self
    }

    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    fn clamp(&self, position: Offset) -> Offset {
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn schedule_end(&mut self) {
        self.cancel_end();

        let (Some(duration), Some(callback)) = (self.duration, self.on_ended.clone()) else {
            return;
        };

        let left = duration.saturating_sub(self.position).as_duration();
        self.end_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(left).await;
            callback();
        }));
    }

    fn cancel_end(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessSurface")
            .field("source", &self.source)
            .field("duration", &self.duration)
            .field("position", &self.current_time())
            .field("playing", &self.is_playing())
            .finish()
    }
}

impl VideoSurface for HeadlessSurface {
    fn load(&mut self, url: &Url) {
        self.pause();
        self.source = Some(url.clone());
        self.position = Offset::ZERO;
    }

    fn seek(&mut self, position: Offset) {
        self.position = self.clamp(position);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
            self.schedule_end();
        }
    }

    fn play(&mut self) -> Result<(), PlaybackBlocked> {
        if self.source.is_none() {
            return Err(PlaybackBlocked::new("no media loaded"));
        }

        if self.blocked_plays > 0 {
            self.blocked_plays -= 1;
            return Err(PlaybackBlocked::new("autoplay needs a user gesture"));
        }

        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
            self.schedule_end();
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.playing_since = None;
        self.cancel_end();
    }

    fn on_ended(&mut self, callback: EndedCallback) {
        self.on_ended = Some(callback);
        if self.playing_since.is_some() {
            self.schedule_end();
        }
    }

    fn current_time(&self) -> Offset {
        let played = self
            .playing_since
            .map(|since| Offset::from(since.elapsed()))
            .unwrap_or_default();

        self.clamp(self.position.saturating_add(played))
    }

    fn duration(&self) -> Option<Offset> {
        self.duration
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        self.cancel_end();
    }
}
