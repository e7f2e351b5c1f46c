use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use snafu::{Location, OptionExt as _, Snafu};
use tokio::select;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::instrument;
use url::Url;

use super::catalog::{Catalog, CatalogError};
use super::object_store::ObjectStore;
use super::store::Store;
use super::surface::{PlaybackBlocked, VideoSurface};
use crate::model::*;
use crate::time::{aligned_ticker, delayed_ticker, Clock};
use crate::timeline::{MediaStatus, Phase, PlaybackState, VideoDirective};
use crate::viewers::ViewerCounter;
use crate::Located;

crate::define_id!(SessionId);

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(transparent)]
    Catalog { source: CatalogError },

    #[snafu(display("no session `{id}` is running"))]
    UnknownSession {
        id: SessionId,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for SessionError {
    fn location(&self) -> Location {
        match self {
            SessionError::Catalog { source } => source.location(),
            SessionError::UnknownSession { location, .. } => *location,
        }
    }
}

/// Cadences of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// How often the timeline is evaluated and a frame is produced.
    pub playback_tick: Duration,
    /// How often the viewer counter drifts.
    pub viewer_tick: Duration,
    /// Frames kept for a slow reader before new ones are dropped.
    pub frame_buffer: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            playback_tick: Duration::from_secs(1),
            viewer_tick: Duration::from_secs(3),
            frame_buffer: 16,
        }
    }
}

/// One observation of a running webinar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub webinar_id: WebinarId,
    pub at: Timestamp,
    #[serde(flatten)]
    pub playback: PlaybackState,
    pub viewer_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<PlaybackBlocked>,
    #[serde(rename = "position_seconds")]
    pub position: Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Message {
    Resume,
    Stop,
}

/// Owns the task running a session. Dropping it aborts the task.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    webinar_id: WebinarId,
    tx: mpsc::Sender<Message>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn webinar_id(&self) -> &WebinarId {
        &self.webinar_id
    }

    /// Retries a play that the surface refused.
    pub async fn resume(&self) {
        let _ = self.tx.send(Message::Resume).await.ok();
    }

    /// Asks the session to stop before its next tick.
    pub async fn stop(&self) {
        let _ = self.tx.send(Message::Stop).await.ok();
    }

    /// Stops the session and waits until its task is gone, after which no frame can be produced.
    pub async fn shutdown(mut self) {
        self.stop().await;
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(session_id = %self.id, error = %err, "session task did not finish cleanly");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Starts a session for `webinar` on `surface`, playing the media at `url`.
///
/// Frames are delivered on the returned receiver. The session ends by itself once the broadcast has
/// ended (after sending the final frame) or when the receiver is dropped.
pub fn spawn<V: VideoSurface>(
    webinar: Webinar, url: &Url, mut surface: V, clock: Arc<dyn Clock>, viewers: ViewerCounter,
    settings: SessionSettings,
) -> (SessionHandle, mpsc::Receiver<Frame>) {
    let (tx, messages) = mpsc::channel(4);
    let (frames, rx) = mpsc::channel(settings.frame_buffer.max(1));

    let id = SessionId::random();
    let webinar_id = webinar.id.clone();

    surface.load(url);
    let media = MediaStatus::new(webinar.video.duration, false);

    let session = Session {
        id: id.clone(),
        webinar,
        surface,
        clock,
        viewers,
        media,
        applied: None,
        blocked: None,
        frames,
    };

    let task = tokio::spawn(session.run(messages, settings));

    let handle = SessionHandle {
        id,
        webinar_id,
        tx,
        task: Some(task),
    };

    (handle, rx)
}

struct Session<V> {
    id: SessionId,
    webinar: Webinar,
    surface: V,
    clock: Arc<dyn Clock>,
    viewers: ViewerCounter,
    media: MediaStatus,
    /// the phase whose directive was last given to the surface
    applied: Option<Phase>,
    blocked: Option<PlaybackBlocked>,
    frames: mpsc::Sender<Frame>,
}

impl<V: VideoSurface> Session<V> {
    #[instrument(name = "session", skip_all, fields(session_id = %self.id, webinar_id = %self.webinar.id))]
    async fn run(mut self, mut messages: mpsc::Receiver<Message>, settings: SessionSettings) {
        let (ended_tx, mut ended) = mpsc::unbounded_channel();
        self.surface.on_ended(Arc::new(move || {
            let _ = ended_tx.send(()).ok();
        }));

        let start_time = self.webinar.schedule.start_time();
        let mut playback = aligned_ticker(start_time, settings.playback_tick, self.clock.now());
        let mut viewers = delayed_ticker(settings.viewer_tick);

        tracing::info!(
            "start a session for `{}` that evaluates every {:?} and rolls viewers every {:?}",
            self.webinar.slug,
            playback.period(),
            viewers.period()
        );

        loop {
            let flow = select! {
                biased;

                message = messages.recv() => match message {
                    Some(Message::Resume) => self.resume(),
                    Some(Message::Stop) | None => ControlFlow::Break(()),
                },
                Some(()) = ended.recv() => {
                    tracing::info!("the media reached its end");
                    self.media.ended = true;
                    self.tick()
                },
                _ = playback.tick() => self.tick(),
                _ = viewers.tick() => {
                    self.viewers.roll();
                    ControlFlow::Continue(())
                },
            };

            if flow.is_break() {
                break;
            }
        }

        self.surface.pause();
        tracing::info!("session finished");
    }

    fn tick(&mut self) -> ControlFlow<()> {
        let now = self.clock.now();
        if self.media.duration.is_none() {
            self.media.duration = self.surface.duration();
        }

        let state = self.webinar.playback(self.media, now);
        self.apply(&state);

        let terminal = state.phase.is_terminal();
        self.emit(now, state)?;

        if terminal {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn resume(&mut self) -> ControlFlow<()> {
        if self.blocked.is_none() {
            return ControlFlow::Continue(());
        }

        tracing::info!("resume requested");
        self.tick()
    }

    /// Commands the surface when the phase changes, and keeps retrying a refused play.
    fn apply(&mut self, state: &PlaybackState) {
        let entering = self.applied != Some(state.phase);
        if entering {
            tracing::info!(phase = ?state.phase, elapsed = %state.elapsed, "entering a new phase");
        }

        match state.video {
            VideoDirective::Hold if entering => self.surface.pause(),
            VideoDirective::Play { from } if entering || self.blocked.is_some() => {
                self.surface.seek(from);
                self.start_playing();
            }
            VideoDirective::Stop if entering => {
                self.surface.pause();
                self.surface.seek(Offset::ZERO);
                self.blocked = None;
            }
            _ => {}
        }

        self.applied = Some(state.phase);
    }

    fn start_playing(&mut self) {
        match self.surface.play() {
            Ok(()) => {
                if self.blocked.take().is_some() {
                    tracing::info!("playback is no longer blocked");
                }
            }
            Err(blocked) => {
                if self.blocked.is_none() {
                    tracing::warn!(reason = %blocked.reason, "the surface refused to play");
                }
                self.blocked = Some(blocked);
            }
        }
    }

    fn emit(&self, at: Timestamp, playback: PlaybackState) -> ControlFlow<()> {
        let frame = Frame {
            webinar_id: self.webinar.id.clone(),
            at,
            playback,
            viewer_count: self.viewers.current(),
            blocked: self.blocked.clone(),
            position: self.surface.current_time(),
        };

        match self.frames.try_send(frame) {
            Ok(()) => ControlFlow::Continue(()),
            Err(TrySendError::Full(_)) => {
                tracing::debug!("the reader is lagging behind, dropping a frame");
                ControlFlow::Continue(())
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("nobody is watching anymore");
                ControlFlow::Break(())
            }
        }
    }
}

/// Frames of one session. Dropping it cancels the session.
#[derive(Debug)]
pub struct Subscription {
    id: SessionId,
    frames: mpsc::Receiver<Frame>,
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
}

impl Subscription {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The next frame, or `None` once the session is over.
    pub async fn next(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // dropping the handle aborts the task
        self.sessions.remove(&self.id);
    }
}

/// Runs one session per viewer of a webinar page.
#[derive(Debug)]
pub struct SessionManager<W, U, O> {
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
    catalog: Catalog<W, U, O>,
    settings: SessionSettings,
}

impl<W: Clone, U: Clone, O> Clone for SessionManager<W, U, O> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            catalog: self.catalog.clone(),
            settings: self.settings,
        }
    }
}

impl<W, U, O> SessionManager<W, U, O>
where
    W: Store<Webinar>,
    U: Store<User>,
    O: ObjectStore,
{
    pub fn new(catalog: Catalog<W, U, O>, settings: SessionSettings) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            catalog,
            settings,
        }
    }

    /// Starts watching the webinar at `slug` on the surface built by `make_surface`.
    ///
    /// Counts as a view of the webinar.
    #[instrument(skip(self, make_surface))]
    pub async fn watch<V, F>(&self, slug: &Slug, make_surface: F) -> Result<Subscription, SessionError>
    where
        V: VideoSurface,
        F: FnOnce(&Webinar) -> V,
    {
        let webinar = self.catalog.by_slug(slug).await?;
        let webinar = self.catalog.record_view(&webinar.id).await?;
        let url = self.catalog.playable_url(&webinar)?;

        let surface = make_surface(&webinar);
        let (handle, frames) = spawn(
            webinar,
            &url,
            surface,
            Arc::clone(self.catalog.clock()),
            ViewerCounter::new(),
            self.settings,
        );

        let id = handle.id().clone();
        tracing::info!(session_id = %id, "watching `{}` from {}", slug, url);
        self.sessions.insert(id.clone(), handle);

        Ok(Subscription {
            id,
            frames,
            sessions: Arc::clone(&self.sessions),
        })
    }

    pub async fn resume(&self, id: &SessionId) -> Result<(), SessionError> {
        // cloned out so the map is not locked across the await
        let tx = self
            .sessions
            .get(id)
            .map(|handle| handle.tx.clone())
            .context(UnknownSessionSnafu { id: id.clone() })?;

        let _ = tx.send(Message::Resume).await.ok();
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop(&self, id: &SessionId) {
        if let Some((_id, handle)) = self.sessions.remove(id) {
            tracing::info!("stopping session `{}` of `{}`", id, handle.webinar_id());
            handle.shutdown().await;
        }
    }

    pub async fn stop_all(&self) {
        tracing::info!("stop all sessions");
        let ids: Vec<SessionId> = self.sessions.iter().map(|x| x.key().clone()).collect();

        for id in ids {
            self.stop(&id).await;
        }
    }

    pub fn active(&self) -> usize {
        self.sessions.len()
    }

    pub fn catalog(&self) -> &Catalog<W, U, O> {
        &self.catalog
    }
}
