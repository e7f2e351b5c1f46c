use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt as _};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::state::App;
use super::Result;
use crate::model::*;
use crate::service::catalog::WebinarDraft;
use crate::service::session::{SessionId, Subscription};
use crate::service::surface::HeadlessSurface;
use crate::timeline::PlaybackState;

pub async fn list(State(app): State<App>) -> Result<Json<Vec<Webinar>>> {
    let webinars = app.catalog().list_for(&app.actor).await?;
    Ok(Json(webinars))
}

#[instrument(skip(app, draft), fields(title = %draft.title))]
pub async fn create(
    State(app): State<App>, Json(draft): Json<WebinarDraft>,
) -> Result<(StatusCode, Json<Webinar>)> {
    let webinar = app.catalog().create(&app.actor, draft).await?;
    Ok((StatusCode::CREATED, Json(webinar)))
}

pub async fn info(State(app): State<App>, Path(slug): Path<Slug>) -> Result<Json<Webinar>> {
    let webinar = app.catalog().by_slug(&slug).await?;
    Ok(Json(webinar))
}

#[instrument(skip(app))]
pub async fn delete(State(app): State<App>, Path(slug): Path<Slug>) -> Result<Json<Webinar>> {
    let webinar = app.catalog().by_slug(&slug).await?;
    let deleted = app.catalog().delete(&app.actor, &webinar.id).await?;
    Ok(Json(deleted))
}

pub async fn replace_chat(
    State(app): State<App>, Path(slug): Path<Slug>, Json(chat): Json<ChatLog>,
) -> Result<Json<Webinar>> {
    let webinar = app.catalog().by_slug(&slug).await?;
    let webinar = app.catalog().replace_chat(&app.actor, &webinar.id, chat).await?;
    Ok(Json(webinar))
}

pub async fn replace_ctas(
    State(app): State<App>, Path(slug): Path<Slug>, Json(ctas): Json<CtaSet>,
) -> Result<Json<Webinar>> {
    let webinar = app.catalog().by_slug(&slug).await?;
    let webinar = app.catalog().replace_ctas(&app.actor, &webinar.id, ctas).await?;
    Ok(Json(webinar))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reschedule {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

pub async fn reschedule(
    State(app): State<App>, Path(slug): Path<Slug>, Json(payload): Json<Reschedule>,
) -> Result<Json<Webinar>> {
    let webinar = app.catalog().by_slug(&slug).await?;
    let webinar = app
        .catalog()
        .reschedule(&app.actor, &webinar.id, payload.start_time, payload.end_time)
        .await?;
    Ok(Json(webinar))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoUpload {
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub duration_seconds: Option<Offset>,
}

fn default_extension() -> String {
    "mp4".to_string()
}

/// The request body is the raw video.
#[instrument(skip(app, bytes), fields(size = bytes.len()))]
pub async fn upload_video(
    State(app): State<App>, Path(slug): Path<Slug>, Query(upload): Query<VideoUpload>, bytes: Bytes,
) -> Result<Json<Webinar>> {
    let webinar = app.catalog().by_slug(&slug).await?;
    let webinar = app
        .catalog()
        .attach_video(
            &app.actor,
            &webinar.id,
            &upload.extension,
            bytes.to_vec(),
            upload.duration_seconds,
        )
        .await?;
    Ok(Json(webinar))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub webinar_id: WebinarId,
    pub status: WebinarStatus,
    pub at: Timestamp,
    #[serde(flatten)]
    pub playback: PlaybackState,
}

/// The timeline right now, without a player attached.
pub async fn state(State(app): State<App>, Path(slug): Path<Slug>) -> Result<Json<StateResponse>> {
    let snapshot = app.catalog().state(&slug).await?;

    let response = StateResponse {
        status: snapshot.webinar.status(snapshot.at),
        webinar_id: snapshot.webinar.id,
        at: snapshot.at,
        playback: snapshot.playback,
    };

    Ok(Json(response))
}

/// Streams the frames of a fresh session as server-sent events, one `frame` event per tick.
///
/// Closing the connection drops the subscription, which cancels the session.
#[instrument(skip(app))]
pub async fn live(
    State(app): State<App>, Path(slug): Path<Slug>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let subscription = app
        .watch(&slug, |webinar| HeadlessSurface::new(webinar.video.duration))
        .await?;

    let session = subscription.id().to_string();
    let opening = Event::default().event("session").data(session);

    let frames = futures::stream::unfold(subscription, |mut subscription: Subscription| async move {
        let frame = subscription.next().await?;
        let event = Event::default()
            .event("frame")
            .json_data(&frame)
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "could not encode a frame");
                Event::default().event("error").data(err.to_string())
            });

        Some((Ok::<_, Infallible>(event), subscription))
    });

    let opening = futures::stream::once(async move { Ok::<_, Infallible>(opening) });
    Ok(Sse::new(opening.chain(frames)).keep_alive(KeepAlive::default()))
}

/// Retries playback for a session whose surface refused to play.
pub async fn resume(State(app): State<App>, Path(id): Path<SessionId>) -> Result<StatusCode> {
    app.resume(&id).await?;
    Ok(StatusCode::ACCEPTED)
}
