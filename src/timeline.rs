//! The playback timeline of a webinar as a pure function of time.
//!
//! Nothing in here reads a clock or keeps state between calls: the same inputs always produce the same
//! [PlaybackState], so a backward jump of the caller's clock corrects itself on the next evaluation.

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::model::*;

/// Which part of the broadcast `now` falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    Live,
    Ended,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        self == Phase::Ended
    }
}

/// What the video surface should be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VideoDirective {
    /// Keep the video paused at the beginning.
    Hold,
    /// Play, positioned at `from` seconds into the media.
    Play { from: Offset },
    /// Pause and rewind, the broadcast is over.
    Stop,
}

/// Time until the start, split the way the waiting room shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl From<Offset> for Countdown {
    fn from(value: Offset) -> Self {
        let total = value.as_duration().as_secs();
        Self {
            days: total / 86_400,
            hours: total / 3_600 % 24,
            minutes: total / 60 % 60,
            seconds: total % 60,
        }
    }
}

/// A CTA inside its window, together with the time it has left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCta {
    #[serde(flatten)]
    pub button: CtaButton,
    #[serde(rename = "remaining_seconds")]
    pub remaining: Offset,
}

/// What the media itself has reported, as far as the caller knows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct MediaStatus {
    /// Length of the video, once known.
    pub duration: Option<Offset>,
    /// The video played through to its natural end.
    pub ended: bool,
}

/// Everything that should be visible on a webinar page at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub phase: Phase,
    #[serde(rename = "elapsed_seconds")]
    pub elapsed: Offset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<Countdown>,
    pub video: VideoDirective,
    pub visible_chat_messages: Vec<ChatMessage>,
    pub active_ctas: Vec<ActiveCta>,
}

/// Evaluates the timeline without any knowledge of the media.
pub fn evaluate(
    schedule: &WebinarSchedule, chat: &ChatLog, ctas: &CtaSet, now: Timestamp,
) -> PlaybackState {
    evaluate_with_media(schedule, chat, ctas, MediaStatus::default(), now)
}

/// Evaluates the timeline, ending the broadcast early if the media ran out before `end_time`.
pub fn evaluate_with_media(
    schedule: &WebinarSchedule, chat: &ChatLog, ctas: &CtaSet, media: MediaStatus, now: Timestamp,
) -> PlaybackState {
    let elapsed = schedule.elapsed(now);
    let past_media = media.ended || media.duration.is_some_and(|duration| elapsed >= duration);

    let phase = match schedule.status(now) {
        WebinarStatus::Scheduled => Phase::NotStarted,
        WebinarStatus::Live if past_media => Phase::Ended,
        WebinarStatus::Live => Phase::Live,
        WebinarStatus::Ended => Phase::Ended,
    };

    match phase {
        Phase::NotStarted => PlaybackState {
            phase,
            elapsed,
            countdown: Some(schedule.until_start(now).into()),
            video: VideoDirective::Hold,
            visible_chat_messages: Vec::new(),
            active_ctas: Vec::new(),
        },
        Phase::Live => PlaybackState {
            phase,
            elapsed,
            countdown: None,
            video: VideoDirective::Play { from: elapsed },
            visible_chat_messages: chat.arrived(elapsed).to_vec(),
            active_ctas: ctas
                .active_at(elapsed)
                .filter_map(|button| {
                    let remaining = button.remaining(elapsed)?;
                    Some(ActiveCta {
                        button: button.clone(),
                        remaining,
                    })
                })
                .collect(),
        },
        Phase::Ended => {
            // the chat stays readable on the end screen, frozen where the broadcast stopped
            let mut horizon = elapsed.min(schedule.length());
            if let Some(duration) = media.duration {
                horizon = horizon.min(duration);
            }

            PlaybackState {
                phase,
                elapsed,
                countdown: None,
                video: VideoDirective::Stop,
                visible_chat_messages: chat.arrived(horizon).to_vec(),
                active_ctas: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const T: &str = "2024-05-01T18:00:00Z";

    fn start() -> Timestamp {
        Timestamp::parse(T).unwrap()
    }

    fn at(seconds: f64) -> Timestamp {
        if seconds < 0.0 {
            let before = chrono::Duration::milliseconds((-seconds * 1000.0).round() as i64);
            return Timestamp::from(*start().inner() - before);
        }
        start() + Duration::from_secs_f64(seconds)
    }

    fn hour_long() -> WebinarSchedule {
        WebinarSchedule::new(start(), at(3600.0)).unwrap()
    }

    fn chat() -> ChatLog {
        ChatLog::new(
            [(0, "a"), (30, "b"), (30, "c"), (90, "d"), (1800, "e"), (3000, "f")]
                .into_iter()
                .map(|(offset, id)| ChatMessage {
                    id: id.into(),
                    username: "Ana".to_string(),
                    text: "hello".to_string(),
                    offset: Offset::from_secs(offset),
                })
                .collect(),
        )
        .unwrap()
    }

    fn ctas() -> CtaSet {
        let button = |show_at: u64, duration: u64| {
            CtaButton::new(
                "Join",
                "https://example.com",
                "#3B82F6",
                Offset::from_secs(show_at),
                Offset::from_secs(duration),
            )
            .unwrap()
        };
        CtaSet::new(vec![button(10, 5), button(12, 60), button(600, 120)]).unwrap()
    }

    fn ids(state: &PlaybackState) -> Vec<&str> {
        state
            .visible_chat_messages
            .iter()
            .map(|message| message.id.as_str())
            .collect()
    }

    #[test]
    fn nothing_is_visible_before_the_start() {
        for seconds in [-86_400.0 * 3.0, -60.0, -0.001] {
            let state = evaluate(&hour_long(), &chat(), &ctas(), at(seconds));

            assert_eq!(state.phase, Phase::NotStarted);
            assert_eq!(state.video, VideoDirective::Hold);
            assert!(state.visible_chat_messages.is_empty());
            assert!(state.active_ctas.is_empty());
            assert_eq!(state.elapsed, Offset::ZERO);
        }
    }

    #[test]
    fn countdown_splits_the_wait() {
        let wait = 2 * 86_400 + 3 * 3_600 + 4 * 60 + 5;
        let state = evaluate(&hour_long(), &chat(), &ctas(), at(-(wait as f64)));

        assert_eq!(
            state.countdown,
            Some(Countdown {
                days: 2,
                hours: 3,
                minutes: 4,
                seconds: 5
            })
        );

        let live = evaluate(&hour_long(), &chat(), &ctas(), at(1.0));
        assert_eq!(live.countdown, None);
    }

    #[test]
    fn late_join_seeks_to_the_elapsed_time() {
        let state = evaluate(&hour_long(), &chat(), &ctas(), at(120.0));

        assert_eq!(state.phase, Phase::Live);
        assert_eq!(
            state.video,
            VideoDirective::Play {
                from: Offset::from_secs(120)
            }
        );
        assert_eq!(ids(&state), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn start_and_end_instants_are_live() {
        assert_eq!(evaluate(&hour_long(), &chat(), &ctas(), at(0.0)).phase, Phase::Live);
        assert_eq!(evaluate(&hour_long(), &chat(), &ctas(), at(3600.0)).phase, Phase::Live);
        assert_eq!(evaluate(&hour_long(), &chat(), &ctas(), at(3600.001)).phase, Phase::Ended);
    }

    #[test]
    fn cta_window_is_half_open() {
        let only = CtaSet::new(vec![CtaButton::new(
            "Buy",
            "https://example.com",
            "#000",
            Offset::from_secs(10),
            Offset::from_secs(5),
        )
        .unwrap()])
        .unwrap();

        let active = |seconds: f64| !evaluate(&hour_long(), &chat(), &only, at(seconds)).active_ctas.is_empty();

        assert!(!active(9.999));
        assert!(active(10.0));
        assert!(active(12.5));
        assert!(active(14.999));
        assert!(!active(15.0));
    }

    #[test]
    fn overlapping_ctas_show_together_with_their_remaining_time() {
        let state = evaluate(&hour_long(), &chat(), &ctas(), at(13.0));

        let remaining: Vec<_> = state.active_ctas.iter().map(|cta| cta.remaining).collect();
        assert_eq!(remaining, vec![Offset::from_secs(2), Offset::from_secs(59)]);

        let later = evaluate(&hour_long(), &chat(), &ctas(), at(100.0));
        assert!(later.active_ctas.is_empty());
    }

    #[test]
    fn chat_visibility_never_shrinks() {
        let mut previous: Vec<String> = Vec::new();

        for second in (0..=3700).step_by(7) {
            let state = evaluate(&hour_long(), &chat(), &ctas(), at(second as f64));
            let current: Vec<String> = ids(&state).into_iter().map(str::to_string).collect();

            assert!(current.starts_with(&previous), "chat shrank at {second}s");
            previous = current;
        }
    }

    #[test]
    fn ended_is_terminal() {
        let media = MediaStatus::new(Some(Offset::from_secs(1200)), false);

        let mut seconds = 1200.0;
        while seconds < 10_000.0 {
            let state = evaluate_with_media(&hour_long(), &chat(), &ctas(), media, at(seconds));
            assert_eq!(state.phase, Phase::Ended, "reverted at {seconds}s");
            assert_eq!(state.video, VideoDirective::Stop);
            assert!(state.active_ctas.is_empty());
            seconds += 333.3;
        }
    }

    #[test]
    fn media_end_before_the_schedule_ends_the_broadcast() {
        let ended = MediaStatus::new(None, true);
        let state = evaluate_with_media(&hour_long(), &chat(), &ctas(), ended, at(610.0));

        assert_eq!(state.phase, Phase::Ended);
        assert!(state.active_ctas.is_empty());
    }

    #[test]
    fn joining_past_the_media_length_does_not_loop() {
        let media = MediaStatus::new(Some(Offset::from_secs(900)), false);

        let before = evaluate_with_media(&hour_long(), &chat(), &ctas(), media, at(899.0));
        assert_eq!(before.phase, Phase::Live);

        let after = evaluate_with_media(&hour_long(), &chat(), &ctas(), media, at(1000.0));
        assert_eq!(after.phase, Phase::Ended);
        assert_eq!(after.video, VideoDirective::Stop);
    }

    #[test]
    fn ended_chat_is_frozen_at_the_broadcast_end() {
        let media = MediaStatus::new(Some(Offset::from_secs(2000)), false);

        let state = evaluate_with_media(&hour_long(), &chat(), &ctas(), media, at(5000.0));
        assert_eq!(ids(&state), vec!["a", "b", "c", "d", "e"]);

        let state = evaluate(&hour_long(), &chat(), &ctas(), at(5000.0));
        assert_eq!(ids(&state), vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let now = at(611.5);
        let first = evaluate(&hour_long(), &chat(), &ctas(), now);
        let second = evaluate(&hour_long(), &chat(), &ctas(), now);

        assert_eq!(first, second);
    }

    #[test]
    fn state_serializes_with_flat_ctas() {
        let state = evaluate(&hour_long(), &chat(), &ctas(), at(11.0));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["phase"], "live");
        assert_eq!(json["video"]["action"], "play");
        assert_eq!(json["active_ctas"][0]["remaining_seconds"], 4.0);
        assert_eq!(json["active_ctas"][0]["text"], "Join");
    }
}
