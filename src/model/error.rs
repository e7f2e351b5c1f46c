use snafu::{Location, Snafu};

use super::*;

/// Rejections raised while building webinars, chat logs and CTAs.
///
/// These never reach the timeline engine: a value that fails here does not exist.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ModelError {
    #[snafu(display("a webinar must end after it starts, got start {start} and end {end}"))]
    InvalidInterval {
        start: Timestamp,
        end: Timestamp,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("an offset must be a finite, non-negative number of seconds, got {value}"))]
    InvalidOffset {
        value: f64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("CTA `{id}` must stay visible for more than zero seconds"))]
    EmptyCtaWindow {
        id: CtaId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("timer opacity must be within 0..=100, got {value}"))]
    InvalidOpacity {
        value: u8,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{url}` is not a valid CTA url: {source}"))]
    InvalidUrl {
        url: String,
        source: url::ParseError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("chat message `{id}` appears more than once"))]
    DuplicateMessage {
        id: MessageId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("CTA `{id}` appears more than once"))]
    DuplicateCta {
        id: CtaId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{text}` is not a usable slug, use lowercase letters, digits and dashes"))]
    InvalidSlug {
        text: String,
        #[snafu(implicit)]
        location: Location,
    },
}
