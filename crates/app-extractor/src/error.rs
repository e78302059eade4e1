use http::StatusCode;
use thiserror::Error;

use crate::common::request::TransportError;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The payload could not be turned into a media description
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The post owner turned off embedding for the post
    #[error("embedding is disabled for this post")]
    EmbedDisabled,

    /// The endpoint wants a logged in session (or the session expired)
    #[error("login required: {0}")]
    AuthRequired(String),

    #[error("unexpected HTTP status {status}")]
    Http { status: StatusCode },

    #[error("request failed: {0}")]
    Transport(#[from] TransportError),

    /// The post is a video but no playable video URL was found
    #[error("video post without a playable source")]
    NoPlayableSource,

    #[error("could not resolve media for {shortcode}: {source}")]
    ResolutionExhausted {
        shortcode: String,
        #[source]
        source: Box<ExtractError>,
    },
}

impl ExtractError {
    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn auth_required<T: Into<String>>(msg: T) -> Self {
        Self::AuthRequired(msg.into())
    }

    /// Short text fit for showing to the person who asked for the download
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedResponse(_) => "Could not read the post data".to_string(),
            Self::EmbedDisabled => "The post does not allow embedding".to_string(),
            Self::AuthRequired(_) => "The post requires logging in".to_string(),
            Self::Http { status } if *status == StatusCode::NOT_FOUND => {
                "Post not found".to_string()
            }
            Self::Http { status } => format!("Instagram answered with {status}"),
            Self::Transport(_) => "Network error".to_string(),
            Self::NoPlayableSource => "No playable video found".to_string(),
            Self::ResolutionExhausted { source, .. } => {
                format!("Could not fetch the post ({})", source.user_message())
            }
        }
    }

    /// The innermost error, skipping `ResolutionExhausted` wrappers
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::ResolutionExhausted { source, .. } => source.root_cause(),
            x => x,
        }
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;
