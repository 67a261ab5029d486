//! Error types for visual editing.
//!
//! Most failures in this crate are soft: a schema walk that cannot finish is
//! reported as an unresolved lookup, not an error. The errors here cover the
//! edges where data crosses a boundary (channel, network, configuration).

use miette::Diagnostic;

/// Main error type for visual editing operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum VisualEditingError {
    /// A channel message could not be encoded or decoded.
    #[error(transparent)]
    #[diagnostic_source]
    Decode(#[from] DecodeError),

    /// The transport refused or failed to post a message.
    #[error("channel transport failed: {0}")]
    #[diagnostic(code(visual_editing::channel))]
    Channel(String),

    /// A projection query to the content store failed.
    #[error("projection query failed: {0}")]
    #[diagnostic(code(visual_editing::fetch))]
    Fetch(String),

    /// Invalid overlay configuration.
    #[error("invalid configuration: {0}")]
    #[diagnostic(
        code(visual_editing::config),
        help("options are camelCase keys, see OverlayConfig")
    )]
    Config(String),
}

/// Encoding/decoding errors for channel envelopes and DOM annotations.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum DecodeError {
    /// The payload of a known message type had the wrong shape.
    #[error("malformed `{kind}` payload")]
    #[diagnostic(code(visual_editing::decode::payload))]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A message payload could not be serialized.
    #[error("failed to encode `{kind}` payload")]
    #[diagnostic(code(visual_editing::decode::encode))]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A `data-sanity` annotation was missing required keys.
    #[error("annotation is missing `{0}`")]
    #[diagnostic(code(visual_editing::decode::annotation))]
    Annotation(&'static str),

    /// A JSON annotation or envelope could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for VisualEditingError {
    fn from(err: reqwest::Error) -> Self {
        VisualEditingError::Fetch(err.to_string())
    }
}

impl From<serde_json::Error> for VisualEditingError {
    fn from(err: serde_json::Error) -> Self {
        VisualEditingError::Decode(DecodeError::Json(err))
    }
}
