use thiserror::Error;

/// Configuration errors raised while the route table is being built.
///
/// None of these can happen once the server is accepting requests.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("missing handler in route {path:?}")]
    MissingHandler { path: String },

    #[error("invalid path pattern {path:?}")]
    InvalidPattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid root template {template:?}: {reason}")]
    InvalidRootTemplate { template: String, reason: String },

    #[error("unknown http method {0:?}")]
    UnknownMethod(String),
}
