use std::fmt;

/// Terminal failure of the upstream completion call. Each variant maps to
/// exactly one client-facing 502 response; raw detail stays server-side.
#[derive(Debug)]
pub enum UpstreamError {
    /// Non-success HTTP status from the completion API.
    Http { status: u16, body: String },
    /// Response decoded, but the first choice carries no completion text.
    EmptyCompletion,
    /// Completion text is not valid JSON after normalization.
    Parse { raw: String },
    /// JSON parsed but does not satisfy the decision contract.
    Structure { detail: String },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Http { status, .. } => write!(f, "upstream HTTP {status}"),
            UpstreamError::EmptyCompletion => {
                write!(f, "upstream returned no completion text")
            }
            UpstreamError::Parse { .. } => {
                write!(f, "upstream output is not valid JSON")
            }
            UpstreamError::Structure { detail } => {
                write!(f, "upstream output failed structural validation: {detail}")
            }
        }
    }
}

impl std::error::Error for UpstreamError {}
