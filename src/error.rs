use thiserror::Error;

/// Why a network round trip didn't produce something usable.
///
/// Fragment refreshes absorb every variant and leave the visible region as it was.
/// Mutating actions surface [`Failure::user_message`] inline, next to the control that triggered them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
	/// The request never completed (offline, DNS, CORS, aborted by the browser…).
	#[error("network request failed: {0}")]
	Network(String),

	/// Non-success status without a usable validation message.
	#[error("server responded with status {status}")]
	Http { status: u16, description: Option<String> },

	/// The body didn't have the expected shape.
	#[error("malformed response body: {0}")]
	Parse(String),

	/// The backend rejected the request with a user-facing explanation,
	/// for example "Only 2 available".
	#[error("{message}")]
	Validation { status: u16, message: String },
}

/// Flat classification of [`Failure`], handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
	Network,
	HttpError,
	ParseError,
	Validation,
}

impl Failure {
	#[must_use]
	pub fn reason(&self) -> FailureReason {
		match self {
			Failure::Network(_) => FailureReason::Network,
			Failure::Http { .. } => FailureReason::HttpError,
			Failure::Parse(_) => FailureReason::ParseError,
			Failure::Validation { .. } => FailureReason::Validation,
		}
	}

	/// The backend's own description, if it sent one.
	#[must_use]
	pub fn user_message(&self) -> Option<&str> {
		match self {
			Failure::Validation { message, .. } => Some(message),
			Failure::Http { description, .. } => description.as_deref(),
			Failure::Network(_) | Failure::Parse(_) => None,
		}
	}

	pub(crate) fn parse(error: impl ToString) -> Self {
		Failure::Parse(error.to_string())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
	#[error("empty selector")]
	Empty,
	#[error("unexpected {found:?} at byte {at} in selector {selector:?}")]
	Unexpected { selector: String, at: usize, found: char },
	#[error("unterminated attribute selector in {0:?}")]
	Unterminated(String),
	#[error("combinators are not supported: {0:?}")]
	Combinator(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid storefront configuration: {0}")]
	Json(#[from] serde_json::Error),
	#[error("invalid route {route:?}: {source}")]
	Route { route: String, source: url::ParseError },
}
