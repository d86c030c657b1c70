pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	#[error("A run for {key} is already in progress.")]
	AlreadyRunning { key: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Mailbox error: {message}")]
	Mailbox { message: String },
	#[error("Inbound signal error: {message}")]
	Signal { message: String },
	/// The run panicked or outlived its deadline.
	#[error("Run aborted: {message}")]
	Aborted { message: String },
}
impl From<scout_storage::Error> for Error {
	fn from(err: scout_storage::Error) -> Self {
		match err {
			scout_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
		}
	}
}
impl From<scout_mail::Error> for Error {
	fn from(err: scout_mail::Error) -> Self {
		Self::Mailbox { message: err.to_string() }
	}
}
impl From<scout_domain::Error> for Error {
	fn from(err: scout_domain::Error) -> Self {
		match err {
			scout_domain::Error::InvalidEnvelope { message } => Self::InvalidRequest { message },
			other => Self::Configuration { message: other.to_string() },
		}
	}
}
