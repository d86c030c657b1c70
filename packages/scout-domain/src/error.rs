pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unknown provider {0:?}.")]
	UnknownProvider(String),
	#[error("Unknown scout type {0:?}.")]
	UnknownScoutType(String),
	#[error("Scout type {scout_type} is not offered by {provider}.")]
	UnsupportedScoutType { provider: String, scout_type: String },
	#[error("Invalid push envelope: {message}")]
	InvalidEnvelope { message: String },
	#[error("Invalid signal pattern: {0}")]
	SignalPattern(#[from] regex::Error),
	#[error("Credential error: {message}")]
	Credential { message: String },
}
