pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Login to {provider} was rejected.")]
	Auth { provider: String },
	#[error("Saved condition {title:?} was not found.")]
	ConditionNotFound { title: String },
	#[error("Element {selector:?} is missing.")]
	ElementMissing { selector: String },
	#[error("Browser error: {message}")]
	Browser { message: String },
	#[error("Timed out: {message}")]
	Timeout { message: String },
	#[error("Export failed: {message}")]
	Export { message: String },
	#[error(transparent)]
	Domain(#[from] scout_domain::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Csv(#[from] csv::Error),
}
impl Error {
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
