pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error("Mailbox API returned {status}: {message}")]
	Api { status: u16, message: String },
	#[error("Message {id} has no readable body.")]
	EmptyBody { id: String },
	#[error("Invalid address {address:?}: {message}")]
	Address { address: String, message: String },
	#[error(transparent)]
	Build(#[from] lettre::error::Error),
	#[error(transparent)]
	Smtp(#[from] lettre::transport::smtp::Error),
}
