use lettre::{
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
	transport::smtp::authentication::Credentials,
};

use crate::{BoxFuture, Error, Result};

const IMPLICIT_TLS_PORT: u16 = 465;

/// A plain-text notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
	pub to: Vec<String>,
	pub subject: String,
	pub body: String,
}

pub trait Notifier
where
	Self: Send + Sync,
{
	fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<()>>;
}

pub struct SmtpNotifier {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from: String,
}
impl SmtpNotifier {
	pub fn from_config(cfg: &scout_config::Mail) -> Result<Self> {
		let builder = if cfg.smtp_port == IMPLICIT_TLS_PORT {
			AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)?
		};
		let transport = builder
			.port(cfg.smtp_port)
			.credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
			.build();

		Ok(Self { transport, from: cfg.from.clone() })
	}

	async fn deliver(&self, mail: &OutgoingMail) -> Result<()> {
		let mut builder = Message::builder()
			.from(parse_mailbox(&self.from)?)
			.subject(mail.subject.as_str())
			.header(ContentType::TEXT_PLAIN);

		for to in &mail.to {
			builder = builder.to(parse_mailbox(to)?);
		}

		let message = builder.body(mail.body.clone())?;

		self.transport.send(message).await?;

		tracing::info!(recipients = mail.to.len(), subject = %mail.subject, "Notification sent.");

		Ok(())
	}
}
impl Notifier for SmtpNotifier {
	fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.deliver(mail))
	}
}

fn parse_mailbox(address: &str) -> Result<lettre::message::Mailbox> {
	address.parse().map_err(|err: lettre::address::AddressError| Error::Address {
		address: address.to_string(),
		message: err.to_string(),
	})
}
