pub mod mailbox;
pub mod smtp;

mod error;

pub use error::{Error, Result};
pub use mailbox::{GmailMailbox, Mailbox};
pub use smtp::{Notifier, OutgoingMail, SmtpNotifier};

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
