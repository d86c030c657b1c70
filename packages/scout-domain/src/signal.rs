//! Notification mail rules and push envelope decoding for the inbound detector.

use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD},
};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Provider, Result};

/// Pending id that stands for every applicant in the provider's bulk export.
pub const BULK_EXPORT_ID: &str = "*";

/// Which unread mails belong to a provider and where the applicant id sits in their body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRule {
	pub provider: Provider,
	pub from: &'static str,
	pub subject: &'static str,
	/// First capture group yields the portal user id.
	pub id_pattern: Option<&'static str>,
	/// Without an id pattern, a matching mail queues one bulk export for the provider.
	pub bulk_export: bool,
}
impl SignalRule {
	pub fn query(&self) -> String {
		format!("is:unread from:({}) subject:({})", self.from, self.subject)
	}

	pub fn has_pattern(&self) -> bool {
		self.id_pattern.is_some()
	}

	pub fn requests_export(&self) -> bool {
		self.id_pattern.is_none() && self.bulk_export
	}

	/// `Ok(None)` means the body did not carry an id, or the rule has no pattern.
	pub fn extract_id(&self, body: &str) -> Result<Option<String>> {
		let Some(pattern) = self.id_pattern else {
			return Ok(None);
		};
		let re = Regex::new(pattern)?;

		Ok(re
			.captures(body)
			.and_then(|captures| captures.get(1))
			.map(|found| found.as_str().trim().to_string())
			.filter(|id| !id.is_empty()))
	}
}

pub const SIGNAL_RULES: &[SignalRule] = &[
	SignalRule {
		provider: Provider::Ran,
		from: "noreply@ran-agent.jp",
		subject: "新着応募",
		id_pattern: Some(r"応募者ID\s*[:：]\s*([A-Za-z0-9\-]+)"),
		bulk_export: false,
	},
	SignalRule {
		provider: Provider::Ambi,
		from: "info@en-ambi.com",
		subject: "応募がありました",
		id_pattern: Some(r"/company/entry/detail/(\d+)"),
		bulk_export: false,
	},
	SignalRule {
		provider: Provider::MynaviScouting,
		from: "scouting@mynavi.jp",
		subject: "エントリー",
		id_pattern: Some(r"会員No\.?\s*[:：]\s*(\d+)"),
		bulk_export: false,
	},
	SignalRule {
		provider: Provider::MynaviAgentScout,
		from: "agent-scout@mynavi.jp",
		subject: "応募通知",
		id_pattern: None,
		bulk_export: true,
	},
];

pub fn rule_for(provider: Provider) -> Option<&'static SignalRule> {
	SIGNAL_RULES.iter().find(|rule| rule.provider == provider)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
	pub message: PushMessage,
	#[serde(default)]
	pub subscription: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushMessage {
	pub data: String,
	#[serde(default, alias = "message_id", rename = "messageId")]
	pub message_id: Option<String>,
}

/// The decoded payload of a mailbox change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotice {
	pub email_address: String,
	pub history_id: u64,
}

pub fn decode_push(envelope: &PushEnvelope) -> Result<PushNotice> {
	let data = envelope.message.data.trim();
	let bytes = STANDARD
		.decode(data)
		.or_else(|_| URL_SAFE.decode(data))
		.or_else(|_| URL_SAFE_NO_PAD.decode(data))
		.map_err(|err| Error::InvalidEnvelope { message: format!("data is not base64: {err}.") })?;
	let payload: Value = serde_json::from_slice(&bytes).map_err(|err| Error::InvalidEnvelope {
		message: format!("data is not a JSON object: {err}."),
	})?;
	let email_address = payload
		.get("emailAddress")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|address| !address.is_empty())
		.ok_or_else(|| Error::InvalidEnvelope { message: "emailAddress is missing.".to_string() })?
		.to_lowercase();
	let history_id = match payload.get("historyId") {
		Some(Value::Number(number)) => number.as_u64(),
		Some(Value::String(raw)) => raw.trim().parse::<u64>().ok(),
		_ => None,
	}
	.ok_or_else(|| Error::InvalidEnvelope { message: "historyId is missing.".to_string() })?;

	Ok(PushNotice { email_address, history_id })
}
