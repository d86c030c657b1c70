//! Inbound mailbox access over the Gmail REST API.

use std::time::Duration;

use base64::{
	Engine as _,
	engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;

use crate::{BoxFuture, Error, Result};

const PAGE_SIZE: u32 = 100;

pub trait Mailbox
where
	Self: Send + Sync,
{
	/// Ids of unread messages matching a search query.
	fn list_unread<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;

	fn message_body<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<String>>;

	fn mark_read<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;
}

pub struct GmailMailbox {
	client: Client,
	api_base: String,
	user_id: String,
	access_token: String,
}
impl GmailMailbox {
	pub fn from_config(cfg: &scout_config::Mailbox) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			client,
			api_base: cfg.api_base.clone(),
			user_id: cfg.user_id.clone(),
			access_token: cfg.access_token.clone(),
		})
	}

	fn url(&self, suffix: &str) -> String {
		format!("{}/gmail/v1/users/{}/messages{suffix}", self.api_base, self.user_id)
	}

	async fn execute<T>(&self, request: RequestBuilder) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let response = request.bearer_auth(&self.access_token).send().await?;
		let status = response.status();

		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();

			return Err(Error::Api { status: status.as_u16(), message });
		}

		Ok(response.json::<T>().await?)
	}

	async fn list_unread_inner(&self, query: &str) -> Result<Vec<String>> {
		let mut ids = Vec::new();
		let mut page_token: Option<String> = None;

		loop {
			let mut params = vec![
				("q", query.to_string()),
				("maxResults", PAGE_SIZE.to_string()),
			];

			if let Some(token) = &page_token {
				params.push(("pageToken", token.clone()));
			}

			let page: ListResponse =
				self.execute(self.client.get(self.url("")).query(&params)).await?;

			ids.extend(page.messages.into_iter().map(|message| message.id));

			match page.next_page_token {
				Some(token) if !token.is_empty() => page_token = Some(token),
				_ => break,
			}
		}

		Ok(ids)
	}

	async fn message_body_inner(&self, id: &str) -> Result<String> {
		let message: MessageResponse = self
			.execute(self.client.get(self.url(&format!("/{id}"))).query(&[("format", "full")]))
			.await?;

		extract_body(&message.payload).ok_or_else(|| Error::EmptyBody { id: id.to_string() })
	}

	async fn mark_read_inner(&self, id: &str) -> Result<()> {
		let _: serde_json::Value = self
			.execute(
				self.client
					.post(self.url(&format!("/{id}/modify")))
					.json(&json!({ "removeLabelIds": ["UNREAD"] })),
			)
			.await?;

		Ok(())
	}
}
impl Mailbox for GmailMailbox {
	fn list_unread<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(self.list_unread_inner(query))
	}

	fn message_body<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<String>> {
		Box::pin(self.message_body_inner(id))
	}

	fn mark_read<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.mark_read_inner(id))
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
	#[serde(default)]
	messages: Vec<MessageRef>,
	#[serde(default)]
	next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
	id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
	payload: MessagePart,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
	#[serde(default)]
	pub mime_type: String,
	#[serde(default)]
	pub body: PartBody,
	#[serde(default)]
	pub parts: Vec<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartBody {
	#[serde(default)]
	pub data: Option<String>,
}

/// Text of a message: the first `text/plain` part, else the first `text/html` part, else the
/// top-level body.
pub fn extract_body(payload: &MessagePart) -> Option<String> {
	find_part(payload, "text/plain")
		.or_else(|| find_part(payload, "text/html"))
		.or_else(|| decode_data(payload.body.data.as_deref()?))
}

fn find_part(part: &MessagePart, mime_type: &str) -> Option<String> {
	if part.mime_type.eq_ignore_ascii_case(mime_type)
		&& let Some(text) = part.body.data.as_deref().and_then(decode_data)
	{
		return Some(text);
	}

	part.parts.iter().find_map(|child| find_part(child, mime_type))
}

fn decode_data(data: &str) -> Option<String> {
	let data = data.trim();
	let bytes = URL_SAFE.decode(data).or_else(|_| URL_SAFE_NO_PAD.decode(data)).ok()?;

	Some(String::from_utf8_lossy(&bytes).into_owned()).filter(|text| !text.is_empty())
}
