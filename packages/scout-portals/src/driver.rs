//! The uniform protocol every portal implements, dispatched over [`PortalDriver`].

use std::{path::Path, time::Duration};

use scout_domain::{Provider, RawRecord, ScoutType, columns, signal::BULK_EXPORT_ID};

use crate::{
	Error, Result, ambi,
	browser::BrowserSession,
	csv_export,
	mynavi,
	profile::{EntryFlow, PortalProfile},
	ran,
	session::{Credentials, SendFailure, SendRequest},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalDriver {
	Ran,
	Ambi,
	MynaviScouting,
	MynaviAgentScout,
}

/// A saved condition opened on the results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionHandle {
	pub title: String,
	/// The condition matched nobody.
	pub empty: bool,
}

impl PortalDriver {
	pub fn for_provider(provider: Provider) -> Self {
		match provider {
			Provider::Ran => Self::Ran,
			Provider::Ambi => Self::Ambi,
			Provider::MynaviScouting => Self::MynaviScouting,
			Provider::MynaviAgentScout => Self::MynaviAgentScout,
		}
	}

	pub fn provider(self) -> Provider {
		match self {
			Self::Ran => Provider::Ran,
			Self::Ambi => Provider::Ambi,
			Self::MynaviScouting => Provider::MynaviScouting,
			Self::MynaviAgentScout => Provider::MynaviAgentScout,
		}
	}

	pub fn profile(self) -> &'static PortalProfile {
		match self {
			Self::Ran => &ran::PROFILE,
			Self::Ambi => &ambi::PROFILE,
			Self::MynaviScouting => &mynavi::SCOUTING_PROFILE,
			Self::MynaviAgentScout => &mynavi::AGENT_SCOUT_PROFILE,
		}
	}

	/// Submits the login form, retrying the submit once while the form is still shown.
	pub async fn authenticate(
		self,
		session: &dyn BrowserSession,
		base_url: &str,
		credentials: &Credentials,
	) -> Result<()> {
		let login = &self.profile().login;

		session.goto(&join(base_url, login.path)).await?;
		session.fill(login.user_field, &credentials.login_id).await?;
		session.fill(login.password_field, &credentials.password).await?;
		session.click(login.submit).await?;

		if !session.exists(login.form_marker).await? {
			return Ok(());
		}

		tracing::info!(provider = %self.provider(), "Login form still shown; retrying submit.");

		session.click(login.submit).await?;

		if session.exists(login.form_marker).await? {
			return Err(Error::Auth { provider: self.provider().label().to_string() });
		}

		Ok(())
	}

	/// Opens the saved condition whose title matches exactly.
	pub async fn select_condition(
		self,
		session: &dyn BrowserSession,
		base_url: &str,
		scout_type: ScoutType,
		title: &str,
	) -> Result<ConditionHandle> {
		let profile = self.profile();

		session.goto(&join(base_url, profile.conditions.path)).await?;

		if let Some(tab) = profile.tab_for(scout_type) {
			session.click(tab).await?;
		}

		let titles = session.texts(profile.conditions.titles).await?;
		let Some(index) = titles.iter().position(|candidate| candidate.trim() == title.trim())
		else {
			return Err(Error::ConditionNotFound { title: title.to_string() });
		};

		session.click_nth(profile.conditions.open, index).await?;

		let empty = session.exists(profile.results.empty_marker).await?;

		Ok(ConditionHandle { title: title.to_string(), empty })
	}

	/// Reads result rows page by page until `limit` rows or the last page.
	///
	/// Engine runs never call this: pending entries carry portal ids, so ingestion resolves them
	/// through [`Self::fetch_entries`]. It is the id-less entry path for library callers that
	/// harvest a condition opened with [`Self::select_condition`].
	pub async fn extract_candidates(
		self,
		session: &dyn BrowserSession,
		condition: &ConditionHandle,
		limit: usize,
	) -> Result<Vec<RawRecord>> {
		let results = &self.profile().results;
		let mut out = Vec::new();

		if condition.empty {
			return Ok(out);
		}

		loop {
			let rows = session.rows(results.rows, results.cells).await?;

			if rows.is_empty() {
				break;
			}

			for fields in rows {
				if out.len() >= limit {
					return Ok(out);
				}

				out.push(RawRecord { external_id: None, fields });
			}

			if out.len() >= limit || !session.exists(results.next_page).await? {
				break;
			}

			session.click(results.next_page).await?;
		}

		Ok(out)
	}

	/// Sends the template to at most `request.ceiling` candidates below the age limit.
	///
	/// On failure the error carries how many sends completed before it.
	pub async fn select_and_send(
		self,
		session: &dyn BrowserSession,
		base_url: &str,
		request: &SendRequest,
	) -> Result<u32, SendFailure> {
		let mut sent = 0;

		match self.send_pages(session, base_url, request, &mut sent).await {
			Ok(()) => Ok(sent.min(request.ceiling)),
			Err(source) => Err(SendFailure { sent: sent.min(request.ceiling), source }),
		}
	}

	async fn send_pages(
		self,
		session: &dyn BrowserSession,
		base_url: &str,
		request: &SendRequest,
		sent: &mut u32,
	) -> Result<()> {
		self.provider().ensure_supports(request.scout_type)?;

		if request.ceiling == 0 {
			return Ok(());
		}

		let condition =
			self.select_condition(session, base_url, request.scout_type, &request.search_title).await?;

		if condition.empty {
			tracing::info!(
				provider = %self.provider(),
				condition = %condition.title,
				"Saved condition matched nobody."
			);

			return Ok(());
		}
		if self == Self::Ambi {
			ambi::choose_page_size(session, request.ceiling).await?;
		}

		let profile = self.profile();
		let results = &profile.results;
		let send_button = match self {
			Self::Ambi => ambi::send_button(request.scout_type),
			_ => profile.send.open,
		};

		loop {
			if session.exists(results.empty_marker).await? {
				break;
			}

			let rows = session.rows(results.rows, results.cells).await?;

			if rows.is_empty() {
				break;
			}

			let mut picked = 0;

			for (index, row) in rows.iter().enumerate() {
				if *sent + picked >= request.ceiling {
					break;
				}
				if !age_allowed(row.get(results.age_cell).map(String::as_str), request.age_limit) {
					continue;
				}

				session.click_nth(results.checkbox, index).await?;

				picked += 1;
			}

			if picked > 0 {
				if !session.is_enabled(send_button).await? {
					tracing::info!(
						provider = %self.provider(),
						condition = %condition.title,
						"Send button is disabled; nothing more can be sent."
					);

					break;
				}

				session.click(send_button).await?;
				session.select_by_label(profile.send.template_select, &request.message_title).await?;

				if request.live {
					session.click(profile.send.confirm).await?;

					if self == Self::Ran {
						ran::after_confirm(session, request.scout_type).await?;
					}
				} else {
					session.click(profile.send.cancel).await?;
				}

				*sent += picked;
			}

			if *sent >= request.ceiling || !session.exists(results.next_page).await? {
				break;
			}

			session.click(results.next_page).await?;
		}

		Ok(())
	}

	/// Resolves pending portal ids into raw records using the portal's entry flow.
	pub async fn fetch_entries(
		self,
		session: &dyn BrowserSession,
		base_url: &str,
		ids: &[String],
		download_dir: &Path,
		download_wait: Duration,
	) -> Result<Vec<RawRecord>> {
		match self.profile().entries {
			EntryFlow::Detail { path_template, fields, missing_marker } => {
				let mut out = Vec::with_capacity(ids.len());

				for id in ids {
					if id == BULK_EXPORT_ID {
						tracing::warn!(
							provider = %self.provider(),
							"Detail flow cannot serve a bulk export request; skipping it."
						);

						continue;
					}

					session.goto(&join(base_url, &path_template.replace("{id}", id))).await?;

					if session.exists(missing_marker).await? {
						tracing::warn!(
							provider = %self.provider(),
							external_id = %id,
							"Entry detail is no longer available."
						);

						continue;
					}

					let mut values = vec![id.clone()];

					values.extend(session.texts(fields).await?);
					out.push(RawRecord { external_id: Some(id.clone()), fields: values });
				}

				Ok(out)
			},
			EntryFlow::CsvExport { path, trigger } => {
				session.goto(&join(base_url, path)).await?;

				if self == Self::MynaviAgentScout {
					mynavi::prepare_agent_export(session).await?;
				}

				let file = session.download(trigger, download_dir, download_wait).await?;
				let id_column =
					columns::external_id_position(columns::for_provider(self.provider()));

				let wanted = if ids.iter().any(|id| id == BULK_EXPORT_ID) { &[][..] } else { ids };

				csv_export::consume_export(&file, id_column, wanted).await
			},
		}
	}
}

/// Rows whose age is at or over the limit are skipped; an unreadable age counts as over.
pub fn age_allowed(cell: Option<&str>, limit: Option<u32>) -> bool {
	let Some(limit) = limit else {
		return true;
	};

	parse_age(cell.unwrap_or_default()).map(|age| age < limit).unwrap_or(false)
}

fn parse_age(text: &str) -> Option<u32> {
	let digits = text
		.chars()
		.skip_while(|c| !c.is_ascii_digit())
		.take_while(char::is_ascii_digit)
		.collect::<String>();

	digits.parse().ok()
}

fn join(base_url: &str, path: &str) -> String {
	format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
