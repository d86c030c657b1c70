use scout_domain::ScoutType;

use crate::{
	Result,
	browser::BrowserSession,
	profile::{ConditionList, EntryFlow, LoginForm, PortalProfile, ResultsPage, SendDialog},
};

pub const PROFILE: PortalProfile = PortalProfile {
	login: LoginForm {
		path: "/login",
		user_field: "input[name='login_id']",
		password_field: "input[name='password']",
		submit: "form#login button[type='submit']",
		form_marker: "form#login",
	},
	conditions: ConditionList {
		path: "/scout/conditions",
		titles: "table.conditions td.condition-name",
		open: "table.conditions a.condition-search",
	},
	results: ResultsPage {
		rows: "table.scout-results tbody tr",
		cells: "td",
		age_cell: 3,
		checkbox: "table.scout-results tbody tr input[type='checkbox']",
		next_page: "ul.pagination a[rel='next']",
		empty_marker: ".scout-results-empty",
	},
	send: SendDialog {
		open: "button#scout-send",
		template_select: "select#scout-template",
		confirm: ".modal-scout button.confirm",
		cancel: ".modal-scout button.cancel",
	},
	entries: EntryFlow::Detail {
		path_template: "/entries/{id}",
		fields: "dl.entry-profile dd",
		missing_marker: ".entry-not-found",
	},
	scout_tabs: &[
		(ScoutType::Normal, "nav.scout-tabs a[data-kind='normal']"),
		(ScoutType::Repeat, "nav.scout-tabs a[data-kind='repeat']"),
		(ScoutType::SendOtherJob, "nav.scout-tabs a[data-kind='other-job']"),
	],
	page_sizes: None,
};

const OTHER_JOB_CONFIRM: &str = ".modal-other-job button.confirm";

/// "Send other job" scouts ask for a second confirmation after the template dialog.
pub(crate) async fn after_confirm(session: &dyn BrowserSession, scout_type: ScoutType) -> Result<()> {
	if scout_type != ScoutType::SendOtherJob {
		return Ok(());
	}
	if session.exists(OTHER_JOB_CONFIRM).await? {
		session.click(OTHER_JOB_CONFIRM).await?;
	}

	Ok(())
}
