use scout_domain::ScoutType;

use crate::{
	Result,
	browser::BrowserSession,
	profile::{ConditionList, EntryFlow, LoginForm, PortalProfile, ResultsPage, SendDialog},
};

pub const SCOUTING_PROFILE: PortalProfile = PortalProfile {
	login: LoginForm {
		path: "/client/login",
		user_field: "input[name='mail']",
		password_field: "input[name='pass']",
		submit: "input[type='submit'].login",
		form_marker: "form[name='loginForm']",
	},
	conditions: ConditionList {
		path: "/client/search/condition/list",
		titles: "table.condList td.condName",
		open: "table.condList a.doSearch",
	},
	results: ResultsPage {
		rows: "table.resultList tr.member",
		cells: "td",
		age_cell: 2,
		checkbox: "table.resultList tr.member input[name='memberIds']",
		next_page: "div.paging a.next",
		empty_marker: "div.resultNone",
	},
	send: SendDialog {
		open: "a.btnScoutSend",
		template_select: "select[name='templateId']",
		confirm: "div#scoutConfirm a.btnSend",
		cancel: "div#scoutConfirm a.btnCancel",
	},
	entries: EntryFlow::CsvExport { path: "/client/entry/list", trigger: "a.btnCsvDownload" },
	scout_tabs: &[(ScoutType::Normal, "ul.scoutMenu li.scout a")],
	page_sizes: None,
};

pub const AGENT_SCOUT_PROFILE: PortalProfile = PortalProfile {
	login: LoginForm {
		path: "/agent/login",
		user_field: "input#userId",
		password_field: "input#userPassword",
		submit: "button#loginButton",
		form_marker: "div.login-box",
	},
	conditions: ConditionList {
		path: "/agent/scout/conditions",
		titles: "div.condition-card h3",
		open: "div.condition-card button.run",
	},
	results: ResultsPage {
		rows: "div.seeker-list article",
		cells: "span.cell",
		age_cell: 1,
		checkbox: "div.seeker-list article input.pick",
		next_page: "nav.pager button.next",
		empty_marker: "div.seeker-list-empty",
	},
	send: SendDialog {
		open: "button.send-scout",
		template_select: "select#templateSelect",
		confirm: "div.dialog button.primary",
		cancel: "div.dialog button.secondary",
	},
	entries: EntryFlow::CsvExport { path: "/agent/applicants", trigger: "button.export-csv" },
	scout_tabs: &[],
	page_sizes: None,
};

const EXPORT_OPEN: &str = "button.export-open";
const EXPORT_RANGE: &str = "div.export-dialog select.range";
const EXPORT_RANGE_LABEL: &str = "直近1週間";

/// The agent portal asks for a date range before it offers the export button.
pub(crate) async fn prepare_agent_export(session: &dyn BrowserSession) -> Result<()> {
	session.click(EXPORT_OPEN).await?;
	session.select_by_label(EXPORT_RANGE, EXPORT_RANGE_LABEL).await
}
