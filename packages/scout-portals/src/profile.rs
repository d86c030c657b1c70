//! Selector tables describing each portal's UI. Paths are relative to the configured base URL.

use scout_domain::ScoutType;

#[derive(Debug, Clone, Copy)]
pub struct LoginForm {
	pub path: &'static str,
	pub user_field: &'static str,
	pub password_field: &'static str,
	pub submit: &'static str,
	/// Present while the login form is still displayed.
	pub form_marker: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ConditionList {
	pub path: &'static str,
	pub titles: &'static str,
	/// Clickable element per saved condition, in the same order as `titles`.
	pub open: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ResultsPage {
	pub rows: &'static str,
	pub cells: &'static str,
	pub age_cell: usize,
	pub checkbox: &'static str,
	pub next_page: &'static str,
	/// Shown instead of rows when the condition matches nobody.
	pub empty_marker: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct SendDialog {
	pub open: &'static str,
	pub template_select: &'static str,
	pub confirm: &'static str,
	pub cancel: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum EntryFlow {
	/// One applicant per page at `path_template` with `{id}` substituted.
	Detail { path_template: &'static str, fields: &'static str, missing_marker: &'static str },
	/// One bulk download of every recent applicant.
	CsvExport { path: &'static str, trigger: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct PortalProfile {
	pub login: LoginForm,
	pub conditions: ConditionList,
	pub results: ResultsPage,
	pub send: SendDialog,
	pub entries: EntryFlow,
	/// Tab to open before choosing a condition, per scout type.
	pub scout_tabs: &'static [(ScoutType, &'static str)],
	/// Page-size selector and the sizes it offers, ascending.
	pub page_sizes: Option<(&'static str, &'static [u32])>,
}
impl PortalProfile {
	pub fn tab_for(&self, scout_type: ScoutType) -> Option<&'static str> {
		self.scout_tabs.iter().find(|(kind, _)| *kind == scout_type).map(|(_, selector)| *selector)
	}
}
