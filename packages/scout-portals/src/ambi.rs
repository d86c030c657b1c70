use scout_domain::ScoutType;

use crate::{
	Result,
	browser::BrowserSession,
	profile::{ConditionList, EntryFlow, LoginForm, PortalProfile, ResultsPage, SendDialog},
};

pub const PROFILE: PortalProfile = PortalProfile {
	login: LoginForm {
		path: "/company/login",
		user_field: "input#loginId",
		password_field: "input#password",
		submit: "button.login-submit",
		form_marker: "form.login-form",
	},
	conditions: ConditionList {
		path: "/company/scout/search/saved",
		titles: "ul.saved-conditions li .title",
		open: "ul.saved-conditions li a.search",
	},
	results: ResultsPage {
		rows: "div.candidate-list div.candidate",
		cells: ".col",
		age_cell: 2,
		checkbox: "div.candidate-list div.candidate input.select",
		next_page: "a.pager-next",
		empty_marker: "p.no-result",
	},
	send: SendDialog {
		open: "button.bulk-scout",
		template_select: "select[name='scoutTemplate']",
		confirm: "div.scout-dialog button.send",
		cancel: "div.scout-dialog button.close",
	},
	entries: EntryFlow::Detail {
		path_template: "/company/entry/detail/{id}",
		fields: "table.entry-detail td",
		missing_marker: "div.error-notfound",
	},
	scout_tabs: &[
		(ScoutType::Normal, "ul.scout-kind li.normal a"),
		(ScoutType::Premium, "ul.scout-kind li.premium a"),
		(ScoutType::NormalRepeat, "ul.scout-kind li.normal-repeat a"),
		(ScoutType::PremiumRepeat, "ul.scout-kind li.premium-repeat a"),
	],
	page_sizes: Some(("select.page-size", &[50, 100, 300, 500])),
};

const PREMIUM_SEND: &str = "button.bulk-scout-premium";

/// Shows enough rows on one page to cover the allotment.
pub(crate) async fn choose_page_size(session: &dyn BrowserSession, wanted: u32) -> Result<()> {
	let Some((selector, sizes)) = PROFILE.page_sizes else {
		return Ok(());
	};
	let size =
		sizes.iter().copied().find(|size| *size >= wanted).or_else(|| sizes.last().copied());

	if let Some(size) = size {
		session.select_by_label(selector, &format!("{size}件")).await?;
	}

	Ok(())
}

pub(crate) fn send_button(scout_type: ScoutType) -> &'static str {
	if scout_type.is_premium() { PREMIUM_SEND } else { PROFILE.send.open }
}
