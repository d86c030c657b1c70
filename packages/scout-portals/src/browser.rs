//! The browser primitives provider drivers are written against.

use std::{
	future::Future,
	path::{Path, PathBuf},
	pin::Pin,
	sync::Arc,
	time::Duration,
};

use crate::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One live browser. Selectors are CSS. Calls are sequential within a run.
pub trait BrowserSession
where
	Self: Send + Sync,
{
	fn goto<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<()>>;

	fn exists<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn fill<'a>(&'a self, selector: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>>;

	fn click<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<()>>;

	/// Clicks the `index`-th element matching `selector`.
	fn click_nth<'a>(&'a self, selector: &'a str, index: usize) -> BoxFuture<'a, Result<()>>;

	fn texts<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;

	/// Cell texts of every element matching `row_selector`, one inner vector per row.
	fn rows<'a>(
		&'a self,
		row_selector: &'a str,
		cell_selector: &'a str,
	) -> BoxFuture<'a, Result<Vec<Vec<String>>>>;

	fn is_enabled<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn select_by_label<'a>(&'a self, selector: &'a str, label: &'a str)
	-> BoxFuture<'a, Result<()>>;

	/// Clicks `trigger` and waits for a finished file to appear in `dir`.
	fn download<'a>(
		&'a self,
		trigger: &'a str,
		dir: &'a Path,
		wait: Duration,
	) -> BoxFuture<'a, Result<PathBuf>>;

	/// Ends the browser session. Closing twice is not an error.
	fn close(&self) -> BoxFuture<'_, Result<()>>;
}

pub trait BrowserLauncher
where
	Self: Send + Sync,
{
	fn launch(&self) -> BoxFuture<'_, Result<Arc<dyn BrowserSession>>>;
}
