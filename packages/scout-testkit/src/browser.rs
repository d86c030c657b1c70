//! A browser whose answers are scripted per selector.
//!
//! Each scripted selector holds a queue of answers. Every call pops the front answer until one
//! remains, which then repeats. Unscripted selectors are absent, empty and enabled.

use std::{
	collections::{HashMap, HashSet, VecDeque},
	path::{Path, PathBuf},
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use scout_portals::{BoxFuture, BrowserLauncher, BrowserSession, Error, Result};

#[derive(Default)]
struct Script {
	exists: HashMap<String, VecDeque<bool>>,
	enabled: HashMap<String, VecDeque<bool>>,
	texts: HashMap<String, VecDeque<Vec<String>>>,
	rows: HashMap<String, VecDeque<Vec<Vec<String>>>>,
	downloads: VecDeque<PathBuf>,
	broken: HashSet<String>,
	calls: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedBrowser {
	script: Mutex<Script>,
	closes: AtomicUsize,
}
impl ScriptedBrowser {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn exists_seq(&self, selector: &str, answers: &[bool]) -> &Self {
		self.with(|script| {
			script.exists.insert(selector.to_string(), answers.iter().copied().collect());
		})
	}

	pub fn enabled_seq(&self, selector: &str, answers: &[bool]) -> &Self {
		self.with(|script| {
			script.enabled.insert(selector.to_string(), answers.iter().copied().collect());
		})
	}

	pub fn texts_seq(&self, selector: &str, pages: Vec<Vec<&str>>) -> &Self {
		self.with(|script| {
			script.texts.insert(selector.to_string(), pages.into_iter().map(owned).collect());
		})
	}

	/// One entry per page; each page lists its rows' cell texts.
	pub fn pages(&self, row_selector: &str, pages: Vec<Vec<Vec<&str>>>) -> &Self {
		self.with(|script| {
			script.rows.insert(
				row_selector.to_string(),
				pages.into_iter().map(|rows| rows.into_iter().map(owned).collect()).collect(),
			);
		})
	}

	pub fn download_file(&self, path: PathBuf) -> &Self {
		self.with(|script| script.downloads.push_back(path))
	}

	/// Clicks and fills on `selector` fail as if the element were missing.
	pub fn broken(&self, selector: &str) -> &Self {
		self.with(|script| {
			script.broken.insert(selector.to_string());
		})
	}

	/// Every primitive call so far, rendered as `"<op> <selector>[ <arg>]"`.
	pub fn calls(&self) -> Vec<String> {
		self.lock().calls.clone()
	}

	pub fn count_calls(&self, call: &str) -> usize {
		self.lock().calls.iter().filter(|logged| logged.as_str() == call).count()
	}

	pub fn close_count(&self) -> usize {
		self.closes.load(Ordering::SeqCst)
	}

	fn with(&self, f: impl FnOnce(&mut Script)) -> &Self {
		f(&mut self.lock());

		self
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
		self.script.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn record(&self, call: String) -> Result<()> {
		let mut script = self.lock();
		let mutating = call.starts_with("click") || call.starts_with("fill");
		let broken = if mutating {
			script.broken.iter().find(|selector| call.contains(selector.as_str())).cloned()
		} else {
			None
		};

		script.calls.push(call);

		match broken {
			Some(selector) => Err(Error::ElementMissing { selector }),
			None => Ok(()),
		}
	}
}
impl BrowserSession for ScriptedBrowser {
	fn goto<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.record(format!("goto {url}")) })
	}

	fn exists<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let mut script = self.lock();

			Ok(script.exists.get_mut(selector).and_then(next).unwrap_or(false))
		})
	}

	fn fill<'a>(&'a self, selector: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.record(format!("fill {selector} {value}")) })
	}

	fn click<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.record(format!("click {selector}")) })
	}

	fn click_nth<'a>(&'a self, selector: &'a str, index: usize) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.record(format!("click_nth {selector} {index}")) })
	}

	fn texts<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let mut script = self.lock();

			Ok(script.texts.get_mut(selector).and_then(next).unwrap_or_default())
		})
	}

	fn rows<'a>(
		&'a self,
		row_selector: &'a str,
		_cell_selector: &'a str,
	) -> BoxFuture<'a, Result<Vec<Vec<String>>>> {
		Box::pin(async move {
			let mut script = self.lock();

			Ok(script.rows.get_mut(row_selector).and_then(next).unwrap_or_default())
		})
	}

	fn is_enabled<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let mut script = self.lock();

			Ok(script.enabled.get_mut(selector).and_then(next).unwrap_or(true))
		})
	}

	fn select_by_label<'a>(
		&'a self,
		selector: &'a str,
		label: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.record(format!("select {selector} {label}")) })
	}

	fn download<'a>(
		&'a self,
		trigger: &'a str,
		_dir: &'a Path,
		wait: Duration,
	) -> BoxFuture<'a, Result<PathBuf>> {
		Box::pin(async move {
			self.record(format!("download {trigger}"))?;

			self.lock().downloads.pop_front().ok_or_else(|| Error::Timeout {
				message: format!("No download finished within {}ms.", wait.as_millis()),
			})
		})
	}

	fn close(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			self.closes.fetch_add(1, Ordering::SeqCst);

			Ok(())
		})
	}
}

/// Hands out prepared browsers in order.
#[derive(Default)]
pub struct ScriptedLauncher {
	browsers: Mutex<VecDeque<Arc<ScriptedBrowser>>>,
	launches: AtomicUsize,
}
impl ScriptedLauncher {
	pub fn new(browsers: Vec<Arc<ScriptedBrowser>>) -> Arc<Self> {
		Arc::new(Self { browsers: Mutex::new(browsers.into()), launches: AtomicUsize::new(0) })
	}

	pub fn launches(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}
}
impl BrowserLauncher for ScriptedLauncher {
	fn launch(&self) -> BoxFuture<'_, Result<Arc<dyn BrowserSession>>> {
		Box::pin(async move {
			self.launches.fetch_add(1, Ordering::SeqCst);

			let browser = self.browsers.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

			browser.map(|browser| browser as Arc<dyn BrowserSession>).ok_or_else(|| Error::Browser {
				message: "No scripted browser left to launch.".to_string(),
			})
		})
	}
}

fn next<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
	if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
}

fn owned(values: Vec<&str>) -> Vec<String> {
	values.into_iter().map(str::to_string).collect()
}
