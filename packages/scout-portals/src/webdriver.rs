//! WebDriver adapter for [`BrowserSession`] backed by `fantoccini`.

use std::{
	collections::HashSet,
	path::{Path, PathBuf},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use fantoccini::{Client, ClientBuilder, Locator, elements::Element, error::CmdError};
use serde_json::{Map, Value, json};
use tokio::{fs, time};

use crate::{
	Error, Result,
	browser::{BoxFuture, BrowserLauncher, BrowserSession},
};

const DOWNLOAD_POLL: Duration = Duration::from_millis(500);
const PARTIAL_SUFFIXES: [&str; 2] = [".crdownload", ".tmp"];

#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
	pub webdriver_url: String,
	pub headless: bool,
	pub download_dir: PathBuf,
	pub step_timeout: Duration,
}
impl WebDriverLauncher {
	pub fn from_config(cfg: &scout_config::Config) -> Self {
		Self {
			webdriver_url: cfg.portals.webdriver_url.clone(),
			headless: cfg.portals.headless,
			download_dir: cfg.runtime.download_dir.clone(),
			step_timeout: Duration::from_millis(cfg.portals.step_timeout_ms),
		}
	}

	fn capabilities(&self) -> Map<String, Value> {
		let mut args = vec!["--disable-gpu", "--no-sandbox", "--window-size=1920,1080"];

		if self.headless {
			args.push("--headless=new");
		}

		let mut caps = Map::new();

		caps.insert(
			"goog:chromeOptions".to_string(),
			json!({
				"args": args,
				"prefs": {
					"download.default_directory": self.download_dir.to_string_lossy(),
					"download.prompt_for_download": false,
					"download.directory_upgrade": true,
				},
			}),
		);

		caps
	}

	async fn connect(&self) -> Result<Arc<dyn BrowserSession>> {
		fs::create_dir_all(&self.download_dir).await?;

		let client = ClientBuilder::native()
			.capabilities(self.capabilities())
			.connect(&self.webdriver_url)
			.await
			.map_err(|err| Error::Browser { message: format!("Failed to start session: {err}.") })?;

		Ok(Arc::new(WebDriverSession {
			client,
			step_timeout: self.step_timeout,
			closed: AtomicBool::new(false),
		}))
	}
}
impl BrowserLauncher for WebDriverLauncher {
	fn launch(&self) -> BoxFuture<'_, Result<Arc<dyn BrowserSession>>> {
		Box::pin(self.connect())
	}
}

pub struct WebDriverSession {
	client: Client,
	step_timeout: Duration,
	closed: AtomicBool,
}
impl WebDriverSession {
	async fn wait_for(&self, selector: &str) -> Result<Element> {
		self.client
			.wait()
			.at_most(self.step_timeout)
			.for_element(Locator::Css(selector))
			.await
			.map_err(|err| map_cmd(err, selector))
	}

	async fn find_all(&self, selector: &str) -> Result<Vec<Element>> {
		self.client.find_all(Locator::Css(selector)).await.map_err(|err| map_cmd(err, selector))
	}

	async fn goto_inner(&self, url: &str) -> Result<()> {
		self.client.goto(url).await.map_err(|err| map_cmd(err, url))
	}

	async fn exists_inner(&self, selector: &str) -> Result<bool> {
		Ok(!self.find_all(selector).await?.is_empty())
	}

	async fn fill_inner(&self, selector: &str, value: &str) -> Result<()> {
		let element = self.wait_for(selector).await?;

		element.clear().await.map_err(|err| map_cmd(err, selector))?;
		element.send_keys(value).await.map_err(|err| map_cmd(err, selector))
	}

	async fn click_inner(&self, selector: &str) -> Result<()> {
		self.wait_for(selector).await?.click().await.map_err(|err| map_cmd(err, selector))
	}

	async fn click_nth_inner(&self, selector: &str, index: usize) -> Result<()> {
		let elements = self.find_all(selector).await?;
		let element = elements.get(index).ok_or_else(|| Error::ElementMissing {
			selector: format!("{selector} [{index}]"),
		})?;

		element.click().await.map_err(|err| map_cmd(err, selector))
	}

	async fn texts_inner(&self, selector: &str) -> Result<Vec<String>> {
		let mut out = Vec::new();

		for element in self.find_all(selector).await? {
			out.push(element.text().await.map_err(|err| map_cmd(err, selector))?.trim().to_string());
		}

		Ok(out)
	}

	async fn rows_inner(&self, row_selector: &str, cell_selector: &str) -> Result<Vec<Vec<String>>> {
		let mut out = Vec::new();

		for row in self.find_all(row_selector).await? {
			let mut cells = Vec::new();

			for cell in
				row.find_all(Locator::Css(cell_selector)).await.map_err(|err| map_cmd(err, cell_selector))?
			{
				cells.push(
					cell.text().await.map_err(|err| map_cmd(err, cell_selector))?.trim().to_string(),
				);
			}

			out.push(cells);
		}

		Ok(out)
	}

	async fn is_enabled_inner(&self, selector: &str) -> Result<bool> {
		self.wait_for(selector).await?.is_enabled().await.map_err(|err| map_cmd(err, selector))
	}

	async fn select_inner(&self, selector: &str, label: &str) -> Result<()> {
		self.wait_for(selector)
			.await?
			.select_by_label(label)
			.await
			.map_err(|err| map_cmd(err, selector))
	}

	async fn download_inner(&self, trigger: &str, dir: &Path, wait: Duration) -> Result<PathBuf> {
		fs::create_dir_all(dir).await?;

		let before = list_files(dir).await?;

		self.click_inner(trigger).await?;

		let deadline = time::Instant::now() + wait;

		loop {
			for path in list_files(dir).await? {
				if before.contains(&path) || is_partial(&path) {
					continue;
				}

				return Ok(path);
			}

			if time::Instant::now() >= deadline {
				return Err(Error::Timeout {
					message: format!("No download appeared in {} within {wait:?}.", dir.display()),
				});
			}

			time::sleep(DOWNLOAD_POLL).await;
		}
	}

	async fn close_inner(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		self.client
			.clone()
			.close()
			.await
			.map_err(|err| Error::Browser { message: format!("Failed to close session: {err}.") })
	}
}
impl BrowserSession for WebDriverSession {
	fn goto<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.goto_inner(url))
	}

	fn exists<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.exists_inner(selector))
	}

	fn fill<'a>(&'a self, selector: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.fill_inner(selector, value))
	}

	fn click<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.click_inner(selector))
	}

	fn click_nth<'a>(&'a self, selector: &'a str, index: usize) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.click_nth_inner(selector, index))
	}

	fn texts<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(self.texts_inner(selector))
	}

	fn rows<'a>(
		&'a self,
		row_selector: &'a str,
		cell_selector: &'a str,
	) -> BoxFuture<'a, Result<Vec<Vec<String>>>> {
		Box::pin(self.rows_inner(row_selector, cell_selector))
	}

	fn is_enabled<'a>(&'a self, selector: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.is_enabled_inner(selector))
	}

	fn select_by_label<'a>(
		&'a self,
		selector: &'a str,
		label: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.select_inner(selector, label))
	}

	fn download<'a>(
		&'a self,
		trigger: &'a str,
		dir: &'a Path,
		wait: Duration,
	) -> BoxFuture<'a, Result<PathBuf>> {
		Box::pin(self.download_inner(trigger, dir, wait))
	}

	fn close(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(self.close_inner())
	}
}

fn map_cmd(err: CmdError, target: &str) -> Error {
	if err.is_no_such_element() {
		return Error::ElementMissing { selector: target.to_string() };
	}
	if matches!(err, CmdError::WaitTimeout) {
		return Error::Timeout { message: format!("Waiting for {target:?} timed out.") };
	}

	Error::Browser { message: format!("{target}: {err}") }
}

async fn list_files(dir: &Path) -> Result<HashSet<PathBuf>> {
	let mut entries = fs::read_dir(dir).await?;
	let mut out = HashSet::new();

	while let Some(entry) = entries.next_entry().await? {
		if entry.file_type().await?.is_file() {
			out.insert(entry.path());
		}
	}

	Ok(out)
}

fn is_partial(path: &Path) -> bool {
	let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();

	PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
