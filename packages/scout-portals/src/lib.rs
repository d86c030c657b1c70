pub mod ambi;
pub mod browser;
pub mod csv_export;
pub mod driver;
pub mod mynavi;
pub mod profile;
pub mod ran;
pub mod session;
pub mod webdriver;

mod error;

pub use browser::{BoxFuture, BrowserLauncher, BrowserSession};
pub use driver::{ConditionHandle, PortalDriver};
pub use error::{Error, Result};
pub use session::{
	BrowserPortals, Credentials, PortalEndpoints, PortalSession, Portals, SendFailure, SendRequest,
};
pub use webdriver::WebDriverLauncher;
