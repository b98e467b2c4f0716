pub mod driver;
pub mod scripts;

pub use driver::{BrowserChoice, WebDriver, WebDriverConfig};
