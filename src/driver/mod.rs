pub mod traits;
pub mod web;

#[cfg(test)]
pub(crate) mod memory;

pub use traits::{DriverError, Locator, PageDriver, RawElement};
