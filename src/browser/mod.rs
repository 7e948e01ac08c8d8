pub mod engine;
pub mod manager;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;

pub use engine::{BrowserEngine, TimelinePage};
pub use manager::{ChromeEngine, ChromePage};
