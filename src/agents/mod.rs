pub mod agent;
pub mod orchestrator;


pub use agent::AccountScraper;
pub use orchestrator::{run_until_shutdown, sleep_or_shutdown, CycleReport, PollLoop};
