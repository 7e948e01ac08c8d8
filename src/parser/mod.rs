pub mod html_parser;
pub mod post;

pub use html_parser::{TimelineParser, POST_SELECTOR};
pub use post::*;
