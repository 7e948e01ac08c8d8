use crate::error::ScrapingError;
use crate::parser::RawPost;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const POST_SELECTOR: &str = r#"article[data-testid="tweet"]"#;
const TEXT_SELECTOR: &str = r#"[data-testid="tweetText"]"#;
const TIME_SELECTOR: &str = "time";
const LIKE_SELECTOR: &str = r#"[data-testid="like"]"#;
const RETWEET_SELECTOR: &str = r#"[data-testid="retweet"]"#;

/// html parser that projects a rendered timeline into raw posts
pub struct TimelineParser {
    post_selector: Selector,
    text_selector: Selector,
    time_selector: Selector,
    like_selector: Selector,
    retweet_selector: Selector,
}

impl TimelineParser {
    pub fn new() -> Result<Self, ScrapingError> {
        Ok(Self {
            post_selector: parse_selector(POST_SELECTOR)?,
            text_selector: parse_selector(TEXT_SELECTOR)?,
            time_selector: parse_selector(TIME_SELECTOR)?,
            like_selector: parse_selector(LIKE_SELECTOR)?,
            retweet_selector: parse_selector(RETWEET_SELECTOR)?,
        })
    }

    /// One raw post per rendered post element, in document order.
    pub fn parse_timeline_html(&self, html: &str) -> Vec<RawPost> {
        let document = Html::parse_document(html);
        let posts: Vec<RawPost> = document
            .select(&self.post_selector)
            .map(|article| self.project_post(&article))
            .collect();

        debug!("Parsed {} posts from HTML", posts.len());
        posts
    }

    fn project_post(&self, article: &ElementRef) -> RawPost {
        let timestamp = article
            .select(&self.time_selector)
            .next()
            .and_then(|time| time.value().attr("datetime"))
            .unwrap_or_default()
            .to_string();

        RawPost {
            text: self.inner_text(article, &self.text_selector).unwrap_or_default(),
            timestamp,
            likes: self.inner_text(article, &self.like_selector).unwrap_or_else(|| "0".to_string()),
            retweets: self.inner_text(article, &self.retweet_selector).unwrap_or_else(|| "0".to_string()),
        }
    }

    // empty text counts as absent, same as a falsy innerText
    fn inner_text(&self, article: &ElementRef, selector: &Selector) -> Option<String> {
        article
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ScrapingError> {
    Selector::parse(selector)
        .map_err(|e| ScrapingError::ParseError(format!("Invalid selector {}: {}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_TIMELINE_HTML: &str = r#"
    <html><body>
    <div aria-label="Timeline">
        <article data-testid="tweet">
            <div data-testid="User-Name"><span>Alice</span></div>
            <a href="/alice/status/1"><time datetime="2024-01-15T10:30:45.000Z">Jan 15</time></a>
            <div data-testid="tweetText" lang="en"><span>gm </span><span>everyone</span></div>
            <div role="group">
                <div data-testid="reply"><span>12</span></div>
                <div data-testid="retweet"><span>340</span></div>
                <div data-testid="like"><span>1.2K</span></div>
            </div>
        </article>
        <article data-testid="tweet">
            <div data-testid="tweetText"><span>second post</span></div>
            <div role="group">
                <div data-testid="retweet"><span></span></div>
            </div>
        </article>
    </div>
    </body></html>
    "#;

    #[test]
    fn test_parser_creation() {
        assert!(TimelineParser::new().is_ok());
    }

    #[test]
    fn test_parse_full_post() {
        let parser = TimelineParser::new().unwrap();
        let posts = parser.parse_timeline_html(MOCK_TIMELINE_HTML);

        assert_eq!(posts.len(), 2);
        let post = &posts[0];
        assert_eq!(post.text, "gm everyone");
        assert_eq!(post.timestamp, "2024-01-15T10:30:45.000Z");
        assert_eq!(post.likes, "1.2K");
        assert_eq!(post.retweets, "340");
    }

    #[test]
    fn test_missing_fields_use_fallbacks() {
        let parser = TimelineParser::new().unwrap();
        let posts = parser.parse_timeline_html(MOCK_TIMELINE_HTML);

        let post = &posts[1];
        assert_eq!(post.text, "second post");
        assert_eq!(post.timestamp, "");
        assert_eq!(post.likes, "0");
        assert_eq!(post.retweets, "0");
    }

    #[test]
    fn test_post_without_text() {
        let parser = TimelineParser::new().unwrap();
        let html = r#"<article data-testid="tweet"><img src="photo.jpg"></article>"#;
        let posts = parser.parse_timeline_html(html);

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "");
    }

    #[test]
    fn test_empty_html() {
        let parser = TimelineParser::new().unwrap();
        assert!(parser.parse_timeline_html("").is_empty());
        assert!(parser.parse_timeline_html("<div><span>incomplete").is_empty());
    }
}
