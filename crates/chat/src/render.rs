//! Message rendering and display helpers.

use chrono::{DateTime, Utc};
use database::ContentType;
use lol_html::html_content::Element;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use serde::Serialize;
use tracing::warn;

/// Notice shown in place of an empty message.
pub const EMPTY_NOTICE: &str = "Empty message";

/// Notice shown in place of html content.
pub const SUPPRESSED_NOTICE: &str = "HTML content is not displayed";

/// Styles forced onto `<ul>` elements.
const LIST_STYLE: &[(&str, &str)] = &[("background-color", "#0052cc"), ("color", "white")];

/// Styles forced onto `<div>` elements.
const BLOCK_STYLE: &[(&str, &str)] = &[("color", "white")];

/// On-screen form of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "markup", rename_all = "lowercase")]
pub enum Rendered {
    /// Markup ready to be inserted as-is.
    Markup(String),
    /// Content whose rendering is disabled.
    Suppressed,
    /// The message had no content.
    Empty,
}

impl Rendered {
    /// Markup for a page, including the notices for non-content states.
    pub fn to_html(&self) -> String {
        match self {
            Rendered::Markup(markup) => markup.clone(),
            Rendered::Suppressed => {
                format!(r#"<div class="message-suppressed">{}</div>"#, SUPPRESSED_NOTICE)
            }
            Rendered::Empty => format!(r#"<div class="message-empty">{}</div>"#, EMPTY_NOTICE),
        }
    }
}

/// Render message content according to its declared type.
///
/// Text is treated as trusted markup and only restyled. Html output is
/// disabled and markdown renders nothing.
pub fn render_message(content: &str, content_type: ContentType) -> Rendered {
    if content.is_empty() {
        return Rendered::Empty;
    }

    match content_type {
        ContentType::Text => Rendered::Markup(restyle_markup(content)),
        ContentType::Html => Rendered::Suppressed,
        ContentType::Markdown => Rendered::Markup(String::new()),
    }
}

/// Force the display colors onto every `<ul>` and `<div>` element.
///
/// The content is tokenized as an HTML fragment, so comments, text and
/// attribute values are never mistaken for tags. Everything that is not a
/// restyled start tag passes through byte for byte.
pub fn restyle_markup(input: &str) -> String {
    let settings = RewriteStrSettings {
        element_content_handlers: vec![
            element!("ul", |el| force_style(el, LIST_STYLE)),
            element!("div", |el| force_style(el, BLOCK_STYLE)),
        ],
        ..RewriteStrSettings::default()
    };

    match rewrite_str(input, settings) {
        Ok(output) => output,
        Err(e) => {
            warn!("Could not restyle message markup: {}", e);
            input.to_string()
        }
    }
}

fn force_style(
    el: &mut Element<'_, '_>,
    forced: &[(&str, &str)],
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let style = merge_style(el.get_attribute("style").as_deref(), forced);
    el.set_attribute("style", &style)?;
    Ok(())
}

/// Combine an existing style declaration list with forced properties.
///
/// Forced properties replace existing ones of the same name.
fn merge_style(existing: Option<&str>, forced: &[(&str, &str)]) -> String {
    let mut declarations: Vec<String> = existing
        .unwrap_or("")
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl.split(':').next().unwrap_or("").trim();
            !forced
                .iter()
                .any(|(forced_property, _)| property.eq_ignore_ascii_case(forced_property))
        })
        .map(str::to_string)
        .collect();

    declarations.extend(
        forced
            .iter()
            .map(|(property, value)| format!("{}: {}", property, value)),
    );

    format!("{};", declarations.join("; "))
}

/// Describe how long ago `timestamp` was, relative to `now`.
///
/// Unparseable timestamps are returned unchanged.
pub fn format_relative_time(timestamp: &str, now: DateTime<Utc>) -> String {
    let then = match DateTime::parse_from_rfc3339(timestamp) {
        Ok(then) => then.with_timezone(&Utc),
        Err(_) => return timestamp.to_string(),
    };

    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} hr ago", hours);
    }

    let days = hours / 24;
    if days < 7 {
        return format!("{} day ago", days);
    }

    then.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_empty_content() {
        for content_type in [ContentType::Text, ContentType::Html, ContentType::Markdown] {
            assert_eq!(render_message("", content_type), Rendered::Empty);
        }
        assert!(Rendered::Empty.to_html().contains(EMPTY_NOTICE));
    }

    #[test]
    fn test_html_suppressed_and_markdown_blank() {
        assert_eq!(
            render_message("<b>hi</b>", ContentType::Html),
            Rendered::Suppressed
        );
        assert_eq!(
            render_message("# Title", ContentType::Markdown),
            Rendered::Markup(String::new())
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(
            render_message("Hello there", ContentType::Text),
            Rendered::Markup("Hello there".to_string())
        );
        assert_eq!(restyle_markup("a < b and c>d"), "a < b and c>d");
    }

    #[test]
    fn test_list_and_div_restyled() {
        let html = restyle_markup("<ul><li>one</li></ul><div>two</div><p>three</p>");
        assert!(html.contains(r#"style="background-color: #0052cc; color: white;""#));
        assert!(html.contains(r#"style="color: white;""#));
        assert!(html.contains("<li>one</li></ul>"));
        assert!(html.ends_with("two</div><p>three</p>"));
    }

    #[test]
    fn test_existing_style_is_merged() {
        let html = restyle_markup(r#"<div class="card" style="margin: 0; COLOR: red">x</div>"#);
        assert!(html.contains(r#"class="card""#));
        assert!(html.contains(r#"style="margin: 0; color: white;""#));
        assert!(!html.contains("red"));
    }

    #[test]
    fn test_unquoted_attribute_still_restyled() {
        let html = restyle_markup("<div title=a'b>x</div>");
        assert!(html.contains("color: white;"));
        assert!(html.ends_with(">x</div>"));
    }

    #[test]
    fn test_comments_and_similar_tags_untouched() {
        let input = "<!-- <div> --><divider>x</divider><ulist>y</ulist>";
        assert_eq!(restyle_markup(input), input);
    }

    #[test]
    fn test_relative_time() {
        let now = DateTime::parse_from_rfc3339("2025-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ago = |d: Duration| (now - d).to_rfc3339();

        assert_eq!(format_relative_time(&ago(Duration::seconds(5)), now), "just now");
        assert_eq!(format_relative_time(&ago(Duration::minutes(5)), now), "5 min ago");
        assert_eq!(format_relative_time(&ago(Duration::hours(3)), now), "3 hr ago");
        assert_eq!(format_relative_time(&ago(Duration::days(2)), now), "2 day ago");
        assert_eq!(format_relative_time(&ago(Duration::days(30)), now), "2025-02-08");
        assert_eq!(format_relative_time("yesterday", now), "yesterday");
    }
}
