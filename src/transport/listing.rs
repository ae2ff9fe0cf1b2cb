//! Viewer page helpers: page-id extraction and the manuscript page listing.

use std::sync::OnceLock;

use regex_lite::Regex;
use url::Url;

use crate::error::TransportError;

/// Query parameter of the viewer URL that carries the page id.
const VIEWER_REF_PARAM: &str = "ref";

/// Separator between page ids in the listing field.
const PAGE_LIST_SEPARATOR: &str = "||";

/// Placeholder the viewer inserts for missing pages.
const PAGE_LIST_PLACEHOLDER: &str = "##";

fn page_list_input() -> &'static Regex {
    static INPUT: OnceLock<Regex> = OnceLock::new();
    INPUT.get_or_init(|| {
        Regex::new(r#"(?i)<input\b[^>]*\sid\s*=\s*["']PageList["'][^>]*>"#)
            .expect("page list pattern is valid")
    })
}

fn value_attribute() -> &'static Regex {
    static VALUE: OnceLock<Regex> = OnceLock::new();
    VALUE.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|\s)value\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("value attribute pattern is valid")
    })
}

/// Extract the page id from a viewer URL such as
/// `https://www.bl.uk/manuscripts/Viewer.aspx?ref=royal_ms_2_a_xvi_fs001r`.
pub fn page_id_from_viewer_url(viewer_url: &str) -> Result<String, TransportError> {
    let url = Url::parse(viewer_url)
        .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", viewer_url, e)))?;

    url.query_pairs()
        .find(|(key, _)| key == VIEWER_REF_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            TransportError::InvalidUrl(format!(
                "{}: no '{}' parameter, manuscript page id not found",
                viewer_url, VIEWER_REF_PARAM
            ))
        })
}

/// Parse the ordered page ids out of the viewer HTML.
///
/// The viewer embeds every page of the manuscript in the `value` of a hidden
/// `<input id="PageList">`, separated by `||`, with `##` standing in for
/// pages that have no image.
pub fn parse_page_list(html: &str) -> Result<Vec<String>, String> {
    let input = page_list_input()
        .find(html)
        .ok_or_else(|| "PageList input not found in viewer page".to_string())?;

    let captures = value_attribute()
        .captures(input.as_str())
        .ok_or_else(|| "PageList input has no value attribute".to_string())?;

    let value = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default();

    Ok(value
        .split(PAGE_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|page| !page.is_empty() && *page != PAGE_LIST_PLACEHOLDER)
        .map(str::to_string)
        .collect())
}
