use indexmap::IndexMap;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use crate::adapters::element_text;
use crate::util::normalize_ws;

static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static CARD_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4, strong, span").expect("static selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("static selector"));

pub const UNKNOWN_EVENT: &str = "Unknown Event";

#[derive(Clone, Debug, PartialEq)]
pub struct ShowLink {
    pub name: String,
    /// link text as published, before the name was cut
    pub label: String,
    pub show_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EventLink {
    pub label: String,
    pub url: String,
}

pub fn absolute_url(site_root: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}/{}", site_root.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}

fn ancestor_named<'a>(el: ElementRef<'a>, names: &[&str]) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| names.contains(&a.value().name()))
}

/// Event name -> event page link, from the season calendar.
pub fn event_detail_links(html: &Html, site_root: &str) -> IndexMap<String, EventLink> {
    let mut links = IndexMap::new();
    for a in html.select(&LINK) {
        let Some(href) = a.value().attr("href") else { continue };
        if !href.contains("event-details-page") {
            continue;
        }
        let event_name = ancestor_named(a, &["div", "li", "article", "td"])
            .and_then(|card| card.select(&CARD_HEADING).next())
            .map(element_text)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_EVENT.to_string());
        let label = event_name.split(',').next().unwrap_or_default().trim().to_string();
        let event_name = normalize_ws(&label.replace("Regional", ""));
        links.insert(event_name, EventLink { label, url: absolute_url(site_root, href) });
    }
    links
}

/// First prelims and first finals schedule link of an event page.
pub fn schedule_links(html: &Html, excluded_marker: &str, site_root: &str) -> (Option<String>, Option<String>) {
    let excluded_marker = excluded_marker.to_lowercase();
    let mut prelims = None;
    let mut finals = None;
    for a in html.select(&LINK) {
        let Some(href) = a.value().attr("href") else { continue };
        let text = element_text(a).to_lowercase();
        if !excluded_marker.is_empty() && text.contains(&excluded_marker) {
            continue;
        }
        if text.contains("prelims") && prelims.is_none() {
            prelims = Some(absolute_url(site_root, href));
        } else if text.contains("finals") && finals.is_none() {
            finals = Some(absolute_url(site_root, href));
        }
    }
    (prelims, finals)
}

/// Show ids linked from the scores index, named after the link or its table row.
pub fn show_links(html: &Html) -> Vec<ShowLink> {
    let mut shows = vec![];
    for a in html.select(&LINK) {
        let Some(href) = a.value().attr("href") else { continue };
        let Some((_, show_id)) = href.rsplit_once("ShowId=") else { continue };
        let show_id = show_id.split('&').next().unwrap_or_default().trim();
        if show_id.is_empty() {
            continue;
        }
        let mut name = element_text(a);
        if name.is_empty() || name.contains("View") || name.contains("Score") {
            if let Some(first_cell) = ancestor_named(a, &["tr"]).and_then(|row| row.select(&CELL).next()) {
                name = element_text(first_cell);
            }
        }
        let label = name;
        let name = label.split("Regional").next().unwrap_or_default().trim().to_string();
        let name = if name.is_empty() { UNKNOWN_EVENT.to_string() } else { name };
        shows.push(ShowLink { name, label, show_id: show_id.to_string() });
    }
    shows
}
