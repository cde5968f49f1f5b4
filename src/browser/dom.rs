//! Rendered-HTML snapshots queried with the `scraper` crate.

use scraper::{ElementRef, Html, Selector};

use crate::error::BrowserError;

/// Owned snapshot of a matched element.
///
/// `scraper`'s trees are not `Send`, so matches are copied out into plain
/// strings before they cross an await point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    text: String,
    own_text: String,
    attributes: Vec<(String, String)>,
    html: String,
}

impl Element {
    /// Whitespace-normalized text of the element and all descendants.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of the element's direct text children only.
    pub fn own_text(&self) -> &str {
        &self.own_text
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Descendants (or the element itself) matching `selector`.
    ///
    /// The element is re-parsed from its outer HTML. Table parts are wrapped
    /// in the table context the parser needs to keep them.
    pub fn find_all(&self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        let selector = parse_selector(selector)?;
        let root_selector = parse_selector(&self.name)?;
        let fragment = Html::parse_fragment(&table_context(&self.name, &self.html));
        let Some(root) = fragment.select(&root_selector).next() else {
            return Ok(Vec::new());
        };
        let own = selector.matches(&root).then_some(root);
        Ok(own
            .into_iter()
            .chain(root.select(&selector))
            .map(snapshot)
            .collect())
    }

    pub fn find(&self, selector: &str) -> Result<Option<Element>, BrowserError> {
        Ok(self.find_all(selector)?.into_iter().next())
    }
}

/// A loaded page's HTML.
#[derive(Debug, Clone, Default)]
pub struct Document {
    html: String,
}

impl Document {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn select(&self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        Ok(document.select(&selector).map(snapshot).collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, BrowserError> {
    Selector::parse(selector).map_err(|e| BrowserError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Outer HTML of a table part nested in the elements the parser expects
/// around it. Anything else is returned unchanged.
fn table_context(name: &str, html: &str) -> String {
    match name {
        "td" | "th" => format!("<table><tbody><tr>{html}</tr></tbody></table>"),
        "tr" => format!("<table><tbody>{html}</tbody></table>"),
        "thead" | "tbody" | "tfoot" | "caption" | "colgroup" => format!("<table>{html}</table>"),
        _ => html.to_string(),
    }
}

fn snapshot(element: ElementRef<'_>) -> Element {
    let own_text = element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| String::from(&**text))
        .collect::<Vec<_>>()
        .join(" ");

    Element {
        name: element.value().name().to_string(),
        text: normalize_whitespace(element.text()),
        own_text: normalize_whitespace(std::iter::once(own_text.as_str())),
        attributes: element
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        html: element.html(),
    }
}

fn normalize_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
