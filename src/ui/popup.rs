use crate::{
    core::{config::MapLabels, geo::LatLng},
    data::facility::Facility,
};
use std::fmt::Write;

/// A navigation affordance inside a popup
#[derive(Debug, Clone, PartialEq)]
pub struct PopupLink {
    pub label: String,
    pub href: String,
    pub new_tab: bool,
}

/// Provider-neutral popup content.
///
/// Providers that render HTML use [`PopupContent::to_html`]; headless
/// consumers read [`PopupContent::text`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PopupContent {
    pub title: String,
    pub paragraphs: Vec<String>,
    pub items: Vec<String>,
    pub link: Option<PopupLink>,
}

impl PopupContent {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.paragraphs.push(text.into());
        self
    }

    pub fn item(mut self, text: impl Into<String>) -> Self {
        self.items.push(text.into());
        self
    }

    pub fn link(mut self, label: impl Into<String>, href: impl Into<String>, new_tab: bool) -> Self {
        self.link = Some(PopupLink {
            label: label.into(),
            href: href.into(),
            new_tab,
        });
        self
    }

    /// Plain-text rendering, one element per line, links as `label <href>`
    pub fn text(&self) -> String {
        let mut out = self.title.clone();
        for paragraph in &self.paragraphs {
            out.push('\n');
            out.push_str(paragraph);
        }
        for item in &self.items {
            out.push_str("\n- ");
            out.push_str(item);
        }
        if let Some(link) = &self.link {
            let _ = write!(out, "\n{} <{}>", link.label, link.href);
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let _ = write!(html, "<b>{}</b>", escape_html(&self.title));
        for paragraph in &self.paragraphs {
            let _ = write!(html, "<p>{}</p>", escape_html(paragraph));
        }
        if !self.items.is_empty() {
            html.push_str("<ul>");
            for item in &self.items {
                let _ = write!(html, "<li>{}</li>", escape_html(item));
            }
            html.push_str("</ul>");
        }
        if let Some(link) = &self.link {
            let target = if link.new_tab { " target=\"_blank\"" } else { "" };
            let _ = write!(
                html,
                "<a href=\"{}\"{}><button>{}</button></a>",
                escape_html(&link.href),
                target,
                escape_html(&link.label)
            );
        }
        html
    }
}

/// Popup shown when a facility marker is clicked
pub fn facility_popup(facility: &Facility, labels: &MapLabels, detail_href: String) -> PopupContent {
    let title = facility.display_name(&labels.unnamed_facility).to_string();
    let mut popup = PopupContent::new(title);

    match &facility.ratings {
        Some(ratings) => {
            popup = popup
                .item(format!("{}: {}/5", labels.availability, ratings.availability))
                .item(format!("{}: {}/5", labels.safety, ratings.safety))
                .item(format!("{}: {}/5", labels.cleanliness, ratings.cleanliness));
        }
        None => popup = popup.paragraph(labels.no_reviews.clone()),
    }

    popup.link(labels.open_facility.clone(), detail_href, true)
}

/// Popup shown at the clicked location while placing a new facility
pub fn placement_popup(position: LatLng, labels: &MapLabels, create_href: String) -> PopupContent {
    PopupContent::new(labels.placement_title.clone())
        .paragraph(labels.placement_hint.clone())
        .paragraph(format!("{}, {}", position.lat_param(), position.lng_param()))
        .link(labels.confirm_placement.clone(), create_href, false)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
