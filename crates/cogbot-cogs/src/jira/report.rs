//! Issue reports parsed from the tracker's XML issue view.

use chrono::{DateTime, FixedOffset};
use roxmltree::{Document, Node};
use thiserror::Error;

use cogbot_core::types::{Embed, EmbedAuthor, EmbedImage};

/// Embed colour for reports.
pub const REPORT_COLOR: u32 = 0xDB1F29;

/// Date format of the XML issue view, e.g. `Fri, 01 Mar 2024 12:00:00 +0100`.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

#[derive(Debug, Error)]
pub enum JiraError {
    #[error("invalid report xml: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("report xml has no <{0}> element")]
    MissingElement(&'static str),

    #[error("<{element}> has no {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("invalid {field} date: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid {field} count: {value}")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct JiraReport {
    pub id: String,
    pub key: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub created_on: DateTime<FixedOffset>,
    pub resolved_on: Option<DateTime<FixedOffset>>,
    pub reporter: String,
    pub assignee: String,
    pub status: String,
    pub status_icon_url: String,
    pub resolution: String,
    pub versions: Vec<String>,
    pub fix_version: Option<String>,
    pub votes: u32,
    pub watches: u32,
}

impl JiraReport {
    /// Parse `rss/channel/item` of an issue view.
    pub fn parse(xml: &str) -> Result<Self, JiraError> {
        let doc = Document::parse(xml)?;
        let item = doc
            .root_element()
            .children()
            .find(|n| n.has_tag_name("channel"))
            .ok_or(JiraError::MissingElement("channel"))?
            .children()
            .find(|n| n.has_tag_name("item"))
            .ok_or(JiraError::MissingElement("item"))?;

        let key_node = child(item, "key")?;
        let status_node = child(item, "status")?;

        let versions: Vec<String> = item
            .children()
            .filter(|n| n.has_tag_name("version"))
            .map(|n| text(n).to_string())
            .collect();
        // The issue view omits fixVersion; with several versions the last one is the fix.
        let fix_version = if versions.len() > 1 {
            versions.last().cloned()
        } else {
            None
        };

        let resolved_on = match item.children().find(|n| n.has_tag_name("resolved")) {
            Some(node) => Some(parse_date("resolved", text(node))?),
            None => None,
        };

        Ok(Self {
            id: key_node
                .attribute("id")
                .ok_or(JiraError::MissingAttribute {
                    element: "key",
                    attribute: "id",
                })?
                .to_string(),
            key: text(key_node).to_string(),
            url: child_text(item, "link")?,
            title: child_text(item, "summary")?,
            description: child_text(item, "description")?,
            created_on: parse_date("created", text(child(item, "created")?))?,
            resolved_on,
            reporter: child_text(item, "reporter")?,
            assignee: child_text(item, "assignee")?,
            status: text(status_node).to_string(),
            status_icon_url: status_node
                .attribute("iconUrl")
                .ok_or(JiraError::MissingAttribute {
                    element: "status",
                    attribute: "iconUrl",
                })?
                .to_string(),
            resolution: child_text(item, "resolution")?,
            versions,
            fix_version,
            votes: parse_count("votes", &child_text(item, "votes")?)?,
            watches: parse_count("watches", &child_text(item, "watches")?)?,
        })
    }

    /// The version the issue was first seen in, when known.
    pub fn since_version(&self) -> &str {
        if self.versions.len() > 1 {
            &self.versions[0]
        } else {
            "Unknown"
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.resolution == "Unresolved"
    }

    pub fn to_embed(&self, base_url: &str) -> Embed {
        let mut embed = Embed {
            title: Some(self.title.clone()),
            url: Some(self.url.clone()),
            color: Some(REPORT_COLOR),
            thumbnail: Some(EmbedImage {
                url: self.status_icon_url.clone(),
            }),
            author: Some(EmbedAuthor {
                name: self.key.clone(),
                url: Some(self.url.clone()),
                icon_url: Some(format!("{}/favicon.png", base_url.trim_end_matches('/'))),
            }),
            fields: Vec::new(),
        }
        .field("Assigned to", &self.assignee)
        .field("Reported by", &self.reporter)
        .field("Created on", self.created_on.format("%d/%m/%Y").to_string());

        if self.is_unresolved() {
            embed = embed
                .field("Status", &self.status)
                .field("Since version", self.since_version())
                .field("Votes", self.votes.to_string());
        } else {
            let resolved_on = self
                .resolved_on
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            embed = embed
                .field("Resolution", &self.resolution)
                .field("Resolved on", resolved_on)
                .field("Since version", self.since_version());
            if let Some(fix) = &self.fix_version {
                embed = embed.field("Fix version", fix);
            }
        }
        embed
    }
}

fn child<'a, 'i>(parent: Node<'a, 'i>, name: &'static str) -> Result<Node<'a, 'i>, JiraError> {
    parent
        .children()
        .find(|n| n.has_tag_name(name))
        .ok_or(JiraError::MissingElement(name))
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or_default().trim()
}

fn child_text(parent: Node, name: &'static str) -> Result<String, JiraError> {
    child(parent, name).map(|n| text(n).to_string())
}

fn parse_date(field: &'static str, value: &str) -> Result<DateTime<FixedOffset>, JiraError> {
    DateTime::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map_err(|_| JiraError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

fn parse_count(field: &'static str, value: &str) -> Result<u32, JiraError> {
    value.parse().map_err(|_| JiraError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
