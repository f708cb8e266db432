//! Issue-tracker lookup: `jira <query>`.
//!
//! A report number (`123` or `MC-123`) is fetched and shown as an embed;
//! anything else gets a quick-search link.

pub mod report;

use std::time::Duration;

use anyhow::Context;
use regex::Regex;
use tracing::info;

use cogbot_core::config::JiraConfig;
use cogbot_core::types::Embed;
use cogbot_platform::ChatPlatform;

pub use report::{JiraError, JiraReport};

/// Fields requested from the XML issue view.
const REPORT_FIELDS: [&str; 14] = [
    "link",
    "description",
    "key",
    "summary",
    "status",
    "resolution",
    "assignee",
    "reporter",
    "created",
    "resolved",
    "version",
    "fixVersion",
    "votes",
    "watches",
];

/// What to answer a query with.
#[derive(Clone, Debug, PartialEq)]
pub enum JiraReply {
    Report { content: String, embed: Box<Embed> },
    Search { url: String },
}

pub struct Jira {
    http: reqwest::Client,
    base_url: String,
    project_key: String,
    report_pattern: Regex,
}

impl Jira {
    pub fn new(config: &JiraConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build jira http client")?;
        let pattern = format!(r"(?i)^({}-)?(\d+)$", regex::escape(&config.project_key));
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_key: config.project_key.to_uppercase(),
            report_pattern: Regex::new(&pattern).context("invalid jira project key")?,
        })
    }

    /// The report number in `query`, if it names a single report.
    pub fn report_number<'q>(&self, query: &'q str) -> Option<&'q str> {
        self.report_pattern
            .captures(query.trim())
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str())
    }

    pub fn report_url(&self, number: &str) -> String {
        let key = format!("{}-{number}", self.project_key);
        let fields: Vec<String> = REPORT_FIELDS.iter().map(|f| format!("field={f}")).collect();
        format!(
            "{}/si/jira.issueviews:issue-xml/{key}/{key}.xml?{}",
            self.base_url,
            fields.join("&")
        )
    }

    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("searchString", query)
            .finish();
        format!("{}/secure/QuickSearch.jspa?{encoded}", self.base_url)
    }

    pub async fn fetch_report(&self, number: &str) -> anyhow::Result<JiraReport> {
        let url = self.report_url(number);
        info!(url = %url, "requesting jira report xml");
        let xml = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to request report {number}"))?
            .error_for_status()
            .with_context(|| format!("tracker refused report {number}"))?
            .text()
            .await
            .with_context(|| format!("failed to read report {number}"))?;
        Ok(JiraReport::parse(&xml)?)
    }

    pub async fn lookup(&self, query: &str) -> anyhow::Result<JiraReply> {
        match self.report_number(query) {
            Some(number) => {
                let report = self.fetch_report(number).await?;
                Ok(JiraReply::Report {
                    content: format!("<{}>", report.url),
                    embed: Box::new(report.to_embed(&self.base_url)),
                })
            }
            None => Ok(JiraReply::Search {
                url: self.search_url(query),
            }),
        }
    }

    /// Answer `query` in `channel_id`.
    pub async fn respond(
        &self,
        platform: &dyn ChatPlatform,
        channel_id: &str,
        query: &str,
    ) -> anyhow::Result<()> {
        match self.lookup(query).await? {
            JiraReply::Report { content, embed } => {
                platform.send_embed(channel_id, &content, &embed).await?;
            }
            JiraReply::Search { url } => {
                platform.send_message(channel_id, &url).await?;
            }
        }
        Ok(())
    }
}
