//! Publish request model.
//!
//! A [`PublishRequest`] is built once per invocation from a notebook path, an
//! integration token and a set of [`PublishOptions`], then handed to a
//! [`Publisher`](crate::Publisher).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::PublishError;

/// Visibility of the created post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Public,
    /// Not visible until published separately.
    #[default]
    Draft,
    Unlisted,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Public => "public",
            PublishStatus::Draft => "draft",
            PublishStatus::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStatus {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(PublishStatus::Public),
            "draft" => Ok(PublishStatus::Draft),
            "unlisted" => Ok(PublishStatus::Unlisted),
            other => Err(PublishError::Configuration(format!(
                "Unknown publish status '{}'. Use: public, draft, unlisted",
                other
            ))),
        }
    }
}

/// License identifiers accepted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum License {
    #[default]
    #[serde(rename = "all-rights-reserved")]
    AllRightsReserved,
    #[serde(rename = "cc-40-by")]
    Cc40By,
    #[serde(rename = "cc-40-by-sa")]
    Cc40BySa,
    #[serde(rename = "cc-40-by-nd")]
    Cc40ByNd,
    #[serde(rename = "cc-40-by-nc")]
    Cc40ByNc,
    #[serde(rename = "cc-40-by-nc-nd")]
    Cc40ByNcNd,
    #[serde(rename = "cc-40-by-nc-sa")]
    Cc40ByNcSa,
    #[serde(rename = "cc-40-zero")]
    Cc40Zero,
    #[serde(rename = "public-domain")]
    PublicDomain,
}

impl License {
    pub const ALL: [License; 9] = [
        License::AllRightsReserved,
        License::Cc40By,
        License::Cc40BySa,
        License::Cc40ByNd,
        License::Cc40ByNc,
        License::Cc40ByNcNd,
        License::Cc40ByNcSa,
        License::Cc40Zero,
        License::PublicDomain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            License::AllRightsReserved => "all-rights-reserved",
            License::Cc40By => "cc-40-by",
            License::Cc40BySa => "cc-40-by-sa",
            License::Cc40ByNd => "cc-40-by-nd",
            License::Cc40ByNc => "cc-40-by-nc",
            License::Cc40ByNcNd => "cc-40-by-nc-nd",
            License::Cc40ByNcSa => "cc-40-by-nc-sa",
            License::Cc40Zero => "cc-40-zero",
            License::PublicDomain => "public-domain",
        }
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for License {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        License::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = License::ALL.iter().map(|l| l.as_str()).collect();
                PublishError::Configuration(format!(
                    "Unknown license '{}'. Use one of: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// How tabular notebook output is rendered into the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableConversion {
    /// Screenshot tables with a headless browser.
    #[default]
    Chrome,
    Matplotlib,
}

impl TableConversion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableConversion::Chrome => "chrome",
            TableConversion::Matplotlib => "matplotlib",
        }
    }
}

impl fmt::Display for TableConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableConversion {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chrome" => Ok(TableConversion::Chrome),
            "matplotlib" => Ok(TableConversion::Matplotlib),
            other => Err(PublishError::Configuration(format!(
                "Unknown table conversion '{}'. Use: chrome, matplotlib",
                other
            ))),
        }
    }
}

/// Presentation options for a publish request.
///
/// `Default` yields a draft with no overrides: no publication, title or tags,
/// followers not notified, all rights reserved, tables rendered with chrome
/// and no markdown saved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishOptions {
    /// Publication to publish under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_name: Option<String>,

    /// Post title (taken from the notebook when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    pub publish_status: PublishStatus,

    pub notify_followers: bool,

    pub license: License,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,

    /// Browser executable used for table rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// Keep the intermediate markdown next to the notebook.
    pub save_markdown: bool,

    pub table_conversion: TableConversion,
}

/// A single notebook publish request.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishRequest {
    path: PathBuf,
    token: String,
    options: PublishOptions,
}

impl PublishRequest {
    /// Build a request. Fails if the token is empty.
    pub fn new(
        path: impl Into<PathBuf>,
        token: impl Into<String>,
        options: PublishOptions,
    ) -> Result<Self, PublishError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(PublishError::Configuration(
                "Integration token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            path: path.into(),
            token,
            options,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    /// Keyword arguments for the external `publish` call.
    pub fn to_kwargs(&self) -> serde_json::Value {
        let o = &self.options;
        serde_json::json!({
            "integration_token": self.token,
            "pub_name": o.pub_name,
            "title": o.title,
            "tags": o.tags,
            "publish_status": o.publish_status,
            "notify_followers": o.notify_followers,
            "license": o.license,
            "canonical_url": o.canonical_url,
            "chrome_path": o.chrome_path,
            "save_markdown": o.save_markdown,
            "table_conversion": o.table_conversion,
        })
    }

    /// Same as [`to_kwargs`](Self::to_kwargs) with the token masked.
    pub fn to_redacted_kwargs(&self) -> serde_json::Value {
        let mut kwargs = self.to_kwargs();
        kwargs["integration_token"] = serde_json::Value::String("***".to_string());
        kwargs
    }
}

impl fmt::Debug for PublishRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishRequest")
            .field("path", &self.path)
            .field("token", &"***")
            .field("options", &self.options)
            .finish()
    }
}
