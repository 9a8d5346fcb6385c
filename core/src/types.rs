//! Confluence content DTOs.
//!
//! # Design
//! These mirror the subset of the `/wiki/rest/api/content` schema that the
//! embedding provider manages. The client itself is generic over any serde
//! type; these exist so callers don't each redefine the same shapes. The
//! mock server defines its own copies and the integration tests catch drift.

use serde::{Deserialize, Serialize};

/// A page or blog post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<SpaceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ContentBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl Content {
    /// A new page in `space_key` with a storage-format body.
    pub fn page(space_key: &str, title: &str, storage_value: &str) -> Self {
        Self {
            id: None,
            content_type: "page".to_string(),
            title: title.to_string(),
            space: Some(SpaceRef {
                key: space_key.to_string(),
            }),
            body: Some(ContentBody {
                storage: Storage::new(storage_value),
            }),
            version: None,
            links: None,
        }
    }

    /// Site-relative path of the page as shown in a browser, suitable for
    /// `Client::url`.
    pub fn web_path(&self) -> Option<String> {
        let links = self.links.as_ref()?;
        let webui = links.webui.as_deref()?;
        Some(format!("{}{}", links.context.as_deref().unwrap_or_default(), webui))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpaceRef {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentBody {
    pub storage: Storage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Storage {
    pub value: String,
    pub representation: String,
}

impl Storage {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            representation: "storage".to_string(),
        }
    }
}

/// Confluence requires the next version number on every update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Version {
    pub number: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Links {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webui: Option<String>,
}
