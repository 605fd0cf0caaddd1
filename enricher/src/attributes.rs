//! Document attributes as extracted upstream, and what the enricher derives
//! from them.
use crate::errors::{EnricherError, Result};
use serde::{Deserialize, Serialize};
use stores::ObjectTags;

const DOCUMENT_TITLE: &str = "_document_title";
const CATEGORY: &str = "_category";
const SOURCE_URI: &str = "_source_uri";
const ETAG: &str = "sp_eTag";
const LANGUAGE_CODE: &str = "_language_code";
const AUTHORS: &str = "_authors";
const CREATED_AT: &str = "_created_at";
const LAST_UPDATED_AT: &str = "_last_updated_at";
const MODIFIED_BY: &str = "sp_modifiedBy";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
        Attribute {
            name: name.into(),
            value,
        }
    }
}

/// Typed attribute value.
///
/// On the wire this is an object with exactly one of `stringValue`,
/// `stringListValue`, `dateValue` or `longValue` set. Anything else becomes
/// `Unsupported` so that one odd attribute never rejects the whole event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAttributeValue", into = "RawAttributeValue")]
pub enum AttributeValue {
    String(String),
    StringList(Vec<String>),
    Date(String),
    Long(i64),
    Unsupported,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttributeValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_list_value: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    long_value: Option<i64>,
}

impl From<RawAttributeValue> for AttributeValue {
    fn from(raw: RawAttributeValue) -> Self {
        if let Some(value) = raw.string_value {
            AttributeValue::String(value)
        } else if let Some(values) = raw.string_list_value {
            AttributeValue::StringList(values)
        } else if let Some(value) = raw.date_value {
            AttributeValue::Date(value)
        } else if let Some(value) = raw.long_value {
            AttributeValue::Long(value)
        } else {
            AttributeValue::Unsupported
        }
    }
}

impl From<AttributeValue> for RawAttributeValue {
    fn from(value: AttributeValue) -> Self {
        let mut raw = RawAttributeValue::default();
        match value {
            AttributeValue::String(v) => raw.string_value = Some(v),
            AttributeValue::StringList(v) => raw.string_list_value = Some(v),
            AttributeValue::Date(v) => raw.date_value = Some(v),
            AttributeValue::Long(v) => raw.long_value = Some(v),
            AttributeValue::Unsupported => {}
        }
        raw
    }
}

impl AttributeValue {
    fn kind(&self) -> &'static str {
        match self {
            AttributeValue::String(_) => "string",
            AttributeValue::StringList(_) => "string list",
            AttributeValue::Date(_) => "date",
            AttributeValue::Long(_) => "long",
            AttributeValue::Unsupported => "unsupported",
        }
    }
}

/// What identifies a document for filing and for the permission lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentIdentity {
    pub title: String,
    pub category: String,
    pub origin_uri: String,
    pub content_fingerprint: String,
}

/// Derives the storage tags and the document identity from `attributes`.
///
/// Fails with `MissingRequiredField` when there is no non-empty title.
pub fn extract(attributes: &[Attribute]) -> Result<(ObjectTags, DocumentIdentity)> {
    let mut tags = ObjectTags::new();
    let mut identity = DocumentIdentity::default();

    for attribute in attributes {
        match (attribute.name.as_str(), &attribute.value) {
            (DOCUMENT_TITLE, AttributeValue::String(title)) => identity.title = title.clone(),
            (CATEGORY, AttributeValue::String(category)) => {
                identity.category = category.clone();
                tags.insert("category", category.as_str());
            }
            (SOURCE_URI, AttributeValue::String(uri)) => {
                identity.origin_uri = uri.clone();
                tags.insert("source_uri", uri.as_str());
            }
            (ETAG, AttributeValue::String(etag)) => identity.content_fingerprint = etag.clone(),
            (LANGUAGE_CODE, AttributeValue::String(language)) => {
                tags.insert("language", language.as_str())
            }
            (AUTHORS, AttributeValue::StringList(authors)) => tags.insert("author", authors.join(", ")),
            (CREATED_AT, AttributeValue::Date(date)) => tags.insert("created_at", date.as_str()),
            (LAST_UPDATED_AT, AttributeValue::Date(date)) => {
                tags.insert("last_updated_at", date.as_str())
            }
            (MODIFIED_BY, AttributeValue::String(user)) => tags.insert("modified_by", user.as_str()),
            (
                name @ (DOCUMENT_TITLE | CATEGORY | SOURCE_URI | ETAG | LANGUAGE_CODE | AUTHORS
                | CREATED_AT | LAST_UPDATED_AT | MODIFIED_BY),
                value,
            ) => {
                tracing::debug!(name, kind = value.kind(), "Ignoring attribute with unexpected value type");
            }
            _ => {}
        }
    }

    if identity.title.is_empty() {
        return Err(EnricherError::MissingRequiredField(DOCUMENT_TITLE));
    }

    Ok((tags, identity))
}
