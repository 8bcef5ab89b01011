//! Decoding of staging-service response bodies.
//!
//! The service answers in XML by default and in JSON when asked. Each
//! operation recognizes exactly one success shape plus the service's error
//! envelope (`<nexus-error><errors><error><msg>` or `{"errors":[{"msg"}]}`).
//! Anything else is a [`StagingError::Parse`]; no operation returns a
//! partially-populated result.

use crate::error::{Result, StagingError};
use roxmltree::Node;
use serde_json::Value;
use std::fmt;

/// A staging profile the account may stage into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingProfile {
    pub id: String,
    pub name: String,
}

/// Lifecycle state reported for a staging repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryState {
    Open,
    Closed,
    Released,
    Dropped,
    Other(String),
}

impl RepositoryState {
    fn from_type(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Self::Open,
            "closed" => Self::Closed,
            "released" => Self::Released,
            "dropped" => Self::Dropped,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
            Self::Released => f.write_str("released"),
            Self::Dropped => f.write_str("dropped"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// State plus the service's in-progress flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub state: RepositoryState,
    pub transitioning: bool,
}

impl RepositoryStatus {
    /// Closed and no longer running close rules.
    pub fn is_closed(&self) -> bool {
        self.state == RepositoryState::Closed && !self.transitioning
    }
}

enum Document<'input> {
    Xml(roxmltree::Document<'input>),
    Json(Value),
}

/// Parses the profile list (`GET profiles`).
pub fn parse_profiles(body: &str) -> Result<Vec<StagingProfile>> {
    const CONTEXT: &str = "profile list";

    match load(body, CONTEXT)? {
        Document::Xml(doc) => {
            let data = expect_xml_root(&doc, "stagingProfiles", CONTEXT)
                .and_then(|root| xml_child(root, "data").ok_or_else(|| missing(CONTEXT, "data")))?;

            data.children()
                .filter(|node| node.has_tag_name("stagingProfile"))
                .map(|node| -> Result<StagingProfile> {
                    Ok(StagingProfile {
                        id: xml_text(node, &["id"], CONTEXT)?,
                        name: xml_text(node, &["name"], CONTEXT)?,
                    })
                })
                .collect()
        }
        Document::Json(value) => json_data(&value, CONTEXT)?
            .as_array()
            .ok_or_else(|| parse_error(CONTEXT, "'data' is not an array"))?
            .iter()
            .map(|entry| -> Result<StagingProfile> {
                Ok(StagingProfile {
                    id: json_str(entry, "id", CONTEXT)?,
                    name: json_str(entry, "name", CONTEXT)?,
                })
            })
            .collect(),
    }
}

/// Parses the "start" reply and returns the new repository id.
pub fn parse_started_repository(body: &str) -> Result<String> {
    const CONTEXT: &str = "start";

    match load(body, CONTEXT)? {
        Document::Xml(doc) => {
            let root = expect_xml_root(&doc, "promoteResponse", CONTEXT)?;
            xml_text(root, &["data", "stagedRepositoryId"], CONTEXT)
        }
        Document::Json(value) => json_str(json_data(&value, CONTEXT)?, "stagedRepositoryId", CONTEXT),
    }
}

/// Finds `repository_id` in a profile's repository list and returns its status.
pub fn parse_repository_state(body: &str, repository_id: &str) -> Result<RepositoryStatus> {
    const CONTEXT: &str = "repository status";

    match load(body, CONTEXT)? {
        Document::Xml(doc) => {
            let data = expect_xml_root(&doc, "stagingRepositories", CONTEXT)
                .and_then(|root| xml_child(root, "data").ok_or_else(|| missing(CONTEXT, "data")))?;

            for node in data
                .children()
                .filter(|node| node.has_tag_name("stagingProfileRepository"))
            {
                if xml_text(node, &["repositoryId"], CONTEXT)? != repository_id {
                    continue;
                }
                let state = RepositoryState::from_type(&xml_text(node, &["type"], CONTEXT)?);
                let transitioning = xml_child(node, "transitioning")
                    .and_then(|n| n.text())
                    .map(|text| text.trim() == "true")
                    .unwrap_or(false);
                return Ok(RepositoryStatus {
                    state,
                    transitioning,
                });
            }
            Err(not_listed(repository_id))
        }
        Document::Json(value) => {
            let entries = json_data(&value, CONTEXT)?
                .as_array()
                .ok_or_else(|| parse_error(CONTEXT, "'data' is not an array"))?;

            for entry in entries {
                if json_str(entry, "repositoryId", CONTEXT)? != repository_id {
                    continue;
                }
                return Ok(RepositoryStatus {
                    state: RepositoryState::from_type(&json_str(entry, "type", CONTEXT)?),
                    transitioning: entry
                        .get("transitioning")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                });
            }
            Err(not_listed(repository_id))
        }
    }
}

/// Parses the reply to finish / promote / bulk promote.
///
/// These calls answer `201 Created` with no body on success, so an empty
/// body is an acknowledgement. A non-empty body must be a success envelope.
pub fn parse_acknowledgement(body: &str, context: &'static str) -> Result<()> {
    if body.trim().is_empty() {
        return Ok(());
    }

    match load(body, context)? {
        Document::Xml(doc) => expect_xml_root(&doc, "promoteResponse", context).map(|_| ()),
        Document::Json(value) => json_data(&value, context).map(|_| ()),
    }
}

/// Extracts an error envelope message, if `body` is one.
///
/// Used on non-2xx replies whose shape is otherwise unknown.
pub fn error_message(body: &str) -> Option<String> {
    match load(body, "error") {
        Err(StagingError::RemoteRejected { message }) => Some(message),
        _ => None,
    }
}

/// Sniffs the format, parses it, and turns error envelopes into
/// [`StagingError::RemoteRejected`].
fn load<'input>(body: &'input str, context: &'static str) -> Result<Document<'input>> {
    let trimmed = body.trim_start();

    if trimmed.starts_with('<') {
        let doc = roxmltree::Document::parse(trimmed)
            .map_err(|e| parse_error(context, format!("malformed XML: {}", e)))?;
        let root = doc.root_element();
        if root.has_tag_name("nexus-error") {
            let message = xml_text(root, &["errors", "error", "msg"], context)?;
            return Err(StagingError::RemoteRejected { message });
        }
        Ok(Document::Xml(doc))
    } else if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| parse_error(context, format!("malformed JSON: {}", e)))?;
        if let Some(errors) = value.get("errors") {
            let message = errors
                .as_array()
                .and_then(|list| list.first())
                .and_then(|first| first.get("msg"))
                .and_then(Value::as_str)
                .ok_or_else(|| missing(context, "errors[0].msg"))?;
            return Err(StagingError::RemoteRejected {
                message: message.to_string(),
            });
        }
        Ok(Document::Json(value))
    } else if trimmed.is_empty() {
        Err(parse_error(context, "empty body"))
    } else {
        Err(parse_error(context, "body is neither XML nor JSON"))
    }
}

fn expect_xml_root<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    tag: &str,
    context: &'static str,
) -> Result<Node<'a, 'input>> {
    let root = doc.root_element();
    if root.has_tag_name(tag) {
        Ok(root)
    } else {
        Err(parse_error(
            context,
            format!("unexpected root <{}>, wanted <{}>", root.tag_name().name(), tag),
        ))
    }
}

fn xml_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn xml_text(node: Node<'_, '_>, path: &[&str], context: &'static str) -> Result<String> {
    let mut current = node;
    for tag in path {
        current = xml_child(current, tag).ok_or_else(|| missing(context, &path.join("/")))?;
    }
    current
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| missing(context, &path.join("/")))
}

fn json_data<'a>(value: &'a Value, context: &'static str) -> Result<&'a Value> {
    value.get("data").ok_or_else(|| missing(context, "data"))
}

fn json_str(value: &Value, key: &str, context: &'static str) -> Result<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| missing(context, key))
}

fn parse_error(context: &'static str, reason: impl Into<String>) -> StagingError {
    StagingError::Parse {
        context,
        reason: reason.into(),
    }
}

fn missing(context: &'static str, path: &str) -> StagingError {
    parse_error(context, format!("missing '{}'", path))
}

fn not_listed(repository_id: &str) -> StagingError {
    parse_error(
        "repository status",
        format!("repository {} is not listed for the profile", repository_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_respects_transitioning_flag() {
        let body = r#"{"data":[{"repositoryId":"r-1","type":"closed","transitioning":true}]}"#;
        let status = parse_repository_state(body, "r-1").unwrap();
        assert_eq!(status.state, RepositoryState::Closed);
        assert!(!status.is_closed());
    }

    #[test]
    fn error_message_only_for_envelopes() {
        assert_eq!(
            error_message(r#"{"errors":[{"id":"*","msg":"Unauthorized"}]}"#).as_deref(),
            Some("Unauthorized")
        );
        assert_eq!(error_message("<html>502 Bad Gateway</html>"), None);
    }
}
