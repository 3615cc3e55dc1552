//! Lock-info request parsing and DAV response bodies.

use crate::error::{WebDavError, WebDavResult};
use http::StatusCode;
use lockdav_core::token::to_opaque_uri;
use lockdav_core::{LockScope, LockType, LockedObject};
use std::io::Write;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};
use xmltree::{Element, XMLNode};

/// `Content-Type` of every XML body we send.
pub const CONTENT_TYPE_XML: &str = "text/xml; charset=UTF-8";

const DAV_NS: &str = "DAV:";

/// Parsed `lockinfo` request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    /// Requested scope.
    pub scope: LockScope,
    /// Requested type. Read locks are granted as write locks.
    pub lock_type: LockType,
    /// Owner text, if the body carried a non-empty `owner` element.
    pub owner: Option<String>,
}

/// Parse a `lockinfo` document.
///
/// Element names are matched on their local-name suffix so any namespace
/// prefix is accepted. The root may only contain elements and text; comments,
/// CDATA sections and processing instructions make the body malformed.
///
/// # Example
///
/// ```
/// use lockdav_core::LockScope;
/// use lockdav_webdav::xml::parse_lock_info;
///
/// let body = br#"<?xml version="1.0"?>
/// <D:lockinfo xmlns:D="DAV:">
///   <D:lockscope><D:exclusive/></D:lockscope>
///   <D:locktype><D:write/></D:locktype>
///   <D:owner><D:href>alice</D:href></D:owner>
/// </D:lockinfo>"#;
///
/// let info = parse_lock_info(body).unwrap();
/// assert_eq!(info.scope, LockScope::Exclusive);
/// assert_eq!(info.owner.as_deref(), Some("alice"));
/// ```
pub fn parse_lock_info(body: &[u8]) -> WebDavResult<LockInfo> {
    let root = Element::parse(body).map_err(|e| malformed(e.to_string()))?;
    lock_info_from_element(&root)
}

fn lock_info_from_element(root: &Element) -> WebDavResult<LockInfo> {
    let mut scope_node = None;
    let mut type_node = None;
    let mut owner_node = None;

    for child in &root.children {
        let element = match child {
            XMLNode::Element(element) => element,
            XMLNode::Text(_) => continue,
            other => return Err(malformed(format!("unexpected node in lockinfo: {other:?}"))),
        };

        let slot = if element.name.ends_with("lockscope") {
            &mut scope_node
        } else if element.name.ends_with("locktype") {
            &mut type_node
        } else if element.name.ends_with("owner") {
            &mut owner_node
        } else {
            continue;
        };
        if slot.replace(element).is_some() {
            return Err(malformed(format!("duplicate {} element", element.name)));
        }
    }

    let scope = scope_node
        .and_then(|node| {
            child_names(node).find_map(|name| {
                if name.ends_with("exclusive") {
                    Some(LockScope::Exclusive)
                } else if name.ends_with("shared") {
                    Some(LockScope::Shared)
                } else {
                    None
                }
            })
        })
        .ok_or_else(|| malformed("missing or unrecognized lockscope"))?;

    let lock_type = type_node
        .and_then(|node| {
            child_names(node).find_map(|name| {
                if name.ends_with("write") {
                    Some(LockType::Write)
                } else if name.ends_with("read") {
                    Some(LockType::Read)
                } else {
                    None
                }
            })
        })
        .ok_or_else(|| malformed("missing or unrecognized locktype"))?;

    let owner = owner_node.and_then(owner_text);

    Ok(LockInfo {
        scope,
        lock_type,
        owner,
    })
}

fn child_names(element: &Element) -> impl Iterator<Item = &str> {
    element.children.iter().filter_map(|child| match child {
        XMLNode::Element(e) => Some(e.name.as_str()),
        _ => None,
    })
}

/// Text of the first child element (usually `href`), else the owner's own text.
fn owner_text(owner: &Element) -> Option<String> {
    let nested = owner.children.iter().find_map(|child| match child {
        XMLNode::Element(e) => Some(e),
        _ => None,
    });
    let text = match nested {
        Some(e) => e.get_text(),
        None => owner.get_text(),
    }?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn malformed(reason: impl Into<String>) -> WebDavError {
    WebDavError::MalformedLockInfo(reason.into())
}

fn new_writer() -> EventWriter<Vec<u8>> {
    EmitterConfig::new()
        .perform_indent(false)
        .write_document_declaration(true)
        .create_writer(Vec::new())
}

fn text_element<W: Write>(
    writer: &mut EventWriter<W>,
    name: &str,
    text: &str,
) -> Result<(), xml::writer::Error> {
    writer.write(XmlEvent::start_element(name))?;
    writer.write(XmlEvent::characters(text))?;
    writer.write(XmlEvent::end_element())
}

fn empty_element<W: Write>(
    writer: &mut EventWriter<W>,
    name: &str,
) -> Result<(), xml::writer::Error> {
    writer.write(XmlEvent::start_element(name))?;
    writer.write(XmlEvent::end_element())
}

/// Render the `prop/lockdiscovery/activelock` body for a lock.
///
/// Scope, type and depth come from the record; `owner` is the identity to
/// report, which differs from the record's first owner for a shared lock
/// granted to a later requester.
pub fn lock_discovery(lock: &LockedObject, owner: &str) -> Result<Vec<u8>, xml::writer::Error> {
    let mut w = new_writer();

    w.write(XmlEvent::start_element("D:prop").ns("D", DAV_NS))?;
    w.write(XmlEvent::start_element("D:lockdiscovery"))?;
    w.write(XmlEvent::start_element("D:activelock"))?;

    w.write(XmlEvent::start_element("D:locktype"))?;
    empty_element(&mut w, &format!("D:{}", lock.lock_type().as_str()))?;
    w.write(XmlEvent::end_element())?;

    w.write(XmlEvent::start_element("D:lockscope"))?;
    empty_element(&mut w, &format!("D:{}", lock.scope().as_str()))?;
    w.write(XmlEvent::end_element())?;

    text_element(&mut w, "D:depth", lock.depth().as_str())?;

    w.write(XmlEvent::start_element("D:owner"))?;
    text_element(&mut w, "D:href", owner)?;
    w.write(XmlEvent::end_element())?;

    text_element(
        &mut w,
        "D:timeout",
        &format!("Second-{}", lock.timeout_seconds()),
    )?;

    w.write(XmlEvent::start_element("D:locktoken"))?;
    text_element(&mut w, "D:href", &to_opaque_uri(lock.token()))?;
    w.write(XmlEvent::end_element())?;

    w.write(XmlEvent::end_element())?; // activelock
    w.write(XmlEvent::end_element())?; // lockdiscovery
    w.write(XmlEvent::end_element())?; // prop

    Ok(w.into_inner())
}

/// Render a single-entry `multistatus` body reporting `status` for `path`.
pub fn multistatus(path: &str, status: StatusCode) -> Result<Vec<u8>, xml::writer::Error> {
    let mut w = new_writer();
    let status_line = format!(
        "HTTP/1.1 {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );

    w.write(XmlEvent::start_element("D:multistatus").ns("D", DAV_NS))?;
    w.write(XmlEvent::start_element("D:response"))?;
    text_element(&mut w, "D:href", path)?;
    text_element(&mut w, "D:status", &status_line)?;
    w.write(XmlEvent::end_element())?;
    w.write(XmlEvent::end_element())?;

    Ok(w.into_inner())
}
