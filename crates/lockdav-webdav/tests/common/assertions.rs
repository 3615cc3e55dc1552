//! Assertions and body helpers shared by the HTTP and dispatcher tests.

use xmltree::Element;

/// Lock-info body with the given scope (`exclusive` or `shared`) and owner.
pub fn lock_body(scope: &str, owner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:{scope}/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
  <D:owner><D:href>{owner}</D:href></D:owner>
</D:lockinfo>"#
    )
}

/// Walk child elements by local name.
pub fn child<'a>(element: &'a Element, path: &[&str]) -> &'a Element {
    path.iter().fold(element, |el, name| {
        el.get_child(*name)
            .unwrap_or_else(|| panic!("missing <{name}> under <{}>", el.name))
    })
}

/// Text of the element reached by `path` from the root.
pub fn text_at(body: &[u8], path: &[&str]) -> String {
    let root = Element::parse(body).expect("response is not XML");
    child(&root, path)
        .get_text()
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// `locktoken/href` of a lock discovery body.
pub fn discovery_token(body: &[u8]) -> String {
    text_at(body, &["lockdiscovery", "activelock", "locktoken", "href"])
}

/// Timeout in seconds reported by a lock discovery body.
pub fn discovery_timeout(body: &[u8]) -> u64 {
    let timeout = text_at(body, &["lockdiscovery", "activelock", "timeout"]);
    timeout
        .strip_prefix("Second-")
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("unexpected timeout {timeout}"))
}

/// Scope element name (`exclusive` or `shared`) of a lock discovery body.
pub fn discovery_scope(body: &[u8]) -> String {
    let root = Element::parse(body).expect("response is not XML");
    let scope = child(&root, &["lockdiscovery", "activelock", "lockscope"]);
    scope
        .children
        .iter()
        .find_map(|n| match n {
            xmltree::XMLNode::Element(e) => Some(e.name.clone()),
            _ => None,
        })
        .expect("empty lockscope")
}

/// Assert a multi-status body reports `423 Locked` for `path`.
pub fn assert_locked_body(body: &[u8], path: &str) {
    assert_eq!(text_at(body, &["response", "href"]), path);
    assert_eq!(
        text_at(body, &["response", "status"]),
        "HTTP/1.1 423 Locked"
    );
}

/// Strip the angle brackets of a `Lock-Token` header value.
pub fn unbracket(header: &str) -> &str {
    header
        .strip_prefix('<')
        .and_then(|h| h.strip_suffix('>'))
        .unwrap_or_else(|| panic!("Lock-Token {header} is not bracketed"))
}
