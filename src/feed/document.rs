use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// SEC-003: Maximum element nesting depth accepted in a feed document.
/// Prevents unbounded stack growth from maliciously nested XML.
const MAX_DEPTH: usize = 64;

/// Errors that can occur while parsing a feed body into a document tree.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// XML is not well-formed.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// The body contained no root element at all.
    #[error("Document has no root element")]
    NoRoot,

    /// The body ended while elements were still open.
    #[error("Unexpected end of document inside <{0}>")]
    Unclosed(String),

    /// SEC-003: Nesting depth exceeds safety limit.
    #[error("XML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),
}

/// A node in the parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its qualified name (`itunes:image`), attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Qualified name, including any namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name with any `prefix:` removed.
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Value of the attribute with exactly this qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of every descendant text node, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// First descendant (pre-order, excluding `self`) matching `pred`.
    pub fn find_descendant<P>(&self, pred: P) -> Option<&Element>
    where
        P: Fn(&Element) -> bool + Copy,
    {
        for child in &self.children {
            if let Node::Element(el) = child {
                if pred(el) {
                    return Some(el);
                }
                if let Some(found) = el.find_descendant(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// First descendant with the given qualified name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.find_descendant(|el| el.name == name)
    }

    /// Every descendant matching `pred`, in document order.
    pub fn descendants_where<'a, P>(&'a self, pred: P, out: &mut Vec<&'a Element>)
    where
        P: Fn(&Element) -> bool + Copy,
    {
        for child in &self.children {
            if let Node::Element(el) = child {
                if pred(el) {
                    out.push(el);
                }
                el.descendants_where(pred, out);
            }
        }
    }
}

/// A feed body parsed into an element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    root: Element,
}

impl ParsedDocument {
    /// All `<item>` elements anywhere in the document, in document order.
    pub fn items(&self) -> Vec<&Element> {
        let mut items = Vec::new();
        if self.root.name == "item" {
            items.push(&self.root);
        }
        self.root.descendants_where(|el| el.name == "item", &mut items);
        items
    }
}

/// Parses a feed body into a [`ParsedDocument`].
///
/// Text and attribute values have the five XML builtin entities resolved.
/// Text containing other entity references (common in hand-written feeds,
/// e.g. `&nbsp;` outside CDATA) is decoded with the HTML entity table rather
/// than rejected.
///
/// # Errors
///
/// Returns [`DocumentError`] if the XML is malformed, truncated, empty, or
/// nested deeper than the safety limit.
///
/// # Security
///
/// quick-xml 0.37 never expands `<!ENTITY>` declarations, so external entity
/// (XXE) payloads in a hostile feed resolve to nothing.
pub fn parse_document(content: &str) -> Result<ParsedDocument, DocumentError> {
    let mut reader = Reader::from_str(content);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(DocumentError::MaxDepthExceeded(MAX_DEPTH));
                }
                stack.push(start_element(&e, &reader));
            }
            Ok(Event::Empty(e)) => {
                let el = start_element(&e, &reader);
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::End(_)) => {
                // End names are checked against the open tag by the reader
                let el = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Xml("unmatched closing tag".to_string()))?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(err) => {
                            // Non-XML entities such as `&nbsp;` are resolved as HTML
                            tracing::debug!(error = %err, "Decoding text with non-XML entity as HTML");
                            html_escape::decode_html_entities(&String::from_utf8_lossy(&e))
                                .into_owned()
                        }
                    };
                    parent.children.push(Node::Text(text));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::Text(String::from_utf8_lossy(&e).into_owned()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocumentError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(DocumentError::Unclosed(open.name));
    }
    root.map(|root| ParsedDocument { root })
        .ok_or(DocumentError::NoRoot)
}

fn start_element(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Element {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                tracing::debug!(element = %name, error = %err, "Skipping malformed attribute");
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        match attr.decode_and_unescape_value(reader.decoder()) {
            Ok(value) => attributes.push((key, value.into_owned())),
            Err(err) => {
                tracing::debug!(element = %name, attribute = %key, error = %err, "Skipping undecodable attribute");
            }
        }
    }

    Element::new(name, attributes)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    el: Element,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None if root.is_none() => *root = Some(el),
        None => {
            return Err(DocumentError::Xml(format!(
                "multiple root elements (second is <{}>)",
                el.name
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Show</title>
    <item>
      <title>First &amp; Best</title>
      <description><![CDATA[<p>Hello <b>there</b></p>]]></description>
      <enclosure url="https://cdn.example.com/1.mp3?a=1&amp;b=2" type="audio/mpeg"/>
      <itunes:image href="https://cdn.example.com/1.jpg"/>
    </item>
    <item><title>Second</title></item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_items_in_order() {
        let doc = parse_document(RSS).unwrap();
        let items = doc.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].find("title").unwrap().text_content(), "First & Best");
        assert_eq!(items[1].find("title").unwrap().text_content(), "Second");
    }

    #[test]
    fn test_cdata_kept_raw() {
        let doc = parse_document(RSS).unwrap();
        let desc = doc.items()[0].find("description").unwrap().text_content();
        assert_eq!(desc, "<p>Hello <b>there</b></p>");
    }

    #[test]
    fn test_attributes_unescaped() {
        let doc = parse_document(RSS).unwrap();
        let enclosure = doc.items()[0].find("enclosure").unwrap();
        assert_eq!(
            enclosure.attr("url"),
            Some("https://cdn.example.com/1.mp3?a=1&b=2")
        );
        assert_eq!(enclosure.attr("length"), None);
    }

    #[test]
    fn test_prefixed_names() {
        let doc = parse_document(RSS).unwrap();
        let image = doc.items()[0].find("itunes:image").unwrap();
        assert_eq!(image.name(), "itunes:image");
        assert_eq!(image.local_name(), "image");
    }

    #[test]
    fn test_html_entity_text_fully_decoded() {
        let doc =
            parse_document("<rss><item><title>Q&amp;A&nbsp;time</title></item></rss>").unwrap();
        assert_eq!(
            doc.items()[0].find("title").unwrap().text_content(),
            "Q&A\u{a0}time"
        );
    }

    #[test]
    fn test_empty_channel_has_no_items() {
        let doc = parse_document(r#"<rss version="2.0"><channel></channel></rss>"#).unwrap();
        assert!(doc.items().is_empty());
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(parse_document("<rss><channel></rss>").is_err());
        assert!(parse_document("<not valid xml").is_err());
    }

    #[test]
    fn test_truncated_rejected() {
        let err = parse_document("<rss><channel><item>").unwrap_err();
        assert!(matches!(err, DocumentError::Unclosed(name) if name == "item"));
    }

    #[test]
    fn test_empty_body_rejected() {
        assert!(matches!(parse_document(""), Err(DocumentError::NoRoot)));
        assert!(matches!(parse_document("   \n"), Err(DocumentError::NoRoot)));
    }

    // SEC-003: Deep nesting rejection
    #[test]
    fn test_depth_limit() {
        let deep = format!("{}{}", "<a>".repeat(MAX_DEPTH + 1), "</a>".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse_document(&deep),
            Err(DocumentError::MaxDepthExceeded(_))
        ));
    }
}
