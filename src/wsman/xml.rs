// Copyright 2024 Dell DRAC driver contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A tiny namespace-aware XML tree, just enough to walk WS-MAN responses.
//!
//! WS-MAN responses are small (one device's worth of attributes or disks),
//! so we buffer the whole thing into a tree rather than stream it.

use std::borrow::Cow;

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::error::{Error, ErrorKind, Result};

/// A single element and its children, with its resolved namespace URI.
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Local (unprefixed) tag name, e.g. `AttributeName`.
    pub name: String,
    /// Resolved namespace URI of this element, if any.
    pub ns: Option<String>,
    /// Attributes as `(local-name, value)`.
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content of direct text nodes.
    pub text: String,
    /// Child elements, in document order.
    pub children: Vec<Node>,
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    /// The document's root element.
    pub root: Node,
}

impl Node {
    /// Whether this element carries `xsi:nil="true"`.
    pub fn is_nil(&self) -> bool {
        self.attributes
            .iter()
            .any(|(k, v)| k == "nil" && v == "true")
    }

    /// Value of an attribute by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct or nested descendant with a matching local name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
        }
        for child in &self.children {
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants (any depth) with a matching local name, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_all(name, &mut out);
        out
    }

    fn collect_all<'a>(&'a self, name: &str, out: &mut Vec<&'a Node>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_all(name, out);
        }
    }

    /// Direct children only, matching by local name.
    pub fn children_named(&self, name: &str) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first matching descendant, if present and not `xsi:nil`.
    pub fn find_text(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|n| {
            if n.is_nil() {
                None
            } else {
                Some(n.text.as_str())
            }
        })
    }

    /// Trimmed text of this element.
    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

impl Document {
    /// Parse a WS-MAN SOAP response body into a tree rooted at `Envelope`.
    pub fn parse(body: &[u8]) -> Result<Document> {
        let mut reader = NsReader::from_reader(body);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;
        let mut buf = Vec::new();

        loop {
            let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
            match event {
                Event::Start(ref e) => {
                    let name = local_name(e.name().as_ref());
                    let ns = match resolved {
                        ResolveResult::Bound(ns) => {
                            Some(String::from_utf8_lossy(ns.as_ref()).into_owned())
                        }
                        _ => None,
                    };
                    let mut attributes = Vec::new();
                    for attr in e.attributes() {
                        let attr = attr.map_err(quick_xml::Error::from)?;
                        let key = local_name(attr.key.as_ref());
                        let value = attr
                            .decode_and_unescape_value(reader.decoder())
                            .map_err(quick_xml::Error::from)?;
                        attributes.push((key, value.into_owned()));
                    }
                    stack.push(Node {
                        name,
                        ns,
                        attributes,
                        text: String::new(),
                        children: Vec::new(),
                    });
                }
                Event::Empty(ref e) => {
                    let name = local_name(e.name().as_ref());
                    let ns = match resolved {
                        ResolveResult::Bound(ns) => {
                            Some(String::from_utf8_lossy(ns.as_ref()).into_owned())
                        }
                        _ => None,
                    };
                    let mut attributes = Vec::new();
                    for attr in e.attributes() {
                        let attr = attr.map_err(quick_xml::Error::from)?;
                        let key = local_name(attr.key.as_ref());
                        let value = attr
                            .decode_and_unescape_value(reader.decoder())
                            .map_err(quick_xml::Error::from)?;
                        attributes.push((key, value.into_owned()));
                    }
                    let node = Node {
                        name,
                        ns,
                        attributes,
                        text: String::new(),
                        children: Vec::new(),
                    };
                    push_finished(&mut stack, &mut root, node);
                }
                Event::Text(ref e) => {
                    let text: Cow<str> = e.decode()?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(text.as_ref());
                    }
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| Error::new(ErrorKind::ClientError, "unbalanced XML"))?;
                    push_finished(&mut stack, &mut root, node);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        root.map(|root| Document { root })
            .ok_or_else(|| Error::new(ErrorKind::ClientError, "empty XML document"))
    }
}

fn push_finished(stack: &mut Vec<Node>, root: &mut Option<Node>, node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        *root = Some(node);
    }
}

fn local_name(qualified: &[u8]) -> String {
    let s = String::from_utf8_lossy(qualified);
    match s.find(':') {
        Some(idx) => s[idx + 1..].to_string(),
        None => s.into_owned(),
    }
}
