//! Lenient HTML fragment parsing for `html`/`insert` change payloads.
//!
//! This is deliberately a fragment-scale parser, not a full HTML5 tree
//! builder: unknown close tags are ignored, unclosed elements are
//! closed implicitly, comments and doctypes are dropped, and a small set of
//! named entities is decoded. Input is expected to have been sanitized by
//! an upstream layer before it reaches the engine.

use crate::dom::document::{Document, RAW_TEXT_ELEMENTS, VOID_ELEMENTS};
use crate::dom::node::NodeId;

/// Parse a fragment into detached nodes, returning the top-level ids in order
pub(crate) fn parse_fragment(doc: &mut Document, input: &str) -> Vec<NodeId> {
    Parser { doc, input: input.as_bytes(), pos: 0 }.run()
}

struct Parser<'a> {
    doc: &'a mut Document,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Vec<NodeId> {
        let mut roots = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();

        while self.pos < self.input.len() {
            if self.peek() == Some(b'<') {
                if self.starts_with("<!--") {
                    self.skip_until("-->");
                } else if self.starts_with("</") {
                    self.pos += 2;
                    let name = self.read_tag_name();
                    self.skip_until(">");
                    close_tag(self.doc, &mut stack, &name);
                } else if self.starts_with("<!") {
                    self.skip_until(">");
                } else if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
                    self.pos += 1;
                    let element = self.read_open_tag();
                    self.attach(&mut roots, &stack, element.node);
                    if element.raw_text {
                        let text = self.read_raw_text(&element.name);
                        if !text.is_empty() {
                            let text_node = self.doc.create_text(text);
                            let _ = self.doc.append_child(element.node, text_node);
                        }
                    } else if element.open {
                        stack.push(element.node);
                    }
                } else {
                    // stray '<' becomes text
                    let text = self.read_text_run(true);
                    self.emit_text(&mut roots, &stack, text);
                }
            } else {
                let text = self.read_text_run(false);
                self.emit_text(&mut roots, &stack, text);
            }
        }

        roots
    }

    fn attach(&mut self, roots: &mut Vec<NodeId>, stack: &[NodeId], node: NodeId) {
        match stack.last() {
            Some(parent) => {
                let _ = self.doc.append_child(*parent, node);
            }
            None => roots.push(node),
        }
    }

    fn emit_text(&mut self, roots: &mut Vec<NodeId>, stack: &[NodeId], text: String) {
        if text.trim().is_empty() {
            return;
        }
        let node = self.doc.create_text(decode_entities(&text));
        self.attach(roots, stack, node);
    }

    fn read_open_tag(&mut self) -> OpenTag {
        let name = self.read_tag_name();
        let node = self.doc.create_element(&name);

        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                }
                _ => {
                    let (attr, value) = self.read_attribute();
                    if !attr.is_empty() {
                        if let Some(element) = self.doc.element_mut(node) {
                            element.set_attribute(attr, value);
                        }
                    }
                }
            }
        }

        let lower = name.to_ascii_lowercase();
        let is_void = VOID_ELEMENTS.contains(&lower.as_str());
        // self-closing syntax is tolerated on any tag
        let self_closed = self.input.get(self.pos.saturating_sub(2)) == Some(&b'/');
        OpenTag {
            node,
            raw_text: RAW_TEXT_ELEMENTS.contains(&lower.as_str()),
            open: !is_void && !self_closed,
            name: lower,
        }
    }

    fn read_attribute(&mut self) -> (String, String) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_ascii_whitespace() && c != b'=' && c != b'>' && c != b'/')
        {
            self.pos += 1;
        }
        let name = self.slice(start, self.pos).to_ascii_lowercase();
        self.skip_whitespace();

        if self.peek() != Some(b'=') {
            return (name, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                let value = self.slice(start, self.pos).to_string();
                self.pos += 1;
                value
            }
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(|c| !c.is_ascii_whitespace() && c != b'>') {
                    self.pos += 1;
                }
                self.slice(start, self.pos).to_string()
            }
        };

        (name, decode_entities(&value))
    }

    fn read_tag_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b':')
        {
            self.pos += 1;
        }
        self.slice(start, self.pos).to_ascii_lowercase()
    }

    fn read_text_run(&mut self, include_leading: bool) -> String {
        let start = self.pos;
        if include_leading {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c != b'<') {
            self.pos += 1;
        }
        self.slice(start, self.pos).to_string()
    }

    fn read_raw_text(&mut self, tag: &str) -> String {
        let close = format!("</{}", tag);
        let remaining = self.remaining();
        let (text, end, found) = match remaining.to_ascii_lowercase().find(&close) {
            Some(end) => (remaining[..end].to_string(), end, true),
            None => (remaining.to_string(), remaining.len(), false),
        };
        self.pos += end;
        if found {
            self.pos += close.len();
            self.skip_until(">");
        }
        text
    }

    fn skip_until(&mut self, marker: &str) {
        match self.remaining().find(marker) {
            Some(offset) => self.pos += offset + marker.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.remaining().starts_with(prefix)
    }

    fn remaining(&self) -> &str {
        std::str::from_utf8(&self.input[self.pos..]).unwrap_or("")
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        std::str::from_utf8(&self.input[start..end]).unwrap_or("")
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }
}

struct OpenTag {
    node: NodeId,
    name: String,
    raw_text: bool,
    open: bool,
}

fn close_tag(doc: &Document, stack: &mut Vec<NodeId>, name: &str) {
    if name.is_empty() {
        return;
    }
    let position = stack
        .iter()
        .rposition(|id| doc.tag_name(*id) == Some(name));
    if let Some(position) = position {
        stack.truncate(position);
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
