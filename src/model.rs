//! Document tree for parsed DocBook: an owned element tree with text and tails.

use std::collections::HashMap;

/// Tag of an XInclude `<xi:include>` element in Clark notation.
pub const XINCLUDE_TAG: &str = "{http://www.w3.org/2001/XInclude}include";

/// A single node of the document tree.
///
/// Text before the first child lives in `text`; text following a child lives
/// in that child's `tail` but belongs to the parent, the same split an XML
/// infoset view uses.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Element {
    /// Local name, or `{uri}local` for elements outside the DocBook vocabulary.
    pub tag: String,
    pub attrs: HashMap<String, String>,
    pub text: String,
    pub children: Vec<Element>,
    pub tail: String,
    /// Comment node; its content is in `text`.
    pub is_comment: bool,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_comment: true,
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Depth-first, pre-order walk over this element and all descendants.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn has_child(&self, tag: &str) -> bool {
        self.children.iter().any(|c| !c.is_comment && c.tag == tag)
    }

    /// Name used in diagnostics: `<tag>` or `Comment`.
    pub fn what(&self) -> String {
        if self.is_comment {
            "Comment".to_string()
        } else {
            format!("<{}>", self.tag)
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        self.stack.extend(el.children.iter().rev());
        Some(el)
    }
}

/// True for empty or whitespace-only text.
pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        let mut root = Element::new("refentry");
        let mut sect = Element::new("refsect1");
        sect.children.push(Element::new("title"));
        sect.children.push(Element::new("para"));
        root.children.push(sect);
        root.children.push(Element::new("refsect1"));
        root
    }

    #[test]
    fn iter_is_preorder() {
        let root = sample();
        let tags: Vec<&str> = root.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["refentry", "refsect1", "title", "para", "refsect1"]);
    }

    #[test]
    fn has_child_ignores_comments() {
        let mut el = Element::new("para");
        let mut c = Element::comment("x");
        c.tag = "emphasis".to_string();
        el.children.push(c);
        assert!(!el.has_child("emphasis"));
    }

    #[test]
    fn blank_text() {
        assert!(is_blank(""));
        assert!(is_blank(" \n\t"));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn what_names_element_or_comment() {
        assert_eq!(Element::new("para").what(), "<para>");
        assert_eq!(Element::comment("x").what(), "Comment");
    }
}
