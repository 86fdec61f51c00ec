//! DocBook → reStructuredText renderer.
//!
//! A recursive depth-first walk over the [`Element`] tree. Each known tag has a
//! handler in [`handlers`]; unknown tags degrade to the concatenation of their
//! children. All per-document state lives in [`Renderer`], so two documents
//! never share warnings, labels or pending substitutions.

mod handlers;
mod text;

use crate::model::{is_blank, Element, XINCLUDE_TAG};
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Tags whose content is preformatted: no indent stripping, no escaping.
const VERBATIM_TAGS: &[&str] = &["programlisting", "screen", "synopsis"];

/// Tags whose `linkend` attribute names a link target.
const LINK_TAGS: &[&str] = &["xref", "link"];

/// Include target whose fragments are version substitutions.
const VERSION_INFO: &str = "version-info.xml";

/// Options controlling a conversion.
#[derive(Debug, Default, Clone)]
pub struct RenderOptions {
    /// Drop XML comments instead of converting them to reST comments.
    pub remove_comments: bool,
}

/// Result of rendering one document.
#[derive(Debug)]
pub struct Rendered {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Render a whole document.
///
/// Fails only on renderer defects (a handler producing no output); every
/// unsupported construct is reported in [`Rendered::warnings`] instead.
pub fn render_document(root: &Element, options: &RenderOptions) -> Result<Rendered> {
    let mut renderer = Renderer::new(options, collect_link_targets(root));
    let mut output = renderer.convert(root)?;
    // The document itself is the outermost block.
    renderer.flush_buffer(&mut output);
    Ok(Rendered {
        text: text::finish(&output),
        warnings: renderer.warnings,
    })
}

/// Collect every `linkend` referenced by a cross-reference in the tree.
pub fn collect_link_targets(root: &Element) -> HashSet<String> {
    root.iter()
        .filter(|el| !el.is_comment && LINK_TAGS.contains(&el.tag.as_str()))
        .filter_map(|el| el.get("linkend"))
        .map(str::to_string)
        .collect()
}

/// Per-document rendering state.
pub struct Renderer<'a> {
    options: &'a RenderOptions,
    /// Ids referenced by some `xref`/`link`.
    linked_ids: HashSet<String>,
    /// Substitution definitions waiting for the end of the enclosing block.
    buffer: String,
    /// Unknown tags already warned about.
    not_handled: HashSet<String>,
    /// Image substitution name per image file.
    images: HashMap<String, String>,
    /// Tags of the elements being rendered, outermost first.
    path: Vec<String>,
    /// Nesting depth of preformatted elements.
    verbatim: usize,
    warnings: Vec<String>,
}

impl<'a> Renderer<'a> {
    pub fn new(options: &'a RenderOptions, linked_ids: HashSet<String>) -> Self {
        Self {
            options,
            linked_ids,
            buffer: String::new(),
            not_handled: HashSet::new(),
            images: HashMap::new(),
            path: Vec::new(),
            verbatim: 0,
            warnings: Vec::new(),
        }
    }

    /// Convert one element (or comment) to reST.
    pub fn convert(&mut self, el: &Element) -> Result<String> {
        if el.is_comment {
            if self.options.remove_comments || is_blank(&el.text) {
                return Ok(String::new());
            }
            let body = self.text(&el.text);
            return Ok(indent_block(&body, 12, Some(".. COMMENT: "), true) + "\n\n");
        }

        let verbatim = VERBATIM_TAGS.contains(&el.tag.as_str());
        self.path.push(el.tag.clone());
        if verbatim {
            self.verbatim += 1;
        }
        let result = self.dispatch(el);
        if verbatim {
            self.verbatim -= 1;
        }
        self.path.pop();
        result
    }

    fn dispatch(&mut self, el: &Element) -> Result<String> {
        if let Some(handler) = handlers::lookup(&el.tag) {
            return match handler(self, el)? {
                Some(s) if s.is_empty() => {
                    bail!("<{}> rendered to nothing at {}", el.tag, self.path_string())
                }
                Some(s) => Ok(s),
                None => Ok(String::new()),
            };
        }
        if el.tag == XINCLUDE_TAG {
            return Ok(self.include(el));
        }
        if self.not_handled.insert(el.tag.clone()) {
            self.warn(format!("Don't know how to handle <{}>", el.tag));
        }
        self.concat(el)
    }

    /// Leading text, then each child followed by its tail.
    pub fn concat(&mut self, el: &Element) -> Result<String> {
        self.concat_where(el, |_| true)
    }

    /// Like [`concat`](Self::concat), but renders only the children accepted by
    /// `keep`. Tails of skipped children are kept.
    fn concat_where(&mut self, el: &Element, keep: impl Fn(&Element) -> bool) -> Result<String> {
        let mut s = self.text(&el.text);
        for child in &el.children {
            if keep(child) {
                let rendered = self.convert(child)?;
                s.push_str(&rendered);
            }
            self.push_tail(&mut s, &child.tail);
        }
        Ok(s)
    }

    fn push_tail(&self, s: &mut String, tail: &str) {
        if tail.is_empty() {
            return;
        }
        if self.verbatim == 0 {
            // Escaping strips the tail's indentation; keep one separator so
            // words on either side do not merge.
            if let Some(first @ (' ' | '\t')) = tail.chars().next() {
                if s.chars().last().is_some_and(|c| !c.is_whitespace()) {
                    s.push(first);
                }
            }
        }
        s.push_str(&self.text(tail));
    }

    /// Children joined with `sep`; text and tails are not allowed.
    fn join_children(&mut self, el: &Element, sep: &str) -> Result<String> {
        self.has_no_text(el);
        let mut parts = Vec::new();
        for child in &el.children {
            let rendered = self.convert(child)?;
            if !rendered.is_empty() {
                parts.push(rendered);
            }
        }
        Ok(parts.join(sep))
    }

    /// Blank-line separated block; pending substitutions follow it.
    fn block(&mut self, el: &Element) -> Result<String> {
        let mut body = self.concat(el)?;
        if self.verbatim == 0 && !is_blank(&el.text) {
            body = text::escape_block_start(&body);
        }
        let mut s = format!("\n\n{body}");
        self.flush_buffer(&mut s);
        Ok(s)
    }

    fn flush_buffer(&mut self, s: &mut String) {
        if !self.buffer.is_empty() {
            s.push_str("\n\n");
            s.push_str(&std::mem::take(&mut self.buffer));
        }
    }

    /// Substitution name for an inline image, named after the file stem.
    ///
    /// The first use of each file queues its definition. A different file
    /// with an already taken stem gets a numbered name (`logo-2`).
    fn image_substitution(&mut self, fileref: &str) -> String {
        if let Some(name) = self.images.get(fileref) {
            return name.clone();
        }
        let stem = Path::new(fileref)
            .file_stem()
            .map_or_else(|| fileref.to_string(), |s| s.to_string_lossy().into_owned());
        let taken = |name: &str| self.images.values().any(|n| n == name);
        let mut name = stem.clone();
        let mut n = 1;
        while taken(&name) {
            n += 1;
            name = format!("{stem}-{n}");
        }

        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(&format!(".. |{name}| image:: {fileref}"));
        self.images.insert(fileref.to_string(), name.clone());
        name
    }

    /// Placeholder for an XInclude, re-resolved by the documentation build.
    fn include(&mut self, el: &Element) -> String {
        let Some(href) = el.get("href") else {
            self.warn(format!("include without href at {}/include", self.path_string()));
            return String::new();
        };
        match el.get("xpointer") {
            Some(xpointer) if href == VERSION_INFO => format!("|{xpointer}|"),
            Some(xpointer) => format!("{{include=\"{href}#{xpointer}\"}}"),
            None => format!("\n\n.. include:: {href}\n\n"),
        }
    }

    fn text(&self, raw: &str) -> String {
        if self.verbatim > 0 {
            raw.to_string()
        } else {
            text::escape(raw)
        }
    }

    /// Number of ancestors of the element being rendered.
    fn level(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    fn path_string(&self) -> String {
        self.path.join("/")
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Warn about children whose tag is not in `tags`.
    fn supports_only(&mut self, el: &Element, tags: &[&str]) {
        for child in &el.children {
            if !child.is_comment && !tags.contains(&child.tag.as_str()) {
                self.warn(format!("{}/{} skipped.", self.path_string(), child.tag));
            }
        }
    }

    /// Warn if the element has child elements.
    fn has_only_text(&mut self, el: &Element) {
        if !el.children.is_empty() {
            let children: Vec<String> = el.children.iter().map(Element::what).collect();
            self.warn(format!(
                "children of {} are skipped: {}",
                self.path_string(),
                children.join(", ")
            ));
        }
    }

    /// Warn about any non-blank text directly inside the element.
    fn has_no_text(&mut self, el: &Element) {
        if !is_blank(&el.text) {
            self.warn(format!("skipping text of <{}>: {}", self.path_string(), el.text));
        }
        for child in &el.children {
            if !is_blank(&child.tail) {
                let what = if child.is_comment { "comment" } else { child.tag.as_str() };
                self.warn(format!(
                    "skipping tail of <{}/{}>: {}",
                    self.path_string(),
                    what,
                    child.tail
                ));
            }
        }
    }
}

/// Indent the non-blank lines of `text` by `indent` spaces.
///
/// Leading and trailing blank lines are dropped and interior runs of blank
/// lines become one. With `first_line`, the first line's indentation is
/// replaced by that marker. With `blank_line`, the block starts with one
/// blank line.
pub fn indent_block(text: &str, indent: usize, first_line: Option<&str>, blank_line: bool) -> String {
    let pad = " ".repeat(indent);
    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;
    for line in text.lines() {
        if is_blank(line) {
            pending_blank = !lines.is_empty();
            continue;
        }
        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        lines.push(format!("{pad}{line}"));
    }

    if let Some(marker) = first_line {
        match lines.first_mut() {
            Some(first) => *first = format!("{marker}{}", &first[indent..]),
            None => lines.push(marker.to_string()),
        }
    }

    let start = if blank_line { "\n\n" } else { "" };
    format!("{start}{}", lines.join("\n"))
}

/// Heading adorned by nesting level: level 1 gets an `=` overline, deeper
/// levels cycle through `# = - ~ ^ .` as underlines.
pub fn make_title(title: &str, level: usize) -> String {
    const UNDERLINES: [char; 6] = ['#', '=', '-', '~', '^', '.'];
    let width = title.chars().count();
    if level <= 1 {
        let rule = "=".repeat(width);
        return format!("\n\n{rule}\n{title}\n{rule}");
    }
    let ch = UNDERLINES[(level - 2).min(UNDERLINES.len() - 1)];
    format!("\n\n{title}\n{}", ch.to_string().repeat(width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn render_with(xml: &str, options: &RenderOptions) -> Rendered {
        render_document(&parser::parse(xml).unwrap(), options).unwrap()
    }

    fn render(xml: &str) -> Rendered {
        render_with(xml, &RenderOptions::default())
    }

    #[test]
    fn indent_block_with_marker() {
        assert_eq!(indent_block("\n\nA\nB", 2, Some("* "), false), "* A\n  B");
    }

    #[test]
    fn indent_block_keeps_one_interior_blank_line() {
        assert_eq!(indent_block("a\n\n\n  \nb\n\n", 3, None, true), "\n\n   a\n\n   b");
    }

    #[test]
    fn indent_block_empty_with_marker() {
        assert_eq!(indent_block("  \n", 2, Some("* "), false), "* ");
    }

    #[test]
    fn title_levels() {
        assert_eq!(make_title("Doc", 1), "\n\n===\nDoc\n===");
        assert_eq!(make_title("Options", 2), "\n\nOptions\n#######");
        assert_eq!(make_title("Sub", 3), "\n\nSub\n===");
        assert_eq!(make_title("Deep", 7), "\n\nDeep\n....");
        assert_eq!(make_title("Deeper", 12), "\n\nDeeper\n......");
    }

    #[test]
    fn title_width_counts_characters() {
        assert_eq!(make_title("Ünï", 3), "\n\nÜnï\n===");
    }

    #[test]
    fn link_targets_come_from_xref_and_link() {
        let root = parser::parse(
            r#"<refentry><para><xref linkend="a"/><link linkend="b">B</link><ulink url="c"/></para></refentry>"#,
        )
        .unwrap();
        let ids = collect_link_targets(&root);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a") && ids.contains("b"));
    }

    #[test]
    fn unknown_tag_warns_once() {
        let out = render("<para><foo>a</foo> <foo>b</foo></para>");
        assert_eq!(out.text, "a b\n");
        assert_eq!(out.warnings, vec!["Don't know how to handle <foo>".to_string()]);
    }

    #[test]
    fn tail_keeps_a_separating_space() {
        let out = render("<para>Use <command>ls</command>\n   to list.</para>");
        assert_eq!(out.text, "Use ``ls``\nto list.\n");
        let out = render("<para>Use <command>ls</command> to list.</para>");
        assert_eq!(out.text, "Use ``ls`` to list.\n");
    }

    #[test]
    fn line_breaks_between_elements_separate_them() {
        let out = render("<para>Run <command>ls</command>\n<option>-a</option>.</para>");
        assert_eq!(out.text, "Run ``ls``\n``-a``.\n");
        let out = render("<para>See\n<command>ls</command> now.</para>");
        assert_eq!(out.text, "See\n``ls`` now.\n");
    }

    #[test]
    fn comments_become_comment_blocks() {
        let out = render("<para>a<!-- hi\n  there -->b</para>");
        assert_eq!(out.text, "a\n\n.. COMMENT: hi\n            there\n\nb\n");
    }

    #[test]
    fn comments_can_be_removed() {
        let options = RenderOptions { remove_comments: true };
        let out = render_with("<para>a<!-- hi -->b</para>", &options);
        assert_eq!(out.text, "ab\n");
    }

    #[test]
    fn blank_comments_are_dropped() {
        let out = render("<para>a<!--   -->b</para>");
        assert_eq!(out.text, "ab\n");
    }

    #[test]
    fn version_include_becomes_substitution() {
        let out = render(
            r#"<para xmlns:xi="http://www.w3.org/2001/XInclude">Since <xi:include href="version-info.xml" xpointer="v250"/>.</para>"#,
        );
        assert_eq!(out.text, "Since |v250|.\n");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn other_includes_become_placeholders() {
        let out = render(
            r#"<refsect1 xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include href="standard-options.xml" xpointer="help"/><xi:include href="common.xml"/></refsect1>"#,
        );
        assert_eq!(
            out.text,
            "{include=\"standard-options.xml#help\"}\n\n.. include:: common.xml\n"
        );
    }

    #[test]
    fn sections_are_separated_by_one_blank_line() {
        let out = render(
            "<refentry><refsect1><title>Description</title><para>One.</para>\n\n\n<para>Two.</para></refsect1></refentry>",
        );
        assert_eq!(out.text, "Description\n###########\n\nOne.\n\nTwo.\n");
    }

    #[test]
    fn output_is_normalized() {
        let out = render("<section><title>T</title><para>a   \n</para><para>b</para></section>");
        assert_eq!(out.text, "=\nT\n=\n\na\n\nb\n");
        assert_eq!(text::finish(&out.text), out.text);
    }

    #[test]
    fn handler_without_output_is_a_defect() {
        let root = parser::parse("<itemizedlist><listitem/></itemizedlist>").unwrap();
        let err = render_document(&root, &RenderOptions::default()).unwrap_err();
        assert!(err.to_string().contains("itemizedlist/listitem"), "{err}");
    }

    #[test]
    fn documents_do_not_share_state() {
        let xml = "<para><foo/>x</para>";
        assert_eq!(render(xml).warnings.len(), 1);
        assert_eq!(render(xml).warnings.len(), 1);
    }
}
