//! Per-tag rendering rules.
//!
//! Handlers return `Some(text)` with non-empty text, or `None` when the element
//! intentionally contributes nothing (metadata, or a construct that was
//! warned about and skipped).

use super::{indent_block, make_title, Renderer};
use crate::model::{is_blank, Element, XINCLUDE_TAG};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::LazyLock;

pub type Handler = fn(&mut Renderer<'_>, &Element) -> Result<Option<String>>;

static HANDLERS: LazyLock<HashMap<&'static str, Handler>> = LazyLock::new(|| {
    let table: &[(&str, Handler)] = &[
        // metadata
        ("refentryinfo", discard),
        ("refmeta", discard),
        ("refnamediv", refnamediv),
        ("refsynopsisdiv", refsynopsisdiv),
        ("refname", pure_text),
        ("refpurpose", pure_text),
        ("cmdsynopsis", cmdsynopsis),
        ("arg", arg),
        ("group", group),
        // inline
        ("emphasis", emphasis),
        ("phrase", emphasis),
        ("citetitle", emphasis),
        ("firstterm", firstterm),
        ("acronym", plain),
        ("command", code),
        ("option", code),
        ("literal", code),
        ("filename", code),
        ("varname", code),
        ("constant", code),
        ("function", code),
        ("type", code),
        ("envar", code),
        ("userinput", code),
        ("computeroutput", code),
        ("systemitem", code),
        ("optional", optional),
        ("replaceable", replaceable),
        ("keycap", keycap),
        ("keycombo", keycombo),
        ("citerefentry", citerefentry),
        // links
        ("ulink", ulink),
        ("xref", xref),
        ("link", link),
        // lists
        ("itemizedlist", itemizedlist),
        ("orderedlist", orderedlist),
        ("listitem", listitem),
        ("variablelist", block),
        ("varlistentry", varlistentry),
        ("term", term),
        // sections
        ("refentry", block),
        ("refsection", block),
        ("refsect1", block),
        ("refsect2", block),
        ("refsect3", block),
        ("refsect4", block),
        ("refsect5", block),
        ("sect1", block),
        ("sect2", block),
        ("sect3", block),
        ("sect4", block),
        ("section", block),
        ("title", title),
        ("para", block),
        ("simpara", block),
        ("formalpara", block),
        // admonitions
        ("note", admonition),
        ("important", admonition),
        ("warning", admonition),
        ("tip", admonition),
        ("caution", admonition),
        // literal blocks
        ("programlisting", literal_block),
        ("screen", literal_block),
        ("synopsis", literal_block),
        // media
        ("mediaobject", block),
        ("imageobject", imageobject),
        ("imagedata", imagedata),
        ("inlinemediaobject", inlinemediaobject),
        ("videoobject", videoobject),
        ("videodata", videodata),
        // bibliography
        ("author", author),
        ("date", date),
    ];
    table.iter().copied().collect()
});

/// Handler registered for `tag`, if any.
pub fn lookup(tag: &str) -> Option<Handler> {
    HANDLERS.get(tag).copied()
}

/// Children a list item (or definition) may contain.
const BLOCK_TAGS: &[&str] = &[
    "para",
    "simpara",
    "formalpara",
    "itemizedlist",
    "orderedlist",
    "variablelist",
    "programlisting",
    "screen",
    "synopsis",
    "note",
    "important",
    "warning",
    "tip",
    "caution",
    "mediaobject",
    XINCLUDE_TAG,
];

// -- metadata -----------------------------------------------------------------

fn discard(_: &mut Renderer<'_>, _: &Element) -> Result<Option<String>> {
    Ok(None)
}

fn refnamediv(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let names = r.join_children(el, " — ")?;
    Ok(Some(format!("{}\n\n{}", make_title("Name", 2), names)))
}

fn refsynopsisdiv(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let synopsis = r.join_children(el, " ")?;
    Ok(Some(format!("{}\n\n{}", make_title("Synopsis", 2), synopsis)))
}

fn pure_text(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.has_only_text(el);
    let text = r.text(&el.text).trim().to_string();
    Ok((!text.is_empty()).then_some(text))
}

fn cmdsynopsis(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(r.join_children(el, " ")?))
}

fn arg(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let text = r.concat(el)?.trim().to_string();
    Ok(wrap_choice(r, el, text))
}

fn group(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let text = r.join_children(el, " | ")?;
    Ok(wrap_choice(r, el, text))
}

/// Wrap synopsis content according to its `choice` attribute.
fn wrap_choice(r: &mut Renderer<'_>, el: &Element, text: String) -> Option<String> {
    match el.get("choice") {
        Some("opt") => {
            let repeat = if el.get("rep") == Some("repeat") { "..." } else { "" };
            Some(format!("[{text}{repeat}]"))
        }
        Some("req") => Some(format!("{{{text}}}")),
        Some("plain") => (!text.is_empty()).then_some(text),
        other => {
            r.warn(format!(
                "skipping {} with choice of: {}",
                el.tag,
                other.unwrap_or("None")
            ));
            None
        }
    }
}

// -- inline -------------------------------------------------------------------

fn emphasis(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(format!("*{}*", r.concat(el)?.trim())))
}

fn code(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(format!("``{}``", r.concat(el)?.trim())))
}

fn plain(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(r.concat(el)?))
}

fn firstterm(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.has_only_text(el);
    Ok(Some(format!(":dfn:`{}`", r.text(&el.text).trim())))
}

fn optional(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(format!("[{}]", r.concat(el)?.trim())))
}

fn replaceable(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(format!("<{}>", r.concat(el)?.trim())))
}

fn keycap(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(format!(":kbd:`{}`", r.concat(el)?.trim())))
}

fn keycombo(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(r.join_children(el, "+")?))
}

/// `<citerefentry>` → `:manpage:` role, e.g. ``:manpage:`systemd(1)` ``.
fn citerefentry(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let part = |tag: &str| el.children.iter().find(|c| !c.is_comment && c.tag == tag);
    match (part("refentrytitle"), part("manvolnum")) {
        (Some(title), Some(volume)) => {
            let title = title.text.trim();
            let volume = volume.text.trim();
            Ok(Some(format!(":manpage:`{title}({volume})`")))
        }
        _ => Ok(Some(r.concat(el)?)),
    }
}

// -- links --------------------------------------------------------------------

fn ulink(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let url = el.get("url").unwrap_or_default();
    let text = r.concat(el)?.trim().to_string();
    let rendered = if text.starts_with(".. image::") {
        format!("{text}\n   :target: {url}\n\n")
    } else if text == url {
        text
    } else if text.is_empty() {
        format!("`<{url}>`_")
    } else {
        format!("`{text} <{url}>`_")
    };
    Ok(Some(rendered))
}

fn xref(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.has_no_text(el);
    let Some(id) = el.get("linkend") else {
        r.warn(format!("{} has no linkend", r.path_string()));
        return Ok(None);
    };
    if r.linked_ids.contains(id) {
        Ok(Some(format!(":ref:`{id}`")))
    } else {
        Ok(Some(format!(":ref:`{id} <{id}>`")))
    }
}

fn link(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let text = r.concat(el)?.trim().to_string();
    match el.get("linkend") {
        Some(id) if text.is_empty() => Ok(Some(format!("`{id}`_"))),
        Some(id) => Ok(Some(format!(":ref:`{text} <{id}>`"))),
        None => Ok((!text.is_empty()).then_some(text)),
    }
}

// -- lists --------------------------------------------------------------------

fn itemizedlist(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    list(r, el, |_| "* ".to_string())
}

fn orderedlist(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    list(r, el, |n| format!("{n}. "))
}

/// One marked, indented block per `listitem`, after a blank line.
fn list(r: &mut Renderer<'_>, el: &Element, marker: impl Fn(usize) -> String) -> Result<Option<String>> {
    r.has_no_text(el);
    let mut items = Vec::new();
    let mut count = 0;
    for child in &el.children {
        if child.is_comment {
            let comment = r.convert(child)?;
            if !comment.is_empty() {
                items.push(comment);
            }
            continue;
        }
        if child.tag != "listitem" {
            r.warn(format!("{}/{} skipped.", r.path_string(), child.tag));
            continue;
        }
        count += 1;
        let prefix = marker(count);
        let body = r.convert(child)?;
        items.push(indent_block(&body, prefix.len(), Some(prefix.as_str()), false));
    }
    Ok(Some(format!("\n\n{}", items.join("\n"))))
}

fn listitem(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.supports_only(el, BLOCK_TAGS);
    let body = r.concat_where(el, |c| c.is_comment || BLOCK_TAGS.contains(&c.tag.as_str()))?;
    Ok(Some(body))
}

/// Definition-list entry: the terms on one line, the item indented below.
fn varlistentry(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.supports_only(el, &["term", "listitem"]);
    let mut terms = Vec::new();
    let mut definition = String::new();
    for child in &el.children {
        if child.is_comment {
            definition.push_str(&r.convert(child)?);
            continue;
        }
        match child.tag.as_str() {
            "term" => terms.push(r.convert(child)?),
            "listitem" => definition.push_str(&r.convert(child)?),
            _ => {}
        }
    }
    let mut s = format!("\n\n{}", terms.join(", "));
    let definition = indent_block(&definition, 4, None, false);
    if !definition.is_empty() {
        s.push('\n');
        s.push_str(&definition);
    }
    Ok(Some(s))
}

fn term(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(r.concat(el)?.trim().to_string()))
}

// -- blocks -------------------------------------------------------------------

fn block(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    Ok(Some(r.block(el)?))
}

fn title(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let text = r.concat(el)?.trim().to_string();
    Ok(Some(make_title(&text, r.level())))
}

fn admonition(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let mut body = String::new();
    if let Some(heading) = el.children.iter().find(|c| !c.is_comment && c.tag == "title") {
        body.push_str(&format!("**{}**\n\n", r.concat(heading)?.trim()));
    }
    body.push_str(&r.concat_where(el, |c| c.is_comment || c.tag != "title")?);
    let mut s = format!("\n\n.. {}::\n\n{}", el.tag, indent_block(&body, 3, None, false));
    r.flush_buffer(&mut s);
    Ok(Some(s))
}

/// Preformatted content as a `::` literal block, indentation kept.
///
/// A listing pulled in from another file becomes an include placeholder for
/// the documentation build instead.
fn literal_block(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    if let Some(include) = el.iter().find(|c| c.tag == XINCLUDE_TAG) {
        let Some(href) = include.get("href") else {
            r.warn(format!("include without href at {}/include", r.path_string()));
            return Ok(None);
        };
        let target = match include.get("xpointer") {
            Some(xpointer) => format!("{href}#{xpointer}"),
            None => href.to_string(),
        };
        if !is_blank(&el.text) || el.children.iter().any(|c| !is_blank(&c.tail)) {
            r.warn(format!("skipping text of <{}> around include", r.path_string()));
        }
        return Ok(Some(format!("\n\n{{include=\"{target}\"}}\n\n")));
    }
    let body = r.concat(el)?;
    Ok(Some(format!("\n\n::\n\n{}\n\n", indent_block(&body, 2, None, false))))
}

// -- media --------------------------------------------------------------------

fn imageobject(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let body = r.concat(el)?;
    Ok(Some(indent_block(&body, 3, Some(".. image:: "), false)))
}

fn imagedata(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.has_no_text(el);
    match el.get("fileref") {
        Some(fileref) => Ok(Some(fileref.to_string())),
        None => {
            r.warn(format!("{} has no fileref", r.path_string()));
            Ok(None)
        }
    }
}

/// Inline images become substitution references; the definition follows the
/// enclosing block.
fn inlinemediaobject(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let fileref = el
        .iter()
        .find(|c| !c.is_comment && c.tag == "imagedata")
        .and_then(|c| c.get("fileref"));
    let Some(fileref) = fileref else {
        r.warn(format!("{} has no image", r.path_string()));
        return Ok(None);
    };
    let name = r.image_substitution(fileref);
    Ok(Some(format!("|{name}|")))
}

fn videoobject(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    let body = r.concat(el)?;
    Ok(Some(format!(
        "\n\n.. raw:: html\n\n{}",
        indent_block(&body, 3, None, false)
    )))
}

fn videodata(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.has_no_text(el);
    let Some(src) = el.get("fileref") else {
        r.warn(format!("{} has no fileref", r.path_string()));
        return Ok(None);
    };
    Ok(Some(format!(
        "<video src=\"{src}\" controls>\n  Your browser does not support the <code>video</code> element.\n</video>"
    )))
}

// -- bibliography -------------------------------------------------------------

fn author(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.has_only_text(el);
    Ok(Some(format!("\n\n.. _author:\n\n**{}**", r.text(&el.text).trim())))
}

fn date(r: &mut Renderer<'_>, el: &Element) -> Result<Option<String>> {
    r.has_only_text(el);
    Ok(Some(format!("\n\n.. _date:\n\n{}", r.text(&el.text).trim())))
}
