//! Splitting a reference entry into its metadata and content halves, and
//! listing the files it includes.

use crate::model::{Element, XINCLUDE_TAG};
use anyhow::{anyhow, bail, Result};
use std::collections::BTreeSet;

/// Root children that carry man-page metadata rather than content.
const METADATA_TAGS: &[&str] = &["refentryinfo", "refmeta", "refnamediv", "refsynopsisdiv"];

/// Root children that carry the page content.
const CONTENT_TAG: &str = "refsect1";

/// Which part of a document to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    All,
    Meta,
    Content,
}

impl Part {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "all" => Ok(Part::All),
            "meta" => Ok(Part::Meta),
            "content" => Ok(Part::Content),
            _ => Err(anyhow!("unknown part: {}. Use all, meta, or content", name)),
        }
    }
}

/// Keep only the requested part of the document's top-level children.
///
/// Splitting requires at least one `refsect1`; a page without content has
/// nothing to split.
pub fn select(root: &mut Element, part: Part) -> Result<()> {
    if part == Part::All {
        return Ok(());
    }
    if !root.has_child(CONTENT_TAG) {
        bail!("<{}> has no {} content", root.tag, CONTENT_TAG);
    }
    match part {
        Part::Meta => remove_children(root, |tag| tag == CONTENT_TAG),
        Part::Content => remove_children(root, |tag| METADATA_TAGS.contains(&tag)),
        Part::All => {}
    }
    Ok(())
}

/// Remove matching children, moving their tails onto what precedes them.
fn remove_children(root: &mut Element, remove: impl Fn(&str) -> bool) {
    let children = std::mem::take(&mut root.children);
    for child in children {
        if child.is_comment || !remove(&child.tag) {
            root.children.push(child);
            continue;
        }
        match root.children.last_mut() {
            Some(prev) => prev.tail.push_str(&child.tail),
            None => root.text.push_str(&child.tail),
        }
    }
}

/// Every include target in the document, `href#xpointer` when a fragment is
/// selected; sorted and de-duplicated.
pub fn includes(root: &Element) -> BTreeSet<String> {
    root.iter()
        .filter(|el| !el.is_comment && el.tag == XINCLUDE_TAG)
        .filter_map(|el| {
            let href = el.get("href")?;
            Some(match el.get("xpointer") {
                Some(xpointer) => format!("{href}#{xpointer}"),
                None => href.to_string(),
            })
        })
        .collect()
}
