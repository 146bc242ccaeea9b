//! HTML sanitization for markup that came from outside the program.

use crate::document::{Document, NodeId, Tree};
use crate::error::Result;

const DEFAULT_DROPPED: &[&str] = &["script", "style", "iframe", "object", "embed", "noscript"];

/// Policy applied by [`sanitize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeConfig {
    /// Elements removed together with their content.
    pub drop_elements: Vec<String>,
    /// When set, elements outside this list are unwrapped (children kept).
    pub allow_elements: Option<Vec<String>>,
    /// Attributes always stripped, in addition to `on*` handlers.
    pub drop_attributes: Vec<String>,
    pub allow_data_attributes: bool,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            drop_elements: DEFAULT_DROPPED.iter().map(|t| t.to_string()).collect(),
            allow_elements: None,
            drop_attributes: Vec::new(),
            allow_data_attributes: true,
        }
    }
}

impl SanitizeConfig {
    pub fn allow_elements<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_elements = Some(
            tags.into_iter()
                .map(|t| t.into().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    pub fn drop_element(mut self, tag: impl Into<String>) -> Self {
        self.drop_elements.push(tag.into().to_ascii_lowercase());
        self
    }

    pub fn drop_attribute(mut self, name: impl Into<String>) -> Self {
        self.drop_attributes.push(name.into().to_ascii_lowercase());
        self
    }

    pub fn allow_data_attributes(mut self, allow: bool) -> Self {
        self.allow_data_attributes = allow;
        self
    }
}

fn is_url_attr(name: &str) -> bool {
    matches!(name, "href" | "src" | "xlink:href" | "action" | "formaction")
}

fn is_javascript_scheme(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    normalized.starts_with("javascript:")
}

/// Returns a safe rendition of `html` under `config`.
pub fn sanitize(html: &str, config: &SanitizeConfig) -> Result<String> {
    let doc = Document::parse(html)?;
    doc.with_tree_mut(|tree| {
        let root = tree.root;
        for id in tree.descendants(root) {
            clean(tree, id, config)?;
        }
        Ok::<_, crate::error::DomError>(())
    })?;
    Ok(doc.inner_html())
}

fn clean(tree: &mut Tree, id: NodeId, config: &SanitizeConfig) -> Result<()> {
    // Dropped ancestors already freed this node.
    if !tree.nodes.contains_key(id) {
        return Ok(());
    }
    let tag = tree.element(id)?.tag.clone();

    if config.drop_elements.contains(&tag) {
        tree.detach(id)?;
        tree.free(id);
        return Ok(());
    }

    if config
        .allow_elements
        .as_ref()
        .is_some_and(|allowed| !allowed.contains(&tag))
    {
        return unwrap(tree, id);
    }

    let el = tree.element_mut(id)?;
    el.attrs.retain(|attr| {
        let name = attr.name.as_str();
        if name.starts_with("on") || config.drop_attributes.iter().any(|d| d == name) {
            return false;
        }
        if !config.allow_data_attributes && name.starts_with("data-") {
            return false;
        }
        !(is_url_attr(name) && is_javascript_scheme(&attr.value))
    });
    Ok(())
}

/// Replaces `id` with its children.
fn unwrap(tree: &mut Tree, id: NodeId) -> Result<()> {
    let Some(parent) = tree.node(id)?.parent else {
        return Ok(());
    };
    let mut index = tree.detach(id)?;
    let children = tree.node(id)?.children.clone();
    for child in children {
        tree.insert_child(parent, child, index)?;
        index = index.map(|i| i + 1);
    }
    tree.free(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_handlers_and_javascript_urls() {
        let out = sanitize(
            "<p onclick=\"x()\">hi<script>alert(1)</script><a href=\"javascript:bad()\" title=\"t\">l</a></p>",
            &SanitizeConfig::default(),
        )
        .expect("sanitize");
        assert_eq!(out, "<p>hi<a title=\"t\">l</a></p>");
    }

    #[test]
    fn unwraps_elements_outside_allow_list() {
        let config = SanitizeConfig::default().allow_elements(["p", "b"]);
        let out = sanitize("<p><span>a<b>b</b></span></p>", &config).expect("sanitize");
        assert_eq!(out, "<p>a<b>b</b></p>");
    }
}
