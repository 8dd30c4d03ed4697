//! Page adapter
//!
//! The renderer and the page-load sequence only touch the host page through
//! the `Page` trait. `MemoryPage` implements it over an in-memory element
//! tree that can be serialized to HTML.

pub mod memory;
pub mod selector;
pub mod skeleton;

pub use memory::MemoryPage;
pub use selector::{Selector, SelectorError};

use std::future::Future;

/// Handle to an element of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Element tree built off-page and inserted in one step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub styles: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    /// Sets an inline style property, replacing an earlier value
    pub fn style(mut self, property: &str, value: &str) -> Self {
        match self.styles.iter_mut().find(|(p, _)| p == property) {
            Some(existing) => existing.1 = value.to_string(),
            None => self.styles.push((property.to_string(), value.to_string())),
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn style_value(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Minimal capabilities of a host page
///
/// Methods take `&self`: a page is shared, mutable state in the same way a
/// browser document is.
pub trait Page {
    /// First element in document order matching `selector`
    fn query(&self, selector: &Selector) -> Option<NodeId>;

    fn next_element_sibling(&self, node: NodeId) -> Option<NodeId>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Detaches `node` and its subtree from the page
    fn remove(&self, node: NodeId);

    /// Inserts `element` right after `reference`.
    ///
    /// Returns `None` when `reference` has no parent to insert into.
    fn insert_after(&self, reference: NodeId, element: Element) -> Option<NodeId>;

    /// Adds a stylesheet to the document head
    fn inject_style(&self, css: &str);

    /// Resolves once an element matching `selector` is attached to the page
    fn wait_for(&self, selector: &Selector) -> impl Future<Output = NodeId> + Send;
}
