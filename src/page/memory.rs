//! In-memory page
//!
//! An arena of element nodes behind a mutex. Every mutation bumps a counter
//! in a `watch` channel, which is what `wait_for` listens to.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use super::selector::{Combinator, Compound, ElementInfo, Selector};
use super::{Element, NodeId, Page};

#[derive(Debug)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    styles: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug)]
struct Document {
    nodes: Vec<Node>,
    head: usize,
    body: usize,
}

const ROOT: usize = 0;

const VOID_ELEMENTS: &[&str] = &["img", "br", "hr", "meta", "link", "input"];

impl Document {
    fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            head: 0,
            body: 0,
        };
        let root = doc.create(Element::new("html"));
        doc.head = doc.create(Element::new("head"));
        doc.body = doc.create(Element::new("body"));
        doc.append(root, doc.head);
        doc.append(root, doc.body);
        doc
    }

    /// Allocates `element` and its subtree without attaching it
    fn create(&mut self, element: Element) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            tag: element.tag,
            classes: element.classes,
            attributes: element.attributes,
            styles: element.styles,
            text: element.text,
            parent: None,
            children: Vec::new(),
        });
        for child in element.children {
            let child_id = self.create(child);
            self.append(id, child_id);
        }
        id
    }

    fn append(&mut self, parent: usize, child: usize) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    fn detach(&mut self, node: usize) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&c| c != node);
        }
    }

    fn insert_after(&mut self, reference: usize, node: usize) -> bool {
        let Some(parent) = self.nodes[reference].parent else {
            return false;
        };
        let index = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == reference)
            .map_or(self.nodes[parent].children.len(), |i| i + 1);
        self.nodes[node].parent = Some(parent);
        self.nodes[parent].children.insert(index, node);
        true
    }

    fn next_sibling(&self, node: usize) -> Option<usize> {
        let parent = self.nodes[node].parent?;
        let siblings = &self.nodes[parent].children;
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn view(&self, node: usize) -> NodeView<'_> {
        NodeView { doc: self, node }
    }

    fn matches(&self, node: usize, selector: &Selector) -> bool {
        let (subject, ancestors) = selector.chain();
        subject.matches(&self.view(node)) && self.matches_ancestors(node, &ancestors)
    }

    fn matches_ancestors(&self, node: usize, rest: &[(Combinator, &Compound)]) -> bool {
        let Some(((combinator, compound), rest)) = rest.split_first() else {
            return true;
        };
        let mut current = self.nodes[node].parent;
        while let Some(ancestor) = current {
            if compound.matches(&self.view(ancestor)) && self.matches_ancestors(ancestor, rest) {
                return true;
            }
            if *combinator == Combinator::Child {
                return false;
            }
            current = self.nodes[ancestor].parent;
        }
        false
    }

    /// Attached nodes in document order
    fn walk(&self) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.iter().rev());
        }
        order
    }

    fn write_html(&self, node: usize, out: &mut String) {
        let n = &self.nodes[node];
        out.push('<');
        out.push_str(&n.tag);
        for (name, value) in &n.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value, true));
        }
        if !n.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&n.classes.join(" "), true));
        }
        if !n.styles.is_empty() {
            let style = n
                .styles
                .iter()
                .map(|(p, v)| format!("{}: {};", p, v))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(out, " style=\"{}\"", escape(&style, true));
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&n.tag.as_str()) {
            return;
        }
        if let Some(text) = &n.text {
            if n.tag == "style" {
                out.push_str(text);
            } else {
                out.push_str(&escape(text, false));
            }
        }
        for &child in &n.children {
            self.write_html(child, out);
        }
        let _ = write!(out, "</{}>", n.tag);
    }
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

struct NodeView<'a> {
    doc: &'a Document,
    node: usize,
}

impl ElementInfo for NodeView<'_> {
    fn tag(&self) -> &str {
        &self.doc.nodes[self.node].tag
    }

    fn id(&self) -> Option<&str> {
        self.doc.nodes[self.node]
            .attributes
            .iter()
            .find(|(n, _)| n == "id")
            .map(|(_, v)| v.as_str())
    }

    fn has_class(&self, class: &str) -> bool {
        self.doc.nodes[self.node].classes.iter().any(|c| c == class)
    }

    fn position(&self) -> usize {
        self.doc.nodes[self.node]
            .parent
            .and_then(|p| {
                self.doc.nodes[p]
                    .children
                    .iter()
                    .position(|&c| c == self.node)
            })
            .map_or(1, |i| i + 1)
    }
}

/// Shared in-memory document
///
/// Clones refer to the same document, so one clone can wait for an element
/// while another inserts it.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    doc: Arc<Mutex<Document>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// Creates an empty `html > head + body` document
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            doc: Arc::new(Mutex::new(Document::new())),
            changes: Arc::new(changes),
        }
    }

    fn doc(&self) -> MutexGuard<'_, Document> {
        // A panic while holding the lock leaves the tree structurally intact.
        self.doc.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let result = f(&mut self.doc());
        self.changes.send_modify(|version| *version += 1);
        result
    }

    pub fn head(&self) -> NodeId {
        NodeId(self.doc().head)
    }

    pub fn body(&self) -> NodeId {
        NodeId(self.doc().body)
    }

    /// Appends `element` as the last child of `parent`
    pub fn append(&self, parent: NodeId, element: Element) -> NodeId {
        self.mutate(|doc| {
            let id = doc.create(element);
            doc.append(parent.0, id);
            NodeId(id)
        })
    }

    /// Every attached element matching `selector`, in document order
    pub fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        let doc = self.doc();
        let found = doc
            .walk()
            .into_iter()
            .filter(|&n| doc.matches(n, selector))
            .map(NodeId)
            .collect();
        found
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.doc().nodes[node.0]
            .children
            .iter()
            .copied()
            .map(NodeId)
            .collect()
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.doc().nodes[node.0].text.clone()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.doc().nodes[node.0]
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn style_value(&self, node: NodeId, property: &str) -> Option<String> {
        self.doc().nodes[node.0]
            .styles
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.clone())
    }

    /// Serializes the whole document
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\n");
        self.doc().write_html(ROOT, &mut out);
        out.push('\n');
        out
    }

    /// Serializes one element and its subtree
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.doc().write_html(node.0, &mut out);
        out
    }
}

impl Page for MemoryPage {
    fn query(&self, selector: &Selector) -> Option<NodeId> {
        let doc = self.doc();
        let found = doc
            .walk()
            .into_iter()
            .find(|&n| doc.matches(n, selector))
            .map(NodeId);
        found
    }

    fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.doc().next_sibling(node.0).map(NodeId)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.doc().view(node.0).has_class(class)
    }

    fn remove(&self, node: NodeId) {
        self.mutate(|doc| doc.detach(node.0));
    }

    fn insert_after(&self, reference: NodeId, element: Element) -> Option<NodeId> {
        self.mutate(|doc| {
            let id = doc.create(element);
            doc.insert_after(reference.0, id).then_some(NodeId(id))
        })
    }

    fn inject_style(&self, css: &str) {
        self.mutate(|doc| {
            let style = doc.create(Element::new("style").attr("type", "text/css").text(css));
            let head = doc.head;
            doc.append(head, style);
        });
    }

    async fn wait_for(&self, selector: &Selector) -> NodeId {
        let mut changes = self.changes.subscribe();
        loop {
            if let Some(node) = self.query(selector) {
                return node;
            }
            // The sender lives as long as `self`, so this only fails if the
            // page is torn down mid-wait.
            if changes.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    fn list_page() -> (MemoryPage, NodeId) {
        let page = MemoryPage::new();
        let list = page.append(page.body(), Element::new("div").id("list"));
        for i in 1..=3 {
            page.append(
                list,
                Element::new("div")
                    .class("item")
                    .text(format!("item {}", i)),
            );
        }
        (page, list)
    }

    #[test]
    fn test_query_child_and_nth_child() {
        let (page, _) = list_page();

        let second = page.query(&sel("#list > div.item:nth-child(2)")).unwrap();
        assert_eq!(page.text(second).as_deref(), Some("item 2"));

        assert!(page.query(&sel("#list > div:nth-child(4)")).is_none());
        assert_eq!(page.query_all(&sel("body div.item")).len(), 3);
    }

    #[test]
    fn test_descendant_match_backtracks() {
        let page = MemoryPage::new();
        let outer = page.append(page.body(), Element::new("section").class("a"));
        let inner = page.append(outer, Element::new("div").class("b"));
        page.append(inner, Element::new("section"));
        let target = page.append(inner, Element::new("span"));

        assert_eq!(page.query(&sel("section.a > div span")), Some(target));
        assert!(page.query(&sel("section.a > span")).is_none());
    }

    #[test]
    fn test_insert_after_and_siblings() {
        let (page, list) = list_page();
        let first = page.children(list)[0];

        let inserted = page
            .insert_after(first, Element::new("p").text("new"))
            .unwrap();

        assert_eq!(page.next_element_sibling(first), Some(inserted));
        assert_eq!(page.children(list).len(), 4);
        // nth-child positions shift with the insert
        let third = page.query(&sel("#list > :nth-child(3)")).unwrap();
        assert_eq!(page.text(third).as_deref(), Some("item 2"));
    }

    #[test]
    fn test_insert_after_detached_reference_fails() {
        let page = MemoryPage::new();
        let node = page.append(page.body(), Element::new("div"));
        page.remove(node);

        assert!(page.insert_after(node, Element::new("p")).is_none());
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let (page, list) = list_page();
        page.remove(list);

        assert!(page.query(&sel(".item")).is_none());
        assert!(page.children(page.body()).is_empty());
    }

    #[test]
    fn test_inject_style_goes_to_head() {
        let page = MemoryPage::new();
        page.inject_style(".foil { color: gold; }");

        let style = page.query(&sel("head > style")).unwrap();
        assert_eq!(page.attribute(style, "type").as_deref(), Some("text/css"));
        assert!(page.to_html().contains("<style type=\"text/css\">.foil { color: gold; }</style>"));
    }

    #[test]
    fn test_html_serialization_escapes() {
        let page = MemoryPage::new();
        page.append(
            page.body(),
            Element::new("div")
                .class("x")
                .style("clear", "both")
                .attr("title", "a \"quoted\" <title>")
                .text("Tom & Jerry <3")
                .child(Element::new("img").attr("src", "a.png")),
        );

        let html = page.to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(
            "<div title=\"a &quot;quoted&quot; &lt;title&gt;\" class=\"x\" style=\"clear: both;\">Tom &amp; Jerry &lt;3<img src=\"a.png\"></div>"
        ));
    }

    #[tokio::test]
    async fn test_wait_for_present_element_returns_immediately() {
        let (page, list) = list_page();
        assert_eq!(page.wait_for(&sel("#list")).await, list);
    }

    #[tokio::test]
    async fn test_wait_for_resumes_on_later_insert() {
        let page = MemoryPage::new();
        let writer = page.clone();

        let inserter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let wrapper = writer.append(writer.body(), Element::new("div"));
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.append(wrapper, Element::new("div").id("late"))
        });

        let found = tokio::time::timeout(Duration::from_secs(5), page.wait_for(&sel("div > #late")))
            .await
            .expect("wait_for should resolve");
        assert_eq!(Some(found), inserter.await.ok());
    }
}
