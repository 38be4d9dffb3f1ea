//! In-memory arena document used by tests and the demo binary.
//!
//! Node ids are never reused, so a handle to a removed node stays valid and
//! just reports as disconnected. Child-list and text changes are reported to
//! observers, mirroring a `MutationObserver` on `{childList, subtree}`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use tokio::sync::mpsc;

use super::{NodeId, PageDom};

#[derive(Debug, Clone, Default)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    style: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct MemoryDom {
    nodes: Vec<NodeData>,
    root: NodeId,
    root_style: BTreeMap<String, String>,
    observers: Vec<mpsc::UnboundedSender<()>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// An empty document whose root is `<body>`.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                tag: "body".to_string(),
                ..NodeData::default()
            }],
            root: NodeId(0),
            root_style: BTreeMap::new(),
            observers: Vec::new(),
        }
    }

    /// Subscribe to child-list mutations.
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Create `<tag attrs...>` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let node = self.create_element(tag);
        for (k, v) in attrs {
            self.set_attr(node, k, v);
        }
        self.append_child(parent, node);
        node
    }

    /// Pseudo-HTML of the whole document, one element per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_into(self.root, 0, &mut out);
        out
    }

    fn outline_into(&self, node: NodeId, depth: usize, out: &mut String) {
        let data = &self.nodes[node.0];
        let _ = write!(out, "{}<{}", "  ".repeat(depth), data.tag);
        for (k, v) in &data.attrs {
            let _ = write!(out, " {k}=\"{v}\"");
        }
        if !data.style.is_empty() {
            let style: Vec<String> = data.style.iter().map(|(k, v)| format!("{k}:{v}")).collect();
            let _ = write!(out, " style=\"{}\"", style.join(";"));
        }
        out.push('>');
        if !data.text.is_empty() {
            out.push_str(&data.text);
        }
        out.push('\n');
        for c in &data.children {
            self.outline_into(*c, depth + 1, out);
        }
    }

    fn notify(&mut self) {
        self.observers.retain(|tx| tx.send(()).is_ok());
    }

    fn node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(node.0)
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    fn attach_at(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        self.notify();
    }
}

impl PageDom for MemoryDom {
    fn root(&self) -> NodeId {
        self.root
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.node(node).map(|n| n.tag.clone())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        match n.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => n.attrs.push((name.to_string(), value.to_string())),
        }
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attrs.retain(|(k, _)| k != name);
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut cur = node;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            ..NodeData::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.attach_at(parent, child, usize::MAX);
    }

    fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.attach_at(parent, child, 0);
    }

    fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(node);
        let index = self
            .node(parent)
            .and_then(|p| p.children.iter().position(|c| *c == reference))
            .map_or(usize::MAX, |i| i + 1);
        self.attach_at(parent, node, index);
    }

    fn remove(&mut self, node: NodeId) {
        if self.parent(node).is_some() {
            self.detach(node);
            self.notify();
        }
    }

    fn text(&self, node: NodeId) -> String {
        let Some(n) = self.node(node) else {
            return String::new();
        };
        let mut out = n.text.clone();
        for c in &n.children {
            out.push_str(&self.text(*c));
        }
        out
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        for c in self.children(node) {
            self.detach(c);
        }
        if let Some(n) = self.node_mut(node) {
            n.text = text.to_string();
        }
        self.notify();
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.node(node)?
            .style
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.clone())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        match n.style.iter_mut().find(|(k, _)| k == property) {
            Some((_, v)) => *v = value.to_string(),
            None => n.style.push((property.to_string(), value.to_string())),
        }
    }

    fn root_style_property(&self, name: &str) -> Option<String> {
        self.root_style.get(name).cloned()
    }

    fn set_root_style_property(&mut self, name: &str, value: &str) {
        self.root_style.insert(name.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{closest, query_all, ElementPattern};

    #[test]
    fn removed_subtree_is_disconnected() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let item = dom.append(root, "div", &[("class", "item")]);
        let link = dom.append(item, "a", &[("href", "/watch?v=x")]);
        assert!(dom.is_connected(link));

        dom.remove(item);
        assert!(!dom.is_connected(link));
        assert_eq!(dom.parent(link), Some(item));
    }

    #[test]
    fn insert_after_and_prepend_keep_order() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let line = dom.append(root, "div", &[]);
        let a = dom.append(line, "span", &[("id", "a")]);
        let b = dom.create_element("span");
        dom.insert_after(a, b);
        let c = dom.create_element("span");
        dom.prepend_child(line, c);
        assert_eq!(dom.children(line), vec![c, a, b]);
    }

    #[test]
    fn patterns_match_compound_selectors() {
        const THUMB: ElementPattern = ElementPattern {
            tag: Some("a"),
            id: Some("thumbnail"),
            attrs: &["href"],
            ..ElementPattern::ANY
        };
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let wrap = dom.append(root, "div", &[("class", "ytd-grid-renderer x")]);
        let hit = dom.append(wrap, "a", &[("id", "thumbnail"), ("href", "/watch?v=1")]);
        dom.append(wrap, "a", &[("id", "thumbnail")]);

        assert_eq!(query_all(&dom, &[THUMB]), vec![hit]);
        let grid = ElementPattern {
            classes: &["ytd-grid-renderer"],
            ..ElementPattern::ANY
        };
        assert_eq!(closest(&dom, hit, &[grid]), Some(wrap));
    }

    #[test]
    fn child_list_changes_reach_observers() {
        let mut dom = MemoryDom::new();
        let mut rx = dom.observe();
        let root = dom.root();
        let n = dom.append(root, "div", &[]);
        dom.set_attr(n, "data-x", "1");
        assert!(rx.try_recv().is_ok());
        // attribute changes are not child-list mutations
        assert!(rx.try_recv().is_err());
    }
}
