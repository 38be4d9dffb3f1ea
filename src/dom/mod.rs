//! # Page DOM seam
//! The annotator only sees the host page through [`PageDom`]. Nodes are opaque
//! [`NodeId`] handles: holding one never keeps an element alive, and a handle
//! to a removed element simply reports `is_connected() == false`.
//!
//! [`ElementPattern`] covers the compound selectors the layout profiles need
//! (`tag#id.class[attr]:not(.class):not([attr])`).

pub mod memory;

pub use memory::MemoryDom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

pub trait PageDom: Send + 'static {
    fn root(&self) -> NodeId;
    fn tag_name(&self, node: NodeId) -> Option<String>;
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attr(&mut self, node: NodeId, name: &str);
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    /// Still reachable from the document root.
    fn is_connected(&self, node: NodeId) -> bool;

    fn create_element(&mut self, tag: &str) -> NodeId;
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn prepend_child(&mut self, parent: NodeId, child: NodeId);
    /// Insert `node` as the next sibling of `reference`.
    fn insert_after(&mut self, reference: NodeId, node: NodeId);
    /// Detach `node` (and its subtree) from the document.
    fn remove(&mut self, node: NodeId);

    /// Concatenated text of the subtree (`textContent`).
    fn text(&self, node: NodeId) -> String;
    /// Replace the subtree with a single text run.
    fn set_text(&mut self, node: NodeId, text: &str);

    fn style(&self, node: NodeId, property: &str) -> Option<String>;
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);
    fn root_style_property(&self, name: &str) -> Option<String>;
    fn set_root_style_property(&mut self, name: &str, value: &str);

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|x| x == class))
    }

    fn is_tag(&self, node: NodeId, tag: &str) -> bool {
        self.tag_name(node)
            .is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    /// All descendants of `node` in document order, `node` excluded.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).into_iter().rev());
        }
        out
    }
}

/// One compound selector.
#[derive(Debug, Clone, Copy)]
pub struct ElementPattern {
    pub tag: Option<&'static str>,
    pub id: Option<&'static str>,
    pub classes: &'static [&'static str],
    pub attrs: &'static [&'static str],
    pub not_classes: &'static [&'static str],
    pub not_attrs: &'static [&'static str],
}

impl ElementPattern {
    pub const ANY: Self = Self {
        tag: None,
        id: None,
        classes: &[],
        attrs: &[],
        not_classes: &[],
        not_attrs: &[],
    };

    pub fn matches<D: PageDom + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        if let Some(tag) = self.tag {
            if !dom.is_tag(node, tag) {
                return false;
            }
        }
        if let Some(id) = self.id {
            if dom.attr(node, "id").as_deref() != Some(id) {
                return false;
            }
        }
        self.classes.iter().all(|c| dom.has_class(node, c))
            && self.attrs.iter().all(|a| dom.attr(node, a).is_some())
            && !self.not_classes.iter().any(|c| dom.has_class(node, c))
            && !self.not_attrs.iter().any(|a| dom.attr(node, a).is_some())
    }
}

pub fn matches_any<D: PageDom + ?Sized>(dom: &D, node: NodeId, patterns: &[ElementPattern]) -> bool {
    patterns.iter().any(|p| p.matches(dom, node))
}

/// Attached elements matching any pattern, in document order.
pub fn query_all<D: PageDom + ?Sized>(dom: &D, patterns: &[ElementPattern]) -> Vec<NodeId> {
    dom.descendants(dom.root())
        .into_iter()
        .filter(|n| matches_any(dom, *n, patterns))
        .collect()
}

/// `node` itself or its nearest ancestor matching any pattern.
pub fn closest<D: PageDom + ?Sized>(
    dom: &D,
    node: NodeId,
    patterns: &[ElementPattern],
) -> Option<NodeId> {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if matches_any(dom, n, patterns) {
            return Some(n);
        }
        cur = dom.parent(n);
    }
    None
}

/// Last descendant of `node` (document order) matching `pattern`.
pub fn last_descendant<D: PageDom + ?Sized>(
    dom: &D,
    node: NodeId,
    pattern: &ElementPattern,
) -> Option<NodeId> {
    dom.descendants(node)
        .into_iter()
        .rev()
        .find(|n| pattern.matches(dom, *n))
}

/// First descendant of `node` (document order) matching `pattern`.
pub fn first_descendant<D: PageDom + ?Sized>(
    dom: &D,
    node: NodeId,
    pattern: &ElementPattern,
) -> Option<NodeId> {
    dom.descendants(node)
        .into_iter()
        .find(|n| pattern.matches(dom, *n))
}
