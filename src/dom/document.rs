//! Arena-backed element tree with structural-mutation subscriptions.
//!
//! This is a deliberately small host-document model: enough surface for the
//! synchronizer to scan marker attributes and write resolved text, plus an
//! explicit subscription channel that reports inserted subtrees in order.

use std::collections::{
    HashMap,
    VecDeque,
};

/// Handle to an element node. 4 bytes; an index into the document arena.
///
/// Ids stay valid for the lifetime of their document. Nodes detached by
/// [`Document::remove`] keep their id and can be attached again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a mutation subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A structural change reported to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// The subtree rooted at the node was attached to the document.
    Inserted(NodeId),
    /// The subscriber's queue overflowed and individual records were
    /// dropped; the subscriber no longer knows which subtrees changed.
    Overflow,
}

#[derive(Debug)]
struct ElementNode {
    tag: String,
    attributes: HashMap<String, String>,
    text: String,
    /// Current value for form fields (`input`, `textarea`).
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Subscriber {
    queue: VecDeque<Mutation>,
    limit: usize,
}

impl Subscriber {
    fn push(&mut self, mutation: Mutation) {
        // Once overflowed, the single Overflow record stands for everything
        // until the subscriber drains.
        if self.queue.back() == Some(&Mutation::Overflow) {
            return;
        }
        if self.queue.len() >= self.limit {
            self.queue.clear();
            self.queue.push_back(Mutation::Overflow);
            return;
        }
        self.queue.push_back(mutation);
    }
}

/// An element tree that reports insertions to subscribers.
///
/// Nodes are created detached, then attached with [`Document::append`];
/// only the attachment is a structural mutation. Content writes (text,
/// value, attributes) are not reported, so the synchronizer's own writes
/// never feed back into its queue.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<ElementNode>,
    root: NodeId,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    next_subscription: u64,
}

impl Document {
    /// Creates a document holding a single `body` root element.
    #[must_use]
    pub fn new() -> Self {
        let root_node = ElementNode {
            tag: "body".to_string(),
            attributes: HashMap::new(),
            text: String::new(),
            value: None,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
            subscribers: HashMap::new(),
            next_subscription: 0,
        }
    }

    /// The root element.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of elements ever created, attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Creates a detached element. Tag names are folded to lowercase.
    #[allow(clippy::cast_possible_truncation)]
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ElementNode {
            tag: tag.to_ascii_lowercase(),
            attributes: HashMap::new(),
            text: String::new(),
            value: None,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Attaches `child` (and its whole subtree) under `parent` and reports
    /// the insertion to every subscriber.
    ///
    /// Only insertions into the live tree are reported, and only as a
    /// single event for the subtree root: assembling a subtree while it is
    /// still detached stays silent.
    ///
    /// Attaching a node that already has a parent, attaching a node to
    /// itself or to one of its own descendants, or using a foreign id is a
    /// no-op.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if child == self.root || child == parent {
            return;
        }
        if self.node(child).is_none_or(|node| node.parent.is_some()) {
            return;
        }
        if self.is_ancestor(child, parent) {
            return;
        }
        let Some(parent_node) = self.node_mut(parent) else {
            return;
        };
        parent_node.children.push(child);
        if let Some(child_node) = self.node_mut(child) {
            child_node.parent = Some(parent);
        }
        if self.is_attached(child) {
            self.notify(Mutation::Inserted(child));
        }
    }

    /// Creates an element and attaches it in one step.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append(parent, id);
        id
    }

    /// Detaches the subtree rooted at `id` from its parent.
    ///
    /// The subtree keeps its id and content; detachment is not reported to
    /// subscribers.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(|node| node.parent) else {
            return;
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.retain(|child| *child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// The element's tag name.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.tag.as_str())
    }

    /// Reads an attribute.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|node| node.attributes.get(name)).map(String::as_str)
    }

    /// Writes an attribute. A no-op for foreign ids.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// The element's text content.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.text.as_str())
    }

    /// Replaces the element's text content. A no-op for foreign ids.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.node_mut(id) {
            node.text = text.to_string();
        }
    }

    /// The current value of a form field, if one was ever written.
    #[must_use]
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|node| node.value.as_deref())
    }

    /// Sets a form field value. A no-op for foreign ids.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.value = Some(value.to_string());
        }
    }

    /// The element's parent, `None` for the root and for detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Whether the node is part of the live tree under the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_ancestor(self.root, id)
    }

    /// Direct children in insertion order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Every node of the subtree rooted at `id`, in preorder, `id` first.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut collected = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.node(current).is_none() {
                continue;
            }
            collected.push(current);
            // Reversed so preorder keeps document order.
            stack.extend(self.children(current).iter().rev().copied());
        }
        collected
    }

    /// Registers a mutation subscriber with a bounded queue.
    ///
    /// A `limit` of zero is treated as one: the queue must at least be able
    /// to hold the overflow record.
    pub fn subscribe(&mut self, limit: usize) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers
            .insert(id, Subscriber { queue: VecDeque::new(), limit: limit.max(1) });
        id
    }

    /// Removes a subscriber and drops its pending queue.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.remove(&id);
    }

    /// Takes every pending mutation for the subscriber, oldest first.
    pub fn drain(&mut self, id: SubscriptionId) -> Vec<Mutation> {
        self.subscribers.get_mut(&id).map_or_else(Vec::new, |sub| sub.queue.drain(..).collect())
    }

    fn notify(&mut self, mutation: Mutation) {
        for subscriber in self.subscribers.values_mut() {
            subscriber.push(mutation);
        }
    }

    fn is_ancestor(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut cursor = Some(of);
        while let Some(current) = cursor {
            if current == candidate {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn node(&self, id: NodeId) -> Option<&ElementNode> {
        self.nodes.get(id.index())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        self.nodes.get_mut(id.index())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
