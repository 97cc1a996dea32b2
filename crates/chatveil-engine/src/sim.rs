//! Simulated host page
//!
//! In-memory element tree implementing the [`HostPage`] contract: nested
//! elements, inline styles, subtree insertion watchers, and iframes whose
//! content documents appear on load. Tests and the demo binary drive the
//! engine against this instead of a real document model.

use crate::host::{HostPage, IframeLoad, Insertion, NodeHandle};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;

struct SimNode {
    tag: String,
    dom_id: Option<String>,
    text: String,
    style: String,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    content_document: Option<NodeHandle>,
}

struct PageState {
    nodes: HashMap<NodeHandle, SimNode>,
    next_id: u64,
    root: NodeHandle,
    watchers: Vec<(NodeHandle, mpsc::UnboundedSender<Insertion>)>,
    load_watchers: Vec<(NodeHandle, mpsc::UnboundedSender<IframeLoad>)>,
}

/// In-memory page; share as `Arc<SimulatedPage>`
pub struct SimulatedPage {
    state: RwLock<PageState>,
}

impl SimulatedPage {
    pub fn new() -> Self {
        let root = NodeHandle(1);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            SimNode {
                tag: "#document".to_string(),
                dom_id: None,
                text: String::new(),
                style: String::new(),
                parent: None,
                children: Vec::new(),
                content_document: None,
            },
        );
        Self {
            state: RwLock::new(PageState {
                nodes,
                next_id: 2,
                root,
                watchers: Vec::new(),
                load_watchers: Vec::new(),
            }),
        }
    }

    /// The top-level document node
    pub fn document(&self) -> NodeHandle {
        self.state.read().root
    }

    /// Create a detached element. `spec` is `tag` or `tag#id`.
    pub fn create_element(&self, spec: &str) -> NodeHandle {
        let (tag, dom_id) = match spec.split_once('#') {
            Some((tag, id)) => (tag.to_string(), Some(id.to_string())),
            None => (spec.to_string(), None),
        };

        let mut state = self.state.write();
        let handle = NodeHandle(state.next_id);
        state.next_id += 1;
        state.nodes.insert(
            handle,
            SimNode {
                tag,
                dom_id,
                text: String::new(),
                style: String::new(),
                parent: None,
                children: Vec::new(),
                content_document: None,
            },
        );
        handle
    }

    /// Set an element's own text content
    pub fn set_text(&self, node: NodeHandle, text: &str) {
        let mut state = self.state.write();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.text = text.to_string();
        }
    }

    /// Attach `child` under `parent` and report the insertion to every
    /// watcher observing an ancestor, the way a subtree mutation watcher
    /// reports the root of an added subtree.
    pub fn append_child(&self, parent: NodeHandle, child: NodeHandle) {
        let mut state = self.state.write();
        if !state.nodes.contains_key(&parent) || !state.nodes.contains_key(&child) {
            return;
        }
        if let Some(n) = state.nodes.get_mut(&child) {
            n.parent = Some(parent);
        }
        if let Some(n) = state.nodes.get_mut(&parent) {
            n.children.push(child);
        }

        let tag = state
            .nodes
            .get(&child)
            .map(|n| n.tag.clone())
            .unwrap_or_default();

        let mut ancestors = Vec::new();
        let mut cursor = Some(parent);
        while let Some(handle) = cursor {
            ancestors.push(handle);
            cursor = state.nodes.get(&handle).and_then(|n| n.parent);
        }

        state.watchers.retain(|(target, sender)| {
            if !ancestors.contains(target) {
                return true;
            }
            sender.send(Insertion { node: child, tag: tag.clone() }).is_ok()
        });
    }

    /// Create and attach an element in one step
    pub fn insert_element(&self, parent: NodeHandle, spec: &str) -> NodeHandle {
        let node = self.create_element(spec);
        self.append_child(parent, node);
        node
    }

    /// Finish loading an iframe. When `accessible`, a fresh content
    /// document is created and handed to load watchers; otherwise the
    /// load event carries no document.
    pub fn load_iframe(&self, iframe: NodeHandle, accessible: bool) -> Option<NodeHandle> {
        let document = if accessible {
            let doc = self.create_element("#document");
            let mut state = self.state.write();
            if let Some(n) = state.nodes.get_mut(&iframe) {
                n.content_document = Some(doc);
            }
            Some(doc)
        } else {
            None
        };

        let mut state = self.state.write();
        state.load_watchers.retain(|(target, sender)| {
            if *target != iframe {
                return true;
            }
            sender.send(IframeLoad { document }).is_ok()
        });

        document
    }

    /// Attach one chat message (renderer + `#message` text child) under a
    /// chat document, matching the default surface selectors.
    pub fn insert_chat_message(&self, chat_document: NodeHandle, text: &str) -> NodeHandle {
        let renderer = self.create_element("chat-message-renderer");
        let message = self.create_element("span#message");
        self.set_text(message, text);
        self.append_child(renderer, message);
        self.append_child(chat_document, renderer);
        renderer
    }

    fn find(&self, from: NodeHandle, selector: &str, include_self: bool) -> Option<NodeHandle> {
        let state = self.state.read();
        let mut stack = if include_self {
            vec![from]
        } else {
            state
                .nodes
                .get(&from)
                .map(|n| n.children.clone())
                .unwrap_or_default()
        };

        while let Some(handle) = stack.pop() {
            let Some(node) = state.nodes.get(&handle) else {
                continue;
            };
            if selector_matches(node, selector) {
                return Some(handle);
            }
            stack.extend(node.children.iter().copied());
        }
        None
    }
}

fn selector_matches(node: &SimNode, selector: &str) -> bool {
    match selector.split_once('#') {
        Some(("", id)) => node.dom_id.as_deref() == Some(id),
        Some((tag, id)) => node.tag == tag && node.dom_id.as_deref() == Some(id),
        None => node.tag == selector,
    }
}

impl Default for SimulatedPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPage for SimulatedPage {
    fn query(&self, selector: &str) -> Option<NodeHandle> {
        let root = self.document();
        self.find(root, selector, false)
    }

    fn query_within(&self, node: NodeHandle, selector: &str) -> Option<NodeHandle> {
        self.find(node, selector, false)
    }

    fn text_of(&self, node: NodeHandle) -> String {
        let state = self.state.read();
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(handle) = stack.pop() {
            if let Some(n) = state.nodes.get(&handle) {
                out.push_str(&n.text);
                // Depth-first, in document order.
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    fn style_of(&self, node: NodeHandle) -> String {
        self.state
            .read()
            .nodes
            .get(&node)
            .map(|n| n.style.clone())
            .unwrap_or_default()
    }

    fn set_style(&self, node: NodeHandle, css: &str) {
        let mut state = self.state.write();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.style = css.to_string();
        }
    }

    fn watch_children(&self, node: NodeHandle) -> mpsc::UnboundedReceiver<Insertion> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.state.write().watchers.push((node, sender));
        receiver
    }

    fn iframe_loads(&self, iframe: NodeHandle) -> mpsc::UnboundedReceiver<IframeLoad> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.state.write().load_watchers.push((iframe, sender));
        receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subtree_watcher_sees_nested_insertions() {
        let page = SimulatedPage::new();
        let shell = page.insert_element(page.document(), "live-app");
        let mut rx = page.watch_children(shell);

        let manager = page.insert_element(shell, "page-manager");
        let frame = page.insert_element(manager, "live-chat-frame");

        assert_eq!(rx.recv().await.unwrap().node, manager);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.node, frame);
        assert_eq!(second.tag, "live-chat-frame");
    }

    #[tokio::test]
    async fn detached_subtrees_report_only_their_root() {
        let page = SimulatedPage::new();
        let shell = page.insert_element(page.document(), "live-app");
        let mut rx = page.watch_children(shell);

        let renderer = page.create_element("chat-message-renderer");
        let message = page.create_element("span#message");
        page.append_child(renderer, message); // detached, not reported
        page.append_child(shell, renderer);

        assert_eq!(rx.recv().await.unwrap().node, renderer);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn selectors_resolve_by_tag_and_id() {
        let page = SimulatedPage::new();
        let shell = page.insert_element(page.document(), "live-app");
        let frame = page.insert_element(shell, "live-chat-frame");
        let iframe = page.insert_element(frame, "iframe#chatframe");

        assert_eq!(page.query("live-app"), Some(shell));
        assert_eq!(page.query_within(frame, "iframe#chatframe"), Some(iframe));
        assert_eq!(page.query("absent-surface"), None);
    }

    #[tokio::test]
    async fn iframe_load_delivers_the_content_document() {
        let page = SimulatedPage::new();
        let iframe = page.create_element("iframe#chatframe");
        let mut loads = page.iframe_loads(iframe);

        let doc = page.load_iframe(iframe, true).unwrap();
        assert_eq!(loads.recv().await.unwrap().document, Some(doc));

        page.load_iframe(iframe, false);
        assert_eq!(loads.recv().await.unwrap().document, None);
    }

    #[test]
    fn text_concatenates_the_subtree() {
        let page = SimulatedPage::new();
        let doc = page.document();
        let renderer = page.insert_chat_message(doc, "  hello chat  ");
        let message = page.query_within(renderer, "#message").unwrap();

        assert_eq!(page.text_of(message).trim(), "hello chat");
        assert_eq!(page.text_of(renderer).trim(), "hello chat");
    }
}
