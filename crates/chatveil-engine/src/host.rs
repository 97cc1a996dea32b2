//! Host page contract
//!
//! The engine never touches a real document model directly; it sees the
//! page through this narrow, fragile contract: selector lookups, style
//! and text access, subtree insertion watchers, and iframe load signals.
//! Watchers are disconnected by dropping their receivers.

use tokio::sync::mpsc;

/// Opaque handle to one element on the host page.
///
/// Identity is handle identity: the same element always yields the same
/// handle, and the processed-set is keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) u64);

/// A newly inserted element reported by a subtree watcher
#[derive(Debug, Clone)]
pub struct Insertion {
    pub node: NodeHandle,
    pub tag: String,
}

/// Fired when an iframe finishes loading.
///
/// `document` is `None` when the content document is inaccessible
/// (cross-origin or not yet ready).
#[derive(Debug, Clone)]
pub struct IframeLoad {
    pub document: Option<NodeHandle>,
}

/// Read-only view of the host page plus watcher registration.
///
/// Implementations must report an insertion exactly once per attached
/// subtree root, the way a `childList` + `subtree` mutation watcher does.
pub trait HostPage: Send + Sync {
    /// Resolve a selector against the top-level document
    fn query(&self, selector: &str) -> Option<NodeHandle>;

    /// Resolve a selector within a node's subtree
    fn query_within(&self, node: NodeHandle, selector: &str) -> Option<NodeHandle>;

    /// Concatenated text content of a node's subtree
    fn text_of(&self, node: NodeHandle) -> String;

    /// Inline style text of a node
    fn style_of(&self, node: NodeHandle) -> String;

    /// Replace a node's inline style text
    fn set_style(&self, node: NodeHandle, css: &str);

    /// Watch a node's subtree for element insertions
    fn watch_children(&self, node: NodeHandle) -> mpsc::UnboundedReceiver<Insertion>;

    /// Watch an iframe element for load events
    fn iframe_loads(&self, iframe: NodeHandle) -> mpsc::UnboundedReceiver<IframeLoad>;
}

/// The six nested attachment points of the discovery hierarchy.
///
/// Selectors are `tag`, `#id`, or `tag#id`. The defaults match the
/// simulated page; real host pages configure their own set.
#[derive(Debug, Clone)]
pub struct SurfaceSelectors {
    /// Root shell element the outer watcher attaches to
    pub app_shell: String,

    /// Intermediate container, logged only
    pub page_manager: String,

    /// Intermediate container, logged only
    pub watch_view: String,

    /// Host element wrapping the live-chat iframe
    pub chat_frame: String,

    /// The iframe inside the chat frame host
    pub chat_iframe: String,

    /// One chat message inside the iframe document
    pub message_renderer: String,

    /// Message text container within a renderer
    pub message_text: String,
}

impl Default for SurfaceSelectors {
    fn default() -> Self {
        Self {
            app_shell: "live-app".to_string(),
            page_manager: "page-manager".to_string(),
            watch_view: "watch-view".to_string(),
            chat_frame: "live-chat-frame".to_string(),
            chat_iframe: "iframe#chatframe".to_string(),
            message_renderer: "chat-message-renderer".to_string(),
            message_text: "#message".to_string(),
        }
    }
}

impl SurfaceSelectors {
    /// Tag-name part of a selector, for matching insertion events
    pub(crate) fn tag_of(selector: &str) -> &str {
        selector.split('#').next().unwrap_or(selector)
    }
}
