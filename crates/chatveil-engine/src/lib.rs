//! Chatveil Engine
//!
//! The page-facing half of the pipeline: a hierarchical observation state
//! machine that discovers nested live-chat surfaces as they appear,
//! veils each newly inserted comment, and funnels classification work
//! into the single-flight task queue.
//!
//! The host page is reached only through the [`host::HostPage`] contract;
//! [`sim::SimulatedPage`] implements it in-memory for tests and the demo
//! binary.

pub mod host;
pub mod logfilter;
pub mod observer;
pub mod sim;
pub mod visibility;

pub use host::{HostPage, IframeLoad, Insertion, NodeHandle, SurfaceSelectors};
pub use logfilter::EngineLog;
pub use observer::{ObserverState, StatsSnapshot, VeilEngine};
pub use sim::SimulatedPage;
pub use visibility::{VeilDecision, VisibilityController};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::host::{HostPage, NodeHandle, SurfaceSelectors};
    pub use crate::observer::{ObserverState, VeilEngine};
    pub use crate::sim::SimulatedPage;
    pub use crate::visibility::VisibilityController;
}
