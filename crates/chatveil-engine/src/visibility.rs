//! Visibility controller
//!
//! Applies and reverts the veil on comment elements. Veiling happens
//! synchronously at discovery time, before classification; visibility
//! only ever reverts afterwards, never re-applies mid-flight.

use crate::host::{HostPage, NodeHandle};
use chatveil_core::{AnalysisResult, Sentiment};
use chatveil_store::Settings;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Style text appended to veil a comment
pub const VEIL_STYLE: &str =
    "filter: blur(5px); background-color: rgba(0, 0, 0, 0.1); transition: filter 0.3s ease;";

/// Transition kept when restoring the original appearance
const RESTORE_TRANSITION: &str = "transition: filter 0.3s ease;";

/// Outcome of a per-comment visibility decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VeilDecision {
    /// The comment stays veiled
    Kept,
    /// The original appearance was restored
    Restored,
}

struct VisState {
    snapshots: HashMap<NodeHandle, String>,
    veiled: HashSet<NodeHandle>,
}

/// Applies the veil treatment and the keep/restore decision.
///
/// Cheap to clone; clones share the style snapshots and veiled set.
#[derive(Clone)]
pub struct VisibilityController {
    page: Arc<dyn HostPage>,
    state: Arc<Mutex<VisState>>,
}

impl VisibilityController {
    pub fn new(page: Arc<dyn HostPage>) -> Self {
        Self {
            page,
            state: Arc::new(Mutex::new(VisState {
                snapshots: HashMap::new(),
                veiled: HashSet::new(),
            })),
        }
    }

    /// Capture the element's current style and veil it.
    ///
    /// Idempotence is guarded by the processed-set at the call site, not
    /// here: a second call would capture the already-veiled style.
    pub fn obscure(&self, node: NodeHandle) {
        let original = self.page.style_of(node);
        let veiled = if original.is_empty() || original.trim_end().ends_with(';') {
            format!("{original}{VEIL_STYLE}")
        } else {
            format!("{original}; {VEIL_STYLE}")
        };
        self.page.set_style(node, &veiled);

        let mut state = self.state.lock();
        state.snapshots.insert(node, original);
        state.veiled.insert(node);
    }

    /// Decide whether the veil stays, reading thresholds from the
    /// settings snapshot taken at completion time.
    ///
    /// Generative results keep the veil iff the sentiment is negative and
    /// the confidence strictly exceeds the threshold; classifier results
    /// iff the label is negative or very_negative and the score strictly
    /// exceeds the threshold.
    pub fn apply_decision(
        &self,
        node: NodeHandle,
        result: &AnalysisResult,
        settings: &Settings,
    ) -> VeilDecision {
        let keep = match result {
            AnalysisResult::Generative {
                sentiment,
                confidence,
                ..
            } => {
                *sentiment == Sentiment::Negative
                    && *confidence > settings.generative.confidence_threshold
            }
            AnalysisResult::Classifier {
                sentiment, score, ..
            } => sentiment.is_negative() && *score > settings.classifier.score_threshold,
        };

        if keep {
            VeilDecision::Kept
        } else {
            self.restore(node);
            VeilDecision::Restored
        }
    }

    /// Re-apply the captured style snapshot plus the transition effect
    pub fn restore(&self, node: NodeHandle) {
        let original = {
            let mut state = self.state.lock();
            state.veiled.remove(&node);
            state.snapshots.remove(&node)
        };

        if let Some(original) = original {
            let restored = if original.is_empty() || original.trim_end().ends_with(';') {
                format!("{original}{RESTORE_TRANSITION}")
            } else {
                format!("{original}; {RESTORE_TRANSITION}")
            };
            self.page.set_style(node, &restored);
        }
    }

    /// Number of comments currently veiled
    pub fn veiled_count(&self) -> usize {
        self.state.lock().veiled.len()
    }

    /// Whether a specific comment is currently veiled
    pub fn is_veiled(&self, node: NodeHandle) -> bool {
        self.state.lock().veiled.contains(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedPage;

    fn controller() -> (Arc<SimulatedPage>, VisibilityController, NodeHandle) {
        let page = Arc::new(SimulatedPage::new());
        let node = page.insert_element(page.document(), "chat-message-renderer");
        page.set_style(node, "color: red;");
        let controller = VisibilityController::new(page.clone() as Arc<dyn HostPage>);
        (page, controller, node)
    }

    fn generative(sentiment: Sentiment, confidence: f32) -> AnalysisResult {
        AnalysisResult::Generative {
            model: "m".to_string(),
            sentiment,
            confidence,
        }
    }

    #[test]
    fn obscure_applies_the_veil_over_the_original_style() {
        let (page, controller, node) = controller();

        controller.obscure(node);

        let style = page.style_of(node);
        assert!(style.starts_with("color: red;"));
        assert!(style.contains("blur(5px)"));
        assert!(controller.is_veiled(node));
    }

    #[test]
    fn restore_reapplies_the_snapshot_with_transition() {
        let (page, controller, node) = controller();

        controller.obscure(node);
        controller.restore(node);

        let style = page.style_of(node);
        assert!(style.starts_with("color: red;"));
        assert!(!style.contains("blur"));
        assert!(style.contains("transition: filter 0.3s ease;"));
        assert!(!controller.is_veiled(node));
    }

    #[test]
    fn generative_decision_uses_strict_greater_than() {
        let (_, controller, node) = controller();
        let mut settings = Settings::default();
        settings.generative.confidence_threshold = 0.5;

        controller.obscure(node);
        assert_eq!(
            controller.apply_decision(node, &generative(Sentiment::Negative, 0.51), &settings),
            VeilDecision::Kept
        );

        assert_eq!(
            controller.apply_decision(node, &generative(Sentiment::Negative, 0.5), &settings),
            VeilDecision::Restored
        );
    }

    #[test]
    fn generative_decision_ignores_non_negative_sentiments() {
        let (_, controller, node) = controller();
        let settings = Settings::default();

        controller.obscure(node);
        assert_eq!(
            controller.apply_decision(node, &generative(Sentiment::Positive, 0.99), &settings),
            VeilDecision::Restored
        );
    }

    #[test]
    fn classifier_decision_counts_both_negative_labels() {
        let (_, controller, node) = controller();
        let settings = Settings::default();

        let very_negative = AnalysisResult::Classifier {
            model: "m".to_string(),
            sentiment: Sentiment::VeryNegative,
            score: 0.9,
        };

        controller.obscure(node);
        assert_eq!(
            controller.apply_decision(node, &very_negative, &settings),
            VeilDecision::Kept
        );
    }
}
