//! Transition state owned by the render loop

use crate::ExpressionTarget;
use tracing::debug;

/// Current target and how far the deformation has advanced toward it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransitionState {
    target: ExpressionTarget,
    progress: f32,
}

impl TransitionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> &ExpressionTarget {
        &self.target
    }

    /// Progress in `[0, 1]`
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Switch to `target`, restarting the ramp from 0.
    ///
    /// Overrides any in-flight transition. Re-requesting the current target
    /// is not a switch and leaves progress alone; returns whether it switched.
    pub fn request(&mut self, target: ExpressionTarget) -> bool {
        if target == self.target {
            return false;
        }
        debug!("Transition {} -> {}", self.target, target);
        self.target = target;
        self.progress = 0.0;
        true
    }

    /// Advance progress by `step`, saturating at 1.0
    pub fn advance(&mut self, step: f32) -> f32 {
        let step = if step.is_finite() { step.max(0.0) } else { 0.0 };
        self.progress = (self.progress + step).min(1.0);
        self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_neutral() {
        let state = TransitionState::new();
        assert!(state.target().is_neutral());
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn test_request_resets_progress() {
        let mut state = TransitionState::new();
        assert!(state.request("happy".into()));
        state.advance(0.3);
        state.advance(0.3);
        assert!((state.progress() - 0.6).abs() < 1e-6);

        assert!(state.request("sad".into()));
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.target().name(), "sad");
    }

    #[test]
    fn test_same_target_is_not_a_switch() {
        let mut state = TransitionState::new();
        state.request("happy".into());
        state.advance(0.5);
        assert!(!state.request("HAPPY".into()));
        assert_eq!(state.progress(), 0.5);
    }

    #[test]
    fn test_advance_saturates() {
        let mut state = TransitionState::new();
        for _ in 0..30 {
            state.advance(0.1);
        }
        assert_eq!(state.progress(), 1.0);
        assert!(state.is_complete());
    }

    #[test]
    fn test_bad_steps_do_not_move_progress() {
        let mut state = TransitionState::new();
        state.advance(0.2);
        state.advance(-1.0);
        state.advance(f32::NAN);
        assert!((state.progress() - 0.2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_progress_is_monotonic(steps in prop::collection::vec(-0.5f32..0.5, 1..60)) {
            let mut state = TransitionState::new();
            let mut last = state.progress();
            for step in steps {
                let now = state.advance(step);
                prop_assert!(now >= last);
                prop_assert!((0.0..=1.0).contains(&now));
                last = now;
            }
        }
    }
}
