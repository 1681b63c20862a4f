//! Render loop observability hooks

use crate::{CycleOutcome, ExpressionTarget};
use metrics::{counter, gauge};

/// Injected into the controller to watch the render loop without side
/// effects in the core.
pub trait RenderObserver {
    /// Called once per cycle, with the playback position of the drawn frame
    fn on_cycle(&mut self, _outcome: &CycleOutcome, _position_secs: Option<f64>) {}

    /// Called when a request changes the target
    fn on_switch(&mut self, _from: &ExpressionTarget, _to: &ExpressionTarget) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RenderObserver for NoopObserver {}

/// Publishes cycle outcomes through the `metrics` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl MetricsObserver {
    pub fn new() -> Self {
        Self
    }
}

impl RenderObserver for MetricsObserver {
    fn on_cycle(&mut self, outcome: &CycleOutcome, position_secs: Option<f64>) {
        counter!("expression_cycles_total", "outcome" => outcome.label()).increment(1);
        if let CycleOutcome::Warped { progress } = outcome {
            gauge!("expression_transition_progress").set(*progress as f64);
        }
        if let Some(position) = position_secs {
            gauge!("expression_playback_position_seconds").set(position);
        }
    }

    fn on_switch(&mut self, _from: &ExpressionTarget, to: &ExpressionTarget) {
        counter!("expression_switches_total", "target" => to.name().to_string()).increment(1);
        gauge!("expression_transition_progress").set(0.0);
    }
}

impl<O: RenderObserver + ?Sized> RenderObserver for Box<O> {
    fn on_cycle(&mut self, outcome: &CycleOutcome, position_secs: Option<f64>) {
        (**self).on_cycle(outcome, position_secs)
    }

    fn on_switch(&mut self, from: &ExpressionTarget, to: &ExpressionTarget) {
        (**self).on_switch(from, to)
    }
}
