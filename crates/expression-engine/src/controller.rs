//! Transition controller and render loop

use crate::{ExpressionTarget, NoopObserver, RenderConfig, RenderObserver, TransitionState};
use emotion_delta::DeltaManager;
use face_warp::{ImageWarper, WarpOutcome};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use video_io::{FrameSource, OutputSurface, SourceFrame};

/// Why a cycle drew the idle frame unwarped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// Target is the baseline pose
    Neutral,
    /// No delta stored for the target
    MissingDelta,
    /// Delta and baseline lengths differ
    TopologyMismatch,
    /// No baseline has been extracted
    MissingBaseline,
    /// The warp failed and drew the source frame
    WarpFallback,
}

/// Result of one render cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Frame not decoded yet; nothing drawn
    Skipped,
    Passthrough(PassthroughReason),
    Warped { progress: f32 },
}

impl CycleOutcome {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Passthrough(PassthroughReason::Neutral) => "neutral",
            Self::Passthrough(PassthroughReason::WarpFallback) => "fallback",
            Self::Passthrough(_) => "passthrough",
            Self::Warped { .. } => "warped",
        }
    }
}

/// Cycle counts of a finished render loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub warped: u64,
    pub passthrough: u64,
    pub skipped: u64,
    pub switches: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Skipped => self.skipped += 1,
            CycleOutcome::Passthrough(_) => self.passthrough += 1,
            CycleOutcome::Warped { .. } => self.warped += 1,
        }
    }
}

/// Drives the per-cycle deformation of the idle feed toward the target
/// emotion.
///
/// Built from an initialized [`DeltaManager`]; owns the warper and the
/// transition state, so a single task renders and no other writer exists.
pub struct ExpressionController<O: RenderObserver = NoopObserver> {
    manager: DeltaManager,
    warper: ImageWarper,
    state: TransitionState,
    config: RenderConfig,
    observer: O,
}

impl ExpressionController<NoopObserver> {
    pub fn new(manager: DeltaManager, config: RenderConfig, width: u32, height: u32) -> Self {
        info!(
            "Creating expression controller {}x{} at {} fps ({} deltas)",
            width,
            height,
            config.fps,
            manager.len()
        );
        Self {
            manager,
            warper: ImageWarper::new(width, height),
            state: TransitionState::new(),
            config,
            observer: NoopObserver,
        }
    }
}

impl<O: RenderObserver> ExpressionController<O> {
    /// Replace the observability hook
    pub fn with_observer<P: RenderObserver>(self, observer: P) -> ExpressionController<P> {
        ExpressionController {
            manager: self.manager,
            warper: self.warper,
            state: self.state,
            config: self.config,
            observer,
        }
    }

    pub fn target(&self) -> &ExpressionTarget {
        self.state.target()
    }

    pub fn progress(&self) -> f32 {
        self.state.progress()
    }

    pub fn manager(&self) -> &DeltaManager {
        &self.manager
    }

    pub fn warper(&self) -> &ImageWarper {
        &self.warper
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Switch the target; overrides any running transition.
    ///
    /// Returns whether the target changed.
    pub fn request(&mut self, target: ExpressionTarget) -> bool {
        let from = self.state.target().clone();
        if !self.state.request(target) {
            return false;
        }
        let to = self.state.target();
        if !to.is_neutral() && self.manager.get_delta(to.name()).is_none() {
            warn!("No delta for '{}', idle frame will be shown", to);
        } else {
            info!("Expression switch: {} -> {}", from, to);
        }
        self.observer.on_switch(&from, to);
        true
    }

    /// Run one cycle: compose `frame` for the current target and present it.
    ///
    /// Never fails; anything that prevents a warp draws the frame unwarped.
    pub fn render_cycle<S: OutputSurface>(
        &mut self,
        frame: Option<&SourceFrame>,
        surface: &mut S,
    ) -> CycleOutcome {
        let Some(frame) = frame else {
            self.observer.on_cycle(&CycleOutcome::Skipped, None);
            return CycleOutcome::Skipped;
        };

        let (width, height) = surface.dimensions();
        if self.warper.dimensions() != (width, height) {
            self.warper.resize(width, height);
        }

        let outcome = self.compose(frame, surface);
        self.observer.on_cycle(&outcome, Some(frame.position_secs));
        outcome
    }

    fn compose<S: OutputSurface>(&mut self, frame: &SourceFrame, surface: &mut S) -> CycleOutcome {
        let Self {
            manager,
            warper,
            state,
            config,
            ..
        } = self;

        let passthrough = |surface: &mut S, reason| {
            surface.present(&frame.image);
            CycleOutcome::Passthrough(reason)
        };

        let ExpressionTarget::Emotion(name) = state.target() else {
            return passthrough(surface, PassthroughReason::Neutral);
        };
        let Some(baseline) = manager.baseline() else {
            return passthrough(surface, PassthroughReason::MissingBaseline);
        };
        let Some(delta) = manager.get_delta(name) else {
            return passthrough(surface, PassthroughReason::MissingDelta);
        };
        if delta.len() != baseline.len() {
            debug!(
                "Delta '{}' has {} points, baseline {}",
                name,
                delta.len(),
                baseline.len()
            );
            return passthrough(surface, PassthroughReason::TopologyMismatch);
        }

        let progress = state.advance(config.ramp_step);
        let target = match DeltaManager::apply_delta(baseline, delta, progress) {
            Ok(target) => target,
            Err(e) => {
                debug!("Cannot apply delta: {}", e);
                return passthrough(surface, PassthroughReason::TopologyMismatch);
            }
        };

        // Interpolation already happened on the landmarks
        let composed = warper.warp_frame(&frame.image, baseline, &target, 1.0);
        surface.present(composed);

        match warper.last_outcome() {
            WarpOutcome::Warped { .. } => CycleOutcome::Warped { progress },
            WarpOutcome::Passthrough => CycleOutcome::Passthrough(PassthroughReason::TopologyMismatch),
            WarpOutcome::Fallback => CycleOutcome::Passthrough(PassthroughReason::WarpFallback),
        }
    }

    /// Render at the configured rate until shutdown is signalled or the
    /// request channel closes.
    ///
    /// A slow cycle delays the next tick instead of bursting to catch up.
    pub async fn run<F: FrameSource, S: OutputSurface>(
        &mut self,
        source: &mut F,
        surface: &mut S,
        mut requests: mpsc::Receiver<ExpressionTarget>,
        mut shutdown: watch::Receiver<bool>,
    ) -> RunSummary {
        info!("Starting render loop at {} fps", self.config.fps);

        let mut ticker = tokio::time::interval(self.config.cycle_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = RunSummary::default();
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now - last_tick;
                    last_tick = now;

                    let frame = source.poll_frame(elapsed);
                    let outcome = self.render_cycle(frame, surface);
                    summary.record(&outcome);
                }
                request = requests.recv() => match request {
                    Some(target) => {
                        if self.request(target) {
                            summary.switches += 1;
                        }
                    }
                    None => {
                        info!("Request channel closed");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            "Render loop stopped after {} cycles ({} warped, {} passthrough, {} skipped)",
            summary.cycles, summary.warped, summary.passthrough, summary.skipped
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use face_landmarks::Landmark;
    use image::{Rgb, RgbImage};
    use std::time::Duration;
    use video_io::{FrameSequence, SequenceConfig};

    const W: u32 = 48;
    const H: u32 = 48;

    fn baseline() -> Vec<Landmark> {
        vec![
            Landmark::new(0.3, 0.3, 0.0),
            Landmark::new(0.7, 0.3, 0.0),
            Landmark::new(0.5, 0.5, 0.0),
            Landmark::new(0.35, 0.7, 0.0),
            Landmark::new(0.65, 0.7, 0.0),
        ]
    }

    fn happy() -> Vec<Landmark> {
        let mut points = baseline();
        points[3] = Landmark::new(0.3, 0.64, 0.0);
        points[4] = Landmark::new(0.7, 0.64, 0.0);
        points
    }

    fn manager() -> DeltaManager {
        let mut manager = DeltaManager::new();
        manager.set_baseline(baseline());
        manager.compute_delta(&happy(), "happy").unwrap();
        manager
    }

    fn frame() -> SourceFrame {
        let image = RgbImage::from_fn(W, H, |x, y| Rgb([(x * 5) as u8, (y * 5) as u8, 60]));
        SourceFrame::new(image, 0.0, 0)
    }

    fn controller() -> ExpressionController {
        ExpressionController::new(manager(), RenderConfig::snappy(), W, H)
    }

    #[derive(Default)]
    struct Recorder {
        outcomes: Vec<CycleOutcome>,
        switches: Vec<(String, String)>,
    }

    impl RenderObserver for Recorder {
        fn on_cycle(&mut self, outcome: &CycleOutcome, _position_secs: Option<f64>) {
            self.outcomes.push(*outcome);
        }

        fn on_switch(&mut self, from: &ExpressionTarget, to: &ExpressionTarget) {
            self.switches.push((from.to_string(), to.to_string()));
        }
    }

    #[test]
    fn test_missing_frame_skips_cycle() {
        let mut controller = controller();
        let mut surface = RgbImage::from_pixel(W, H, Rgb([1, 2, 3]));
        assert_eq!(controller.render_cycle(None, &mut surface), CycleOutcome::Skipped);
        assert_eq!(surface.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_neutral_bypasses_warper() {
        let mut controller = controller();
        let mut surface = RgbImage::new(W, H);
        let frame = frame();

        let outcome = controller.render_cycle(Some(&frame), &mut surface);
        assert_eq!(outcome, CycleOutcome::Passthrough(PassthroughReason::Neutral));
        assert_eq!(surface, frame.image);
        assert_eq!(controller.warper().triangulation_builds(), 0);
    }

    #[test]
    fn test_unknown_emotion_shows_idle_frame() {
        let mut controller = controller();
        let mut surface = RgbImage::new(W, H);
        let frame = frame();

        assert!(controller.request("surprised".into()));
        let outcome = controller.render_cycle(Some(&frame), &mut surface);
        assert_eq!(outcome, CycleOutcome::Passthrough(PassthroughReason::MissingDelta));
        assert_eq!(surface, frame.image);
        assert_eq!(controller.progress(), 0.0);
    }

    #[test]
    fn test_mismatched_delta_falls_back() {
        let mut manager = manager();
        manager.import(
            [("happy".to_string(), vec![Landmark::default(); 3])]
                .into_iter()
                .collect(),
        );
        let mut controller = ExpressionController::new(manager, RenderConfig::default(), W, H);
        let mut surface = RgbImage::new(W, H);
        let frame = frame();

        controller.request("happy".into());
        let outcome = controller.render_cycle(Some(&frame), &mut surface);
        assert_eq!(
            outcome,
            CycleOutcome::Passthrough(PassthroughReason::TopologyMismatch)
        );
        assert_eq!(surface, frame.image);
    }

    #[test]
    fn test_missing_baseline_falls_back() {
        let mut controller =
            ExpressionController::new(DeltaManager::new(), RenderConfig::default(), W, H);
        let mut surface = RgbImage::new(W, H);
        controller.request("happy".into());
        let outcome = controller.render_cycle(Some(&frame()), &mut surface);
        assert_eq!(
            outcome,
            CycleOutcome::Passthrough(PassthroughReason::MissingBaseline)
        );
    }

    #[test]
    fn test_progress_ramps_and_warps() {
        let mut controller = controller();
        let mut surface = RgbImage::new(W, H);
        let frame = frame();

        controller.request("happy".into());
        let mut last = 0.0;
        for _ in 0..15 {
            match controller.render_cycle(Some(&frame), &mut surface) {
                CycleOutcome::Warped { progress } => {
                    assert!(progress >= last);
                    last = progress;
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!(last, 1.0);
        assert_ne!(surface, frame.image);
        assert_eq!(controller.warper().triangulation_builds(), 1);
    }

    #[test]
    fn test_new_request_resets_progress() {
        let mut controller = controller();
        let mut surface = RgbImage::new(W, H);
        let frame = frame();

        controller.request("happy".into());
        for _ in 0..5 {
            controller.render_cycle(Some(&frame), &mut surface);
        }
        assert!(controller.progress() > 0.4);

        controller.request("neutral".into());
        assert_eq!(controller.progress(), 0.0);
        controller.request("happy".into());
        let outcome = controller.render_cycle(Some(&frame), &mut surface);
        assert!(matches!(outcome, CycleOutcome::Warped { progress } if progress < 0.2));
    }

    #[test]
    fn test_surface_resize_rebuilds_triangulation() {
        let mut controller = controller();
        let frame = frame();
        controller.request("happy".into());

        let mut small = RgbImage::new(W, H);
        controller.render_cycle(Some(&frame), &mut small);
        controller.render_cycle(Some(&frame), &mut small);
        let mut large = RgbImage::new(W * 2, H * 2);
        controller.render_cycle(Some(&frame), &mut large);
        controller.render_cycle(Some(&frame), &mut large);

        assert_eq!(controller.warper().triangulation_builds(), 2);
        assert_eq!(controller.warper().dimensions(), (W * 2, H * 2));
    }

    #[test]
    fn test_observer_sees_cycles_and_switches() {
        let mut controller = controller().with_observer(Recorder::default());
        let mut surface = RgbImage::new(W, H);
        let frame = frame();

        controller.render_cycle(None, &mut surface);
        controller.request("happy".into());
        controller.request("happy".into());
        controller.render_cycle(Some(&frame), &mut surface);

        let recorder = controller.observer();
        assert_eq!(recorder.switches, vec![("neutral".to_string(), "happy".to_string())]);
        assert_eq!(recorder.outcomes.len(), 2);
        assert_eq!(recorder.outcomes[0], CycleOutcome::Skipped);
        assert!(matches!(recorder.outcomes[1], CycleOutcome::Warped { .. }));
    }

    #[test]
    fn test_metrics_observer_without_recorder() {
        let mut controller = controller().with_observer(crate::MetricsObserver::new());
        let mut surface = RgbImage::new(W, H);
        controller.request("happy".into());
        let outcome = controller.render_cycle(Some(&frame()), &mut surface);
        assert_eq!(outcome.label(), "warped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_until_shutdown() {
        let mut controller = controller();
        let mut surface = RgbImage::new(W, H);
        let mut source =
            FrameSequence::new(vec![frame().image], SequenceConfig::idle_loop(30.0)).unwrap();

        let (request_tx, request_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = async move {
            request_tx.send("happy".into()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            shutdown_tx.send(true).unwrap();
            // Keep the request channel open until shutdown has been seen
            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(request_tx);
        };

        let (summary, ()) = tokio::join!(
            controller.run(&mut source, &mut surface, request_rx, shutdown_rx),
            driver
        );

        assert_eq!(summary.switches, 1);
        assert!(summary.cycles >= 14 && summary.cycles <= 17, "{:?}", summary);
        assert!(summary.warped >= 10);
        assert_eq!(summary.skipped, 0);
        assert!(controller.target().name() == "happy");
        assert_eq!(controller.progress(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_stops_when_requests_close() {
        let mut controller = controller();
        let mut surface = RgbImage::new(W, H);
        let mut source = FrameSequence::still(frame().image);

        let (request_tx, request_rx) = mpsc::channel::<ExpressionTarget>(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(request_tx);

        let summary = controller
            .run(&mut source, &mut surface, request_rx, shutdown_rx)
            .await;
        assert_eq!(summary.switches, 0);
    }
}
