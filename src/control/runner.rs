//! The perception-to-actuation loop.
//!
//! One iteration per frame, strictly ordered:
//! 1. acquire a frame (failure skips the rest of the iteration)
//! 2. detect
//! 3. locate the target
//! 4. decide an instruction
//! 5. dispatch it, discarding any delivery error
//! 6. render the overlay
//! 7. apply at most one operator event
//!
//! Single-threaded. The only blocking points are acquisition and dispatch,
//! each bounded by its collaborator's timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::control::locator::{locate_target, AnchorPoint};
use crate::control::mode::{ModeMachine, Transition};
use crate::control::policy::CommandPolicy;
use crate::detect::{DetectorBackend, LabelMap};
use crate::dispatch::{DispatchStats, Dispatcher};
use crate::ingest::FrameSource;
use crate::input::{InputEvent, InputSource};
use crate::instruction::Instruction;
use crate::overlay::{ClassPalette, FrameRate, Overlay, OverlayRenderer};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Shared running flag.
///
/// The loop checks it once per iteration. Clones can be handed to signal
/// handlers to stop the loop from outside.
#[derive(Clone, Debug)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// What one call to `ControlLoop::step` did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// False when acquisition failed and the iteration was skipped.
    pub acquired: bool,
    pub detections: usize,
    pub anchor: Option<AnchorPoint>,
    /// The frame's policy instruction, if one was dispatched.
    pub instruction: Option<Instruction>,
    pub event: Option<InputEvent>,
    /// One-off instruction dispatched by a sub-mode transition.
    pub side_effect: Option<Instruction>,
}

impl IterationReport {
    pub fn skipped(&self) -> bool {
        !self.acquired
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub frames: u64,
    pub skipped: u64,
    pub detector_errors: u64,
    pub dispatch: DispatchStats,
}

pub struct ControlLoop<S, D, C, I, R> {
    source: S,
    detector: D,
    dispatcher: C,
    input: I,
    renderer: R,
    machine: ModeMachine,
    policy: CommandPolicy,
    labels: LabelMap,
    palette: ClassPalette,
    frame_rate: FrameRate,
    running: StopHandle,
    stats: LoopStats,
    last_health_log: Instant,
}

impl<S, D, C, I, R> ControlLoop<S, D, C, I, R>
where
    S: FrameSource,
    D: DetectorBackend,
    C: Dispatcher,
    I: InputSource,
    R: OverlayRenderer,
{
    pub fn new(source: S, detector: D, dispatcher: C, input: I, renderer: R) -> Self {
        Self {
            source,
            detector,
            dispatcher,
            input,
            renderer,
            machine: ModeMachine::new(),
            policy: CommandPolicy::default(),
            labels: LabelMap::default(),
            palette: ClassPalette::default(),
            frame_rate: FrameRate::new(),
            running: StopHandle::new(),
            stats: LoopStats::default(),
            last_health_log: Instant::now(),
        }
    }

    pub fn with_policy(mut self, policy: CommandPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_labels(mut self, labels: LabelMap) -> Self {
        self.palette = ClassPalette::new(labels.len());
        self.labels = labels;
        self
    }

    pub fn machine(&self) -> &ModeMachine {
        &self.machine
    }

    pub fn dispatcher(&self) -> &C {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut C {
        &mut self.dispatcher
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_running()
    }

    /// Run one iteration. Never fails: every collaborator error is handled here.
    pub fn step(&mut self) -> IterationReport {
        self.stats.iterations += 1;
        let mut report = IterationReport::default();

        let Some(frame) = self.source.get_frame() else {
            self.stats.skipped += 1;
            self.log_health();
            return report;
        };
        report.acquired = true;
        self.stats.frames += 1;
        let fps = self.frame_rate.tick();

        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                self.stats.detector_errors += 1;
                log::warn!("{} detector failed: {:#}", self.detector.name(), e);
                Vec::new()
            }
        };
        report.detections = detections.len();

        let anchor = locate_target(&detections, self.machine.mode());
        report.anchor = anchor;

        if let Some(instruction) = self
            .policy
            .decide(&self.machine, anchor, frame.width())
        {
            self.send(instruction);
            report.instruction = Some(instruction);
        }

        let overlay = Overlay::build(
            &self.machine,
            &detections,
            anchor,
            &self.labels,
            &self.palette,
            fps,
        );
        if let Err(e) = self.renderer.render(&frame, &overlay) {
            log::warn!("overlay render failed: {:#}", e);
        }

        if let Some(event) = self.input.poll() {
            report.event = Some(event);
            report.side_effect = self.handle_event(event);
        }

        self.log_health();
        report
    }

    /// Iterate until a quit event or an external stop, then release the display.
    pub fn run(&mut self) -> LoopStats {
        log::info!(
            "control loop running ({}, detector={}, threshold={:.2})",
            self.machine,
            self.detector.name(),
            self.detector.confidence_threshold()
        );
        while self.running.is_running() {
            self.step();
        }
        if let Err(e) = self.renderer.close() {
            log::warn!("overlay close failed: {:#}", e);
        }
        log::info!(
            "control loop stopped after {} frames ({} skipped, {} sent, {} dropped)",
            self.stats.frames,
            self.stats.skipped,
            self.stats.dispatch.sent,
            self.stats.dispatch.dropped
        );
        self.stats
    }

    fn handle_event(&mut self, event: InputEvent) -> Option<Instruction> {
        let transition = self.machine.apply(event);
        match transition {
            Transition::Quit => {
                log::info!("quit requested");
                self.running.stop();
            }
            Transition::ModeChanged(_) | Transition::SubModeChanged { .. } => {
                log::info!("switched to {}", self.machine);
            }
            Transition::Ignored => log::debug!("ignoring {:?} in {}", event, self.machine),
        }
        let side_effect = transition.side_effect();
        if let Some(instruction) = side_effect {
            self.send(instruction);
        }
        side_effect
    }

    fn send(&mut self, instruction: Instruction) {
        let outcome = self.dispatcher.dispatch(instruction);
        self.stats.dispatch.record(&outcome);
        if let Err(e) = outcome {
            log::debug!("dropped {}: {:#}", instruction, e);
        }
    }

    fn log_health(&mut self) {
        if self.last_health_log.elapsed() < HEALTH_LOG_INTERVAL {
            return;
        }
        let camera = self.source.stats();
        log::info!(
            "health camera_healthy={} camera_failures={} frames={} skipped={} \
             detector_errors={} fps={} sent={} dropped={} mode={}",
            self.source.is_healthy(),
            camera.failures,
            self.stats.frames,
            self.stats.skipped,
            self.stats.detector_errors,
            self.frame_rate
                .current()
                .map(|fps| format!("{:.1}", fps))
                .unwrap_or_else(|| "--".to_string()),
            self.stats.dispatch.sent,
            self.stats.dispatch.dropped,
            self.machine
        );
        self.last_health_log = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection, ScriptedBackend};
    use crate::dispatch::RecordingDispatcher;
    use crate::ingest::{Acquisition, SyntheticSource};
    use crate::input::ScriptedInput;
    use crate::overlay::LogRenderer;

    type TestLoop = ControlLoop<
        SyntheticSource,
        ScriptedBackend,
        RecordingDispatcher,
        ScriptedInput,
        LogRenderer,
    >;

    fn person(x_min: i32, x_max: i32) -> Detection {
        Detection::new(0, 0.9, BoundingBox::new(x_min, 100, x_max, 300))
    }

    fn build(
        script: Vec<Acquisition>,
        frames: Vec<Vec<Detection>>,
        events: Vec<Option<InputEvent>>,
    ) -> TestLoop {
        ControlLoop::new(
            SyntheticSource::new(640, 480).with_script(script),
            ScriptedBackend::new(0.5).with_frames(frames),
            RecordingDispatcher::new(),
            ScriptedInput::new(events),
            LogRenderer::new(),
        )
    }

    #[test]
    fn detection_mode_dispatches_nothing() {
        let mut control = build(vec![], vec![vec![person(0, 20)]; 3], vec![]);
        for _ in 0..3 {
            let report = control.step();
            assert!(report.acquired);
            assert_eq!(report.instruction, None);
        }
        assert!(control.dispatcher().attempts().is_empty());
    }

    #[test]
    fn event_applies_after_dispatch_of_same_iteration() {
        let mut control = build(
            vec![],
            vec![vec![person(100, 200)], vec![person(100, 200)]],
            vec![Some(InputEvent::ToggleMode), None],
        );
        let first = control.step();
        assert_eq!(first.instruction, None);
        assert!(control.machine().is_following());

        let second = control.step();
        assert_eq!(second.instruction, Some(Instruction::SteerLeftServo));
        assert_eq!(control.dispatcher().attempts(), &[Instruction::SteerLeftServo]);
    }

    #[test]
    fn detector_failure_halts_vehicle_in_follow_mode() {
        let mut detector = ScriptedBackend::new(0.5);
        detector.push(vec![]).push_failure("inference timeout");
        let mut control = ControlLoop::new(
            SyntheticSource::new(640, 480),
            detector,
            RecordingDispatcher::new(),
            ScriptedInput::new([Some(InputEvent::ToggleMode)]),
            LogRenderer::new(),
        );
        control.step();
        let report = control.step();
        assert!(report.acquired);
        assert_eq!(report.instruction, Some(Instruction::Stop));
        assert_eq!(control.stats().detector_errors, 1);
    }

    #[test]
    fn quit_stops_run_and_closes_renderer() {
        let mut control = build(vec![], vec![], vec![None, None, Some(InputEvent::Quit)]);
        let stats = control.run();
        assert_eq!(stats.iterations, 3);
        assert!(!control.is_running());
        assert_eq!(control.renderer().frames(), 3);
    }

    #[test]
    fn health_is_logged_while_camera_is_down() {
        let mut control = build(vec![Acquisition::Failure; 3], vec![], vec![]);
        let stale = Instant::now()
            .checked_sub(Duration::from_secs(10))
            .expect("monotonic clock older than 10s");
        control.last_health_log = stale;

        for _ in 0..3 {
            assert!(control.step().skipped());
        }

        assert!(control.last_health_log > stale);
        assert!(control.last_health_log.elapsed() < HEALTH_LOG_INTERVAL);
        assert_eq!(control.stats().skipped, 3);
        assert_eq!(control.source().stats().failures, 3);
        assert!(!control.source().is_healthy());
    }

    #[test]
    fn stop_handle_stops_loop_from_outside() {
        let mut control = build(vec![], vec![], vec![]);
        let handle = control.stop_handle();
        handle.stop();
        let stats = control.run();
        assert_eq!(stats.iterations, 0);
    }
}
