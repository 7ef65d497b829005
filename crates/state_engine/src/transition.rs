//! Phased transitions: pre work, scene loads, mid work, post work.
//!
//! A [`TransitionSequencer`] is a component describing one transition into a
//! target state. [`TransitionSequencer::transition`] starts it; the plugin then
//! calls [`TransitionSequencer::tick`] once per frame until it is idle again.
//!
//! Phase order:
//! 1. `PreTransition`: pre work items, one after another.
//! 2. `LoadingScenes`: optional delay, then each scene load in order (the
//!    first replaces loaded scenes unless loading is additive). One frame is
//!    yielded after every load.
//! 3. `MidTransition`: mid work items, then an optional delay.
//! 4. `PostTransition`: post work items, then back to `Idle`.
//!
//! The target state is switched on according to [`BlendMode`]. A failed scene
//! load aborts the sequence and returns it to `Idle`.

use std::fmt;
use std::time::Duration;

use bevy::prelude::*;

use crate::blend::BlendTask;
use crate::definition::StateId;
use crate::engine::StateEngine;
use crate::notifications::TransitionFinished;
use crate::scene_loading::{
    SceneLoadError, SceneLoadMode, SceneLoadStatus, SceneLoadTicket, SceneLoader,
    SceneLoaderResource, SceneRef,
};

// =============================================================================
// Public types
// =============================================================================

/// When the target state is switched on during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Before the pre work runs.
    SwitchOnStart,
    /// After the scene loads, before the mid work.
    #[default]
    SwitchInMiddle,
    /// After the mid work and delay, before the post work.
    SwitchOnEnd,
    /// Immediately, alongside the current states; override resolution runs
    /// when the sequencer returns to idle.
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPhase {
    #[default]
    Idle,
    PreTransition,
    LoadingScenes,
    MidTransition,
    PostTransition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// The sequencer is already running; the request was dropped.
    TransitionInProgress,
    /// The target state is blocked; the request was dropped.
    StateBlocked(StateId),
    /// A scene load failed and the sequence was aborted.
    SceneLoad(SceneLoadError),
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::TransitionInProgress => write!(f, "A transition is already in progress"),
            TransitionError::StateBlocked(id) => write!(f, "Target state {id} is blocked"),
            TransitionError::SceneLoad(e) => write!(f, "Scene load failed: {e}"),
        }
    }
}

impl std::error::Error for TransitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransitionError::SceneLoad(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SceneLoadError> for TransitionError {
    fn from(e: SceneLoadError) -> Self {
        TransitionError::SceneLoad(e)
    }
}

/// Outcome of one [`TransitionSequencer::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionStatus {
    /// Nothing is running.
    Idle,
    /// Suspended in the given phase until a later frame.
    Running(TransitionPhase),
    /// The sequence finished this frame.
    Completed,
    /// The sequence was aborted this frame and is idle again.
    Aborted(TransitionError),
}

// =============================================================================
// Work items
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    Pending,
    Done,
}

/// What a work item sees while it is polled.
pub struct WorkContext<'a> {
    pub engine: &'a mut StateEngine,
    /// Real time since the previous frame.
    pub delta: Duration,
    /// The sequencer's target state.
    pub target: StateId,
}

/// Cooperative work attached to a transition phase.
///
/// Items in a phase run strictly one after another: the next item is not
/// polled until the current one returns [`WorkStatus::Done`]. Items are kept
/// across transitions; `start` runs each time an item begins.
pub trait TransitionWork: Send + Sync {
    fn start(&mut self) {}

    fn poll(&mut self, cx: &mut WorkContext<'_>) -> WorkStatus;
}

/// Work item built from a closure, see [`work_fn`].
pub struct WorkFn<F>(F);

/// Wrap a polling closure as a work item.
pub fn work_fn<F>(f: F) -> WorkFn<F>
where
    F: FnMut(&mut WorkContext<'_>) -> WorkStatus + Send + Sync,
{
    WorkFn(f)
}

impl<F> TransitionWork for WorkFn<F>
where
    F: FnMut(&mut WorkContext<'_>) -> WorkStatus + Send + Sync,
{
    fn poll(&mut self, cx: &mut WorkContext<'_>) -> WorkStatus {
        (self.0)(cx)
    }
}

/// One-shot callback, finishes on its first poll.
struct Callback<F>(F);

impl<F> TransitionWork for Callback<F>
where
    F: FnMut(&mut StateEngine) + Send + Sync,
{
    fn poll(&mut self, cx: &mut WorkContext<'_>) -> WorkStatus {
        (self.0)(cx.engine);
        WorkStatus::Done
    }
}

/// Waits for a span of real time.
#[derive(Debug, Clone)]
pub struct WaitFor {
    duration: Duration,
    elapsed: Duration,
}

impl WaitFor {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            elapsed: Duration::ZERO,
        }
    }
}

impl TransitionWork for WaitFor {
    fn start(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn poll(&mut self, cx: &mut WorkContext<'_>) -> WorkStatus {
        if self.elapsed >= self.duration {
            return WorkStatus::Done;
        }
        self.elapsed += cx.delta;
        WorkStatus::Pending
    }
}

/// Waits a number of frames.
#[derive(Debug, Clone)]
pub struct WaitFrames {
    frames: u32,
    remaining: u32,
}

impl WaitFrames {
    pub fn new(frames: u32) -> Self {
        Self {
            frames,
            remaining: frames,
        }
    }
}

impl TransitionWork for WaitFrames {
    fn start(&mut self) {
        self.remaining = self.frames;
    }

    fn poll(&mut self, _cx: &mut WorkContext<'_>) -> WorkStatus {
        if self.remaining == 0 {
            return WorkStatus::Done;
        }
        self.remaining -= 1;
        WorkStatus::Pending
    }
}

// =============================================================================
// Sequencer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Pre(usize),
    /// `None` until the first frame of the delay has been yielded.
    BeforeLoad(Option<Duration>),
    LoadScene {
        index: usize,
        ticket: Option<SceneLoadTicket>,
    },
    Mid(usize),
    AfterLoad(Option<Duration>),
    Post(usize),
}

impl Step {
    fn phase(self) -> TransitionPhase {
        match self {
            Step::Pre(_) => TransitionPhase::PreTransition,
            Step::BeforeLoad(_) | Step::LoadScene { .. } => TransitionPhase::LoadingScenes,
            Step::Mid(_) | Step::AfterLoad(_) => TransitionPhase::MidTransition,
            Step::Post(_) => TransitionPhase::PostTransition,
        }
    }
}

#[derive(Component)]
pub struct TransitionSequencer {
    next_state: StateId,
    blend_mode: BlendMode,
    additive_scene_loading: bool,
    before_scene_load_delay: Duration,
    after_scene_load_delay: Duration,
    scenes: Vec<SceneRef>,
    pre_work: Vec<Box<dyn TransitionWork>>,
    mid_work: Vec<Box<dyn TransitionWork>>,
    post_work: Vec<Box<dyn TransitionWork>>,
    step: Option<Step>,
    work_started: bool,
    blend: Option<BlendTask>,
}

impl TransitionSequencer {
    pub fn new(next_state: StateId) -> Self {
        Self {
            next_state,
            blend_mode: BlendMode::default(),
            additive_scene_loading: false,
            before_scene_load_delay: Duration::ZERO,
            after_scene_load_delay: Duration::ZERO,
            scenes: Vec::new(),
            pre_work: Vec::new(),
            mid_work: Vec::new(),
            post_work: Vec::new(),
            step: None,
            work_started: false,
            blend: None,
        }
    }

    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    /// Load every scene additively instead of replacing with the first one.
    pub fn with_additive_loading(mut self, additive: bool) -> Self {
        self.additive_scene_loading = additive;
        self
    }

    /// Delays in seconds around the scene loads. Negative values clamp to zero.
    pub fn with_delays(mut self, before_load: f32, after_load: f32) -> Self {
        self.before_scene_load_delay = secs(before_load);
        self.after_scene_load_delay = secs(after_load);
        self
    }

    pub fn with_scenes<I, S>(mut self, scenes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SceneRef>,
    {
        self.scenes.extend(scenes.into_iter().map(Into::into));
        self
    }

    /// Insert a scene at position `order` (clamped to the end of the list).
    pub fn add_scene(&mut self, scene: impl Into<SceneRef>, order: usize) {
        let order = order.min(self.scenes.len());
        self.scenes.insert(order, scene.into());
    }

    pub fn add_pre_work(&mut self, work: impl TransitionWork + 'static) {
        self.pre_work.push(Box::new(work));
    }

    pub fn add_mid_work(&mut self, work: impl TransitionWork + 'static) {
        self.mid_work.push(Box::new(work));
    }

    pub fn add_post_work(&mut self, work: impl TransitionWork + 'static) {
        self.post_work.push(Box::new(work));
    }

    pub fn add_pre_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut StateEngine) + Send + Sync + 'static,
    {
        self.add_pre_work(Callback(callback));
    }

    pub fn add_mid_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut StateEngine) + Send + Sync + 'static,
    {
        self.add_mid_work(Callback(callback));
    }

    pub fn add_post_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut StateEngine) + Send + Sync + 'static,
    {
        self.add_post_work(Callback(callback));
    }

    pub fn next_state(&self) -> StateId {
        self.next_state
    }

    /// Retarget the sequencer. Has no effect on a transition already running.
    pub fn set_next_state(&mut self, state: StateId) {
        self.next_state = state;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn scenes(&self) -> &[SceneRef] {
        &self.scenes
    }

    pub fn phase(&self) -> TransitionPhase {
        self.step.map_or(TransitionPhase::Idle, Step::phase)
    }

    pub fn is_transitioning(&self) -> bool {
        self.step.is_some()
    }

    pub fn is_loading_scene(&self) -> bool {
        matches!(self.step, Some(Step::LoadScene { .. }))
    }

    /// Start the transition. Rejected while another one is running or while
    /// the target state is blocked; a rejected request is simply dropped.
    pub fn transition(&mut self, engine: &mut StateEngine) -> Result<(), TransitionError> {
        let name = engine.registry().name(self.next_state).to_string();
        if self.is_transitioning() {
            warn!("Transition to '{name}' requested while another transition is running, ignoring");
            return Err(TransitionError::TransitionInProgress);
        }
        if engine.is_blocked(self.next_state) {
            info!("Transition to '{name}' refused: state is blocked");
            return Err(TransitionError::StateBlocked(self.next_state));
        }

        info!("Transition to '{name}' started ({:?})", self.blend_mode);
        match self.blend_mode {
            BlendMode::SwitchOnStart => {
                engine.set_state(self.next_state);
            }
            BlendMode::Blend => {
                self.blend = Some(engine.blend_into_state(self.next_state, 0.0));
            }
            BlendMode::SwitchInMiddle | BlendMode::SwitchOnEnd => {}
        }
        self.work_started = false;
        self.step = Some(Step::Pre(0));
        Ok(())
    }

    /// Advance the running transition by one frame.
    pub fn tick(
        &mut self,
        engine: &mut StateEngine,
        loader: &mut dyn SceneLoader,
        delta: Duration,
    ) -> TransitionStatus {
        let Some(mut step) = self.step.take() else {
            return TransitionStatus::Idle;
        };
        let target = self.next_state;

        loop {
            step = match step {
                Step::Pre(i) => {
                    let mut cx = WorkContext {
                        engine: &mut *engine,
                        delta,
                        target,
                    };
                    match poll_work(&mut self.pre_work, i, &mut self.work_started, &mut cx) {
                        Some(WorkStatus::Pending) => return self.suspend(step),
                        Some(WorkStatus::Done) => Step::Pre(i + 1),
                        None => Step::BeforeLoad(None),
                    }
                }
                Step::BeforeLoad(elapsed) => match wait(self.before_scene_load_delay, elapsed, delta) {
                    Some(pending) => return self.suspend(Step::BeforeLoad(Some(pending))),
                    None => Step::LoadScene {
                        index: 0,
                        ticket: None,
                    },
                },
                Step::LoadScene { index, ticket } => {
                    if index >= self.scenes.len() {
                        if self.blend_mode == BlendMode::SwitchInMiddle {
                            engine.set_state(target);
                        }
                        Step::Mid(0)
                    } else {
                        match ticket {
                            None => {
                                let mode = if index == 0 && !self.additive_scene_loading {
                                    SceneLoadMode::Single
                                } else {
                                    SceneLoadMode::Additive
                                };
                                match loader.begin_load(&self.scenes[index], mode) {
                                    Ok(ticket) => Step::LoadScene {
                                        index,
                                        ticket: Some(ticket),
                                    },
                                    Err(e) => return self.abort(engine, e),
                                }
                            }
                            Some(ticket) => match loader.poll_load(ticket) {
                                SceneLoadStatus::Loading => return self.suspend(step),
                                SceneLoadStatus::Loaded => {
                                    info!("Loaded {}", self.scenes[index]);
                                    engine.notify_scene_changed();
                                    return self.suspend(Step::LoadScene {
                                        index: index + 1,
                                        ticket: None,
                                    });
                                }
                                SceneLoadStatus::Failed(e) => return self.abort(engine, e),
                            },
                        }
                    }
                }
                Step::Mid(i) => {
                    let mut cx = WorkContext {
                        engine: &mut *engine,
                        delta,
                        target,
                    };
                    match poll_work(&mut self.mid_work, i, &mut self.work_started, &mut cx) {
                        Some(WorkStatus::Pending) => return self.suspend(step),
                        Some(WorkStatus::Done) => Step::Mid(i + 1),
                        None => Step::AfterLoad(None),
                    }
                }
                Step::AfterLoad(elapsed) => match wait(self.after_scene_load_delay, elapsed, delta) {
                    Some(pending) => return self.suspend(Step::AfterLoad(Some(pending))),
                    None => {
                        if self.blend_mode == BlendMode::SwitchOnEnd {
                            engine.set_state(target);
                        }
                        Step::Post(0)
                    }
                },
                Step::Post(i) => {
                    let mut cx = WorkContext {
                        engine: &mut *engine,
                        delta,
                        target,
                    };
                    match poll_work(&mut self.post_work, i, &mut self.work_started, &mut cx) {
                        Some(WorkStatus::Pending) => return self.suspend(step),
                        Some(WorkStatus::Done) => Step::Post(i + 1),
                        None => return self.finish(engine),
                    }
                }
            };
        }
    }

    fn suspend(&mut self, step: Step) -> TransitionStatus {
        self.step = Some(step);
        TransitionStatus::Running(step.phase())
    }

    fn finish(&mut self, engine: &mut StateEngine) -> TransitionStatus {
        self.reset(engine);
        info!(
            "Transition to '{}' complete, active: [{}]",
            engine.registry().name(self.next_state),
            engine.describe_active()
        );
        TransitionStatus::Completed
    }

    fn abort(&mut self, engine: &mut StateEngine, e: SceneLoadError) -> TransitionStatus {
        error!(
            "Transition to '{}' aborted: {e}",
            engine.registry().name(self.next_state)
        );
        self.reset(engine);
        TransitionStatus::Aborted(TransitionError::SceneLoad(e))
    }

    /// Back to idle. A running blend ends here, since its end condition is
    /// the sequencer going idle.
    fn reset(&mut self, engine: &mut StateEngine) {
        self.step = None;
        self.work_started = false;
        if let Some(mut blend) = self.blend.take() {
            blend.settle(engine);
        }
    }
}

fn secs(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f32(value)
    } else {
        Duration::ZERO
    }
}

/// Returns the elapsed time to keep waiting with, or `None` once the delay
/// is over. Entering a non-zero delay always yields one frame first.
fn wait(delay: Duration, elapsed: Option<Duration>, delta: Duration) -> Option<Duration> {
    match elapsed {
        None if delay.is_zero() => None,
        None => Some(Duration::ZERO),
        Some(elapsed) => {
            let elapsed = elapsed + delta;
            (elapsed < delay).then_some(elapsed)
        }
    }
}

fn poll_work(
    list: &mut [Box<dyn TransitionWork>],
    index: usize,
    started: &mut bool,
    cx: &mut WorkContext<'_>,
) -> Option<WorkStatus> {
    let work = list.get_mut(index)?;
    if !*started {
        work.start();
        *started = true;
    }
    let status = work.poll(cx);
    if status == WorkStatus::Done {
        *started = false;
    }
    Some(status)
}

// =============================================================================
// Systems
// =============================================================================

/// Start the transition on the given sequencer entity.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTransition(pub Entity);

pub(crate) fn apply_transition_requests(
    mut requests: EventReader<StartTransition>,
    mut engine: ResMut<StateEngine>,
    mut sequencers: Query<&mut TransitionSequencer>,
) {
    for StartTransition(entity) in requests.read() {
        match sequencers.get_mut(*entity) {
            Ok(mut sequencer) => {
                // Rejections are logged inside `transition`.
                let _ = sequencer.transition(&mut engine);
            }
            Err(_) => warn!("StartTransition for {entity} which has no TransitionSequencer"),
        }
    }
}

pub(crate) fn drive_transitions(
    mut engine: ResMut<StateEngine>,
    mut loader: ResMut<SceneLoaderResource>,
    time: Res<Time<Real>>,
    mut sequencers: Query<(Entity, &mut TransitionSequencer)>,
    mut finished: EventWriter<TransitionFinished>,
) {
    for (entity, mut sequencer) in &mut sequencers {
        if !sequencer.is_transitioning() {
            continue;
        }
        let status = sequencer.tick(&mut engine, loader.0.as_mut(), time.delta());
        if matches!(
            status,
            TransitionStatus::Completed | TransitionStatus::Aborted(_)
        ) {
            finished.send(TransitionFinished { entity, status });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::definition::StateDefinition;
    use crate::registry::StateRegistry;
    use crate::scene_loading::InstantSceneLoader;

    const FRAME: Duration = Duration::from_millis(100);

    fn game() -> StateEngine {
        let mut engine = StateEngine::new(
            StateRegistry::build(vec![
                StateDefinition::new("MainMenu"),
                StateDefinition::new("Playing"),
                StateDefinition::new("Cutscene").do_not_override_any(true),
                StateDefinition::new("Credits").blocked_by(["Cutscene"]),
            ])
            .unwrap(),
        );
        let menu = engine.registry().id_of("MainMenu").unwrap();
        engine.set_state(menu);
        engine
    }

    fn id(engine: &StateEngine, name: &str) -> StateId {
        engine.registry().id_of(name).unwrap()
    }

    /// Tick until idle, returning the final status and the number of ticks.
    fn run(
        seq: &mut TransitionSequencer,
        engine: &mut StateEngine,
        loader: &mut dyn SceneLoader,
    ) -> (TransitionStatus, usize) {
        for n in 1..=1000 {
            let status = seq.tick(engine, loader, FRAME);
            if !matches!(status, TransitionStatus::Running(_)) {
                return (status, n);
            }
        }
        panic!("transition never finished");
    }

    /// Loader that takes a fixed number of polls per scene and can fail one.
    struct SlowLoader {
        polls_per_scene: u32,
        fail_on: Option<SceneRef>,
        in_flight: Vec<(SceneLoadTicket, SceneRef, u32)>,
        next: u64,
        log: Vec<(SceneRef, SceneLoadMode)>,
    }

    impl SlowLoader {
        fn new(polls_per_scene: u32) -> Self {
            Self {
                polls_per_scene,
                fail_on: None,
                in_flight: Vec::new(),
                next: 0,
                log: Vec::new(),
            }
        }
    }

    impl SceneLoader for SlowLoader {
        fn begin_load(
            &mut self,
            scene: &SceneRef,
            mode: SceneLoadMode,
        ) -> Result<SceneLoadTicket, SceneLoadError> {
            self.log.push((scene.clone(), mode));
            let ticket = SceneLoadTicket(self.next);
            self.next += 1;
            self.in_flight.push((ticket, scene.clone(), self.polls_per_scene));
            Ok(ticket)
        }

        fn poll_load(&mut self, ticket: SceneLoadTicket) -> SceneLoadStatus {
            let Some(entry) = self.in_flight.iter_mut().find(|(t, _, _)| *t == ticket) else {
                return SceneLoadStatus::Failed(SceneLoadError::UnknownTicket(ticket));
            };
            if self.fail_on.as_ref() == Some(&entry.1) {
                return SceneLoadStatus::Failed(SceneLoadError::Failed {
                    scene: entry.1.clone(),
                    reason: "missing asset".into(),
                });
            }
            if entry.2 == 0 {
                SceneLoadStatus::Loaded
            } else {
                entry.2 -= 1;
                SceneLoadStatus::Loading
            }
        }
    }

    #[test]
    fn test_empty_transition_switches_and_completes() {
        let mut engine = game();
        let playing = id(&engine, "Playing");
        let mut seq = TransitionSequencer::new(playing);
        let mut loader = InstantSceneLoader::default();

        assert_eq!(seq.phase(), TransitionPhase::Idle);
        seq.transition(&mut engine).unwrap();
        assert_eq!(seq.phase(), TransitionPhase::PreTransition);
        let (status, _) = run(&mut seq, &mut engine, &mut loader);
        assert_eq!(status, TransitionStatus::Completed);
        assert!(engine.is_active(playing));
        assert!(!engine.is_active(id(&engine, "MainMenu")));
        assert_eq!(seq.phase(), TransitionPhase::Idle);
        assert_eq!(seq.tick(&mut engine, &mut loader, FRAME), TransitionStatus::Idle);
    }

    #[test]
    fn test_second_request_rejected_while_running() {
        let mut engine = game();
        let playing = id(&engine, "Playing");
        let mut seq = TransitionSequencer::new(playing);
        seq.add_pre_work(WaitFrames::new(3));
        let mut loader = InstantSceneLoader::default();

        seq.transition(&mut engine).unwrap();
        seq.tick(&mut engine, &mut loader, FRAME);
        assert_eq!(
            seq.transition(&mut engine),
            Err(TransitionError::TransitionInProgress)
        );
        let (status, _) = run(&mut seq, &mut engine, &mut loader);
        assert_eq!(status, TransitionStatus::Completed);
        assert!(engine.is_active(playing));
    }

    #[test]
    fn test_blocked_target_rejected() {
        let mut engine = game();
        engine.set_state(id(&engine, "Cutscene"));
        let credits = id(&engine, "Credits");
        let mut seq = TransitionSequencer::new(credits);
        assert_eq!(
            seq.transition(&mut engine),
            Err(TransitionError::StateBlocked(credits))
        );
        assert!(!seq.is_transitioning());
    }

    #[test]
    fn test_phase_order_and_switch_points() {
        for mode in [
            BlendMode::SwitchOnStart,
            BlendMode::SwitchInMiddle,
            BlendMode::SwitchOnEnd,
            BlendMode::Blend,
        ] {
            let mut engine = game();
            let playing = id(&engine, "Playing");
            let menu = id(&engine, "MainMenu");
            let log: Arc<Mutex<Vec<String>>> = Arc::default();
            let mut seq = TransitionSequencer::new(playing)
                .with_blend_mode(mode)
                .with_scenes(["Level1"]);

            for (phase, tag) in [(0, "pre"), (1, "mid"), (2, "post")] {
                let log = log.clone();
                let record = move |engine: &mut StateEngine| {
                    let state = match (engine.is_active(menu), engine.is_active(playing)) {
                        (true, true) => "both",
                        (false, true) => "playing",
                        (true, false) => "menu",
                        (false, false) => "none",
                    };
                    log.lock().unwrap().push(format!("{tag}:{state}"));
                };
                match phase {
                    0 => seq.add_pre_callback(record),
                    1 => seq.add_mid_callback(record),
                    _ => seq.add_post_callback(record),
                }
            }

            let mut loader = InstantSceneLoader::default();
            seq.transition(&mut engine).unwrap();
            let (status, _) = run(&mut seq, &mut engine, &mut loader);
            assert_eq!(status, TransitionStatus::Completed);
            assert!(engine.is_active(playing));
            assert!(!engine.is_active(menu), "{mode:?} must override the menu by the end");

            let expected = match mode {
                BlendMode::SwitchOnStart => ["pre:playing", "mid:playing", "post:playing"],
                BlendMode::SwitchInMiddle => ["pre:menu", "mid:playing", "post:playing"],
                BlendMode::SwitchOnEnd => ["pre:menu", "mid:menu", "post:playing"],
                BlendMode::Blend => ["pre:both", "mid:both", "post:both"],
            };
            assert_eq!(*log.lock().unwrap(), expected, "mode {mode:?}");
        }
    }

    #[test]
    fn test_work_items_run_sequentially() {
        let mut engine = game();
        let mut seq = TransitionSequencer::new(id(&engine, "Playing"));
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();

        let first_log = log.clone();
        let mut first_polls = 0;
        seq.add_pre_work(work_fn(move |_cx| {
            first_polls += 1;
            if first_polls < 3 {
                first_log.lock().unwrap().push("first");
                WorkStatus::Pending
            } else {
                WorkStatus::Done
            }
        }));
        let second_log = log.clone();
        seq.add_pre_work(work_fn(move |_cx| {
            second_log.lock().unwrap().push("second");
            WorkStatus::Done
        }));

        let mut loader = InstantSceneLoader::default();
        seq.transition(&mut engine).unwrap();
        run(&mut seq, &mut engine, &mut loader);
        assert_eq!(*log.lock().unwrap(), vec!["first", "first", "second"]);
    }

    #[test]
    fn test_scene_modes_and_scene_notifications() {
        let mut engine = game();
        let mut seq = TransitionSequencer::new(id(&engine, "Playing"))
            .with_scenes([SceneRef::from("Level1"), SceneRef::Index(4)]);
        seq.add_scene("Ui", 1);
        let mut loader = SlowLoader::new(2);

        seq.transition(&mut engine).unwrap();
        assert_eq!(
            seq.tick(&mut engine, &mut loader, FRAME),
            TransitionStatus::Running(TransitionPhase::LoadingScenes)
        );
        assert!(seq.is_loading_scene());
        let (status, _) = run(&mut seq, &mut engine, &mut loader);
        assert_eq!(status, TransitionStatus::Completed);
        assert_eq!(
            loader.log,
            vec![
                (SceneRef::from("Level1"), SceneLoadMode::Single),
                (SceneRef::from("Ui"), SceneLoadMode::Additive),
                (SceneRef::Index(4), SceneLoadMode::Additive),
            ]
        );
        assert_eq!(engine.take_scene_changes(), 3);
    }

    #[test]
    fn test_additive_loading_never_replaces() {
        let mut engine = game();
        let mut seq = TransitionSequencer::new(id(&engine, "Playing"))
            .with_additive_loading(true)
            .with_scenes(["A", "B"]);
        let mut loader = InstantSceneLoader::default();
        seq.transition(&mut engine).unwrap();
        run(&mut seq, &mut engine, &mut loader);
        assert!(loader
            .history()
            .iter()
            .all(|(_, mode)| *mode == SceneLoadMode::Additive));
    }

    #[test]
    fn test_scene_failure_aborts_to_idle() {
        let mut engine = game();
        let playing = id(&engine, "Playing");
        let mut seq = TransitionSequencer::new(playing).with_scenes(["Level1", "Broken", "Level3"]);
        let post_ran = Arc::new(Mutex::new(false));
        let flag = post_ran.clone();
        seq.add_post_callback(move |_| *flag.lock().unwrap() = true);

        let mut loader = SlowLoader::new(0);
        loader.fail_on = Some(SceneRef::from("Broken"));

        seq.transition(&mut engine).unwrap();
        let (status, _) = run(&mut seq, &mut engine, &mut loader);
        assert!(matches!(
            status,
            TransitionStatus::Aborted(TransitionError::SceneLoad(SceneLoadError::Failed { .. }))
        ));
        assert_eq!(seq.phase(), TransitionPhase::Idle);
        assert!(!engine.is_active(playing), "SwitchInMiddle never reached");
        assert!(!*post_ran.lock().unwrap());
        assert_eq!(loader.log.len(), 2, "third scene never started");

        // The sequencer can be used again.
        loader.fail_on = None;
        seq.transition(&mut engine).unwrap();
        let (status, _) = run(&mut seq, &mut engine, &mut loader);
        assert_eq!(status, TransitionStatus::Completed);
        assert!(engine.is_active(playing));
    }

    #[test]
    fn test_blend_settles_when_aborted() {
        let mut engine = game();
        let (menu, playing) = (id(&engine, "MainMenu"), id(&engine, "Playing"));
        let mut seq = TransitionSequencer::new(playing)
            .with_blend_mode(BlendMode::Blend)
            .with_scenes(["Broken"]);
        let mut loader = SlowLoader::new(0);
        loader.fail_on = Some(SceneRef::from("Broken"));

        seq.transition(&mut engine).unwrap();
        assert!(engine.is_active(menu) && engine.is_active(playing));
        run(&mut seq, &mut engine, &mut loader);
        assert!(!engine.is_active(menu));
        assert!(engine.is_active(playing));
    }

    #[test]
    fn test_delays_hold_their_phase() {
        let mut engine = game();
        let playing = id(&engine, "Playing");
        let mut seq = TransitionSequencer::new(playing).with_delays(0.25, 0.15);
        let mut loader = InstantSceneLoader::default();
        seq.transition(&mut engine).unwrap();

        let mut phases = Vec::new();
        loop {
            match seq.tick(&mut engine, &mut loader, FRAME) {
                TransitionStatus::Running(phase) => phases.push(phase),
                TransitionStatus::Completed => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        // 100ms frames: the 0.25s delay holds three of them, the 0.15s delay two.
        let loading = phases
            .iter()
            .filter(|p| **p == TransitionPhase::LoadingScenes)
            .count();
        let mid = phases
            .iter()
            .filter(|p| **p == TransitionPhase::MidTransition)
            .count();
        assert_eq!(loading, 3);
        assert_eq!(mid, 2);
        assert!(engine.is_active(playing));
    }

    #[test]
    fn test_negative_delays_clamp_to_zero() {
        let mut engine = game();
        let mut seq = TransitionSequencer::new(id(&engine, "Playing")).with_delays(-1.0, f32::NAN);
        let mut loader = InstantSceneLoader::default();
        seq.transition(&mut engine).unwrap();
        assert_eq!(
            seq.tick(&mut engine, &mut loader, FRAME),
            TransitionStatus::Completed
        );
    }

    #[test]
    fn test_wait_for_restarts_each_transition() {
        let mut engine = game();
        let (menu, playing) = (id(&engine, "MainMenu"), id(&engine, "Playing"));
        let mut seq = TransitionSequencer::new(playing);
        seq.add_mid_work(WaitFor::new(Duration::from_millis(250)));
        let mut loader = InstantSceneLoader::default();

        seq.transition(&mut engine).unwrap();
        let (_, first) = run(&mut seq, &mut engine, &mut loader);

        engine.set_state(menu);
        seq.transition(&mut engine).unwrap();
        let (_, second) = run(&mut seq, &mut engine, &mut loader);
        assert_eq!(first, second);
        assert!(first > 1);
    }

    #[test]
    fn test_transition_error_display() {
        let msg = format!("{}", TransitionError::TransitionInProgress);
        assert!(msg.contains("already in progress"), "got: {msg}");
        let err = TransitionError::from(SceneLoadError::NotFound(SceneRef::Index(2)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
