//! Timed blend transitions.
//!
//! [`StateEngine::blend_into_state`] enables a state next to whatever is
//! already active and hands back a [`BlendTask`]. The task is polled once per
//! frame until its end condition holds or its timeout elapses; then override
//! resolution runs for the blended state and a final notification fires.
//!
//! [`StateBlends`] schedules standalone blends with boxed end conditions.
//! Transition sequencers own and drive their blend directly.

use std::time::Duration;

use bevy::prelude::*;

use crate::definition::StateId;
use crate::engine::StateEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendStatus {
    Blending,
    /// Override resolution has run. `timed_out` is true when the timeout,
    /// not the end condition, ended the blend.
    Settled { timed_out: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendTask {
    state: StateId,
    timeout: Option<Duration>,
    elapsed: Duration,
    settled: bool,
}

impl BlendTask {
    pub(crate) fn new(state: StateId, timeout_secs: f32) -> Self {
        let timeout = (timeout_secs > 0.0 && timeout_secs.is_finite())
            .then(|| Duration::from_secs_f32(timeout_secs));
        Self {
            state,
            timeout,
            elapsed: Duration::ZERO,
            settled: false,
        }
    }

    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Advance by one frame. Settles when `end_condition` holds or the
    /// timeout elapses; polling a settled task is a no-op.
    pub fn poll(
        &mut self,
        engine: &mut StateEngine,
        delta: Duration,
        end_condition: impl FnOnce(&StateEngine) -> bool,
    ) -> BlendStatus {
        if self.settled {
            return BlendStatus::Settled { timed_out: false };
        }
        if end_condition(engine) {
            self.settle(engine);
            return BlendStatus::Settled { timed_out: false };
        }
        self.elapsed += delta;
        if let Some(timeout) = self.timeout {
            if self.elapsed >= timeout {
                debug!(
                    "Blend into '{}' timed out after {:.2}s",
                    engine.registry().name(self.state),
                    self.elapsed.as_secs_f32()
                );
                self.settle(engine);
                return BlendStatus::Settled { timed_out: true };
            }
        }
        BlendStatus::Blending
    }

    /// End the blend now, running override resolution for the blended state.
    pub fn settle(&mut self, engine: &mut StateEngine) {
        if self.settled {
            return;
        }
        self.settled = true;
        engine.finish_blend(self.state);
    }
}

/// End condition for a scheduled blend, re-evaluated every frame.
pub type BlendCondition = Box<dyn FnMut(&StateEngine) -> bool + Send + Sync>;

struct ScheduledBlend {
    task: BlendTask,
    condition: BlendCondition,
}

/// Blends started outside a transition, advanced by the plugin each frame.
#[derive(Resource, Default)]
pub struct StateBlends {
    running: Vec<ScheduledBlend>,
}

impl StateBlends {
    /// Start blending into `state` and schedule it until `condition` holds or
    /// `timeout` seconds pass (`<= 0` waits on the condition only).
    pub fn start(
        &mut self,
        engine: &mut StateEngine,
        state: StateId,
        timeout: f32,
        condition: impl FnMut(&StateEngine) -> bool + Send + Sync + 'static,
    ) {
        let task = engine.blend_into_state(state, timeout);
        self.running.push(ScheduledBlend {
            task,
            condition: Box::new(condition),
        });
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Poll every running blend once, dropping the ones that settled.
    pub fn advance(&mut self, engine: &mut StateEngine, delta: Duration) {
        self.running.retain_mut(|blend| {
            let condition = &mut blend.condition;
            let status = blend.task.poll(engine, delta, |e| condition(e));
            status == BlendStatus::Blending
        });
    }
}

pub(crate) fn advance_blends(
    mut engine: ResMut<StateEngine>,
    mut blends: ResMut<StateBlends>,
    time: Res<Time<Real>>,
) {
    if blends.is_empty() {
        return;
    }
    blends.advance(&mut engine, time.delta());
}
