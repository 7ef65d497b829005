//! Entities shown or hidden by the active state set.
//!
//! A [`StateBasedActivity`] pairs an "active" rule with an "inactive" rule.
//! The entity is shown when the inactive rule does not match and the active
//! rule does. [`update_activities`] re-evaluates every activity each frame,
//! writes [`Visibility`] and fires [`ActivityToggled`] on every flip.

use bevy::prelude::*;

use crate::definition::StateId;
use crate::engine::StateEngine;

/// How a list of states is compared against the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMatch {
    /// None of the listed states is active.
    ContainsNone,
    /// At least one listed state is active.
    #[default]
    ContainsOne,
    /// Every listed state is active.
    ContainsAll,
    /// The active set is exactly the listed states.
    MatchExactly,
}

impl StateMatch {
    pub fn evaluate(self, engine: &StateEngine, states: &[StateId]) -> bool {
        match self {
            StateMatch::ContainsNone => !engine.has_any_active(states),
            StateMatch::ContainsOne => engine.has_any_active(states),
            StateMatch::ContainsAll => engine.are_all_active(states, false),
            StateMatch::MatchExactly => engine.are_all_active(states, true),
        }
    }
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct StateBasedActivity {
    pub active_states: Vec<StateId>,
    pub active_match: StateMatch,
    pub inactive_states: Vec<StateId>,
    pub inactive_match: StateMatch,
    /// With no `active_states`, shown unless the inactive rule matches.
    pub active_by_default: bool,
    /// Write the result into the entity's `Visibility`.
    pub control_visibility: bool,
    is_active: Option<bool>,
}

impl Default for StateBasedActivity {
    fn default() -> Self {
        Self {
            active_states: Vec::new(),
            active_match: StateMatch::default(),
            inactive_states: Vec::new(),
            inactive_match: StateMatch::default(),
            active_by_default: false,
            control_visibility: true,
            is_active: None,
        }
    }
}

impl StateBasedActivity {
    /// Shown while any of `states` is active.
    pub fn shown_in(states: impl IntoIterator<Item = StateId>) -> Self {
        Self {
            active_states: states.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Shown unless any of `states` is active.
    pub fn hidden_in(states: impl IntoIterator<Item = StateId>) -> Self {
        Self {
            inactive_states: states.into_iter().collect(),
            active_by_default: true,
            ..Default::default()
        }
    }

    pub fn with_active_match(mut self, rule: StateMatch) -> Self {
        self.active_match = rule;
        self
    }

    pub fn with_inactive(mut self, states: impl IntoIterator<Item = StateId>, rule: StateMatch) -> Self {
        self.inactive_states = states.into_iter().collect();
        self.inactive_match = rule;
        self
    }

    pub fn without_visibility_control(mut self) -> Self {
        self.control_visibility = false;
        self
    }

    /// Result of the last evaluation, `None` before the first one.
    pub fn is_active(&self) -> Option<bool> {
        self.is_active
    }

    pub fn should_be_active(&self, engine: &StateEngine) -> bool {
        if !self.inactive_states.is_empty()
            && self.inactive_match.evaluate(engine, &self.inactive_states)
        {
            return false;
        }
        if self.active_by_default && self.active_states.is_empty() {
            return true;
        }
        self.active_match.evaluate(engine, &self.active_states)
    }
}

/// An activity flipped, or was evaluated for the first time.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityToggled {
    pub entity: Entity,
    pub active: bool,
}

pub(crate) fn update_activities(
    engine: Res<StateEngine>,
    mut activities: Query<(Entity, &mut StateBasedActivity, Option<&mut Visibility>)>,
    mut toggled: EventWriter<ActivityToggled>,
) {
    for (entity, mut activity, visibility) in &mut activities {
        let active = activity.should_be_active(&engine);
        if activity.is_active == Some(active) {
            continue;
        }
        activity.is_active = Some(active);
        debug!(
            "Activity {entity} {}",
            if active { "activated" } else { "deactivated" }
        );
        if activity.control_visibility {
            if let Some(mut visibility) = visibility {
                *visibility = if active {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                };
            }
        }
        toggled.send(ActivityToggled { entity, active });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::StateDefinition;
    use crate::registry::StateRegistry;

    fn engine() -> StateEngine {
        StateEngine::new(
            StateRegistry::build(vec![
                StateDefinition::new("Menu"),
                StateDefinition::new("Playing"),
                StateDefinition::new("Hud").substate_of(["Playing"]),
            ])
            .unwrap(),
        )
    }

    fn ids(engine: &StateEngine) -> (StateId, StateId, StateId) {
        let r = engine.registry();
        (
            r.id_of("Menu").unwrap(),
            r.id_of("Playing").unwrap(),
            r.id_of("Hud").unwrap(),
        )
    }

    #[test]
    fn test_match_rules() {
        let mut engine = engine();
        let (menu, playing, hud) = ids(&engine);
        engine.set_state(playing);
        engine.set_state(hud);

        assert!(StateMatch::ContainsOne.evaluate(&engine, &[menu, hud]));
        assert!(!StateMatch::ContainsNone.evaluate(&engine, &[menu, hud]));
        assert!(StateMatch::ContainsNone.evaluate(&engine, &[menu]));
        assert!(StateMatch::ContainsAll.evaluate(&engine, &[playing]));
        assert!(!StateMatch::MatchExactly.evaluate(&engine, &[playing]));
        assert!(StateMatch::MatchExactly.evaluate(&engine, &[playing, hud]));
    }

    #[test]
    fn test_shown_in() {
        let mut engine = engine();
        let (menu, playing, _) = ids(&engine);
        let panel = StateBasedActivity::shown_in([menu]);
        assert!(!panel.should_be_active(&engine));
        engine.set_state(menu);
        assert!(panel.should_be_active(&engine));
        engine.set_state(playing);
        assert!(!panel.should_be_active(&engine));
    }

    #[test]
    fn test_hidden_in_defaults_to_shown() {
        let mut engine = engine();
        let (menu, playing, _) = ids(&engine);
        let overlay = StateBasedActivity::hidden_in([menu]);
        assert!(overlay.should_be_active(&engine));
        engine.set_state(menu);
        assert!(!overlay.should_be_active(&engine));
        engine.set_state(playing);
        assert!(overlay.should_be_active(&engine));
    }

    #[test]
    fn test_inactive_rule_wins() {
        let mut engine = engine();
        let (_, playing, hud) = ids(&engine);
        let crosshair = StateBasedActivity::shown_in([playing])
            .with_inactive([hud], StateMatch::ContainsOne);
        engine.set_state(playing);
        assert!(crosshair.should_be_active(&engine));
        engine.set_state(hud);
        assert!(!crosshair.should_be_active(&engine));
    }

    #[test]
    fn test_empty_active_list_without_default_is_hidden() {
        let mut engine = engine();
        let (menu, _, _) = ids(&engine);
        engine.set_state(menu);
        assert!(!StateBasedActivity::default().should_be_active(&engine));
    }
}
