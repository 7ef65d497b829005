//! Fixed catalog of states with dense IDs.
//!
//! [`StateRegistry::build`] turns the name-based [`StateDefinition`]s into
//! [`RegisteredState`]s whose relations are index lists. The registry owns the
//! only copy of each definition; the engine and its consumers refer to states
//! by [`StateId`].

use std::collections::HashMap;

use crate::catalog_error::{CatalogError, UnknownState};
use crate::config::MAX_STATES;
use crate::definition::{StateDefinition, StateId, TimeScaleDirective};

/// A state with its relations resolved to IDs.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredState {
    pub id: StateId,
    pub name: String,
    pub substate_of: Vec<StateId>,
    pub blocked_by: Vec<StateId>,
    pub do_not_override_any: bool,
    pub cant_override_by_default: bool,
    /// Explicit protections plus every `substate_of` parent (unless
    /// `do_not_override_any`, where the list is never consulted).
    pub do_not_override: Vec<StateId>,
    pub always_override: Vec<StateId>,
    pub toggle: bool,
    pub lock_cursor: bool,
    pub time_scale_on_enable: TimeScaleDirective,
    pub time_scale_on_disable: TimeScaleDirective,
}

impl RegisteredState {
    pub fn is_substate(&self) -> bool {
        !self.substate_of.is_empty()
    }

    pub fn protects(&self, other: StateId) -> bool {
        self.do_not_override.contains(&other)
    }

    pub fn forces(&self, other: StateId) -> bool {
        self.always_override.contains(&other)
    }
}

#[derive(Debug, Clone)]
pub struct StateRegistry {
    states: Vec<RegisteredState>,
    by_name: HashMap<String, StateId>,
}

impl StateRegistry {
    /// Assign IDs in catalog order, resolve relations and validate.
    pub fn build(catalog: Vec<StateDefinition>) -> Result<Self, CatalogError> {
        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        if catalog.len() > MAX_STATES {
            return Err(CatalogError::TooManyStates {
                count: catalog.len(),
                max: MAX_STATES,
            });
        }

        let mut by_name = HashMap::with_capacity(catalog.len());
        for (index, def) in catalog.iter().enumerate() {
            if def.name.trim().is_empty() {
                return Err(CatalogError::EmptyName { index });
            }
            if by_name
                .insert(def.name.clone(), StateId::from_index(index))
                .is_some()
            {
                return Err(CatalogError::DuplicateName(def.name.clone()));
            }
        }

        let mut states = Vec::with_capacity(catalog.len());
        for (index, def) in catalog.into_iter().enumerate() {
            let id = StateId::from_index(index);
            let resolve = |names: &[String]| -> Result<Vec<StateId>, CatalogError> {
                let mut ids: Vec<StateId> = Vec::with_capacity(names.len());
                for name in names {
                    let other = *by_name.get(name).ok_or_else(|| {
                        CatalogError::UnknownReference {
                            state: def.name.clone(),
                            reference: name.clone(),
                        }
                    })?;
                    if other == id {
                        return Err(CatalogError::SelfReference {
                            state: def.name.clone(),
                        });
                    }
                    if !ids.contains(&other) {
                        ids.push(other);
                    }
                }
                Ok(ids)
            };

            let substate_of = resolve(&def.substate_of)?;
            let blocked_by = resolve(&def.blocked_by)?;
            let mut do_not_override = resolve(&def.do_not_override)?;
            let always_override = resolve(&def.always_override)?;

            if let Some(conflict) = substate_of.iter().find(|p| blocked_by.contains(p)) {
                return Err(CatalogError::Unsatisfiable {
                    state: def.name.clone(),
                    other: catalog_name(&by_name, *conflict),
                });
            }

            if !def.do_not_override_any {
                for parent in &substate_of {
                    if !do_not_override.contains(parent) {
                        do_not_override.push(*parent);
                    }
                }
            }

            states.push(RegisteredState {
                id,
                name: def.name,
                substate_of,
                blocked_by,
                do_not_override_any: def.do_not_override_any,
                cant_override_by_default: def.cant_override_by_default,
                do_not_override,
                always_override,
                toggle: def.toggle,
                lock_cursor: def.lock_cursor,
                time_scale_on_enable: def.time_scale_on_enable,
                time_scale_on_disable: def.time_scale_on_disable,
            });
        }

        let registry = Self { states, by_name };
        registry.check_substate_cycles()?;
        Ok(registry)
    }

    /// Depth-first search over `substate_of` edges.
    fn check_substate_cycles(&self) -> Result<(), CatalogError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(
            registry: &StateRegistry,
            id: StateId,
            marks: &mut [Mark],
            path: &mut Vec<StateId>,
        ) -> Result<(), CatalogError> {
            match marks[id.index()] {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    let start = path.iter().position(|p| *p == id).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..]
                        .iter()
                        .map(|p| registry.name(*p).to_string())
                        .collect();
                    cycle.push(registry.name(id).to_string());
                    return Err(CatalogError::SubstateCycle(cycle));
                }
                Mark::Unvisited => {}
            }
            marks[id.index()] = Mark::InProgress;
            path.push(id);
            for parent in &registry.states[id.index()].substate_of {
                visit(registry, *parent, marks, path)?;
            }
            path.pop();
            marks[id.index()] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; self.states.len()];
        let mut path = Vec::new();
        for state in &self.states {
            visit(self, state.id, &mut marks, &mut path)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether `id` was issued by this registry.
    pub fn contains(&self, id: StateId) -> bool {
        id.index() < self.states.len()
    }

    pub fn get(&self, id: StateId) -> &RegisteredState {
        &self.states[id.index()]
    }

    pub fn name(&self, id: StateId) -> &str {
        &self.states[id.index()].name
    }

    pub fn id_of(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    /// Like [`id_of`](Self::id_of) but reports the missing name.
    pub fn lookup(&self, name: &str) -> Result<StateId, UnknownState> {
        self.id_of(name)
            .ok_or_else(|| UnknownState(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredState> {
        self.states.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.states.len()).map(StateId::from_index)
    }
}

fn catalog_name(by_name: &HashMap<String, StateId>, id: StateId) -> String {
    by_name
        .iter()
        .find(|(_, v)| **v == id)
        .map(|(k, _)| k.clone())
        .unwrap_or_default()
}
