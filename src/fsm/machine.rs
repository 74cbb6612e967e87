//! Weighted-transition state machine
//!
//! Generic over a context type `C`. States own a behavior and zero or
//! more outgoing transitions; each transition scores the context and
//! names a target state. Evaluation picks the strictly highest positive
//! score, first declared winning ties, and the two-phase
//! evaluate-then-behave split lets a machine change state and act
//! within the same tick.
//!
//! Predicates and behaviors are plain function pointers, so a machine
//! carries no captured state and wiring can be rebuilt cheaply; the
//! only instance state is the current [`StateId`].

use crate::core::error::{GridlockError, Result};

/// Transition predicate: context in, non-negative score out.
pub type ScoreFn<C> = fn(&C) -> f32;

/// State behavior: acts on the context (here, filling in a move intent).
pub type BehaviorFn<C> = fn(&mut C);

/// Handle to a state within one machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateId(pub(crate) usize);

struct Transition<C> {
    score: ScoreFn<C>,
    target: StateId,
}

enum StateKind<C> {
    Behavior(BehaviorFn<C>),
    Nested(Machine<C>),
}

struct State<C> {
    name: &'static str,
    kind: StateKind<C>,
    transitions: Vec<Transition<C>>,
}

impl<C> State<C> {
    /// Clear transient per-state memory when the state is left. Plain
    /// behavior states hold none; nested machines rewind to their
    /// initial state, recursively.
    fn reset(&mut self) {
        if let StateKind::Nested(machine) = &mut self.kind {
            machine.reset();
        }
    }
}

/// A weighted-transition state machine instance
pub struct Machine<C> {
    states: Vec<State<C>>,
    current: usize,
}

impl<C> Machine<C> {
    pub fn builder() -> MachineBuilder<C> {
        MachineBuilder {
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> StateId {
        StateId(self.current)
    }

    pub fn current_name(&self) -> &'static str {
        self.states[self.current].name
    }

    /// Restore a previously observed current state.
    ///
    /// Lets a caller persist only the `StateId` across ticks and
    /// rehydrate the wiring fresh each tick.
    pub fn resume_at(&mut self, id: StateId) -> Result<()> {
        if id.0 >= self.states.len() {
            return Err(GridlockError::UnknownState(id.0));
        }
        self.current = id.0;
        Ok(())
    }

    /// Score the current state's transitions and follow the best one.
    ///
    /// The strictly highest positive score wins; equal scores resolve
    /// to the first-declared transition (the scan uses `>` against the
    /// running best, so later equal scores never displace it). With no
    /// positive score the machine stays put. Leaving a state resets it.
    pub fn evaluate(&mut self, ctx: &C) -> StateId {
        let mut best_score = 0.0f32;
        let mut best_target = None;
        for transition in &self.states[self.current].transitions {
            let score = (transition.score)(ctx);
            if score > best_score {
                best_score = score;
                best_target = Some(transition.target);
            }
        }

        if let Some(target) = best_target {
            if target.0 != self.current {
                self.states[self.current].reset();
                self.current = target.0;
            }
        }

        StateId(self.current)
    }

    /// Run the current state's behavior, or delegate into a nested
    /// machine.
    pub fn behave(&mut self, ctx: &mut C) {
        match &mut self.states[self.current].kind {
            StateKind::Behavior(behavior) => behavior(ctx),
            StateKind::Nested(machine) => machine.behave(ctx),
        }
    }

    /// Evaluate then behave: one full tick of the machine.
    pub fn step(&mut self, ctx: &mut C) -> StateId {
        self.evaluate(ctx);
        self.behave(ctx);
        StateId(self.current)
    }

    /// Rewind to the initial state, resetting the state being left.
    pub fn reset(&mut self) {
        self.states[self.current].reset();
        self.current = 0;
    }
}

impl<C> std::fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("current", &self.states[self.current].name)
            .field(
                "states",
                &self.states.iter().map(|s| s.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder collecting states and transitions before validation
///
/// The first registered state becomes the initial state. `build`
/// rejects empty machines and transitions naming out-of-range states,
/// so a misconfigured machine fails at construction instead of
/// silently idling.
pub struct MachineBuilder<C> {
    states: Vec<State<C>>,
    transitions: Vec<(usize, usize, ScoreFn<C>)>,
}

impl<C> MachineBuilder<C> {
    /// Register a behavior state; returns its handle.
    pub fn state(&mut self, name: &'static str, behavior: BehaviorFn<C>) -> StateId {
        self.states.push(State {
            name,
            kind: StateKind::Behavior(behavior),
            transitions: Vec::new(),
        });
        StateId(self.states.len() - 1)
    }

    /// Register a state backed by a nested machine.
    pub fn nested(&mut self, name: &'static str, machine: Machine<C>) -> StateId {
        self.states.push(State {
            name,
            kind: StateKind::Nested(machine),
            transitions: Vec::new(),
        });
        StateId(self.states.len() - 1)
    }

    /// Declare a scored transition. Declaration order is tie order.
    pub fn transition(&mut self, from: StateId, to: StateId, score: ScoreFn<C>) {
        self.transitions.push((from.0, to.0, score));
    }

    pub fn build(self) -> Result<Machine<C>> {
        if self.states.is_empty() {
            return Err(GridlockError::EmptyMachine);
        }

        let mut states = self.states;
        for (from, to, score) in self.transitions {
            if from >= states.len() {
                return Err(GridlockError::UnknownState(from));
            }
            if to >= states.len() {
                return Err(GridlockError::UnknownState(to));
            }
            states[from].transitions.push(Transition {
                score,
                target: StateId(to),
            });
        }

        Ok(Machine { states, current: 0 })
    }
}
