//! Per-agent controller: six states over the FSM engine
//!
//! Explore, Collect, Return, UrgentReturn, Flee, Hunt. Transition
//! scores are relative magnitudes only - the engine takes the maximum
//! positive score and first-declared wins ties - so the ordering below
//! is the whole contract:
//!
//! | target            | trigger                               | score |
//! |-------------------|---------------------------------------|-------|
//! | UrgentReturn      | remaining < depot distance + margin   | 2.0   |
//! | Flee              | threat in radius and cargo worth it   | 1.2   |
//! | Return            | full cargo / projected rate / at depot| 1.0   |
//! | Hunt              | light load and eligible rich hostile  | 0.8   |
//! | Return (early)    | near depot and moderately loaded      | 0.6   |
//! | Collect / Explore | cell worth mining / cell exhausted    | 0.5   |
//!
//! A controller persists only its current state id; the wiring is
//! static and rebuilt around each tick's context.

use crate::agent::behavior::{BehaviorInput, DepotContext, IntentBuilders};
use crate::core::config::BotConfig;
use crate::core::error::Result;
use crate::core::types::{AgentState, Position, Tick};
use crate::fsm::{Machine, StateId};
use crate::signals::AgentSignals;
use crate::spatial::TorusGrid;
use crate::traffic::MoveIntent;
use ahash::AHashSet;

const URGENT_RETURN_SCORE: f32 = 2.0;
const FLEE_SCORE: f32 = 1.2;
const RETURN_SCORE: f32 = 1.0;
const HUNT_SCORE: f32 = 0.8;
const SMART_RETURN_SCORE: f32 = 0.6;
const COLLECT_SCORE: f32 = 0.5;

/// Everything one controller sees for one tick
pub struct ControlContext<'a> {
    pub agent: &'a AgentState,
    pub grid: &'a TorusGrid,
    pub depot: DepotContext<'a>,
    pub remaining_ticks: Tick,
    pub config: &'a BotConfig,
    pub signals: &'a AgentSignals,
    pub blocked: &'a AHashSet<Position>,
    pub builders: &'a IntentBuilders,
    /// Filled by the state behavior during `behave`.
    pub intent: Option<MoveIntent>,
}

impl ControlContext<'_> {
    fn as_input(&self) -> BehaviorInput<'_> {
        BehaviorInput {
            agent: self.agent,
            grid: self.grid,
            depot: &self.depot,
            signals: self.signals,
            config: self.config,
            blocked: self.blocked,
        }
    }
}

// --- transition predicates ---

/// Too few ticks left to dawdle: failing to reach a depot forfeits the
/// cargo, so this outranks everything.
fn urgent_return_score(ctx: &ControlContext<'_>) -> f32 {
    if (ctx.remaining_ticks as i32) < ctx.depot.distance + ctx.config.safe_return_margin {
        URGENT_RETURN_SCORE
    } else {
        0.0
    }
}

fn flee_score(ctx: &ControlContext<'_>) -> f32 {
    if ctx.signals.threat_nearby && ctx.agent.cargo >= ctx.config.flee_min_cargo {
        FLEE_SCORE
    } else {
        0.0
    }
}

/// Full hold, or the projected at-depot rate beats staying out.
fn return_full_score(ctx: &ControlContext<'_>) -> f32 {
    let full = (ctx.config.fill_threshold * ctx.config.max_cargo as f32) as i32;
    if ctx.agent.cargo >= full {
        return RETURN_SCORE;
    }
    let projected = ctx.agent.cargo as f32 / (ctx.depot.distance + 1) as f32;
    if projected > ctx.config.return_rate_multiplier * ctx.signals.baseline_rate {
        return RETURN_SCORE;
    }
    0.0
}

fn at_depot_score(ctx: &ControlContext<'_>) -> f32 {
    if ctx.depot.distance == 0 {
        RETURN_SCORE
    } else {
        0.0
    }
}

fn hunt_score(ctx: &ControlContext<'_>) -> f32 {
    if ctx.agent.cargo <= ctx.config.hunt_max_own_cargo && ctx.signals.hunt_target.is_some() {
        HUNT_SCORE
    } else {
        0.0
    }
}

/// Close to a depot with a worthwhile partial load: bank it. Scored
/// below the full-cargo trigger so higher-priority transitions can
/// preempt it.
fn smart_return_score(ctx: &ControlContext<'_>) -> f32 {
    let moderate = (ctx.config.smart_return_fill * ctx.config.max_cargo as f32) as i32;
    if ctx.depot.distance <= ctx.config.smart_return_radius && ctx.agent.cargo >= moderate {
        SMART_RETURN_SCORE
    } else {
        0.0
    }
}

fn collect_score(ctx: &ControlContext<'_>) -> f32 {
    if ctx.signals.marginal_yield as f32 > ctx.signals.baseline_rate {
        COLLECT_SCORE
    } else {
        0.0
    }
}

fn cell_exhausted_score(ctx: &ControlContext<'_>) -> f32 {
    if ctx.signals.marginal_yield as f32 > ctx.signals.baseline_rate {
        0.0
    } else {
        COLLECT_SCORE
    }
}

fn threat_clear_score(ctx: &ControlContext<'_>) -> f32 {
    if flee_score(ctx) > 0.0 {
        0.0
    } else {
        COLLECT_SCORE
    }
}

fn hunt_clear_score(ctx: &ControlContext<'_>) -> f32 {
    if hunt_score(ctx) > 0.0 {
        0.0
    } else {
        COLLECT_SCORE
    }
}

// --- state behaviors ---

fn act_explore(ctx: &mut ControlContext<'_>) {
    let intent = (ctx.builders.explore)(&ctx.as_input());
    ctx.intent = Some(intent);
}

fn act_collect(ctx: &mut ControlContext<'_>) {
    let intent = (ctx.builders.collect)(&ctx.as_input());
    ctx.intent = Some(intent);
}

fn act_return(ctx: &mut ControlContext<'_>) {
    let intent = (ctx.builders.return_home)(&ctx.as_input());
    ctx.intent = Some(intent);
}

fn act_urgent_return(ctx: &mut ControlContext<'_>) {
    let intent = (ctx.builders.urgent_return)(&ctx.as_input());
    ctx.intent = Some(intent);
}

fn act_flee(ctx: &mut ControlContext<'_>) {
    let intent = (ctx.builders.flee)(&ctx.as_input());
    ctx.intent = Some(intent);
}

fn act_hunt(ctx: &mut ControlContext<'_>) {
    let intent = (ctx.builders.hunt)(&ctx.as_input());
    ctx.intent = Some(intent);
}

/// Static wiring of the six states. Declaration order of transitions
/// is the tie order from the table above.
fn controller_machine<'a>() -> Machine<ControlContext<'a>> {
    let mut b = Machine::builder();
    let explore = b.state("explore", act_explore);
    let collect = b.state("collect", act_collect);
    let return_home = b.state("return", act_return);
    let urgent = b.state("urgent_return", act_urgent_return);
    let flee = b.state("flee", act_flee);
    let hunt = b.state("hunt", act_hunt);

    b.transition(explore, urgent, urgent_return_score);
    b.transition(explore, flee, flee_score);
    b.transition(explore, return_home, return_full_score);
    b.transition(explore, return_home, at_depot_score);
    b.transition(explore, hunt, hunt_score);
    b.transition(explore, return_home, smart_return_score);
    b.transition(explore, collect, collect_score);

    b.transition(collect, urgent, urgent_return_score);
    b.transition(collect, flee, flee_score);
    b.transition(collect, return_home, return_full_score);
    b.transition(collect, return_home, at_depot_score);
    b.transition(collect, explore, cell_exhausted_score);

    b.transition(return_home, urgent, urgent_return_score);
    b.transition(return_home, explore, at_depot_score);

    b.transition(urgent, explore, at_depot_score);

    b.transition(flee, urgent, urgent_return_score);
    b.transition(flee, explore, threat_clear_score);

    b.transition(hunt, urgent, urgent_return_score);
    b.transition(hunt, flee, flee_score);
    b.transition(hunt, explore, hunt_clear_score);

    b.build().expect("controller wiring is statically valid")
}

/// Result of one controller tick
#[derive(Debug, Clone)]
pub struct ControllerStep {
    pub intent: MoveIntent,
    /// The controller changed state during evaluation.
    pub changed: bool,
}

/// One agent's persistent decision state
///
/// Holds only the current state id across ticks; created when the
/// agent first appears and dropped when it leaves the live set.
#[derive(Debug, Clone, Default)]
pub struct AgentController {
    current: Option<StateId>,
}

impl AgentController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate then behave against this tick's context.
    ///
    /// Total: if a behavior produced no intent, the agent asks to hold
    /// its cell at collect priority.
    pub fn update(&mut self, ctx: &mut ControlContext<'_>) -> Result<ControllerStep> {
        let mut machine = controller_machine();
        if let Some(id) = self.current {
            machine.resume_at(id)?;
        }

        let before = machine.current();
        machine.evaluate(&*ctx);
        machine.behave(ctx);
        let after = machine.current();
        self.current = Some(after);

        let intent = ctx.intent.take().unwrap_or_else(|| {
            MoveIntent::stay(
                ctx.agent.id,
                ctx.agent.position,
                MoveIntent::COLLECT_PRIORITY,
            )
        });
        Ok(ControllerStep {
            intent,
            changed: before != after,
        })
    }

    /// Name of the current state, for logs and tests.
    pub fn state_name(&self) -> &'static str {
        let mut machine = controller_machine();
        if let Some(id) = self.current {
            if machine.resume_at(id).is_err() {
                return "unknown";
            }
        }
        machine.current_name()
    }
}
