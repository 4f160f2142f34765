//! The choice resolution engine.
//!
//! `make_choice` runs one transactional pass over a working copy of the
//! character: gate, apply, progress, check invariants, resolve the next node,
//! arrive. The caller's character is never touched; the committed copy comes
//! back inside the [`Transition`].

use tracing::{debug, info, warn};
use xianlu_character::domain::aggregates::MAX_HEALTH;
use xianlu_character::domain::progression::gain_experience;
use xianlu_character::{Attributes, Character, EndingRecord, ExperienceTable};
use xianlu_core::rng::DeterministicRng;

use crate::domain::config::EngineConfig;
use crate::domain::effect::{Effect, apply_all};
use crate::domain::gating::{GateRoll, failure_probability, roll_forced_choice};
use crate::domain::graph::{Choice, Node, StoryGraph};
use crate::domain::guards::{GuardRedirect, InvariantGuards};
use crate::domain::late_events::LateEventTable;
use crate::domain::migration::MigrationMap;
use crate::domain::penalty::{PenaltyCategory, Severity, penalty_for};
use crate::domain::resolver::{NodeResolver, ResolvedVia};
use crate::domain::transition::{
    Diagnostic, EndCause, IgnoreReason, RecentChanges, Transition, TransitionKind,
};

/// Marker appended to the choice log before a forced attempt.
const FORCED_ATTEMPT_MARKER: &str = "【强行尝试】";
/// Marker appended to the choice log when a forced attempt fails.
const FORCED_FAILURE_MARKER: &str = "【强行失败】";

/// Static story content plus the rules that drive it.
#[derive(Debug, Clone)]
pub struct NarrativeEngine {
    graph: StoryGraph,
    experience: ExperienceTable,
    migrations: MigrationMap,
    guards: InvariantGuards,
    late_events: LateEventTable,
    config: EngineConfig,
}

impl NarrativeEngine {
    /// Creates an engine with default guards, no migrations, no late events
    /// and the default configuration.
    #[must_use]
    pub fn new(graph: StoryGraph, experience: ExperienceTable) -> Self {
        Self {
            graph,
            experience,
            migrations: MigrationMap::default(),
            guards: InvariantGuards::default(),
            late_events: LateEventTable::default(),
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_migrations(mut self, migrations: MigrationMap) -> Self {
        self.migrations = migrations;
        self
    }

    #[must_use]
    pub fn with_guards(mut self, guards: InvariantGuards) -> Self {
        self.guards = guards;
        self
    }

    #[must_use]
    pub fn with_late_events(mut self, late_events: LateEventTable) -> Self {
        self.late_events = late_events;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn graph(&self) -> &StoryGraph {
        &self.graph
    }

    #[must_use]
    pub fn experience_table(&self) -> &ExperienceTable {
        &self.experience
    }

    #[must_use]
    pub fn migrations(&self) -> &MigrationMap {
        &self.migrations
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Node resolver over this engine's graph and migration map.
    #[must_use]
    pub fn resolver(&self) -> NodeResolver<'_> {
        NodeResolver::new(&self.graph, &self.migrations)
    }

    /// A fresh character on the root node, with the configured starting
    /// attributes.
    #[must_use]
    pub fn start_new_game(&self) -> Character {
        self.start_new_game_with(self.config.starting_attributes)
    }

    /// A fresh character on the root node with the given attributes.
    #[must_use]
    pub fn start_new_game_with(&self, mut attributes: Attributes) -> Character {
        attributes.clamp_all();
        let root = self.graph.root();
        let mut character = Character::new(root.id.clone(), attributes);
        character.age = self.config.starting_age;
        character.adjust_spirit_stone(
            attributes
                .family
                .saturating_mul(self.config.spirit_stone_per_family),
        );

        let mut changes = RecentChanges::default();
        self.apply_with_progression(&root.on_enter, &mut character, &mut changes);
        info!(root = %root.id, "new game started");
        character
    }

    /// Failure chance, in percent, for forcing an unmet choice right now.
    #[must_use]
    pub fn failure_probability(&self, character: &Character) -> u32 {
        failure_probability(character.attributes.luck, character.choice_count())
    }

    /// Resolves `choice_id` on the character's current node.
    ///
    /// Never fails: missing nodes and choices produce an ignored transition,
    /// and recovered faults are reported as diagnostics.
    pub fn make_choice(
        &self,
        character: &Character,
        choice_id: &str,
        rng: &mut dyn DeterministicRng,
    ) -> Transition {
        if character.is_game_ended || !character.is_alive() {
            debug!(choice_id, "choice ignored: run has ended");
            return Transition::ignored(IgnoreReason::GameEnded);
        }

        let resolver = self.resolver();
        let Some(node) = resolver.lookup(&character.current_node) else {
            warn!(node = %character.current_node, "current node is missing; choice ignored");
            return Transition::ignored(IgnoreReason::MissingNode);
        };
        let Some(choice) = node.choice(choice_id) else {
            warn!(node = %node.id, choice_id, "choice not found on node; ignored");
            return Transition::ignored(IgnoreReason::MissingChoice);
        };

        let mut working = character.clone();
        let mut changes = RecentChanges::default();
        let mut diagnostics = Vec::new();

        let snapshot = working.cultivation;
        working.visited_nodes.insert(node.id.clone());

        if !choice.is_available(&working) {
            let roll = roll_forced_choice(working.attributes.luck, working.choice_count(), rng);
            changes.forced = Some(roll);
            if !roll.passed {
                return self.fail_forced_choice(character, working, node, choice, roll, changes, rng);
            }
            debug!(
                choice_id,
                roll = roll.roll,
                failure_probability = roll.failure_probability,
                "forced choice succeeded"
            );
        }

        let resets = self.apply_with_progression(&choice.consequence, &mut working, &mut changes);

        if working.cultivation.is_below(&snapshot) && !resets {
            debug!(choice_id, "cultivation regression reverted");
            working.cultivation = snapshot;
        }

        if !working.is_alive() {
            return self.conclude(
                character,
                working,
                self.graph.death_node(),
                EndCause::Died,
                changes,
                diagnostics,
            );
        }

        if working.last_record() != Some(choice.text.as_str()) {
            working.record(choice.text.clone());
        }

        let mut destination = self.resolve_next(node, choice, &working, &mut diagnostics);

        if let Some(redirect) = self.guards.check(
            &node.id,
            &destination.id,
            node.chapter,
            destination.chapter,
            &working,
        ) {
            destination = match redirect.target() {
                Some(id) => resolver.lookup(id).unwrap_or_else(|| {
                    warn!(target = id, "guard redirect target missing; using root");
                    diagnostics.push(Diagnostic::UnknownRedirect {
                        target: id.to_owned(),
                    });
                    self.graph.root()
                }),
                None => self.graph.root(),
            };
            if matches!(redirect, GuardRedirect::SelfLoop { .. }) && destination.id == node.id {
                // The redirect target is the looping node itself.
                let fallback = self.graph.failure_node();
                destination = if fallback.id == node.id {
                    self.graph.death_node()
                } else {
                    fallback
                };
                warn!(node = %node.id, to = %destination.id, "self-loop redirect leads back to the same node");
            }
            debug!(from = %node.id, to = %destination.id, ?redirect, "guard redirected transition");
            changes.redirect = Some(redirect);
        }

        if destination.is_ending() {
            return self.conclude(
                character,
                working,
                destination,
                EndCause::Ending,
                changes,
                diagnostics,
            );
        }

        if let Some(event) = self.late_events.draw(&working, rng) {
            if let Some(target) = resolver.lookup(&event.node) {
                info!(event = %event.id, to = %target.id, "late-game event fired");
                working.set_flag(event.flag());
                changes.late_event = Some(event.id.clone());
                destination = target;
            } else {
                warn!(event = %event.id, target = %event.node, "late-game event target missing; skipped");
                diagnostics.push(Diagnostic::UnknownRedirect {
                    target: event.node.clone(),
                });
            }
            if destination.is_ending() {
                return self.conclude(
                    character,
                    working,
                    destination,
                    EndCause::Ending,
                    changes,
                    diagnostics,
                );
            }
        }

        self.regenerate(&mut working, &mut changes);

        self.arrive(
            character,
            working,
            node,
            destination,
            changes,
            diagnostics,
            None,
        )
    }

    /// Applies effects and feeds any experience they grant to the progression
    /// engine. Returns whether the effects explicitly reset cultivation.
    fn apply_with_progression(
        &self,
        effects: &[Effect],
        working: &mut Character,
        changes: &mut RecentChanges,
    ) -> bool {
        let applied = apply_all(effects, working);
        if applied.experience > 0 {
            let gain = gain_experience(working, applied.experience, &self.experience);
            if !gain.breakthroughs.is_empty() {
                info!(breakthroughs = ?gain.breakthroughs, "cultivation breakthrough");
            }
            changes.record_gain(&gain);
        }
        applied.resets_cultivation
    }

    fn resolve_next<'a>(
        &'a self,
        node: &Node,
        choice: &Choice,
        working: &Character,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> &'a Node {
        let target = match choice.next_node.resolve(working) {
            Ok(target) => target,
            Err(error) => {
                warn!(node = %node.id, choice_id = %choice.id, %error, "next node unresolved; using root");
                diagnostics.push(Diagnostic::NextNodeResolution {
                    choice_id: choice.id.clone(),
                    message: error.to_string(),
                });
                return self.graph.root();
            }
        };

        let resolved = self.resolver().resolve_with_trace(&target);
        match resolved.via {
            ResolvedVia::Direct => {}
            ResolvedVia::Migrated => {
                debug!(legacy = %target, canonical = %resolved.node.id, "migrated legacy node id");
            }
            ResolvedVia::Fallback => {
                warn!(%target, "unknown next node; using root");
                diagnostics.push(Diagnostic::UnknownTarget { target });
            }
        }
        resolved.node
    }

    fn regenerate(&self, working: &mut Character, changes: &mut RecentChanges) {
        let turn = working.current_turn;
        let quiet = working
            .last_damage_turn
            .is_none_or(|t| turn.saturating_sub(t) >= self.config.regeneration_quiet_turns);
        if !quiet || !working.is_alive() {
            return;
        }
        let before = working.health;
        let amount = self.config.regeneration_amount(working.attributes.constitution);
        working.health = before.saturating_add(amount).min(MAX_HEALTH);
        changes.regenerated = working.health - before;
    }

    /// Moves the working copy onto `destination` and commits it.
    #[allow(clippy::too_many_arguments)]
    fn arrive(
        &self,
        original: &Character,
        mut working: Character,
        from: &Node,
        destination: &Node,
        mut changes: RecentChanges,
        diagnostics: Vec<Diagnostic>,
        failure: Option<(PenaltyCategory, Severity)>,
    ) -> Transition {
        if !working.visited_nodes.contains(&destination.id) {
            self.apply_with_progression(&destination.on_enter, &mut working, &mut changes);
            if !working.is_alive() {
                return self.conclude(
                    original,
                    working,
                    self.graph.death_node(),
                    EndCause::Died,
                    changes,
                    diagnostics,
                );
            }
        }

        working.current_node.clone_from(&destination.id);
        working.pending_transition = Some(destination.id.clone());
        working.current_turn = working.current_turn.saturating_add(1);
        changes.diff(original, &working);

        let kind = match failure {
            Some((category, severity)) => TransitionKind::ForcedFailure {
                from: from.id.clone(),
                to: destination.id.clone(),
                category,
                severity,
            },
            None => TransitionKind::Advanced {
                from: from.id.clone(),
                to: destination.id.clone(),
            },
        };
        debug!(from = %from.id, to = %destination.id, turn = working.current_turn, "transition committed");

        Transition {
            kind,
            character: Some(working),
            changes,
            diagnostics,
        }
    }

    /// Ends the run on `destination`.
    fn conclude(
        &self,
        original: &Character,
        mut working: Character,
        destination: &Node,
        cause: EndCause,
        mut changes: RecentChanges,
        diagnostics: Vec<Diagnostic>,
    ) -> Transition {
        if cause == EndCause::Ending {
            working.age = working.age.saturating_add(self.config.ending_age_bonus);
        }
        working.is_game_ended = true;
        working.current_node.clone_from(&destination.id);
        working.pending_transition = Some(destination.id.clone());
        working.current_turn = working.current_turn.saturating_add(1);
        working.ending = Some(EndingRecord {
            node_id: destination.id.clone(),
            turn: working.current_turn,
            age: working.age,
            cultivation: working.cultivation,
            resources: working.resources.clone(),
        });
        changes.diff(original, &working);
        info!(ending = %destination.id, ?cause, turn = working.current_turn, "run ended");

        Transition {
            kind: TransitionKind::Ended {
                to: destination.id.clone(),
                cause,
            },
            character: Some(working),
            changes,
            diagnostics,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fail_forced_choice(
        &self,
        original: &Character,
        mut working: Character,
        node: &Node,
        choice: &Choice,
        roll: GateRoll,
        mut changes: RecentChanges,
        rng: &mut dyn DeterministicRng,
    ) -> Transition {
        let category = PenaltyCategory::classify(choice.condition_text.as_deref());
        let severity = Severity::from_roll(rng.next_u32_range(0, 99));
        let penalty = penalty_for(category, severity, rng);
        warn!(
            choice_id = %choice.id,
            roll = roll.roll,
            failure_probability = roll.failure_probability,
            ?category,
            ?severity,
            "forced choice failed"
        );

        working.record(format!("{FORCED_ATTEMPT_MARKER}{}", choice.text));
        working.record(FORCED_FAILURE_MARKER);
        apply_all(&penalty.effects, &mut working);
        if !penalty.lethal && !working.is_alive() {
            working.health = 1;
        }
        let lethal = !working.is_alive();
        changes.penalty = Some(penalty);

        if lethal {
            return self.conclude(
                original,
                working,
                self.graph.death_node(),
                EndCause::Died,
                changes,
                Vec::new(),
            );
        }

        let destination = self.graph.failure_node();
        if destination.is_ending() {
            return self.conclude(
                original,
                working,
                destination,
                EndCause::Ending,
                changes,
                Vec::new(),
            );
        }
        self.arrive(
            original,
            working,
            node,
            destination,
            changes,
            Vec::new(),
            Some((category, severity)),
        )
    }
}
