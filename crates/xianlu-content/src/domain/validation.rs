//! Static checks over a story document.
//!
//! Errors block compilation; warnings are logged and carried alongside the
//! compiled story.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use xianlu_character::AttributeKind;
use xianlu_narrative::domain::effect::attribute_deltas;
use xianlu_narrative::domain::graph::{Choice, NextNode, Node};

use super::document::StoryDocument;

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Where the issue is, e.g. `node 'start' / choice 'climb'`.
    pub location: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// All findings for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn error(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            location: location.into(),
            message: message.into(),
        });
    }

    fn warning(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            location: location.into(),
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

struct Ids<'a> {
    nodes: HashSet<&'a str>,
    doc: &'a StoryDocument,
}

impl Ids<'_> {
    /// Whether `id` resolves without falling back to the root.
    fn resolves(&self, id: &str) -> bool {
        self.nodes.contains(id)
            || self
                .doc
                .migrations
                .canonical(id)
                .is_some_and(|canonical| self.nodes.contains(canonical))
    }
}

/// Runs every check over `doc`.
#[must_use]
pub fn validate(doc: &StoryDocument) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut nodes = HashSet::with_capacity(doc.nodes.len());
    for node in &doc.nodes {
        if !nodes.insert(node.id.as_str()) {
            report.error(format!("node '{}'", node.id), "duplicate node id");
        }
    }
    let ids = Ids { nodes, doc };

    check_designated_nodes(doc, &ids, &mut report);
    for node in &doc.nodes {
        check_node(node, &ids, &mut report);
    }
    check_migrations(doc, &ids, &mut report);
    check_guards(doc, &ids, &mut report);
    check_late_events(doc, &ids, &mut report);
    report
}

fn check_designated_nodes(doc: &StoryDocument, ids: &Ids<'_>, report: &mut ValidationReport) {
    for (role, id) in [
        ("root", &doc.root),
        ("failure_node", &doc.failure_node),
        ("death_node", &doc.death_node),
    ] {
        if !ids.nodes.contains(id.as_str()) {
            report.error(role, format!("node '{id}' does not exist"));
        }
    }
    if let Some(death) = doc.node(&doc.death_node) {
        if !death.is_ending() {
            report.error("death_node", format!("node '{}' must be an ending", death.id));
        }
    }
}

fn check_node(node: &Node, ids: &Ids<'_>, report: &mut ValidationReport) {
    let here = format!("node '{}'", node.id);
    if node.is_ending() && !node.choices.is_empty() {
        report.warning(&here, "ending node has choices that can never be taken");
    }
    if !node.is_ending() && node.choices.is_empty() {
        report.warning(&here, "node has no choices and is not an ending");
    }

    let mut seen = HashSet::new();
    for choice in &node.choices {
        let at = format!("{here} / choice '{}'", choice.id);
        if !seen.insert(choice.id.as_str()) {
            report.error(&at, "duplicate choice id");
        }
        check_targets(choice, ids, &at, report);
        check_attribute_changes(choice, &at, report);
        if choice.condition.is_some() && choice.condition_text.is_none() {
            report.warning(&at, "gated choice has no condition_text; penalties fall back to generic");
        }
    }
}

fn check_targets(choice: &Choice, ids: &Ids<'_>, at: &str, report: &mut ValidationReport) {
    for target in choice.next_node.targets() {
        if target.trim().is_empty() {
            report.error(at, "next node id is empty");
        } else if !ids.resolves(target) {
            report.error(at, format!("next node '{target}' does not exist"));
        }
    }
    if let NextNode::Computed(table) = &choice.next_node {
        if table.default.is_none() {
            report.warning(at, "decision table has no default; unmatched rules fall back to root");
        }
    }
}

/// `attribute_changes` is display-only; flag every divergence from what the
/// consequence actually does.
fn check_attribute_changes(choice: &Choice, at: &str, report: &mut ValidationReport) {
    let actual = attribute_deltas(&choice.consequence);
    let declared: BTreeMap<AttributeKind, i32> = choice
        .attribute_changes
        .iter()
        .filter(|(_, delta)| **delta != 0)
        .map(|(kind, delta)| (*kind, *delta))
        .collect();
    if declared == actual {
        return;
    }
    for kind in AttributeKind::ALL {
        let shown = declared.get(&kind).copied().unwrap_or(0);
        let applied = actual.get(&kind).copied().unwrap_or(0);
        if shown != applied {
            report.warning(
                at,
                format!("attribute_changes shows {kind} {shown:+} but consequence applies {applied:+}"),
            );
        }
    }
}

fn check_migrations(doc: &StoryDocument, ids: &Ids<'_>, report: &mut ValidationReport) {
    for (legacy, canonical) in doc.migrations.iter() {
        let at = format!("migration '{legacy}'");
        if ids.nodes.contains(legacy) {
            report.warning(&at, "legacy id is also a live node id and is never migrated");
        }
        if !ids.nodes.contains(canonical) {
            report.warning(&at, format!("canonical node '{canonical}' does not exist"));
        }
    }
}

fn check_guards(doc: &StoryDocument, ids: &Ids<'_>, report: &mut ValidationReport) {
    if let Some(redirect) = &doc.guards.self_loop.redirect_to {
        if !ids.resolves(redirect) {
            report.error("guards.self_loop", format!("redirect node '{redirect}' does not exist"));
        }
    }
    let loop_target = doc.guards.self_loop.redirect_to.as_deref().unwrap_or(doc.root.as_str());
    if !doc.guards.self_loop.exempt.contains(loop_target) {
        let loops = doc.node(loop_target).is_some_and(|node| {
            node.choices
                .iter()
                .any(|choice| choice.next_node.targets().contains(&loop_target))
        });
        if loops {
            report.warning(
                "guards.self_loop",
                format!("redirect node '{loop_target}' loops onto itself; its loops go to the failure node"),
            );
        }
    }
    for exempt in &doc.guards.self_loop.exempt {
        if !ids.nodes.contains(exempt.as_str()) {
            report.warning("guards.self_loop", format!("exempt node '{exempt}' does not exist"));
        }
    }
    for gate in &doc.guards.chapter_gates {
        let at = format!("chapter gate {}", gate.chapter);
        match doc.node(&gate.entry_node) {
            None => report.error(&at, format!("entry node '{}' does not exist", gate.entry_node)),
            Some(entry) if entry.chapter == gate.chapter => {
                report.error(&at, "entry node is inside the gated chapter");
            }
            Some(_) => {}
        }
    }
}

fn check_late_events(doc: &StoryDocument, ids: &Ids<'_>, report: &mut ValidationReport) {
    if doc.late_events.chance_percent > 100 {
        report.error("late_events", "chance_percent must be at most 100");
    }
    let mut seen = HashSet::new();
    for event in &doc.late_events.events {
        let at = format!("late event '{}'", event.id);
        if !seen.insert(event.id.as_str()) {
            report.error(&at, "duplicate event id");
        }
        if !ids.resolves(&event.node) {
            report.error(&at, format!("node '{}' does not exist", event.node));
        }
        if event.weight == 0 {
            report.warning(&at, "weight 0 means the event never fires");
        }
    }
}
