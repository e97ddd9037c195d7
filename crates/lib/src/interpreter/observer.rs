//! Run events for presentation layers.
//!
//! The interpreter never prints. It reports through an [`Observer`], and
//! every method has a no-op default so callers implement only what they show.

use crate::directive::{Conditional, Directive};
use crate::rule::Rule;

use super::outcome::TriggerKind;

/// One reported step: a non-empty outcome of a rule command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
  pub rule_name: String,
  pub command_name: String,
  pub success: bool,
}

/// What a step did, or would have done in dry-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  Boolean(bool),
  Trigger(TriggerKind),
  Command(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  /// Dry-run replaced the step with a report.
  DryRun {
    rule_name: String,
    command_name: String,
    authors: Vec<String>,
    conditional: Conditional,
    action: Action,
  },
  /// Verbose report of a step that ran without a process.
  Verbose {
    rule_name: String,
    command_name: String,
    action: Action,
  },
}

pub trait Observer {
  /// A rule was loaded for `directive` and is about to run.
  fn rule_started(&mut self, _directive: &Directive, _rule: &Rule) {}

  fn step_started(&mut self, _rule_name: &str, _command_name: &str) {}

  fn step_finished(&mut self, _event: &StepEvent) {}

  fn notice(&mut self, _notice: &Notice) {}
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Observer that keeps every event, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
  pub rules: Vec<String>,
  pub steps: Vec<StepEvent>,
  pub notices: Vec<Notice>,
}

impl Observer for RecordingObserver {
  fn rule_started(&mut self, directive: &Directive, _rule: &Rule) {
    self.rules.push(directive.identifier.clone());
  }

  fn step_finished(&mut self, event: &StepEvent) {
    self.steps.push(event.clone());
  }

  fn notice(&mut self, notice: &Notice) {
    self.notices.push(notice.clone());
  }
}
