//! Execution pipeline: outcomes, halting, loops and dry-run.

use kestrel_lib::directive::{Conditional, ConditionalKind, Directive};
use kestrel_lib::interpreter::{Action, HaltReason, InterpreterError, Notice, RunOutcome};

use super::common::{TestEnv, rule_source, step};

fn guarded(identifier: &str, kind: ConditionalKind, expression: &str) -> Directive {
  Directive::new(identifier).with_conditional(Conditional::new(kind, expression))
}

// =============================================================================
// Outcomes
// =============================================================================

#[tokio::test]
async fn boolean_outcomes_report_success() {
  let env = TestEnv::new();
  env.write_simple_rule(
    "mixed",
    &[],
    &[step("passes", "return true"), step("fails", "return false")].concat(),
  );

  let mut config = env.config();
  config.halt_on_error = false;
  let (result, observer) = env.run(config, &[Directive::new("mixed")]).await;

  assert_eq!(result.unwrap(), RunOutcome::Completed { directives: 1 });
  let successes: Vec<bool> = observer.steps.iter().map(|s| s.success).collect();
  assert_eq!(successes, vec![true, false]);
  assert_eq!(observer.steps[0].rule_name, "mixed rule");
}

#[tokio::test]
async fn list_outcomes_are_flattened_in_order() {
  let env = TestEnv::new();
  env.write_simple_rule("many", &[], &step("list", "return { true, { true, '' }, {}, false }"));

  let mut config = env.config();
  config.halt_on_error = false;
  let (result, observer) = env.run(config, &[Directive::new("many")]).await;

  assert!(result.is_ok());
  let successes: Vec<bool> = observer.steps.iter().map(|s| s.success).collect();
  assert_eq!(successes, vec![true, true, false]);
}

#[tokio::test]
async fn empty_outcome_is_not_a_step() {
  let env = TestEnv::new();
  env.write_simple_rule("quiet", &[], &step("nothing", "return ''"));

  let (result, observer) = env.run(env.config(), &[Directive::new("quiet")]).await;
  assert!(result.is_ok());
  assert!(observer.steps.is_empty());
}

#[tokio::test]
async fn nil_outcome_aborts_the_run() {
  let env = TestEnv::new();
  env.write_simple_rule("null", &[], &step("nil", "return { true, nil, true }"));
  env.write_simple_rule("after", &[], &step("later", "return true"));

  let directives = [Directive::new("null").with_lines(vec![7]), Directive::new("after")];
  let (result, observer) = env.run(env.config(), &directives).await;

  let err = result.unwrap_err();
  assert!(matches!(err.error, InterpreterError::NullOutcome { .. }));
  assert_eq!(err.context.unwrap().lines, vec![7]);
  // The item before the hole ran; nothing after it did.
  assert_eq!(observer.steps.len(), 1);
  assert_eq!(observer.rules, vec!["null".to_string()]);
}

#[tokio::test]
async fn unsupported_outcome_aborts_the_run() {
  let env = TestEnv::new();
  env.write_simple_rule("odd", &[], &step("map", "return { key = 'value' }"));

  let (result, _) = env.run(env.config(), &[Directive::new("odd")]).await;
  assert!(matches!(
    result.unwrap_err().error,
    InterpreterError::UnsupportedOutcome { .. }
  ));
}

// =============================================================================
// Halting
// =============================================================================

#[tokio::test]
async fn failure_halts_with_halt_on_error() {
  let env = TestEnv::new();
  env.write_simple_rule("fail", &[], &step("broken", "return false"));
  env.write_simple_rule("after", &[], &step("later", "return true"));

  let (result, observer) = env.run(env.config(), &[Directive::new("fail"), Directive::new("after")]).await;

  assert_eq!(
    result.unwrap(),
    RunOutcome::Halted {
      reason: HaltReason::Failure {
        rule: "fail rule".into(),
        command: "broken".into()
      },
      directives: 1,
    }
  );
  assert_eq!(observer.rules, vec!["fail".to_string()]);
}

#[tokio::test]
async fn failure_continues_without_halt_on_error() {
  let env = TestEnv::new();
  env.write_simple_rule("fail", &[], &step("broken", "return false"));
  env.write_simple_rule("after", &[], &step("later", "return true"));

  let mut config = env.config();
  config.halt_on_error = false;
  let (result, observer) = env.run(config, &[Directive::new("fail"), Directive::new("after")]).await;

  assert_eq!(result.unwrap(), RunOutcome::Completed { directives: 2 });
  assert_eq!(observer.steps.len(), 2);
}

#[tokio::test]
async fn halt_trigger_stops_later_directives() {
  let env = TestEnv::new();
  env.write_simple_rule("stop", &[], &[step("halt", "return halt()"), step("same rule", "return true")].concat());
  env.write_simple_rule("after", &[], &step("later", "return true"));

  let mut config = env.config();
  config.halt_on_error = false;
  let (result, observer) = env.run(config, &[Directive::new("stop"), Directive::new("after")]).await;

  assert_eq!(
    result.unwrap(),
    RunOutcome::Halted {
      reason: HaltReason::Trigger,
      directives: 1,
    }
  );
  assert_eq!(observer.steps.len(), 1);
  assert!(observer.steps[0].success);
}

// =============================================================================
// Conditionals
// =============================================================================

#[tokio::test]
async fn if_gates_the_directive() {
  let env = TestEnv::new();
  env.write_simple_rule("index", &[], &step("makeindex", "return true"));

  let directives = [
    guarded("index", ConditionalKind::If, "exists('idx')"),
    guarded("index", ConditionalKind::Unless, "exists('idx')"),
  ];
  let (result, observer) = env.run(env.config(), &directives).await;

  assert!(result.is_ok());
  assert_eq!(observer.steps.len(), 1);
}

#[tokio::test]
async fn while_runs_at_most_max_loops_passes() {
  let env = TestEnv::new();
  env.write_simple_rule("again", &[], &step("pass", "return true"));

  let mut config = env.config();
  config.max_loops = 3;
  let (result, observer) = env
    .run(config, &[guarded("again", ConditionalKind::While, "true")])
    .await;

  assert!(result.is_ok());
  assert_eq!(observer.steps.len(), 3);
}

#[tokio::test]
async fn until_runs_once_then_up_to_max_loops_minus_one_more() {
  let env = TestEnv::new();
  env.write_simple_rule("again", &[], &step("pass", "return true"));

  let mut config = env.config();
  config.max_loops = 3;
  let (result, observer) = env
    .run(config, &[guarded("again", ConditionalKind::Until, "false")])
    .await;

  assert!(result.is_ok());
  assert_eq!(observer.steps.len(), 3);
}

#[tokio::test]
async fn until_true_runs_once() {
  let env = TestEnv::new();
  env.write_simple_rule("again", &[], &step("pass", "return true"));

  let (result, observer) = env
    .run(env.config(), &[guarded("again", ConditionalKind::Until, "true")])
    .await;

  assert!(result.is_ok());
  assert_eq!(observer.steps.len(), 1);
}

#[tokio::test]
async fn while_stops_when_the_expression_turns_false() {
  let env = TestEnv::new();
  env.write_simple_rule("counter", &[], &step("count", "return true"));
  std::fs::write(env.path("doc.aux"), "first").unwrap();

  let (result, observer) = env
    .run(env.config(), &[guarded("counter", ConditionalKind::While, "changed('aux')")])
    .await;

  // The aux file is new on the first check and unchanged on the second.
  assert!(result.is_ok());
  assert_eq!(observer.steps.len(), 1);
}

#[tokio::test]
async fn non_boolean_conditional_aborts_the_run() {
  let env = TestEnv::new();
  env.write_simple_rule("rule", &[], &step("pass", "return true"));

  let (result, _) = env
    .run(env.config(), &[guarded("rule", ConditionalKind::If, "'yes'")])
    .await;
  assert!(matches!(result.unwrap_err().error, InterpreterError::Condition(_)));
}

// =============================================================================
// Session and dry-run
// =============================================================================

#[tokio::test]
async fn session_is_shared_across_directives() {
  let env = TestEnv::new();
  env.write_simple_rule("producer", &[], &step("store", "session.put('engine', 'xelatex'); return true"));
  env.write_simple_rule(
    "consumer",
    &[],
    &step("read", "return session.get('engine') == 'xelatex'"),
  );

  let (result, observer) = env
    .run(env.config(), &[Directive::new("producer"), Directive::new("consumer")])
    .await;

  assert!(result.is_ok());
  assert!(observer.steps.iter().all(|s| s.success));
}

#[tokio::test]
async fn dry_run_reports_instead_of_running() {
  let env = TestEnv::new();
  env.write_simple_rule(
    "touch",
    &[],
    &[
      step("create", "return command('touch', 'marker.txt')"),
      step("check", "return false"),
      step("stop", "return halt()"),
    ]
    .concat(),
  );

  let mut config = env.config();
  config.dry_run = true;
  config.halt_on_error = false;
  let directives = [guarded("touch", ConditionalKind::While, "true")];
  let (result, observer) = env.run(config, &directives).await;

  assert_eq!(
    result.unwrap(),
    RunOutcome::Halted {
      reason: HaltReason::Trigger,
      directives: 1,
    }
  );
  assert!(!env.path("marker.txt").exists());

  let actions: Vec<&Action> = observer
    .notices
    .iter()
    .map(|n| match n {
      Notice::DryRun { action, authors, .. } => {
        assert_eq!(authors, &vec!["Test Author".to_string()]);
        action
      }
      other => panic!("expected a dry-run notice, got {other:?}"),
    })
    .collect();
  assert_eq!(actions.len(), 3);
  assert_eq!(actions[0], &Action::Command("touch marker.txt".into()));
  assert_eq!(actions[1], &Action::Boolean(false));
}

#[tokio::test]
async fn verbose_reports_boolean_steps() {
  let env = TestEnv::new();
  env.write_simple_rule("check", &[], &step("probe", "return true"));

  let mut config = env.config();
  config.verbose = true;
  let (result, observer) = env.run(config, &[Directive::new("check")]).await;

  assert!(result.is_ok());
  assert!(matches!(
    observer.notices.as_slice(),
    [Notice::Verbose {
      action: Action::Boolean(true),
      ..
    }]
  ));
}

// =============================================================================
// Processes
// =============================================================================

#[cfg(unix)]
mod processes {
  use super::*;

  #[tokio::test]
  async fn process_runs_in_the_reference_directory() {
    let env = TestEnv::new();
    env.write_simple_rule("touch", &[], &step("create", "return command('touch', 'marker.txt')"));

    let (result, observer) = env.run(env.config(), &[Directive::new("touch")]).await;

    assert!(result.is_ok());
    assert!(observer.steps[0].success);
    assert!(env.path("marker.txt").exists());
  }

  #[tokio::test]
  async fn exit_code_failure_halts_the_run() {
    let env = TestEnv::new();
    env.write_simple_rule("fail", &[], &step("exit one", "return \"/bin/sh -c 'exit 1'\""));
    env.write_simple_rule("touch", &[], &step("create", "return command('touch', 'marker.txt')"));

    let (result, observer) = env
      .run(env.config(), &[Directive::new("fail"), Directive::new("touch")])
      .await;

    assert!(result.unwrap().is_failure());
    assert!(!observer.steps[0].success);
    assert!(!env.path("marker.txt").exists());
  }

  #[tokio::test]
  async fn exit_mapper_decides_success() {
    let env = TestEnv::new();
    env.write_rule(
      "tolerant",
      &rule_source(
        "tolerant",
        &[],
        "1.0",
        r#"    {
      name = 'exit one is fine',
      command = function() return command('/bin/sh', '-c', 'exit 1') end,
      exit = function(code) return code == 1 end,
    },"#,
      ),
    );

    let (result, observer) = env.run(env.config(), &[Directive::new("tolerant")]).await;
    assert!(result.is_ok());
    assert!(observer.steps[0].success);
  }

  #[tokio::test]
  async fn non_boolean_exit_mapper_is_an_error() {
    let env = TestEnv::new();
    env.write_rule(
      "sloppy",
      &rule_source(
        "sloppy",
        &[],
        "1.0",
        r#"    {
      name = 'returns a code',
      command = function() return 'true' end,
      exit = function(code) return code end,
    },"#,
      ),
    );

    let (result, _) = env.run(env.config(), &[Directive::new("sloppy")]).await;
    assert!(matches!(
      result.unwrap_err().error,
      InterpreterError::InvalidExitMapper { found: "integer", .. }
    ));
  }
}
