//! Rule resolution and contract validation through the interpreter.

use kestrel_lib::directive::Directive;
use kestrel_lib::interpreter::{InterpreterError, RunOutcome};
use kestrel_lib::rule::{HeaderError, RuleError};

use super::common::{TestEnv, rule_source, step};

fn compile_rule(env: &TestEnv) {
  env.write_simple_rule("compile", &["engine"], &step("engine run", "return true"));
}

#[tokio::test]
async fn declared_arguments_pass() {
  let env = TestEnv::new();
  compile_rule(&env);

  let directive = Directive::new("compile")
    .with_parameter("file", "doc.tex")
    .with_parameter("engine", "pdftex");
  let (result, observer) = env.run(env.config(), &[directive]).await;

  assert_eq!(result.unwrap(), RunOutcome::Completed { directives: 1 });
  assert_eq!(observer.steps.len(), 1);
  assert!(observer.steps[0].success);
}

#[tokio::test]
async fn declared_argument_may_be_absent() {
  let env = TestEnv::new();
  compile_rule(&env);

  let (result, _) = env.run(env.config(), &[Directive::new("compile")]).await;
  assert!(result.is_ok());
}

#[tokio::test]
async fn undeclared_argument_is_rejected() {
  let env = TestEnv::new();
  compile_rule(&env);

  let directive = Directive::new("compile")
    .with_parameter("file", "doc.tex")
    .with_parameter("engine", "pdftex")
    .with_parameter("extra", "x")
    .with_lines(vec![3, 4]);
  let (result, observer) = env.run(env.config(), &[directive]).await;

  let err = result.unwrap_err();
  match &err.error {
    InterpreterError::Rule(RuleError::UnknownArguments { names, lines }) => {
      assert_eq!(names, &vec!["extra".to_string()]);
      assert_eq!(lines, &vec![3, 4]);
    }
    other => panic!("expected unknown arguments, got {other:?}"),
  }
  let context = err.context.as_ref().unwrap();
  assert_eq!(context.identifier, "compile");
  assert!(context.path.as_ref().unwrap().ends_with("compile.lua"));
  assert!(err.to_string().contains("rule 'compile'"));
  assert!(observer.steps.is_empty());
}

#[tokio::test]
async fn newer_rule_version_is_rejected() {
  let env = TestEnv::new();
  env.write_rule("future", &rule_source("future", &[], "2.0", &step("noop", "return true")));

  let (result, _) = env.run(env.config(), &[Directive::new("future")]).await;
  let err = result.unwrap_err();
  assert!(matches!(
    err.error,
    InterpreterError::Rule(RuleError::Header(HeaderError::VersionTooOld { .. }))
  ));
}

#[tokio::test]
async fn identifier_must_match_file_name() {
  let env = TestEnv::new();
  env.write_rule("alias", &rule_source("original", &[], "1.0", &step("noop", "return true")));

  let (result, _) = env.run(env.config(), &[Directive::new("alias")]).await;
  assert!(matches!(
    result.unwrap_err().error,
    InterpreterError::Rule(RuleError::Header(HeaderError::IdentifierMismatch { .. }))
  ));
}

#[tokio::test]
async fn missing_rule_lists_search_paths() {
  let env = TestEnv::new();

  let (result, _) = env.run(env.config(), &[Directive::new("nowhere")]).await;
  let err = result.unwrap_err();
  match &err.error {
    InterpreterError::Rule(RuleError::NotFound { identifier, searched }) => {
      assert_eq!(identifier, "nowhere");
      assert!(searched.iter().any(|p| p.ends_with("rules")));
    }
    other => panic!("expected not found, got {other:?}"),
  }
  assert!(err.context.unwrap().path.is_none());
}

#[tokio::test]
async fn first_rule_path_wins() {
  let env = TestEnv::new();
  std::fs::create_dir_all(env.path("override")).unwrap();
  std::fs::write(
    env.path("override/pick.lua"),
    rule_source("pick", &[], "1.0", &step("chosen", "return true")),
  )
  .unwrap();
  env.write_rule("pick", &rule_source("pick", &[], "1.0", &step("shadowed", "return false")));

  let mut config = env.config();
  config.rule_paths.insert(0, "override".into());
  let (result, observer) = env.run(config, &[Directive::new("pick")]).await;

  assert!(result.is_ok());
  assert_eq!(observer.steps[0].command_name, "chosen");
}

#[tokio::test]
async fn malformed_commands_are_rejected() {
  let env = TestEnv::new();
  env.write_simple_rule("broken", &[], "    { name = 'no body' },");

  let (result, _) = env.run(env.config(), &[Directive::new("broken")]).await;
  assert!(matches!(result.unwrap_err().error, InterpreterError::Rule(RuleError::Commands(_))));
}

#[tokio::test]
async fn script_errors_are_reported() {
  let env = TestEnv::new();
  env.write_rule("syntax", "return {{{");

  let (result, _) = env.run(env.config(), &[Directive::new("syntax")]).await;
  assert!(matches!(result.unwrap_err().error, InterpreterError::Rule(RuleError::Script(_))));
}

#[tokio::test]
async fn ensure_supplies_defaults_for_declared_arguments() {
  let env = TestEnv::new();
  env.write_simple_rule(
    "defaults",
    &["engine"],
    &step("defaulted", "ensure('engine', 'pdflatex'); return obtain('engine') == 'pdflatex'"),
  );

  let (result, observer) = env.run(env.config(), &[Directive::new("defaults")]).await;
  assert!(result.is_ok());
  assert!(observer.steps[0].success);
}

#[tokio::test]
async fn ensure_rejects_undeclared_keys() {
  let env = TestEnv::new();
  env.write_simple_rule("strict", &["engine"], &step("bad", "ensure('other', 1); return true"));

  let (result, _) = env.run(env.config(), &[Directive::new("strict")]).await;
  assert!(matches!(result.unwrap_err().error, InterpreterError::Script(_)));
}
