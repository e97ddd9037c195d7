//! Shared fixtures for engine integration tests.

use std::path::PathBuf;

use kestrel_lib::config::Config;
use kestrel_lib::directive::Directive;
use kestrel_lib::interpreter::{Interpreter, RecordingObserver, RunError, RunOutcome};
use tempfile::TempDir;

/// A reference document with its own rule directory.
pub struct TestEnv {
  pub temp: TempDir,
  pub reference: PathBuf,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let reference = temp.path().join("doc.tex");
    std::fs::write(&reference, "\\documentclass{article}\n").unwrap();
    std::fs::create_dir_all(temp.path().join("rules")).unwrap();
    Self { temp, reference }
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.temp.path().join(relative)
  }

  /// Write `rules/<id>.lua`.
  pub fn write_rule(&self, id: &str, source: &str) {
    std::fs::write(self.path(&format!("rules/{id}.lua")), source).unwrap();
  }

  /// Write a rule with the usual header and the given `commands` list body.
  pub fn write_simple_rule(&self, id: &str, arguments: &[&str], commands: &str) {
    self.write_rule(id, &rule_source(id, arguments, "1.0", commands));
  }

  /// Configuration searching only this environment's rules.
  pub fn config(&self) -> Config {
    Config {
      rule_paths: vec![self.path("rules")],
      ..Config::default()
    }
  }

  pub async fn run(&self, config: Config, directives: &[Directive]) -> (Result<RunOutcome, RunError>, RecordingObserver) {
    let mut observer = RecordingObserver::default();
    let mut interpreter = Interpreter::new(config, &self.reference).unwrap();
    let result = interpreter.run(directives, &mut observer).await;
    (result, observer)
  }
}

pub fn rule_source(id: &str, arguments: &[&str], requires: &str, commands: &str) -> String {
  let arguments: Vec<String> = arguments.iter().map(|a| format!("'{a}'")).collect();
  format!(
    r#"
return {{
  rule = {{
    id = '{id}',
    name = '{id} rule',
    description = 'test rule',
    arguments = {{ {arguments} }},
    authors = {{ 'Test Author' }},
    requires = {requires},
  }},
  commands = {{
{commands}
  }},
}}
"#,
    arguments = arguments.join(", ")
  )
}

/// One command entry whose body is `body`, succeeding on exit code 0.
pub fn step(name: &str, body: &str) -> String {
  format!(
    r#"    {{
      name = '{name}',
      command = function() {body} end,
      exit = function(code) return code == 0 end,
    }},"#
  )
}
