//! Implementation of the `kestrel check` command.
//!
//! Resolves a rule, evaluates its script and validates its header and
//! commands without running anything.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use kestrel_lib::cache::ChangeCache;
use kestrel_lib::config::Config;
use kestrel_lib::directive::Directive;
use kestrel_lib::lua::helpers::FileScope;
use kestrel_lib::lua::helpers::params::Bindings;
use kestrel_lib::lua::helpers::session::Session;
use kestrel_lib::lua::runtime::create_runtime;
use kestrel_lib::rule::{RuleResolver, load_rule, rule_env};
use kestrel_lib::types::Parameters;
use kestrel_lib::util::paths;

use crate::logging;
use crate::output::{print_stat, print_success};

/// Execute the check command.
///
/// Without `--reference`, relative rule paths resolve against the current
/// directory.
pub fn cmd_check(identifier: &str, reference: Option<&Path>, config: Option<&Path>, verbose: bool) -> Result<()> {
  logging::init(verbose, None)?;
  let config = Config::discover(config).context("Failed to load configuration")?;

  let reference: PathBuf = match reference {
    Some(path) => path.to_path_buf(),
    None => std::env::current_dir()
      .context("Failed to read the current directory")?
      .join("document"),
  };
  let base_dir = paths::canonical_parent(&reference)
    .with_context(|| format!("Failed to resolve reference: {}", reference.display()))?;

  let resolver = RuleResolver::new(&config.rule_paths, &base_dir);
  let location = resolver.resolve(identifier)?;

  let cache = ChangeCache::for_reference(&reference, &config.cache_name)?;
  let scope = FileScope::new(&reference, &reference, cache)
    .with_context(|| format!("Failed to resolve reference: {}", reference.display()))?;
  let lua = create_runtime()?;
  let env = rule_env(&lua, &scope, &Bindings::new(Parameters::new()), &Session::new())?;
  let rule = load_rule(
    &lua,
    &location,
    env,
    &Directive::new(identifier),
    config.application_version,
  )?;

  print_success(&format!("Rule '{}' is valid", rule.header.id));
  print_stat("Name", &rule.header.name);
  print_stat("Description", &rule.header.description);
  print_stat("Path", &location.path.display().to_string());
  print_stat("Arguments", &rule.header.arguments.join(", "));
  print_stat("Authors", &rule.header.authors.join(", "));
  print_stat("Requires", &rule.header.requires.to_string());
  let commands: Vec<&str> = rule.commands.iter().map(|c| c.name.as_str()).collect();
  print_stat("Commands", &commands.join(", "));

  Ok(())
}
