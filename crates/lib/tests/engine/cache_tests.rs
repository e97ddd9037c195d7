//! Change-detection cache behavior across runs.

use kestrel_lib::cache::{CACHE_DATABASE_VERSION, ChangeCache};
use kestrel_lib::directive::{Conditional, ConditionalKind, Directive};

use super::common::{TestEnv, step};

#[test]
fn unseen_file_changes_once() {
  let env = TestEnv::new();
  let file = env.path("a.txt");
  std::fs::write(&file, "alpha").unwrap();
  let cache = ChangeCache::for_reference(&env.reference, "kestrel").unwrap();

  assert!(cache.has_changed(&file).unwrap());
  assert!(!cache.has_changed(&file).unwrap());

  let database = cache.load().unwrap();
  assert_eq!(database.version, CACHE_DATABASE_VERSION);
  assert_eq!(database.entries.len(), 1);
}

#[tokio::test]
async fn changed_persists_between_runs() {
  let env = TestEnv::new();
  env.write_simple_rule("bib", &[], &step("bibtex", "return true"));
  std::fs::write(env.path("doc.bib"), "@book{a}").unwrap();
  let directive = Directive::new("bib").with_conditional(Conditional::new(ConditionalKind::If, "changed('bib')"));

  let (_, first) = env.run(env.config(), &[directive.clone()]).await;
  let (_, second) = env.run(env.config(), &[directive.clone()]).await;
  std::fs::write(env.path("doc.bib"), "@book{b}").unwrap();
  let (_, third) = env.run(env.config(), &[directive]).await;

  assert_eq!(first.steps.len(), 1);
  assert!(second.steps.is_empty());
  assert_eq!(third.steps.len(), 1);
}

#[tokio::test]
async fn cache_name_comes_from_configuration() {
  let env = TestEnv::new();
  env.write_simple_rule("probe", &[], &step("probe", "return changed('tex')"));

  let mut config = env.config();
  config.cache_name = "probe-cache".into();
  let (result, observer) = env.run(config, &[Directive::new("probe")]).await;

  assert!(result.is_ok());
  assert!(observer.steps[0].success);
  assert!(env.path("probe-cache.json").exists());
}
