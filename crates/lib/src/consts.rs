/// Application name, used for default file names.
pub const APP_NAME: &str = "kestrel";

/// Version compared against a rule's `requires` field.
pub const APP_VERSION: f64 = 1.0;

/// Extension of rule script files.
pub const RULE_EXTENSION: &str = "lua";

/// Directory name for bundled rules, next to the executable.
pub const RULES_DIR: &str = "rules";

/// Extension of the change-detection cache file.
pub const CACHE_EXTENSION: &str = "json";

/// Extension of the run log file.
pub const LOG_EXTENSION: &str = "log";

/// Default maximum number of loop iterations for `while`/`until`.
pub const DEFAULT_MAX_LOOPS: u64 = 10;

/// Name of the per-user configuration file in the home directory.
pub const CONFIG_FILENAME: &str = ".kestrel.yaml";

/// Parameter holding the file a directive operates on.
pub const FILE_PARAMETER: &str = "file";

/// Argument names a rule may never declare.
pub const RESERVED_ARGUMENTS: &[&str] = &[FILE_PARAMETER, "files"];
