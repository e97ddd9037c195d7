//! Directives: one rule invocation each, produced by an external scanner.
//!
//! A [`Plan`] is the serialized form of a scanned document: the reference
//! file plus its ordered directives. Plans are read from YAML (or JSON,
//! which YAML accepts).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::FILE_PARAMETER;
use crate::types::{ParamValue, Parameters};

/// Guard discipline attached to a directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionalKind {
  #[default]
  None,
  If,
  Unless,
  While,
  Until,
}

impl ConditionalKind {
  /// Kinds whose guard must hold before the first pass.
  pub fn checks_before_entry(&self) -> bool {
    matches!(self, ConditionalKind::If | ConditionalKind::While | ConditionalKind::Unless)
  }

  /// Kinds whose expression result is negated.
  pub fn is_negated(&self) -> bool {
    matches!(self, ConditionalKind::Unless | ConditionalKind::Until)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ConditionalKind::None => "none",
      ConditionalKind::If => "if",
      ConditionalKind::Unless => "unless",
      ConditionalKind::While => "while",
      ConditionalKind::Until => "until",
    }
  }
}

/// A guard expression with its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditional {
  #[serde(default)]
  pub kind: ConditionalKind,
  #[serde(default)]
  pub expression: String,
}

impl Conditional {
  pub fn new(kind: ConditionalKind, expression: impl Into<String>) -> Self {
    Self {
      kind,
      expression: expression.into(),
    }
  }
}

impl fmt::Display for Conditional {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      ConditionalKind::None => f.write_str("none"),
      kind => write!(f, "{} {}", kind.as_str(), self.expression),
    }
  }
}

/// One rule invocation site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
  pub identifier: String,
  #[serde(default)]
  pub parameters: Parameters,
  #[serde(default)]
  pub conditional: Conditional,
  #[serde(default, rename = "lines")]
  pub line_numbers: Vec<usize>,
}

impl Directive {
  pub fn new(identifier: impl Into<String>) -> Self {
    Self {
      identifier: identifier.into(),
      parameters: Parameters::new(),
      conditional: Conditional::default(),
      line_numbers: Vec::new(),
    }
  }

  pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
    self.parameters.insert(key.into(), value.into());
    self
  }

  pub fn with_conditional(mut self, conditional: Conditional) -> Self {
    self.conditional = conditional;
    self
  }

  pub fn with_lines(mut self, lines: Vec<usize>) -> Self {
    self.line_numbers = lines;
    self
  }

  /// The file this directive operates on, if set.
  pub fn file(&self) -> Option<String> {
    self.parameters.get(FILE_PARAMETER).map(ToString::to_string)
  }
}

#[derive(Debug, Error)]
pub enum PlanError {
  #[error("failed to read plan '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse plan '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
}

/// A scanned document: its reference file and directives in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
  pub reference: PathBuf,
  #[serde(default)]
  pub directives: Vec<Directive>,
}

impl Plan {
  /// Load a plan file.
  ///
  /// A relative `reference` is resolved against the plan's directory, and
  /// every directive without a `file` parameter gets the reference path.
  pub fn load(path: &Path) -> Result<Self, PlanError> {
    let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut plan: Plan = serde_yaml::from_str(&content).map_err(|source| PlanError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    if plan.reference.is_relative() {
      let base = path.parent().unwrap_or(Path::new("."));
      plan.reference = base.join(&plan.reference);
    }
    plan.fill_files();
    Ok(plan)
  }

  fn fill_files(&mut self) {
    let reference = self.reference.to_string_lossy().into_owned();
    for directive in &mut self.directives {
      directive
        .parameters
        .entry(FILE_PARAMETER.to_string())
        .or_insert_with(|| ParamValue::String(reference.clone()));
    }
  }
}
