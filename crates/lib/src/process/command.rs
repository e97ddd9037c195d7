use std::fmt;

use super::ProcessError;

/// A system command produced by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
  /// Structured argument vector, passed through unchanged.
  Args(Vec<String>),
  /// Shell-style line, split into arguments before spawning.
  Line(String),
}

impl CommandLine {
  /// Argument vector to spawn. The first element is the program.
  pub fn argv(&self) -> Result<Vec<String>, ProcessError> {
    let argv = match self {
      CommandLine::Args(args) => args.clone(),
      CommandLine::Line(line) => split_command(line)?,
    };
    if argv.is_empty() {
      return Err(ProcessError::InvalidCommand {
        command: self.to_string(),
        message: "empty command".to_string(),
      });
    }
    Ok(argv)
  }

  pub fn is_empty(&self) -> bool {
    match self {
      CommandLine::Args(args) => args.is_empty(),
      CommandLine::Line(line) => line.is_empty(),
    }
  }
}

impl fmt::Display for CommandLine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CommandLine::Args(args) => {
        let parts: Vec<String> = args
          .iter()
          .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
              format!("\"{}\"", arg.replace('"', "\\\""))
            } else {
              arg.clone()
            }
          })
          .collect();
        f.write_str(&parts.join(" "))
      }
      CommandLine::Line(line) => f.write_str(line),
    }
  }
}

/// Split a shell-style command line into arguments.
///
/// Whitespace separates arguments. Single quotes are literal; double quotes
/// honour `\"` and `\\`; a backslash outside quotes escapes the next char.
pub fn split_command(line: &str) -> Result<Vec<String>, ProcessError> {
  #[derive(PartialEq)]
  enum State {
    Plain,
    Single,
    Double,
  }

  let invalid = |message: &str| ProcessError::InvalidCommand {
    command: line.to_string(),
    message: message.to_string(),
  };

  let mut args = Vec::new();
  let mut current = String::new();
  // Distinguishes `''` (an empty argument) from no argument at all.
  let mut in_arg = false;
  let mut state = State::Plain;
  let mut chars = line.chars();

  while let Some(c) = chars.next() {
    match state {
      State::Plain => match c {
        '\'' => {
          state = State::Single;
          in_arg = true;
        }
        '"' => {
          state = State::Double;
          in_arg = true;
        }
        '\\' => {
          let escaped = chars.next().ok_or_else(|| invalid("trailing backslash"))?;
          current.push(escaped);
          in_arg = true;
        }
        c if c.is_whitespace() => {
          if in_arg {
            args.push(std::mem::take(&mut current));
            in_arg = false;
          }
        }
        c => {
          current.push(c);
          in_arg = true;
        }
      },
      State::Single => match c {
        '\'' => state = State::Plain,
        c => current.push(c),
      },
      State::Double => match c {
        '"' => state = State::Plain,
        '\\' => match chars.next() {
          Some(escaped @ ('"' | '\\')) => current.push(escaped),
          Some(other) => {
            current.push('\\');
            current.push(other);
          }
          None => return Err(invalid("unterminated double quote")),
        },
        c => current.push(c),
      },
    }
  }

  match state {
    State::Single => return Err(invalid("unterminated single quote")),
    State::Double => return Err(invalid("unterminated double quote")),
    State::Plain => {}
  }
  if in_arg {
    args.push(current);
  }
  Ok(args)
}
