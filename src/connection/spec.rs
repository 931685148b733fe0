//! Launch specification for a process connection
//!
//! A [`LaunchSpec`] is the command plus working directory that define how a
//! server process is started. It is stored verbatim at construction and only
//! validated when the connection starts.
//!
//! Identity is what callers use to deduplicate connections: two specs are
//! equal when they name the same working directory and the same *set* of
//! command tokens, regardless of argument order or repetition.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::connection::error::{ConnectionError, LaunchSpecField};
use crate::io::LaunchRequest;

// ============================================================================
// Launch Options
// ============================================================================

/// Optional launch behavior that does not affect connection identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Remove `'` characters from every command token before spawning.
    ///
    /// Some servers (cquery) choke on quoted arguments passed through from
    /// editor configuration. Off unless a consumer needs it.
    pub strip_single_quotes: bool,

    /// Kill the process if the provider is dropped while it still runs
    pub kill_on_drop: bool,
}

// ============================================================================
// Launch Spec
// ============================================================================

/// Command and working directory of a server process
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    command: Vec<String>,
    working_directory: Option<PathBuf>,
    options: LaunchOptions,
}

impl LaunchSpec {
    /// Create a spec from a command sequence and a working directory
    pub fn new(
        command: impl IntoIterator<Item = impl Into<String>>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            working_directory: Some(working_directory.into()),
            options: LaunchOptions::default(),
        }
    }

    /// Start building a spec
    pub fn builder() -> LaunchSpecBuilder {
        LaunchSpecBuilder::new()
    }

    /// Command sequence, executable first
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Working directory, if one was given
    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// Launch options
    pub fn options(&self) -> LaunchOptions {
        self.options
    }

    /// Check that the spec can be used to spawn a process
    pub fn validate(&self) -> Result<(), ConnectionError> {
        self.checked_parts().map(|_| ())
    }

    /// Working directory, executable and arguments of a valid spec
    fn checked_parts(&self) -> Result<(&Path, &str, &[String]), ConnectionError> {
        let working_directory = match &self.working_directory {
            None => {
                return Err(ConnectionError::invalid(
                    LaunchSpecField::WorkingDirectory,
                    "is missing",
                ));
            }
            Some(dir) if dir.as_os_str().is_empty() => {
                return Err(ConnectionError::invalid(
                    LaunchSpecField::WorkingDirectory,
                    "is empty",
                ));
            }
            Some(dir) => dir.as_path(),
        };

        let Some((program, args)) = self.command.split_first() else {
            return Err(ConnectionError::invalid(LaunchSpecField::Command, "is empty"));
        };

        if let Some(index) = self.command.iter().position(|token| token.is_empty()) {
            return Err(ConnectionError::invalid(
                LaunchSpecField::CommandToken(index),
                "is empty",
            ));
        }

        Ok((working_directory, program.as_str(), args))
    }

    fn resolve_token(&self, token: &str) -> String {
        if self.options.strip_single_quotes {
            token.replace('\'', "")
        } else {
            token.to_string()
        }
    }

    /// Command tokens as they will be handed to the OS
    ///
    /// Always a fresh copy; the stored command is never modified.
    pub fn resolved_command(&self) -> Vec<String> {
        self.command
            .iter()
            .map(|token| self.resolve_token(token))
            .collect()
    }

    /// Validate and turn the spec into a spawnable request
    pub fn to_launch_request(&self) -> Result<LaunchRequest, ConnectionError> {
        let (working_directory, program, args) = self.checked_parts()?;

        Ok(LaunchRequest {
            program: self.resolve_token(program),
            args: args.iter().map(|arg| self.resolve_token(arg)).collect(),
            working_directory: working_directory.to_path_buf(),
            kill_on_drop: self.options.kill_on_drop,
        })
    }

    fn token_set(&self) -> BTreeSet<&str> {
        self.command.iter().map(String::as_str).collect()
    }
}

impl PartialEq for LaunchSpec {
    fn eq(&self, other: &Self) -> bool {
        self.working_directory == other.working_directory && self.token_set() == other.token_set()
    }
}

impl Eq for LaunchSpec {}

impl Hash for LaunchSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Ordered set keeps the hash consistent with set equality.
        self.token_set().hash(state);
        self.working_directory.hash(state);
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.working_directory {
            Some(dir) => write!(f, "{:?} in {}", self.command, dir.display()),
            None => write!(f, "{:?} in <no working directory>", self.command),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`LaunchSpec`]
///
/// Performs no validation; an incomplete spec is reported when the
/// connection starts.
#[derive(Debug, Default)]
pub struct LaunchSpecBuilder {
    command: Vec<String>,
    working_directory: Option<PathBuf>,
    options: LaunchOptions,
}

impl LaunchSpecBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the executable, replacing anything added so far
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.command = vec![program.into()];
        self
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.command.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Strip single quotes from command tokens before spawning
    pub fn strip_single_quotes(mut self, enabled: bool) -> Self {
        self.options.strip_single_quotes = enabled;
        self
    }

    /// Kill the process when the provider is dropped while running
    pub fn kill_on_drop(mut self, enabled: bool) -> Self {
        self.options.kill_on_drop = enabled;
        self
    }

    /// Finish the spec
    pub fn build(self) -> LaunchSpec {
        LaunchSpec {
            command: self.command,
            working_directory: self.working_directory,
            options: self.options,
        }
    }
}
