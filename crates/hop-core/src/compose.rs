//! Double-hop ssh invocation composer
//!
//! A node is reached by running `ssh` on its relay: the outer invocation
//! targets the relay and carries the whole inner invocation (targeting the
//! node) as one opaque argument. The relay's shell splits that argument back
//! into words, so every word of the inner command goes through
//! [`shell_quote`].

use std::borrow::Cow;
use std::fmt;
use std::io::IsTerminal;
use std::process::Command;

use crate::topology::{Node, Relay};

/// Default remote-access program
pub const SSH_PROGRAM: &str = "ssh";

/// Shell started on the node for interactive sessions
pub const LOGIN_SHELL: [&str; 2] = ["/bin/bash", "-l"];

/// Quote a word for a POSIX shell.
///
/// Words made only of characters the shell never interprets are returned
/// unchanged; anything else is wrapped in single quotes with embedded
/// single quotes written as `'\''`.
pub fn shell_quote(word: &str) -> Cow<'_, str> {
    let is_bare = |c: char| c.is_ascii_alphanumeric() || "_-+=@%:,./".contains(c);

    if !word.is_empty() && word.chars().all(is_bare) {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

/// Quote each word and join them with spaces
pub fn shell_join<I, S>(words: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| shell_quote(w.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether this process's stdin is attached to a terminal
pub fn stdin_is_terminal() -> bool {
    std::io::stdin().is_terminal()
}

/// A fully formed program + argument list, ready to be spawned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build a `std::process::Command` for this invocation
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(&self.program).chain(self.args.iter());
        write!(f, "{}", shell_join(words))
    }
}

/// Builds the nested relay → node invocations for one resolved pair
#[derive(Debug, Clone)]
pub struct Composer<'a> {
    relay: &'a Relay,
    node: &'a Node,
}

impl<'a> Composer<'a> {
    pub fn new(relay: &'a Relay, node: &'a Node) -> Self {
        Self { relay, node }
    }

    /// Interactive login shell on the node.
    ///
    /// The outer hop always asks for a terminal; the inner hop only does so
    /// when `tty` is set, i.e. when our own stdin is a terminal.
    pub fn interactive(&self, tty: bool) -> Invocation {
        let inner = self.inner(tty, &LOGIN_SHELL);
        self.outer(true, inner)
    }

    /// [`Composer::interactive`] with terminal detection on stdin
    pub fn interactive_for_stdin(&self) -> Invocation {
        self.interactive(stdin_is_terminal())
    }

    /// Run `command` on the node without a terminal on either hop.
    ///
    /// The command text reaches the node's shell as a single argument, so
    /// pipes and redirections are evaluated on the node.
    pub fn exec(&self, command: &str) -> Invocation {
        let inner = self.inner(false, &[command]);
        self.outer(false, inner)
    }

    fn inner(&self, tty: bool, remote: &[&str]) -> String {
        let target = self.node.target();
        let mut words: Vec<&str> = vec![SSH_PROGRAM];
        if tty {
            words.push("-t");
        }
        words.push(&target);
        words.extend_from_slice(remote);
        shell_join(words)
    }

    fn outer(&self, tty: bool, remote: String) -> Invocation {
        let mut invocation = Invocation::new(SSH_PROGRAM);
        if tty {
            invocation = invocation.arg("-t");
        }
        invocation
            .args(relay_options(self.relay))
            .arg(self.relay.target())
            .arg(remote)
    }
}

/// `-i` / `-p` options for reaching a relay
pub fn relay_options(relay: &Relay) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(identity) = relay.identity_file.as_deref().filter(|s| !s.is_empty()) {
        args.push("-i".to_string());
        args.push(identity.to_string());
    }
    if let Some(port) = relay.port {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    args
}
