// SPDX-License-Identifier: MIT

//! Blocking user input
//!
//! The topic phase suspends on exactly one line of user text per incomplete
//! cycle. `ConsoleInput` reads it from stdin; `ScriptedInput` replays a fixed
//! list of replies (tests and `--answers` files).

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};

/// Reply that cancels the workflow
pub const EXIT_COMMAND: &str = "exit";

/// Whether a reply asks to leave the workflow
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(EXIT_COMMAND)
}

/// Source of user replies
#[async_trait]
pub trait UserInput: Send {
    /// Show `prompt` and wait for one line; `None` when input is closed
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Interactive console on stdin/stdout
pub struct ConsoleInput {
    reader: BufReader<Stdin>,
    stdout: Stdout,
}

impl ConsoleInput {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserInput for ConsoleInput {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.stdout.write_all(prompt.as_bytes()).await?;
        self.stdout.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Replays a fixed list of replies, then reports closed input
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    replies: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// One reply per line of the file
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(content.lines()))
    }

    /// Number of replies handed out so far
    pub fn reads(&self) -> usize {
        self.prompts.len()
    }

    /// Prompts shown so far, in order
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

#[async_trait]
impl UserInput for ScriptedInput {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let reply = self.replies.pop_front();
        if reply.is_some() {
            self.prompts.push(prompt.to_string());
        }
        Ok(reply)
    }
}
