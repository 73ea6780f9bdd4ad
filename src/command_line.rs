//! Splitting of command lines into sequences of pipelines.
//!
//! `#` separates pipelines that run one after another, `|` separates the
//! commands of one pipeline. Arguments may be quoted with `"` or `'`, and `\`
//! escapes whitespace, quotes and separators.

use std::fmt;

use thiserror::Error;

use crate::lexer::{BalancingLexer, LexerConfig, LexerError, Preset, State, TokenKind};

pub const PIPE: &str = "|";
pub const SEQUENCE: &str = "#";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandLineError {
    #[error("Empty command at stage {stage} of pipeline {pipeline}")]
    EmptyCommand { pipeline: usize, stage: usize },

    #[error(transparent)]
    Lexer(#[from] LexerError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub args: Vec<String>,
}

impl Command {
    pub fn new<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Command {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn arguments(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub pipelines: Vec<Pipeline>,
}

impl CommandLine {
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

fn command_lexer(text: &str) -> Result<BalancingLexer<std::str::Chars<'_>>, LexerError> {
    let config = LexerConfig {
        escape: Some('\\'),
        preset: Preset::TwoQuote,
        keywords: vec![PIPE.to_string(), SEQUENCE.to_string()],
    };
    BalancingLexer::with_config(text.chars(), config)
}

/// Removes the outer delimiters of a quoted token. Only called for regions
/// the lexer reported as closed.
fn strip_quotes(text: &str, state: &State) -> String {
    for opener in state.quote_starts() {
        let Some(closer) = state.closer_for(opener) else {
            continue;
        };
        if text.len() >= opener.len() + closer.len()
            && text.starts_with(opener.as_str())
            && text.ends_with(closer)
        {
            return text[opener.len()..text.len() - closer.len()].to_string();
        }
    }
    text.to_string()
}

pub fn split(text: &str) -> Result<CommandLine, CommandLineError> {
    let mut lexer = command_lexer(text)?;
    let quotes = lexer.state();

    let mut line = CommandLine::default();
    let mut pipeline = Pipeline::default();
    let mut command = Command::default();
    let mut seen_token = false;

    while let Some(token) = lexer.next_token() {
        seen_token = true;
        match lexer.token() {
            TokenKind::Keyword if token == PIPE => {
                push_command(&line, &mut pipeline, std::mem::take(&mut command))?;
            }
            TokenKind::Keyword if token == SEQUENCE => {
                push_command(&line, &mut pipeline, std::mem::take(&mut command))?;
                line.pipelines.push(std::mem::take(&mut pipeline));
            }
            TokenKind::Quoted if lexer.quote_closed() => {
                command.args.push(strip_quotes(&token, &quotes))
            }
            _ => command.args.push(token),
        }
    }

    if seen_token {
        push_command(&line, &mut pipeline, command)?;
        line.pipelines.push(pipeline);
    }
    Ok(line)
}

fn push_command(
    line: &CommandLine,
    pipeline: &mut Pipeline,
    command: Command,
) -> Result<(), CommandLineError> {
    if command.args.is_empty() {
        return Err(CommandLineError::EmptyCommand {
            pipeline: line.pipelines.len(),
            stage: pipeline.commands.len(),
        });
    }
    pipeline.commands.push(command);
    Ok(())
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c <= ' ' || matches!(c, '"' | '\'' | '\\' | '|' | '#'))
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if !needs_quoting(arg) {
                f.write_str(arg)?;
                continue;
            }
            f.write_str("\"")?;
            for c in arg.chars() {
                if matches!(c, '"' | '\'' | '\\') {
                    f.write_str("\\")?;
                }
                write!(f, "{}", c)?;
            }
            f.write_str("\"")?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", PIPE)?;
            }
            write!(f, "{}", command)?;
        }
        Ok(())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, pipeline) in self.pipelines.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", SEQUENCE)?;
            }
            write!(f, "{}", pipeline)?;
        }
        Ok(())
    }
}
