//! Operator interaction for the review loop.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::error::{Error, Result};

/// What the operator wants to do with the image just generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Keep the output and move to the next file.
    Accept,
    /// Refine the last result with an extra instruction.
    Comment,
    /// Start over from the original with the base prompt.
    Retry,
    /// Delete both the output and the original.
    Skip,
}

impl MenuChoice {
    /// Menu entries in display order.
    pub const ALL: [MenuChoice; 4] = [Self::Accept, Self::Comment, Self::Retry, Self::Skip];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Comment => "comment",
            Self::Retry => "retry",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for MenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MenuChoice {
    type Err = String;

    /// Accepts the 1-based menu number, the full label, or its first letter.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let answer = s.trim().to_lowercase();
        if let Ok(n) = answer.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|i| Self::ALL.get(i).copied())
                .ok_or_else(|| format!("no menu entry {n}"));
        }
        Self::ALL
            .into_iter()
            .find(|c| {
                c.label() == answer
                    || (answer.len() == 1 && c.label().starts_with(answer.as_str()))
            })
            .ok_or_else(|| format!("unknown choice {:?}", s.trim()))
    }
}

/// Source of operator decisions.
pub trait Prompter {
    /// Show the menu for `file_name` and block until a choice is made.
    fn choose(&mut self, file_name: &str) -> Result<MenuChoice>;
    /// Ask for one line of refinement text.
    fn comment(&mut self) -> Result<String>;
}

/// Line-based menu on a terminal (or any reader/writer pair).
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .map_err(|e| Error::Prompt(e.to_string()))?;
        if n == 0 {
            return Err(Error::Prompt("input closed".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn write(&mut self, text: fmt::Arguments<'_>) -> Result<()> {
        self.output
            .write_fmt(text)
            .and_then(|_| self.output.flush())
            .map_err(|e| Error::Prompt(e.to_string()))
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn choose(&mut self, file_name: &str) -> Result<MenuChoice> {
        self.write(format_args!("\nWhat do you want to do with {file_name}?\n"))?;
        for (i, choice) in MenuChoice::ALL.iter().enumerate() {
            self.write(format_args!("  {}) {choice}\n", i + 1))?;
        }

        loop {
            self.write(format_args!("> "))?;
            let answer = self.read_line()?;
            match answer.parse::<MenuChoice>() {
                Ok(choice) => return Ok(choice),
                Err(e) => self.write(format_args!("{e}, pick 1-4\n"))?,
            }
        }
    }

    fn comment(&mut self) -> Result<String> {
        self.write(format_args!("Comment: "))?;
        self.read_line()
    }
}

/// Accepts every first result without asking; the single-shot mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoAccept;

impl Prompter for AutoAccept {
    fn choose(&mut self, _file_name: &str) -> Result<MenuChoice> {
        Ok(MenuChoice::Accept)
    }

    fn comment(&mut self) -> Result<String> {
        Ok(String::new())
    }
}
