//! Line-based I/O capability handed to the evaluator.
//!
//! `input` and `print` are the only builtins with effects, and they reach the
//! outside world exclusively through a [`Console`]. Programs can therefore be
//! run against real stdin/stdout with [`StdConsole`] or against a script of
//! input lines with [`ScriptedConsole`].

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait Console {
    /// Show `prompt` and read one line, without its line terminator
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Write `text` followed by a newline
    fn write_line(&mut self, text: &str) -> io::Result<()>;
}

fn end_of_input() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "end of input")
}

/// Console backed by the process's stdin and stdout
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        StdConsole
    }
}

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(end_of_input());
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{text}")?;
        stdout.flush()
    }
}

/// Console that replays queued input lines and records everything written.
///
/// Reading past the end of the script fails with `UnexpectedEof`.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(input: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedConsole {
            input: input.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Lines written so far
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Prompts shown so far, one per `read_line`
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_owned());
        self.input.pop_front().ok_or_else(end_of_input)
    }

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.output.push(text.to_owned());
        Ok(())
    }
}
