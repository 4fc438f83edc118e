//! Review of task outputs between pipeline steps.
//!
//! The runner hands every normalized task output to a [`ReviewGate`] before
//! it becomes part of the stage output. Unattended runs use [`AutoApprove`];
//! interactive runs use [`ConsoleGate`], which lets a person accept, reject,
//! or replace the JSON.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::StageKind;

/// Decision on one task's output
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept,
    Reject,
    /// Use this value instead of the produced one
    Modify(Value),
}

pub trait ReviewGate: Send {
    fn review(&mut self, stage: StageKind, task: &str, output: &Value) -> Result<Verdict>;
}

/// Accepts everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl ReviewGate for AutoApprove {
    fn review(&mut self, _stage: StageKind, _task: &str, _output: &Value) -> Result<Verdict> {
        Ok(Verdict::Accept)
    }
}

/// Asks on a line-oriented reader/writer pair (stdin/stdout in the CLI)
pub struct ConsoleGate<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead + Send, W: Write + Send> ConsoleGate<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Read one trimmed line; `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read review input")?;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some(line.trim().to_string()))
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> ReviewGate for ConsoleGate<R, W> {
    fn review(&mut self, stage: StageKind, task: &str, output: &Value) -> Result<Verdict> {
        writeln!(self.output, "\n=== {} / {} Output Review ===", stage, task)?;
        writeln!(self.output, "{}", serde_json::to_string_pretty(output)?)?;

        loop {
            write!(self.output, "\nIs this output acceptable? (yes/no/modify): ")?;
            self.output.flush()?;

            let Some(answer) = self.read_line()? else {
                return Ok(Verdict::Reject);
            };

            match answer.to_ascii_lowercase().as_str() {
                "yes" | "y" => return Ok(Verdict::Accept),
                "no" | "n" => return Ok(Verdict::Reject),
                "modify" | "m" => {
                    write!(self.output, "Enter modifications (as JSON): ")?;
                    self.output.flush()?;

                    let Some(text) = self.read_line()? else {
                        return Ok(Verdict::Reject);
                    };
                    match serde_json::from_str(&text) {
                        Ok(value) => return Ok(Verdict::Modify(value)),
                        Err(_) => writeln!(self.output, "Invalid JSON format. Please try again.")?,
                    }
                }
                _ => writeln!(
                    self.output,
                    "Invalid input. Please enter 'yes', 'no', or 'modify'."
                )?,
            }
        }
    }
}
