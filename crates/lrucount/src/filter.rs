//! Line filter driven by a counter cache

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::ValueEnum;
use lrucounter::{CounterCache, Decision, StatsSnapshot};
use serde::Serialize;

/// What to write for each input line
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Lines that are within their limit
    Filter,
    /// Every line, prefixed with its count and decision
    Annotate,
    /// Lines that went over their limit
    Blocked,
}

/// Totals reported at end of input
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub lines: u64,
    pub allowed: u64,
    pub blocked: u64,
    pub resets: u64,
    pub evictions: u64,
    pub tracked: usize,
}

/// Lines are keyed as raw bytes so logs with stray non-UTF-8 bytes pass
/// through unchanged.
pub struct LineFilter {
    cache: CounterCache<Vec<u8>>,
    max: u64,
    mode: Mode,
}

impl LineFilter {
    pub fn new(cache: CounterCache<Vec<u8>>, max: u64, mode: Mode) -> Self {
        Self { cache, max, mode }
    }

    /// Feed every line of `input` through the cache, writing to `out`
    pub fn process<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<()> {
        for line in input.split(b'\n') {
            let mut line = line.context("failed to read input line")?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let decision = self.cache.incr(line.clone(), self.max);
            self.emit(&line, decision, out)?;
        }
        Ok(())
    }

    fn emit<W: Write>(&self, line: &[u8], decision: Decision, out: &mut W) -> Result<()> {
        let print = match self.mode {
            Mode::Filter => decision.allowed,
            Mode::Blocked => decision.is_blocked(),
            Mode::Annotate => {
                let verdict = if decision.allowed { "allow" } else { "block" };
                write!(out, "{}\t{}\t", decision.count, verdict)?;
                true
            }
        };
        if print {
            out.write_all(line)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        let StatsSnapshot {
            allowed,
            blocked,
            resets,
            evictions,
            ..
        } = self.cache.stats().snapshot();

        Summary {
            lines: allowed + blocked,
            allowed,
            blocked,
            resets,
            evictions,
            tracked: self.cache.len(),
        }
    }
}
