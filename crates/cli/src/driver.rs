//! The tick loop: reads one command per line, advances the logical clock,
//! and feeds each command to the [`acssi_core::TransactionManager`].

use std::io::{self, BufRead, Write};

use acssi_core::TransactionManager;
use acssi_parser::{parse_line, Command};

use crate::report::format_event;

/// Runs a full command stream to completion, writing the event log to
/// `out` and input errors / protocol violations to `err`.
///
/// # Errors
///
/// Only on an I/O failure reading `input` or writing `out`/`err` — never
/// on a malformed command line or a transaction abort, both of which are
/// reported and the run continues.
pub fn run<R: BufRead, W: Write, E: Write>(
    input: R,
    mut out: W,
    mut err: E,
    echo: bool,
) -> io::Result<()> {
    let mut tm = TransactionManager::new();
    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        let tick = tm.advance();
        for ev in &tick {
            writeln!(out, "{}", format_event(ev))?;
        }
        if echo {
            writeln!(out, "> {line}")?;
        }
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(cmd)) => {
                let events = dispatch(&mut tm, cmd);
                match events {
                    Ok(events) => {
                        for ev in &events {
                            writeln!(out, "{}", format_event(ev))?;
                        }
                    }
                    Err(e) => writeln!(err, "line {}: {e}", lineno + 1)?,
                }
            }
            Err(e) => writeln!(err, "line {}: {e}", lineno + 1)?,
        }
    }
    Ok(())
}

fn dispatch(
    tm: &mut TransactionManager,
    cmd: Command,
) -> Result<Vec<acssi_core::Event>, acssi_core::TmError> {
    match cmd {
        Command::Begin(tx) => tm.begin(tx),
        Command::Read(tx, var) => tm.read(tx, var),
        Command::Write(tx, var, value) => tm.write(tx, var, value),
        Command::End(tx) => tm.end(tx),
        Command::Fail(site) => tm.fail(site),
        Command::Recover(site) => tm.recover(site),
        Command::Dump => Ok(tm.dump()),
    }
}
