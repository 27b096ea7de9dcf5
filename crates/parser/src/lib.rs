//! Parser for the simulator's command grammar.
//!
//! Grammar (one command per line, whitespace-insensitive, arguments
//! parenthesized and comma-separated):
//!
//! ```text
//! line   = command? ws
//! command = "begin" "(" tx ")"
//!         | "R" "(" tx "," var ")"
//!         | "W" "(" tx "," var "," int ")"
//!         | "end" "(" tx ")"
//!         | "fail" "(" site ")"
//!         | "recover" "(" site ")"
//!         | "dump" "(" ")"
//! tx     = "T" uint
//! var    = "x" uint
//! site   = uint
//! ```
//!
//! A blank (or all-whitespace) line is valid and means "advance the tick,
//! nothing else" — it parses to `None` rather than an error.

use winnow::ascii::{dec_int, dec_uint, space0};
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::literal;
use winnow::ModalResult;

use acssi_core::{SiteId, TxId, VarId};

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Begin(TxId),
    Read(TxId, VarId),
    Write(TxId, VarId, i64),
    End(TxId),
    Fail(SiteId),
    Recover(SiteId),
    Dump,
}

/// A line that failed to parse as any known command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// 1-based byte column within the line where parsing gave up.
    pub column: usize,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "column {}: {}", self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a single input line into a [`Command`], or `None` for a blank
/// line.
///
/// # Errors
///
/// Returns a [`ParseError`] when the line is non-blank but does not match
/// any command in the grammar.
pub fn parse_line(line: &str) -> Result<Option<Command>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let original = trimmed;
    let mut input = trimmed;
    let cmd = command
        .parse_next(&mut input)
        .map_err(|e| to_parse_error(original, &input, &e))?;
    if !input.is_empty() {
        return Err(ParseError {
            message: format!("unexpected trailing input {input:?}"),
            column: original.len() - input.len() + 1,
        });
    }
    Ok(Some(cmd))
}

fn to_parse_error(
    original: &str,
    remaining: &str,
    err: &winnow::error::ErrMode<winnow::error::ContextError>,
) -> ParseError {
    let consumed = original.len().saturating_sub(remaining.len());
    ParseError {
        message: err.to_string(),
        column: consumed + 1,
    }
}

fn ws(input: &mut &str) -> ModalResult<()> {
    space0.void().parse_next(input)
}

fn tx_id(input: &mut &str) -> ModalResult<TxId> {
    literal("T").parse_next(input)?;
    let n: u32 = dec_uint.parse_next(input)?;
    Ok(TxId(n))
}

fn var_id(input: &mut &str) -> ModalResult<VarId> {
    literal("x").parse_next(input)?;
    let n: u8 = dec_uint.parse_next(input)?;
    Ok(VarId::new(n))
}

fn site_id(input: &mut &str) -> ModalResult<SiteId> {
    let n: u8 = dec_uint.parse_next(input)?;
    Ok(SiteId(n))
}

fn value(input: &mut &str) -> ModalResult<i64> {
    dec_int.parse_next(input)
}

fn comma(input: &mut &str) -> ModalResult<()> {
    ws(input)?;
    literal(",").parse_next(input)?;
    ws(input)?;
    Ok(())
}

fn open_paren(input: &mut &str) -> ModalResult<()> {
    ws(input)?;
    literal("(").parse_next(input)?;
    ws(input)?;
    Ok(())
}

fn close_paren(input: &mut &str) -> ModalResult<()> {
    ws(input)?;
    literal(")").parse_next(input)?;
    Ok(())
}

fn begin_cmd(input: &mut &str) -> ModalResult<Command> {
    literal("begin").parse_next(input)?;
    open_paren(input)?;
    let tx = tx_id(input)?;
    close_paren(input)?;
    Ok(Command::Begin(tx))
}

fn read_cmd(input: &mut &str) -> ModalResult<Command> {
    literal("R").parse_next(input)?;
    open_paren(input)?;
    let tx = tx_id(input)?;
    comma(input)?;
    let var = var_id(input)?;
    close_paren(input)?;
    Ok(Command::Read(tx, var))
}

fn write_cmd(input: &mut &str) -> ModalResult<Command> {
    literal("W").parse_next(input)?;
    open_paren(input)?;
    let tx = tx_id(input)?;
    comma(input)?;
    let var = var_id(input)?;
    comma(input)?;
    let v = value(input)?;
    close_paren(input)?;
    Ok(Command::Write(tx, var, v))
}

fn end_cmd(input: &mut &str) -> ModalResult<Command> {
    literal("end").parse_next(input)?;
    open_paren(input)?;
    let tx = tx_id(input)?;
    close_paren(input)?;
    Ok(Command::End(tx))
}

fn fail_cmd(input: &mut &str) -> ModalResult<Command> {
    literal("fail").parse_next(input)?;
    open_paren(input)?;
    let site = site_id(input)?;
    close_paren(input)?;
    Ok(Command::Fail(site))
}

fn recover_cmd(input: &mut &str) -> ModalResult<Command> {
    literal("recover").parse_next(input)?;
    open_paren(input)?;
    let site = site_id(input)?;
    close_paren(input)?;
    Ok(Command::Recover(site))
}

fn dump_cmd(input: &mut &str) -> ModalResult<Command> {
    literal("dump").parse_next(input)?;
    open_paren(input)?;
    close_paren(input)?;
    Ok(Command::Dump)
}

fn command(input: &mut &str) -> ModalResult<Command> {
    let cmd = alt((
        begin_cmd,
        read_cmd,
        write_cmd,
        end_cmd,
        fail_cmd,
        recover_cmd,
        dump_cmd,
    ))
    .parse_next(input)?;
    ws(input)?;
    opt(literal(";")).parse_next(input)?;
    ws(input)?;
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_is_none() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn parses_begin() {
        assert_eq!(parse_line("begin(T1)").unwrap(), Some(Command::Begin(TxId(1))));
    }

    #[test]
    fn parses_read_and_write() {
        assert_eq!(
            parse_line("R(T1, x2)").unwrap(),
            Some(Command::Read(TxId(1), VarId(2)))
        );
        assert_eq!(
            parse_line("W(T1,x2,-5)").unwrap(),
            Some(Command::Write(TxId(1), VarId(2), -5))
        );
    }

    #[test]
    fn parses_end_fail_recover_dump() {
        assert_eq!(parse_line("end(T3)").unwrap(), Some(Command::End(TxId(3))));
        assert_eq!(parse_line("fail(2)").unwrap(), Some(Command::Fail(SiteId(2))));
        assert_eq!(
            parse_line("recover(2)").unwrap(),
            Some(Command::Recover(SiteId(2)))
        );
        assert_eq!(parse_line("dump()").unwrap(), Some(Command::Dump));
    }

    #[test]
    fn whitespace_is_insensitive() {
        assert_eq!(
            parse_line("  W ( T1 , x2 , 7 )  ").unwrap(),
            Some(Command::Write(TxId(1), VarId(2), 7))
        );
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse_line("frobnicate(T1)").is_err());
    }

    #[test]
    fn trailing_semicolon_is_accepted() {
        assert_eq!(
            parse_line("begin(T1);").unwrap(),
            Some(Command::Begin(TxId(1)))
        );
    }
}
