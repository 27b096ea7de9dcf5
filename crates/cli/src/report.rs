//! Formats [`acssi_core::Event`]s into the lines the command grammar's
//! output table describes.

use std::fmt::Write as _;

use acssi_core::Event;

/// Renders a single event as the line(s) the driver writes to stdout.
///
/// `dump()` is the only event that spans multiple lines; the caller writes
/// the returned string followed by a single trailing newline either way.
#[must_use]
pub fn format_event(event: &Event) -> String {
    match event {
        Event::Begin { tx, tick } => format!("{tx} begins at tick {tick}"),
        Event::Read { tx, var, value } => {
            let _ = tx;
            format!("{var}: {value}")
        }
        Event::Wait { tx, var } => format!("{tx} waits on {var}"),
        Event::WriteAck { tx, var, sites } => {
            if sites.is_empty() {
                format!("{tx} writes {var} to no up sites")
            } else {
                let site_list = sites
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{tx} writes {var} to sites {site_list}")
            }
        }
        Event::Commit { tx, tick } => format!("{tx} commits at tick {tick}"),
        Event::Abort { tx, reason } => format!("{tx} aborts ({reason})"),
        Event::SiteFail { site } => format!("site {site} fails"),
        Event::SiteRecover { site } => format!("site {site} recovers"),
        Event::Dump(dumps) => {
            let mut out = String::new();
            for (i, dump) in dumps.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                let values = dump
                    .values
                    .iter()
                    .map(|(var, value)| format!("{var}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = write!(out, "site {} - {values}", dump.site);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use acssi_core::{AbortReason, SiteDump, SiteId, TxId, VarId};

    use super::*;

    #[test]
    fn read_prints_var_colon_value() {
        let ev = Event::Read {
            tx: TxId(1),
            var: VarId(2),
            value: 20,
        };
        assert_eq!(format_event(&ev), "x2: 20");
    }

    #[test]
    fn abort_includes_the_reason_tag() {
        let ev = Event::Abort {
            tx: TxId(1),
            reason: AbortReason::SsiRwRwCycle,
        };
        assert_eq!(format_event(&ev), "T1 aborts (ssi-rw-rw-cycle)");
    }

    #[test]
    fn dump_joins_sites_with_newlines() {
        let ev = Event::Dump(vec![
            SiteDump {
                site: SiteId(1),
                values: vec![(VarId(1), 10), (VarId(2), 20)],
            },
            SiteDump {
                site: SiteId(2),
                values: vec![(VarId(2), 20)],
            },
        ]);
        assert_eq!(format_event(&ev), "site 1 - x1: 10, x2: 20\nsite 2 - x2: 20");
    }
}
