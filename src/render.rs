//! Plain-text presentation of the history.

use std::fmt::Write as _;

use dashmap::DashMap;

use crate::history::HistoryObserver;
use crate::models::LinkRecord;

const PREVIOUS_LINKS_SEPARATOR: &str = "--- Previous Links ---";

/// Render the whole list: newest link first, then a separator, then the
/// older links.
pub fn render_history(records: &[LinkRecord]) -> String {
    let mut out = String::new();
    for (index, record) in records.iter().enumerate() {
        if index == 1 {
            out.push_str(PREVIOUS_LINKS_SEPARATOR);
            out.push('\n');
        }
        let _ = writeln!(out, "{}", record.shortened);
        let _ = writeln!(out, "  {}", record.original);
        let _ = writeln!(out, "  {}", visits_label(record.visits));
    }
    out
}

/// Render a single visit-count change.
pub fn render_visits(record: &LinkRecord) -> String {
    format!("{}: {}", record.slug, visits_label(record.visits))
}

fn visits_label(visits: u64) -> String {
    format!("{visits} visits")
}

/// Prints history changes to stdout.
///
/// A visit count is printed only when it differs from the last count shown
/// for that slug.
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    shown: DashMap<String, u64>,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&self, records: &[LinkRecord]) {
        for record in records {
            self.shown.insert(record.slug.clone(), record.visits);
        }
    }

    /// The line to print for a visit update, or `None` if the count is
    /// already on screen.
    fn visits_change(&self, record: &LinkRecord) -> Option<String> {
        let previous = self.shown.insert(record.slug.clone(), record.visits);
        (previous != Some(record.visits)).then(|| render_visits(record))
    }
}

impl HistoryObserver for ConsoleRenderer {
    fn history_loaded(&self, records: &[LinkRecord]) {
        self.remember(records);
        if !records.is_empty() {
            print!("{}", render_history(records));
        }
    }

    fn record_added(&self, _record: &LinkRecord, records: &[LinkRecord]) {
        self.remember(records);
        print!("{}", render_history(records));
    }

    fn visits_updated(&self, record: &LinkRecord) {
        if let Some(line) = self.visits_change(record) {
            println!("{line}");
        }
    }
}
