//! Text rendering of journal entries.

use harness::{EntryKind, OutputEntry};

/// `[HH:MM:SS] ► text` for info entries, `[HH:MM:SS] ❌ text` for errors.
pub fn entry(entry: &OutputEntry) -> String {
    let prefix = match entry.kind {
        EntryKind::Info => "►",
        EntryKind::Error => "❌",
    };
    format!(
        "[{}] {} {}",
        entry.timestamp.format("%H:%M:%S"),
        prefix,
        entry.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness::Journal;

    fn first_entry(kind: EntryKind, text: &str) -> OutputEntry {
        let journal = Journal::new();
        journal.append(kind, text);
        journal.snapshot().remove(0)
    }

    #[test]
    fn info_entries_get_the_arrow_prefix() {
        let line = entry(&first_entry(EntryKind::Info, "Result: 4"));
        assert!(line.starts_with('['));
        assert!(line.ends_with("► Result: 4"));
    }

    #[test]
    fn error_entries_get_the_cross_prefix() {
        let line = entry(&first_entry(EntryKind::Error, "No code to execute"));
        assert!(line.ends_with("❌ No code to execute"));
    }
}
