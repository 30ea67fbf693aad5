use std::collections::VecDeque;
use std::io::{self, Write};

use chrono::{DateTime, Local};
use serde::Serialize;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Direction of a captured chunk relative to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Written to the transport (user input, terminal responses).
    Tx,
    /// Received from the transport.
    Rx,
}

impl Direction {
    fn glyph(self) -> &'static str {
        match self {
            Direction::Tx => ">>",
            Direction::Rx => "<<",
        }
    }
}

/// One captured chunk.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub direction: Direction,
    pub data: Vec<u8>,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    timestamp: String,
    direction: Direction,
    data: std::borrow::Cow<'a, str>,
    length: usize,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    entries: Vec<JsonEntry<'a>>,
    count: usize,
}

/// Bounded capture of transport traffic. Oldest entries are trimmed at
/// capacity; trimming is routine, not an error.
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
}

impl HistoryBuffer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn record(&mut self, direction: Direction, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            timestamp: Local::now(),
            direction,
            data: data.to_vec(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Raw data only, in capture order.
    pub fn export_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        for entry in &self.entries {
            out.write_all(&entry.data)?;
        }
        Ok(())
    }

    /// One line per chunk: `[timestamp] <<|>> data`.
    pub fn export_timestamped(&self, out: &mut dyn Write) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(
                out,
                "[{}] {} {}",
                entry.timestamp.format(TIMESTAMP_FORMAT),
                entry.direction.glyph(),
                String::from_utf8_lossy(&entry.data)
            )?;
        }
        Ok(())
    }

    /// `{entries: [{timestamp, direction, data, length}], count}`.
    pub fn export_json(&self, out: &mut dyn Write) -> io::Result<()> {
        let export = JsonExport {
            entries: self
                .entries
                .iter()
                .map(|e| JsonEntry {
                    timestamp: e.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    direction: e.direction,
                    data: String::from_utf8_lossy(&e.data),
                    length: e.data.len(),
                })
                .collect(),
            count: self.entries.len(),
        };
        serde_json::to_writer_pretty(&mut *out, &export)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_trims_oldest() {
        let mut history = HistoryBuffer::new(3);
        for i in 0..5u8 {
            history.record(Direction::Rx, &[b'0' + i]);
        }
        assert_eq!(history.len(), 3);
        let first = history.entries().next().unwrap();
        assert_eq!(first.data, b"2", "entries 0 and 1 were trimmed");
    }

    #[test]
    fn empty_chunks_are_not_recorded() {
        let mut history = HistoryBuffer::new(10);
        history.record(Direction::Tx, b"");
        assert!(history.is_empty());
    }

    #[test]
    fn plain_export_concatenates_data() {
        let mut history = HistoryBuffer::new(10);
        history.record(Direction::Rx, b"hello ");
        history.record(Direction::Tx, b"world");
        let mut out = Vec::new();
        history.export_plain(&mut out).unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn timestamped_export_marks_directions() {
        let mut history = HistoryBuffer::new(10);
        history.record(Direction::Rx, b"in");
        history.record(Direction::Tx, b"out");
        let mut out = Vec::new();
        history.export_timestamped(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("<< in"), "rx uses <<: {}", lines[0]);
        assert!(lines[1].contains(">> out"), "tx uses >>: {}", lines[1]);
        assert!(lines[0].starts_with('['), "line carries a timestamp");
    }

    #[test]
    fn json_export_shape() {
        let mut history = HistoryBuffer::new(10);
        history.record(Direction::Tx, b"abc");
        let mut out = Vec::new();
        history.export_json(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["entries"][0]["direction"], "tx");
        assert_eq!(value["entries"][0]["data"], "abc");
        assert_eq!(value["entries"][0]["length"], 3);
        assert!(value["entries"][0]["timestamp"].is_string());
    }
}
