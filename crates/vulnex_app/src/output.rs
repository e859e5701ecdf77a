use std::io::{self, Write};

use scan_logging::scan_warn;
use vulnex_engine::{EngineEvent, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human progress lines; findings with empty bodies stay silent.
    Lines,
    /// One JSON object per finding, empty bodies included.
    JsonLines,
}

/// Writes the live finding stream to stdout.
pub struct ConsoleProgress {
    mode: OutputMode,
}

impl ConsoleProgress {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    fn render(&self, event: &EngineEvent) -> Option<String> {
        let EngineEvent::Finding { finding, line } = event else {
            return None;
        };
        match self.mode {
            OutputMode::Lines => line.clone(),
            OutputMode::JsonLines => match serde_json::to_string(finding) {
                Ok(json) => Some(json),
                Err(err) => {
                    scan_warn!("Failed to serialize finding {}: {}", finding.target(), err);
                    None
                }
            },
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: EngineEvent) {
        if let Some(text) = self.render(&event) {
            // A closed pipe only loses output; the scan keeps storing findings.
            let _ = writeln!(io::stdout().lock(), "{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vulnex_core::{ContentHash, Finding};
    use vulnex_engine::{FailureKind, FetchError};

    fn finding_event(len: u64, line: Option<&str>) -> EngineEvent {
        EngineEvent::Finding {
            finding: Finding {
                url: "https://a.example.com".to_string(),
                path: "admin".to_string(),
                status_code: 403,
                content_type: None,
                content_length: len,
                body_hash: ContentHash::digest(b""),
                location: None,
                discovered_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
            line: line.map(str::to_string),
        }
    }

    #[test]
    fn lines_mode_prints_engine_line_only() {
        let console = ConsoleProgress::new(OutputMode::Lines);
        assert_eq!(
            console.render(&finding_event(5, Some("[403] admin (unknown)"))),
            Some("[403] admin (unknown)".to_string())
        );
        assert_eq!(console.render(&finding_event(0, None)), None);
    }

    #[test]
    fn json_mode_includes_empty_bodies() {
        let console = ConsoleProgress::new(OutputMode::JsonLines);
        let json = console.render(&finding_event(0, None)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status_code"], 403);
        assert_eq!(value["path"], "admin");
        assert_eq!(value["body_hash"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn non_finding_events_are_silent() {
        let console = ConsoleProgress::new(OutputMode::Lines);
        let dropped = EngineEvent::Dropped {
            url: "https://a.example.com/x".to_string(),
            error: FetchError {
                kind: FailureKind::Timeout,
                message: "timed out".to_string(),
            },
        };
        assert_eq!(console.render(&dropped), None);
    }
}
