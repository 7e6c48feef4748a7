//! Pipeline progress reporting.
//!
//! Reports observable progress during `catalog download` and `catalog build`
//! so users see how far a long, throttled run has come. Progress is emitted
//! on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Posts file read; `total` posts will be processed.
    Loaded { total: u64 },
    /// Image download: n posts handled out of total.
    Downloading { n: u64, total: u64 },
    /// Catalog assembly: n posts handled out of total.
    Assembling { n: u64, total: u64 },
}

/// Reports pipeline progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the pipeline stages.
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "download  1,234 / 5,000 posts".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Loaded { total } => {
                format!("loaded  {} posts\n", format_number(*total))
            }
            ProgressEvent::Downloading { n, total } => format!(
                "download  {} / {} posts\n",
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::Assembling { n, total } => format!(
                "build  {} / {} posts\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Loaded { total } => serde_json::json!({
                "event": "progress",
                "phase": "loaded",
                "total": total
            }),
            ProgressEvent::Downloading { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "downloading",
                "n": n,
                "total": total
            }),
            ProgressEvent::Assembling { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "assembling",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
