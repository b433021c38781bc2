//! Pipeline progress reporting.
//!
//! Reports which stream is running and how many files it has analyzed, so
//! long runs against a slow analysis service are visibly alive. Progress
//! is emitted on **stderr** so stdout stays reserved for the run summary.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// A stream started; its file count is not known yet.
    Discovering { stream: String },
    /// `n` of `total` files of a stream have been submitted for analysis.
    Analyzing {
        stream: String,
        n: u64,
        total: u64,
        file: String,
    },
    /// Guides are being written.
    Writing { n: u64, total: u64 },
}

/// Reports pipeline progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "code  analyzing  3 / 12 files  auth.py".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Discovering { stream } => format!("{}  discovering...\n", stream),
            ProgressEvent::Analyzing {
                stream,
                n,
                total,
                file,
            } => format!(
                "{}  analyzing  {} / {} files  {}\n",
                stream,
                format_number(*n),
                format_number(*total),
                file
            ),
            ProgressEvent::Writing { n, total } => format!(
                "library  writing  {} / {} guides\n",
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
            ProgressEvent::Discovering { stream } => serde_json::json!({
                "event": "progress",
                "stream": stream,
                "phase": "discovering"
            }),
            ProgressEvent::Analyzing {
                stream,
                n,
                total,
                file,
            } => serde_json::json!({
                "event": "progress",
                "stream": stream,
                "phase": "analyzing",
                "n": n,
                "total": total,
                "file": file
            }),
            ProgressEvent::Writing { n, total } => serde_json::json!({
                "event": "progress",
                "stream": "library",
                "phase": "writing",
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
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
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

impl std::str::FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "none" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!(
                "invalid progress mode '{}': expected human, json or off",
                other
            )),
        }
    }
}
