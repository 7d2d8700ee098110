use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines trace of layout decisions. Every line is one object with a
/// `type` field (`table.measure`, `table.page_break`, ...); a final
/// `debug.summary` line carries the counters.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: HashMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: HashMap::new(),
            })),
        })
    }

    /// Writes an event line and bumps the counter of the same name.
    pub fn event(&self, kind: &str, fields: &[(&str, JsonValue<'_>)]) {
        let mut json = format!("{{\"type\":\"{}\"", json_escape(kind));
        for (key, value) in fields {
            json.push_str(&format!(",\"{}\":{}", json_escape(key), value.render()));
        }
        json.push('}');
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
            let entry = state.counters.entry(kind.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let json = format!(
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

/// Field value of a debug event.
#[derive(Debug, Clone, Copy)]
pub(crate) enum JsonValue<'a> {
    Int(i64),
    Num(f32),
    Str(&'a str),
    Bool(bool),
}

impl JsonValue<'_> {
    fn render(&self) -> String {
        match self {
            JsonValue::Int(v) => v.to_string(),
            JsonValue::Num(v) if v.is_finite() => format!("{v:.3}"),
            JsonValue::Num(_) => "null".to_string(),
            JsonValue::Str(v) => format!("\"{}\"", json_escape(v)),
            JsonValue::Bool(v) => v.to_string(),
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
