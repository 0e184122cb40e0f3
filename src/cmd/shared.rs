/*!
shared.rs - shared helpers for subcommands.

Focus:
  - encode_payload / decode_payload: JSON wire codec for worker stdio
  - Transport: options -> worker -> typed result (or raw text)
  - Outcome: what a handler wants printed + the exit code
  - GenericResult: the `{"Success": bool}` reply shape
  - fold_keys: case-insensitive key matching for replies
*/

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::io::Write;

use crate::cmd::subject::Subject;
use crate::{log_debug, log_warn};
use crate::worker::Worker;

pub const SUCCESS_MESSAGE: &str = "Success.";

/* ---- Payload Codec ---- */

/// Serialize options as one compact JSON document terminated by a newline.
pub fn encode_payload<O: Serialize>(options: &O) -> Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(options).context("Failed to serialize request payload")?;
    buf.push(b'\n');
    Ok(buf)
}

/// Decode the first JSON document found in worker output.
///
/// Anything after the first value is ignored (with a warning). Empty (or
/// whitespace-only) output is an error, as is a malformed first value.
///
/// Object keys are matched case-insensitively: every key is folded to
/// lowercase before the typed decode, so result structs name their fields in
/// lowercase. Null members are dropped and a bare `null` reads as `{}`, so
/// both fall back to field defaults.
pub fn decode_payload<R: DeserializeOwned>(bytes: &[u8]) -> Result<R> {
    let mut stream = serde_json::Deserializer::from_slice(bytes).into_iter::<Value>();
    let value = match stream.next() {
        Some(value) => value.context("Malformed worker payload")?,
        None => bail!("worker produced no output"),
    };
    let rest = &bytes[stream.byte_offset()..];
    if rest.iter().any(|b| !b.is_ascii_whitespace()) {
        log_warn!("ignoring {} trailing bytes of worker output", rest.len());
    }
    let value = match value {
        Value::Null => Value::Object(Map::new()),
        other => fold_keys(other),
    };
    serde_json::from_value(value).context("Malformed worker payload")
}

/// Lowercase object keys and drop null members, recursively.
///
/// Case variants of one key collapse into a single entry; the map iterates in
/// byte order, so the all-lowercase spelling wins.
fn fold_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.to_lowercase(), fold_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(fold_keys).collect()),
        other => other,
    }
}

/* ---- Transport ---- */

/// Worker reply: decoded result, or the untouched output in raw mode.
#[derive(Debug, PartialEq)]
pub enum Reply<R> {
    Decoded(R),
    Raw(String),
}

/// Marshals options into a worker call and unmarshals the reply.
pub struct Transport<'a> {
    worker: &'a dyn Worker,
    raw: bool,
}

impl<'a> Transport<'a> {
    pub fn new(worker: &'a dyn Worker) -> Self {
        Self { worker, raw: false }
    }

    /// Skip decoding and hand back the worker's stdout verbatim.
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn call<O, R>(&self, subject: Subject, options: &O) -> Result<Reply<R>>
    where
        O: Serialize,
        R: DeserializeOwned,
    {
        let payload = encode_payload(options)?;
        log_debug!("-> {subject}: {} byte payload", payload.len());

        let output = self.worker.execute(subject, &payload)?;
        log_debug!("<- {subject}: {} byte reply", output.len());

        if self.raw {
            return Ok(Reply::Raw(String::from_utf8_lossy(&output).into_owned()));
        }
        decode_payload(&output)
            .map(Reply::Decoded)
            .with_context(|| format!("Failed to decode `{subject}` result from worker"))
    }
}

/* ---- Results ---- */

/// Reply shape shared by every subcommand that reports pass/fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenericResult {
    #[serde(rename = "success", default)]
    pub success: bool,
}

/// Accept a string, a number, or null where the worker is loose about types.
pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}

/* ---- Outcome ---- */

/// Console output and exit status decided by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub code: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl Outcome {
    /// Line on stdout, exit 0.
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: Some(line(msg)),
            stderr: None,
        }
    }

    /// Line on stderr, exit 1.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            code: 1,
            stdout: None,
            stderr: Some(line(msg)),
        }
    }

    /// Text on stdout exactly as given, exit 0.
    pub fn verbatim(text: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: Some(text.into()),
            stderr: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Print and terminate the process.
    pub fn emit(self) -> ! {
        if let Some(out) = &self.stdout {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(out.as_bytes());
            let _ = stdout.flush();
        }
        if let Some(err) = &self.stderr {
            let mut stderr = std::io::stderr().lock();
            let _ = stderr.write_all(err.as_bytes());
            let _ = stderr.flush();
        }
        std::process::exit(self.code)
    }
}

fn line(msg: impl Into<String>) -> String {
    let mut s = msg.into();
    s.push('\n');
    s
}

/* ---- Test Support ---- */


/* ---- Tests ---- */
