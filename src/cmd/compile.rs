/*!
`compile.rs`

Implements the `compile` subcommand: send a list of files to the worker for
compilation inside a project.

Request payload:
{ "project_name": "...", "files": ["/abs/a.cls", "/abs/sub/b.cls"] }

Reply payload (success):
{ "Success": true, "Body": "..." }

Reply payload (failure):
{ "Success": false,
  "Details": { "ComponentFailures": { "FullName": "...", "Problem": "...", "LineNumber": "42" } } }

Relative file arguments are joined onto the working directory and lexically
cleaned before they are sent; absolute ones pass through untouched.
*/

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::cmd::shared::{Outcome, Reply, SUCCESS_MESSAGE, Transport, lenient_string};
use crate::cmd::subject::Subject;
use crate::log_debug;

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Project the files belong to
    #[arg(long = "project_name", value_name = "NAME", default_value = "")]
    pub project_name: String,

    /// Files to compile (relative paths resolve against the working directory)
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,
}

/// Wire shape of the `compile` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compilation {
    pub project_name: String,
    pub files: Vec<String>,
}

impl Compilation {
    pub fn from_args(args: CompileArgs, cwd: &Path) -> Result<Self> {
        Ok(Self {
            project_name: args.project_name,
            files: resolve_files(cwd, &args.files)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompileResult {
    #[serde(rename = "success", default)]
    pub success: bool,
    #[serde(rename = "body", default, deserialize_with = "lenient_string")]
    pub body: String,
    #[serde(rename = "details", default)]
    pub details: ResultDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResultDetails {
    #[serde(rename = "componentfailures", default)]
    pub component_failures: ComponentResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComponentResult {
    #[serde(rename = "fullname", default, deserialize_with = "lenient_string")]
    pub full_name: String,
    #[serde(rename = "problem", default, deserialize_with = "lenient_string")]
    pub problem: String,
    #[serde(rename = "linenumber", default, deserialize_with = "lenient_string")]
    pub line_number: String,
}

/// Make every file argument absolute relative to `cwd`.
pub fn resolve_files(cwd: &Path, files: &[String]) -> Result<Vec<String>> {
    files
        .iter()
        .map(|raw| {
            let path = absolutize(cwd, Path::new(raw));
            path.to_str()
                .map(str::to_string)
                .with_context(|| format!("resolved path is not valid UTF-8: {}", path.display()))
        })
        .collect()
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    clean(&cwd.join(path))
}

/// Drop `.` segments and fold `..` into its parent without touching the disk.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

pub fn execute_compile(args: CompileArgs, transport: &Transport<'_>) -> Result<Outcome> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let options = Compilation::from_args(args, &cwd)?;
    Ok(match transport.call(Subject::Compile, &options)? {
        Reply::Raw(text) => Outcome::verbatim(text),
        Reply::Decoded(res) => interpret(&res),
    })
}

fn interpret(res: &CompileResult) -> Outcome {
    if res.success {
        if !res.body.is_empty() {
            log_debug!("compile body: {}", res.body);
        }
        return Outcome::success(SUCCESS_MESSAGE);
    }
    let failure = &res.details.component_failures;
    if !failure.full_name.is_empty() {
        log_debug!("compile failed in {}", failure.full_name);
    }
    Outcome::failure(format!("Line {}: {}", failure.line_number, failure.problem))
}
