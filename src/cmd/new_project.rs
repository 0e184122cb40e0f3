/*!
`new_project.rs`

Implements the `new_project` subcommand: ask the worker to create a local
project bound to an org.

Request payload (stdin of `mm.py new_project`):
{
  "project_name": "...",
  "username": "...",
  "password": "...",
  "org_type": "sandbox",
  "package": { "ApexClass": "*", "ApexComponent": "*", "ApexPage": "*",
               "ApexTrigger": "*", "StaticResource": "*" }
}

Reply payload: { "Success": bool }

Behavior:
  - Blank `--org_type` becomes "sandbox"
  - `package` is always the fixed default mapping
  - Missing flags are sent as empty strings; the worker validates
*/

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::cmd::shared::{GenericResult, Outcome, Reply, SUCCESS_MESSAGE, Transport};
use crate::cmd::subject::Subject;

pub const DEFAULT_ORG_TYPE: &str = "sandbox";
pub const FAILURE_MESSAGE: &str = "New project creation failed.";

/// Metadata types fetched into every new project, each with a wildcard member.
pub const DEFAULT_PACKAGE: [(&str, &str); 5] = [
    ("ApexClass", "*"),
    ("ApexComponent", "*"),
    ("ApexPage", "*"),
    ("StaticResource", "*"),
    ("ApexTrigger", "*"),
];

/// Fresh copy of [`DEFAULT_PACKAGE`] as the map sent on the wire.
pub fn default_package() -> BTreeMap<String, String> {
    DEFAULT_PACKAGE
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Args, Debug)]
pub struct NewProjectArgs {
    /// Name of the project to create
    #[arg(long = "project_name", value_name = "NAME", default_value = "")]
    pub project_name: String,

    /// Org username
    #[arg(long, value_name = "USER", default_value = "")]
    pub username: String,

    /// Org password (plus security token, if the org requires one)
    #[arg(long, value_name = "PASS", default_value = "")]
    pub password: String,

    /// Org type (defaults to "sandbox" when empty)
    #[arg(long = "org_type", value_name = "TYPE", default_value = "")]
    pub org_type: String,
}

/// Wire shape of the `new_project` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectCreation {
    pub project_name: String,
    pub username: String,
    pub password: String,
    pub org_type: String,
    pub package: BTreeMap<String, String>,
}

impl From<NewProjectArgs> for ProjectCreation {
    fn from(args: NewProjectArgs) -> Self {
        let org_type = if args.org_type.is_empty() {
            DEFAULT_ORG_TYPE.to_string()
        } else {
            args.org_type
        };
        Self {
            project_name: args.project_name,
            username: args.username,
            password: args.password,
            org_type,
            package: default_package(),
        }
    }
}

pub fn execute_new_project(args: NewProjectArgs, transport: &Transport<'_>) -> Result<Outcome> {
    let options = ProjectCreation::from(args);
    Ok(match transport.call(Subject::NewProject, &options)? {
        Reply::Raw(text) => Outcome::verbatim(text),
        Reply::Decoded(res) => interpret(&res),
    })
}

fn interpret(res: &GenericResult) -> Outcome {
    if res.success {
        Outcome::success(SUCCESS_MESSAGE)
    } else {
        Outcome::failure(FAILURE_MESSAGE)
    }
}
