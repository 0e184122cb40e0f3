/*!
`unit_test.rs`

Implements the `unit_test` subcommand: run test classes inside a project.

Request payload:
{ "project_name": "...", "classes": ["FooTest", "BarTest"], "run_all_tests": false }

Reply payload:
{ "Status": "...", "ExtendedStatus": "..." }

The status line is printed as-is and the command always exits 0; pass/fail
judgement is left to whoever reads the status.
*/

use anyhow::Result;
use clap::Args;
use clap::builder::BoolishValueParser;
use serde::{Deserialize, Serialize};

use crate::cmd::shared::{Outcome, Reply, Transport, lenient_string};
use crate::cmd::subject::Subject;
use crate::log_debug;

#[derive(Args, Debug)]
pub struct UnitTestArgs {
    /// Project holding the test classes
    #[arg(long = "project_name", value_name = "NAME", default_value = "")]
    pub project_name: String,

    /// Run every test in the org instead of the listed classes
    #[arg(
        long = "run_all_tests",
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub run_all_tests: bool,

    /// Test classes to run
    #[arg(value_name = "CLASS")]
    pub classes: Vec<String>,
}

/// Wire shape of the `unit_test` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRun {
    pub project_name: String,
    pub classes: Vec<String>,
    pub run_all_tests: bool,
}

impl From<UnitTestArgs> for TestRun {
    fn from(args: UnitTestArgs) -> Self {
        Self {
            project_name: args.project_name,
            classes: args.classes,
            run_all_tests: args.run_all_tests,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TestResult {
    #[serde(rename = "status", default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(rename = "extendedstatus", default, deserialize_with = "lenient_string")]
    pub extended_status: String,
}

pub fn execute_unit_test(args: UnitTestArgs, transport: &Transport<'_>) -> Result<Outcome> {
    let options = TestRun::from(args);
    Ok(match transport.call(Subject::UnitTest, &options)? {
        Reply::Raw(text) => Outcome::verbatim(text),
        Reply::Decoded(res) => interpret(&res),
    })
}

fn interpret(res: &TestResult) -> Outcome {
    if !res.extended_status.is_empty() {
        log_debug!("extended status: {}", res.extended_status);
    }
    Outcome::success(res.status.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::shared::fake::FakeWorker;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        #[command(name = "unit_test")]
        UnitTest(UnitTestArgs),
    }

    fn parse(argv: &[&str]) -> UnitTestArgs {
        let full = ["t", "unit_test"].iter().chain(argv).copied();
        match TestCli::try_parse_from(full).unwrap().cmd {
            TestSub::UnitTest(a) => a,
        }
    }

    fn run(argv: &[&str], reply: serde_json::Value) -> (Outcome, serde_json::Value) {
        let worker = FakeWorker::replying_json(reply);
        let outcome = execute_unit_test(parse(argv), &Transport::new(&worker)).unwrap();
        (outcome, worker.sent())
    }

    #[test]
    fn no_positionals_sends_empty_classes() {
        let (_, sent) = run(&["--project_name=demo"], json!({"Status": "Queued"}));
        assert_eq!(
            sent,
            json!({"project_name": "demo", "classes": [], "run_all_tests": false})
        );
    }

    #[test]
    fn run_all_flag_sets_true() {
        let (_, sent) = run(&["--run_all_tests"], json!({}));
        assert_eq!(sent["run_all_tests"], true);
    }

    #[test]
    fn run_all_flag_accepts_explicit_value() {
        assert!(parse(&["--run_all_tests=true"]).run_all_tests);
        assert!(!parse(&["--run_all_tests=false"]).run_all_tests);
        assert!(parse(&["--run_all_tests=1"]).run_all_tests);
    }

    #[test]
    fn flag_does_not_swallow_following_class() {
        let args = parse(&["--run_all_tests", "FooTest", "BarTest"]);
        assert!(args.run_all_tests);
        assert_eq!(args.classes, vec!["FooTest", "BarTest"]);
    }

    #[test]
    fn classes_keep_their_order() {
        let (_, sent) = run(&["ZetaTest", "AlphaTest"], json!({}));
        assert_eq!(sent["classes"], json!(["ZetaTest", "AlphaTest"]));
    }

    #[test]
    fn status_is_printed_and_exit_is_zero() {
        let (outcome, _) = run(
            &[],
            json!({"Status": "Failed", "ExtendedStatus": "(2/3) tests passed"}),
        );
        assert_eq!(outcome.code, 0);
        assert_eq!(outcome.stdout.as_deref(), Some("Failed\n"));
        assert_eq!(outcome.stderr, None);
    }

    #[test]
    fn missing_status_prints_empty_line() {
        let (outcome, _) = run(&[], json!({"Success": false}));
        assert_eq!(outcome, Outcome::success(""));
    }
}
