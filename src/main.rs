use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

mod cmd;
mod utils;
mod worker;

use cmd::{CompileArgs, NewProjectArgs, Outcome, Transport, UnitTestArgs};
use worker::{Config, ProcessWorker};

const MISSING_ROOT_MESSAGE: &str = "Please set MM_ROOT and try again.";

/// mm - front-end for the mm.py worker
///
/// Command layout:
///   mm new_project --project_name=X --username=U --password=P [--org_type=T]
///   mm compile     --project_name=X <FILE...>
///   mm unit_test   --project_name=X [--run_all_tests] [CLASS...]
///
/// Each command serializes its flags to JSON, runs `<MM_PYTHON> $MM_ROOT/mm.py <command>`
/// with that JSON on stdin, and decodes the JSON reply from stdout.
///
/// Global flags / env:
///   -v / -vv        Increase verbosity (-v also shows worker stderr)
///   -q / --quiet    Errors only
///   --raw           Print the worker's reply untouched instead of interpreting it
///   MM_ROOT         Directory containing mm.py (required)
///   MM_PYTHON       Interpreter command line (default: python)
///
/// Exit status:
///   0  success (always for unit_test)
///   1  worker reported failure, bad arguments, missing MM_ROOT, or worker/transport error
#[derive(Parser, Debug)]
#[command(
    name = "mm",
    version,
    author,
    about = "mm - command-line front-end for the mm.py worker",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print the worker's raw reply and exit 0 without interpreting it
    #[arg(long, global = true)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project from org credentials
    #[command(name = "new_project")]
    NewProject(NewProjectArgs),

    /// Compile files inside a project
    #[command(name = "compile")]
    Compile(CompileArgs),

    /// Run test classes inside a project
    #[command(name = "unit_test")]
    UnitTest(UnitTestArgs),
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match run(cli) {
        Ok(outcome) => outcome.emit(),
        Err(e) => {
            log_error!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let Some(config) = Config::from_env()? else {
        return Ok(Outcome::verbatim(format!("{MISSING_ROOT_MESSAGE}\n")).with_code(1));
    };
    log_debug!(
        "worker: {} {}",
        config.interpreter,
        config.script_path().display()
    );

    let worker = ProcessWorker::new(config).show_stderr(cli.verbose > 0 && !cli.quiet);
    let transport = Transport::new(&worker).raw(cli.raw);

    match cli.command {
        Commands::NewProject(args) => cmd::execute_new_project(args, &transport),
        Commands::Compile(args) => cmd::execute_compile(args, &transport),
        Commands::UnitTest(args) => cmd::execute_unit_test(args, &transport),
    }
}
