/*!
Command modules.

Layout:
  src/cmd/
    mod.rs          (this file)
    subject.rs      (Subject enum: worker subcommand names)
    shared.rs       (payload codec, Transport, Outcome, GenericResult)
    new_project.rs  (NewProjectArgs + execute_new_project)
    compile.rs      (CompileArgs     + execute_compile)
    unit_test.rs    (UnitTestArgs    + execute_unit_test)

Conventions:
  - Each subcommand module exposes exactly one public `execute_*` function
    taking its clap args plus a `Transport`, returning `anyhow::Result<Outcome>`.
  - `Err` is reserved for fatal problems (spawn, I/O, decode). A worker that
    reports failure still yields `Ok(Outcome)` with a non-zero code.
*/

pub mod compile;
pub mod new_project;
pub mod shared;
pub mod subject;
pub mod unit_test;

pub use compile::{CompileArgs, execute_compile};
pub use new_project::{NewProjectArgs, execute_new_project};
pub use shared::{Outcome, Transport};
pub use unit_test::{UnitTestArgs, execute_unit_test};
