/*!
Subject enum for worker subcommands.

Variants:
  new_project (create a project from org credentials)
  compile     (compile files inside a project)
  unit_test   (run test classes inside a project)

The wire name of each variant is the single argument handed to the
worker script (`mm.py <subject>`).

Helpers:
  - variants()
  - as_str()
*/

use std::fmt;

/// Enumeration of the subcommands the worker understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Subject {
    NewProject,
    Compile,
    UnitTest,
}

impl Subject {
    /// Return a static slice of all variants (registration order).
    #[cfg(test)]
    pub const fn variants() -> &'static [Subject] {
        &[Subject::NewProject, Subject::Compile, Subject::UnitTest]
    }

    /// Name passed to the worker as its sole argument.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Subject::NewProject => "new_project",
            Subject::Compile => "compile",
            Subject::UnitTest => "unit_test",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------- Tests ---------------------------------- */
