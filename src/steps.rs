//! Routes step phrases to `Manager` operations.
//!
//! Every filesystem step has a variant ending in `in "NAME" fs` (or `filesystem`,
//! `file system`) that targets a registered filesystem instead of the default one.
//! Steps ending in `:` take the doc string as their argument.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::registry::DEFAULT_FS;

const IN_FS: &str = r#"(?: in "(?P<fs>[^"]+)" (?:fs|filesystem|file system))?"#;
const PATH: &str = r#""(?P<path>[^"]+)""#;
const PERM: &str = r"(?P<perm>[0-9]+)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    TempDir,
    ChangeDir,
    ResetDir,
    Remove,
    CreateFile,
    CreateFileWithContent,
    CreateDir,
    Chmod,
    AssertFile,
    AssertDir,
    AssertContent,
    AssertContentMatches,
    AssertPerm,
    AssertTreeEqual,
    AssertTreeContains,
}

struct StepDef {
    action: Action,
    regex: Regex,
}

impl StepDef {
    fn new(action: Action, pattern: &str) -> Self {
        let pattern = pattern
            .replace("{fs}", IN_FS)
            .replace("{path}", PATH)
            .replace("{perm}", PERM);
        Self {
            action,
            regex: Regex::new(&pattern).expect("invalid step pattern"),
        }
    }
}

static STEPS: LazyLock<Vec<StepDef>> = LazyLock::new(|| {
    use Action::*;

    vec![
        StepDef::new(TempDir, r"(?:current|working) directory is temporary"),
        StepDef::new(ChangeDir, r"(?:current|working) directory is {path}"),
        StepDef::new(ChangeDir, r"changes? (?:current|working) directory to {path}"),
        StepDef::new(ResetDir, r"resets? (?:current|working) directory"),
        // preconditions
        StepDef::new(Remove, r"^there is no (?:file|directory) {path}{fs}$"),
        StepDef::new(CreateFile, r"^there is a file {path}{fs}$"),
        StepDef::new(CreateDir, r"^there is a directory {path}{fs}$"),
        StepDef::new(CreateFileWithContent, r"^there is a file {path}{fs} with content:"),
        StepDef::new(Chmod, r"changes? {path} permission{fs} to {perm}$"),
        StepDef::new(Chmod, r"^(?:file|directory) {path} permission{fs} is {perm}$"),
        // assertions
        StepDef::new(AssertFile, r"^there should be a file {path}{fs}$"),
        StepDef::new(AssertDir, r"^there should be a directory {path}{fs}$"),
        StepDef::new(AssertContent, r"^there should be a file {path}{fs} with content:"),
        StepDef::new(AssertContentMatches, r"^there should be a file {path}{fs} with content matches:"),
        StepDef::new(AssertPerm, r"^(?:file|directory) {path} permission{fs} should be {perm}$"),
        StepDef::new(AssertTreeEqual, r#"^there should be only these files(?: in "(?P<dir>[^"]+)")?{fs}:"#),
        StepDef::new(AssertTreeContains, r#"^there should be these files(?: in "(?P<dir>[^"]+)")?{fs}:"#),
    ]
});

/// Returns true when `text` is a known step phrase.
pub fn is_defined(text: &str) -> bool {
    STEPS.iter().any(|step| step.regex.is_match(text))
}

impl Manager {
    /// Runs one step given its text (without the `Given`/`When`/`Then` keyword) and
    /// its doc string, if any.
    ///
    /// `$TEST_DIR`, `$CWD` and `$WORKING_DIR` are expanded in both first.
    pub fn run_step(&self, text: &str, doc: Option<&str>) -> Result<()> {
        let text = self.expand_variables(text)?;
        let doc = doc.map(|doc| self.expand_variables(doc)).transpose()?;

        let Some((action, caps)) = STEPS
            .iter()
            .find_map(|step| step.regex.captures(&text).map(|caps| (step.action, caps)))
        else {
            return Err(Error::UndefinedStep(text.clone()));
        };
        debug!(step = %text, ?action, "running step");

        let fs = caps.name("fs").map_or(DEFAULT_FS, |m| m.as_str());
        let path = caps.name("path").map_or("", |m| m.as_str());
        let perm = caps.name("perm").map_or("", |m| m.as_str());
        let dir = caps.name("dir").map_or(".", |m| m.as_str());
        let doc_string = || {
            doc.as_deref()
                .ok_or_else(|| Error::MissingDocString(text.clone()))
        };

        match action {
            Action::TempDir => self.chdir_temp(),
            Action::ChangeDir => self.chdir(path),
            Action::ResetDir => self.reset_dir(),
            Action::Remove => self.remove(fs, path),
            Action::CreateFile => self.create_file(fs, path, None),
            Action::CreateFileWithContent => self.create_file(fs, path, Some(doc_string()?)),
            Action::CreateDir => self.create_dir(fs, path),
            Action::Chmod => self.chmod(fs, path, perm),
            Action::AssertFile => self.assert_file_exists(fs, path),
            Action::AssertDir => self.assert_dir_exists(fs, path),
            Action::AssertContent => self.assert_file_content(fs, path, doc_string()?),
            Action::AssertContentMatches => {
                self.assert_file_content_matches(fs, path, doc_string()?)
            }
            Action::AssertPerm => self.assert_perm(fs, path, perm),
            Action::AssertTreeEqual => self.assert_tree_equal(fs, dir, doc_string()?),
            Action::AssertTreeContains => self.assert_tree_contains(fs, dir, doc_string()?),
        }
    }
}
