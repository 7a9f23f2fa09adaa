//! Process-backed reference collaborators.
//!
//! The student's test module is a compiled test executable; running the suite
//! means spawning it in a scratch directory and capturing its report. Each
//! run starts a fresh process, so there is no import cache and `reload` has
//! nothing to re-evaluate.

use std::path::PathBuf;
use std::process::Command;

use is_executable::is_executable;
use log::{debug, info, warn};

use crate::collaborators::{
    CollaboratorError, ModuleHandle, RunResult, SuiteRunner, TestLoader, TestSuite,
};

/// Resolves module names to files under a single submission directory.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProcessTestLoader {
    search_dir: PathBuf,
}

impl ProcessTestLoader {
    pub fn new(search_dir: impl Into<PathBuf>) -> Self {
        Self {
            search_dir: search_dir.into(),
        }
    }
}

impl TestLoader for ProcessTestLoader {
    fn load(&mut self, name: &str) -> Result<ModuleHandle, CollaboratorError> {
        let path = self.search_dir.join(name);
        if !path.exists() {
            return Err(CollaboratorError::UnresolvedModule {
                name: name.to_string(),
                reason: format!("no such file under {:?}", self.search_dir),
            });
        }
        debug!("resolved module `{name}` to {path:?}");
        Ok(ModuleHandle::new(name, path))
    }

    fn reload(&mut self, module: &ModuleHandle) -> Result<(), CollaboratorError> {
        // a fresh process re-executes every definition line on its own, so
        // there is no cached module object to re-evaluate
        debug!("reload of `{}` is a no-op for process modules", module.name());
        Ok(())
    }

    fn load_suite(&self, module: &ModuleHandle) -> Result<TestSuite, CollaboratorError> {
        if !is_executable(module.path()) {
            return Err(CollaboratorError::UnresolvedModule {
                name: module.name().to_string(),
                reason: "module does not point to an executable test suite".to_string(),
            });
        }
        Ok(TestSuite::from_module(module.clone()))
    }
}

/// Runs a test suite by spawning its executable once, non-verbose, in a
/// temporary working directory. Success is the process exiting with status
/// zero. No wall-clock limit is imposed here; a hung suite blocks the
/// synthesis until the enclosing platform kills it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProcessSuiteRunner {
    args: Vec<String>,
    envs: Vec<(String, String)>,
    inherit_parent_envs: bool,
}

impl ProcessSuiteRunner {
    pub fn new() -> Self {
        Self {
            args: vec![],
            envs: vec![],
            inherit_parent_envs: true,
        }
    }

    /// Extra arguments for the test executable, given as one shell-like
    /// command line.
    pub fn with_args_line(mut self, line: &str) -> Result<Self, &'static str> {
        self.args = shlex::split(line).ok_or("malformed argument line")?;
        Ok(self)
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn without_parent_envs(mut self) -> Self {
        self.inherit_parent_envs = false;
        self
    }
}

impl SuiteRunner for ProcessSuiteRunner {
    fn run(&mut self, suite: &TestSuite) -> Result<RunResult, CollaboratorError> {
        let tmp_dir = tempfile::tempdir().map_err(|err| {
            log::error!("error while creating a temporary directory");
            log::debug!("error: {err:?}");
            CollaboratorError::Execution(err)
        })?;

        let module = suite.module();
        info!("executing test suite `{}`", module.name());
        let mut cmd = Command::new(module.path());
        cmd.args(&self.args);
        if !self.inherit_parent_envs {
            cmd.env_clear();
        }
        cmd.envs(self.envs.iter().cloned());
        cmd.current_dir(&tmp_dir);

        let output = match cmd.output() {
            Ok(output) => output,
            Err(err) => {
                // recorded, not fatal: an unrunnable suite grades like a
                // failing one
                warn!("unable to execute the test suite `{}`", module.name());
                debug!("error: {err:?}");
                return Ok(RunResult::new(
                    false,
                    format!("Failed to execute the test suite: {err}"),
                ));
            }
        };

        let mut transcript = String::from_utf8_lossy(&output.stdout).into_owned();
        transcript.push_str(&String::from_utf8_lossy(&output.stderr));
        let success = output.status.success();
        if success {
            info!("test suite `{}` passed", module.name());
        } else {
            info!("test suite `{}` did not pass", module.name());
        }
        Ok(RunResult::new(success, transcript))
    }
}
