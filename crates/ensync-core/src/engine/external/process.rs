use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{command}' exited with {status}: {output}")]
    Failed {
        command: String,
        status: String,
        output: String,
    },
    #[error("'{tool}' did not produce the expected file '{}'", .path.display())]
    MissingOutput { tool: String, path: PathBuf },
    #[error("Could not interpret output of '{tool}': {message}")]
    MalformedOutput { tool: String, message: String },
    #[error("None of the {attempts} invocations of '{tool}' succeeded; last error: {last}")]
    Exhausted {
        tool: String,
        attempts: usize,
        #[source]
        last: Box<ToolError>,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ToolError {
    /// Whether the program itself could not be found, as opposed to having run and failed.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ToolError::Launch { source, .. } => source.kind() == io::ErrorKind::NotFound,
            ToolError::Exhausted { last, .. } => last.is_unavailable(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// The captured streams for error reports, preferring stderr.
    pub fn summary(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        self.stdout.trim().to_string()
    }
}

/// Runs `command` with `dir` as working directory and waits for it to exit.
///
/// # Errors
///
/// Returns [`ToolError::Launch`] if the process cannot be spawned and
/// [`ToolError::Failed`] if it exits unsuccessfully.
pub fn run(command: &ToolCommand, dir: &Path) -> Result<ToolOutput, ToolError> {
    debug!(command = %command.display(), dir = %dir.display(), "Running external tool");

    let output = Command::new(&command.program)
        .args(&command.args)
        .current_dir(dir)
        .output()
        .map_err(|source| ToolError::Launch {
            program: command.program.display().to_string(),
            source,
        })?;

    let captured = ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !output.status.success() {
        let summary = captured.summary();
        return Err(ToolError::Failed {
            command: command.display(),
            status: output.status.to_string(),
            output: if summary.is_empty() {
                "no output".to_string()
            } else {
                summary
            },
        });
    }

    Ok(captured)
}

/// Tries each candidate in order and returns the first successful run.
pub fn run_first_success(
    tool: &str,
    candidates: &[ToolCommand],
    dir: &Path,
) -> Result<ToolOutput, ToolError> {
    let mut last_error = None;
    for candidate in candidates {
        match run(candidate, dir) {
            Ok(output) => return Ok(output),
            Err(e) => {
                debug!(command = %candidate.display(), error = %e, "Invocation failed, trying next");
                last_error = Some(e);
            }
        }
    }
    let last = last_error.unwrap_or_else(|| ToolError::MalformedOutput {
        tool: tool.to_string(),
        message: "no invocation was attempted".to_string(),
    });
    Err(ToolError::Exhausted {
        tool: tool.to_string(),
        attempts: candidates.len(),
        last: Box::new(last),
    })
}

/// A temporary working directory for one external tool call.
///
/// The directory is removed when the value is dropped, on success and error
/// paths alike, unless it was created with `keep` set.
pub struct Workspace {
    dir: Option<TempDir>,
    keep: bool,
}

impl Workspace {
    pub fn new(prefix: &str, keep: bool) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self {
            dir: Some(dir),
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.as_ref().map_or(Path::new("."), TempDir::path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if self.keep {
                let kept = dir.keep();
                info!(path = %kept.display(), "Keeping temporary files");
            }
        }
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::test_support::write_script;
    use super::*;

    #[test]
    fn captures_stdout_of_successful_run() {
        let bin = tempfile::tempdir().unwrap();
        let script = write_script(bin.path(), "hello", "echo hello \"$1\"");
        let work = tempfile::tempdir().unwrap();

        let output = run(&ToolCommand::new(script).arg("world"), work.path()).unwrap();
        assert_eq!(output.stdout.trim(), "hello world");
    }

    #[test]
    fn failure_reports_stderr() {
        let bin = tempfile::tempdir().unwrap();
        let script = write_script(bin.path(), "broken", "echo 'bad input' >&2\nexit 3");
        let work = tempfile::tempdir().unwrap();

        let err = run(&ToolCommand::new(script), work.path()).unwrap_err();
        match err {
            ToolError::Failed { output, .. } => assert_eq!(output, "bad input"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_unavailable() {
        let work = tempfile::tempdir().unwrap();
        let err = run(&ToolCommand::new("/nonexistent/ensync-tool"), work.path()).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn first_successful_candidate_wins() {
        let bin = tempfile::tempdir().unwrap();
        let script = write_script(
            bin.path(),
            "picky",
            "if [ \"$1\" = \"-old\" ]; then echo ok; exit 0; fi\nexit 1",
        );
        let work = tempfile::tempdir().unwrap();
        let candidates = [
            ToolCommand::new(&script).arg("-new"),
            ToolCommand::new(&script).arg("-old"),
        ];

        let output = run_first_success("picky", &candidates, work.path()).unwrap();
        assert_eq!(output.stdout.trim(), "ok");

        let err = run_first_success("picky", &candidates[..1], work.path()).unwrap_err();
        assert!(matches!(err, ToolError::Exhausted { attempts: 1, .. }));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn workspace_is_removed_unless_kept() {
        let removed = Workspace::new("ensync-test", false).unwrap();
        let removed_path = removed.path().to_path_buf();
        drop(removed);
        assert!(!removed_path.exists());

        let kept = Workspace::new("ensync-test", true).unwrap();
        let kept_path = kept.path().to_path_buf();
        drop(kept);
        assert!(kept_path.exists());
        std::fs::remove_dir_all(kept_path).unwrap();
    }
}
