mod history;
pub mod pipe_exec;

pub use self::{
    history::History,
    pipe_exec::{
        job_control::{BackgroundProcess, ProcessState},
        streams::RedirectionError,
        PipelineError,
    },
};
pub use crate::builtins::Status;

use crate::{
    builtins::{BuiltinMap, BUILTINS},
    parser::pipelines::{parse, Limits, PipelineParsingError},
    sys,
};
use std::process;
use thiserror::Error;

/// Errors from the processing of a single line of input.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The line could not be parsed; nothing was run.
    #[error("{0}")]
    Parsing(#[from] PipelineParsingError),
    /// The pipeline could not be started or waited on.
    #[error("pipeline execution error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Options for the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Capacity limits applied while parsing each line.
    pub limits:           Limits,
    /// How many commands the history retains.
    pub history_capacity: usize,
    /// Parse every line, but do not run anything.
    pub no_exec:          bool,
    /// Print each pipeline before it runs.
    pub print_comms:      bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            limits:           Limits::default(),
            history_capacity: History::DEFAULT_CAPACITY,
            no_exec:          false,
            print_comms:      false,
        }
    }
}

/// The shell structure holds everything that outlives a single pipeline: the builtins, the
/// command history, the background jobs and the status of the last command.
pub struct Shell {
    /// The builtins that are recognized in the head position of a stage.
    pub(crate) builtins: &'static BuiltinMap,
    /// The log of commands, as printed by the `history` builtin.
    pub history: History,
    /// When a command is executed, the final result of that command is stored here.
    previous_status: Status,
    /// Background jobs, indexed by job id. Finished jobs leave an empty slot behind.
    background: Vec<BackgroundProcess>,
    opts: Options,
}

impl Default for Shell {
    fn default() -> Self { Self::new() }
}

impl Shell {
    pub fn new() -> Self { Self::with_options(Options::default()) }

    pub fn with_options(opts: Options) -> Self {
        Shell {
            builtins: BUILTINS,
            history: History::new(opts.history_capacity),
            previous_status: Status::SUCCESS,
            background: Vec::new(),
            opts,
        }
    }

    /// Parses and runs one line of input, returning the status of the pipeline it describes.
    ///
    /// A blank line runs nothing and leaves the previous status in place. A line that fails
    /// to parse or to launch sets the previous status to a general failure.
    pub fn execute_command(&mut self, line: &str) -> Result<Status, ShellError> {
        let result = self.run_line(line);
        match &result {
            Ok(status) => self.previous_status = *status,
            Err(_) => self.previous_status = Status::FAILURE,
        }
        result
    }

    fn run_line(&mut self, line: &str) -> Result<Status, ShellError> {
        let pipeline = match parse(line, &self.opts.limits)? {
            Some(pipeline) => pipeline,
            None => return Ok(self.previous_status),
        };

        if self.opts.no_exec {
            return Ok(Status::SUCCESS);
        }

        Ok(self.execute_pipeline(&pipeline)?)
    }

    /// Terminates the process with the given status.
    pub fn exit(&mut self, status: Status) -> ! {
        sys::flush_std_streams();
        process::exit(status.as_os_code())
    }

    /// The status of the last command that was run.
    pub fn previous_status(&self) -> Status { self.previous_status }

    pub fn builtins(&self) -> &'static BuiltinMap { self.builtins }

    /// Access to the shell options
    pub fn opts(&self) -> &Options { &self.opts }

    /// Mutable access to the shell options
    pub fn opts_mut(&mut self) -> &mut Options { &mut self.opts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn syntax_errors_fail_the_line() {
        let mut shell = Shell::new();
        match shell.execute_command("echo 'open") {
            Err(ShellError::Parsing(PipelineParsingError::UnmatchedQuote)) => (),
            other => panic!("expected a syntax error, got {:?}", other),
        }
        assert_eq!(Status::FAILURE, shell.previous_status());
    }

    #[test]
    fn blank_lines_keep_the_previous_status() {
        let mut shell = Shell::new();
        assert_eq!(Status::SUCCESS, shell.execute_command("   ").unwrap());
        let _ = shell.execute_command("|");
        assert_eq!(Status::FAILURE, shell.execute_command("\n").unwrap());
    }

    #[test]
    fn no_exec_only_parses() {
        let mut shell = Shell::with_options(Options { no_exec: true, ..Options::default() });
        assert!(shell.execute_command("minish-no-such-command | false").unwrap().is_success());
        assert!(shell.execute_command("cat <").is_err());
    }

    #[test]
    fn limits_come_from_the_options() {
        let limits = Limits { max_args: 2, max_stages: 2 };
        let opts = Options { limits, no_exec: true, ..Options::default() };
        let mut shell = Shell::with_options(opts);
        match shell.execute_command("echo a b") {
            Err(ShellError::Parsing(PipelineParsingError::TooManyArgs(2))) => (),
            other => panic!("expected too many args, got {:?}", other),
        }
        match shell.execute_command("a | b | c") {
            Err(ShellError::Parsing(PipelineParsingError::TooManyStages(2))) => (),
            other => panic!("expected too many stages, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn previous_status_follows_the_last_stage() {
        let mut shell = Shell::new();
        assert_eq!(Status::FAILURE, shell.execute_command("true | false").unwrap());
        assert_eq!(Status::FAILURE, shell.previous_status());
        assert_eq!(Status::SUCCESS, shell.execute_command("pwd > /dev/null").unwrap());
        assert_eq!(Status::SUCCESS, shell.previous_status());
    }

    #[test]
    fn history_capacity_comes_from_the_options() {
        let shell = Shell::with_options(Options { history_capacity: 5, ..Options::default() });
        assert_eq!(5, shell.history.capacity());
    }
}
