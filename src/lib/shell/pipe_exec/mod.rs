//! The purpose of the pipeline execution module is to turn a parsed pipeline into running
//! processes and manage their execution thereof. That includes creating the pipes between
//! stages, forking and executing commands, applying std{in,out} redirections, and waiting on
//! foreground tasks or handing background tasks over to job control.

pub mod job_control;
pub mod streams;

use self::{
    job_control::{terminate_and_reap, BackgroundProcess},
    streams::{duplicate_streams, redir, redirect_streams, PreparedRedirection},
};
use super::{Shell, Status};
use crate::{
    builtins::BuiltinFunction,
    parser::pipelines::{Pipeline, Stage},
    sys,
};
use nix::{
    errno::Errno,
    sys::signal::{signal, SigHandler, Signal},
    unistd::{execvp, fork, pipe, ForkResult, Pid},
};
use smallvec::SmallVec;
use std::{
    ffi::{CString, NulError},
    io::{self, Write},
    os::unix::io::{AsRawFd, OwnedFd},
};
use thiserror::Error;

/// Failures of the executor itself, as opposed to failures of the commands it runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not create pipe: {0}")]
    CreatePipe(#[source] Errno),
    #[error("could not fork: {0}")]
    Fork(#[source] Errno),
    #[error("failed to wait on {pid}: {source}")]
    WaitPid {
        pid:    Pid,
        #[source]
        source: Errno,
    },
    #[error("argument contains a nul byte: {0}")]
    NulByte(#[from] NulError),
    #[error("could not save the standard streams: {0}")]
    SaveStreams(#[source] Errno),
    #[error("stage has no command")]
    NoCommand,
}

/// A stage that is ready to be forked: everything a child needs is converted up front.
struct PreparedStage<'p> {
    stage:       &'p Stage,
    argv:        SmallVec<[CString; 4]>,
    redirection: PreparedRedirection,
    builtin:     Option<BuiltinFunction>,
}

impl<'p> PreparedStage<'p> {
    fn new(stage: &'p Stage, shell: &Shell) -> Result<Self, PipelineError> {
        let command = stage.command().ok_or(PipelineError::NoCommand)?;
        let argv = stage
            .args
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<SmallVec<[CString; 4]>, NulError>>()?;
        Ok(PreparedStage {
            stage,
            argv,
            redirection: PreparedRedirection::new(&stage.redirection)?,
            builtin: shell.builtins.get(command),
        })
    }
}

impl Shell {
    /// Executes a parsed pipeline, returning the status of its last stage.
    ///
    /// A lone foreground builtin runs inside the shell itself, so that `cd` and `exit` act on
    /// the shell. Every other stage, builtins included, runs in a process of its own.
    /// Backgrounded pipelines are registered with job control and report success immediately.
    pub fn execute_pipeline(&mut self, pipeline: &Pipeline) -> Result<Status, PipelineError> {
        if self.opts.print_comms {
            eprintln!("> {}", pipeline);
        }

        if pipeline.len() == 1 && !pipeline.is_background() {
            let stage = &pipeline.stages[0];
            if let Some(main) = stage.command().and_then(|command| self.builtins.get(command)) {
                return self.exec_builtin(main, stage);
            }
        }

        let stages = pipeline
            .stages
            .iter()
            .map(|stage| PreparedStage::new(stage, self))
            .collect::<Result<SmallVec<[_; 16]>, PipelineError>>()?;
        let pids = self.spawn_pipeline(&stages)?;

        if pipeline.is_background() {
            self.send_to_background(BackgroundProcess::new(pids, pipeline.to_string()));
            Ok(Status::SUCCESS)
        } else {
            self.watch_foreground(&pids)
        }
    }

    /// Runs a builtin in the shell's own process. Its redirections are applied to the shell's
    /// standard streams for the duration of the call and undone afterwards.
    fn exec_builtin(
        &mut self,
        main: BuiltinFunction,
        stage: &Stage,
    ) -> Result<Status, PipelineError> {
        let redirection = PreparedRedirection::new(&stage.redirection)?;
        if redirection.is_empty() {
            return Ok(main(&stage.args, self));
        }

        sys::flush_std_streams();
        let (stdin, stdout) = duplicate_streams().map_err(PipelineError::SaveStreams)?;
        let status = match redirection.apply() {
            Ok(()) => main(&stage.args, self),
            Err(why) => {
                eprintln!("minish: {}", why);
                Status::FAILURE
            }
        };
        let _ = io::stdout().flush();
        redirect_streams(stdin, stdout);
        Ok(status)
    }

    /// Forks one process per stage, left to right, connecting each stage's output to the next
    /// stage's input. Returns the pids in stage order.
    ///
    /// If a pipe or a fork cannot be created, the stages spawned so far are terminated and
    /// reaped before the error is returned.
    ///
    /// The children allocate and print diagnostics before they exec, which is only sound
    /// while the process forking them has a single thread.
    fn spawn_pipeline(
        &mut self,
        stages: &[PreparedStage],
    ) -> Result<SmallVec<[Pid; 16]>, PipelineError> {
        let mut pids = SmallVec::new();
        // The read end of the previous stage's pipe, if any.
        let mut previous: Option<OwnedFd> = None;

        for (id, stage) in stages.iter().enumerate() {
            let ends = if id + 1 < stages.len() {
                match sys::retry(pipe) {
                    Ok(ends) => Some(ends),
                    Err(why) => {
                        drop(previous);
                        terminate_and_reap(&pids);
                        return Err(PipelineError::CreatePipe(why));
                    }
                }
            } else {
                None
            };

            sys::flush_std_streams();
            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    let writer = ends.map(|(reader, writer)| {
                        drop(reader);
                        writer
                    });
                    self.exec_stage(stage, previous, writer)
                }
                Ok(ForkResult::Parent { child }) => {
                    pids.push(child);
                    // Replacing the previous read end closes it; the write end belongs to the
                    // child alone.
                    previous = ends.map(|(reader, _writer)| reader);
                }
                Err(why) => {
                    drop(ends);
                    drop(previous);
                    terminate_and_reap(&pids);
                    return Err(PipelineError::Fork(why));
                }
            }
        }

        Ok(pids)
    }

    /// Runs in the child: wires the pipe ends onto the standard streams, applies the stage's
    /// redirections, and replaces the process image. Never returns.
    fn exec_stage(
        &mut self,
        stage: &PreparedStage,
        stdin: Option<OwnedFd>,
        stdout: Option<OwnedFd>,
    ) -> ! {
        if let Some(reader) = stdin {
            redir(reader.as_raw_fd(), sys::STDIN_FILENO);
        }
        if let Some(writer) = stdout {
            redir(writer.as_raw_fd(), sys::STDOUT_FILENO);
        }

        // The shell may ignore SIGPIPE; a stage writing into a closed pipe should die of it.
        unsafe {
            let _ = signal(Signal::SIGPIPE, SigHandler::SigDfl);
        }

        if let Err(why) = stage.redirection.apply() {
            eprintln!("minish: {}", why);
            sys::fork_exit(Status::NO_SUCH_COMMAND.as_os_code());
        }

        if let Some(main) = stage.builtin {
            let status = main(&stage.stage.args, self);
            sys::fork_exit(status.as_os_code());
        }

        if let Some(program) = stage.argv.first() {
            let name = program.to_string_lossy();
            match execvp(program, &stage.argv[..]) {
                Err(Errno::ENOENT) => eprintln!("minish: command not found: {}", name),
                Err(why) => eprintln!("minish: {}: {}", name, why),
                Ok(_) => (),
            }
        }
        sys::fork_exit(Status::NO_SUCH_COMMAND.as_os_code())
    }
}
