use super::{
    super::{Shell, Status},
    PipelineError,
};
use crate::sys;
use nix::{
    errno::Errno,
    sys::{
        signal::{kill, Signal},
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};
use smallvec::SmallVec;
use std::fmt;

#[derive(Clone, Copy, Hash, Debug, PartialEq, Eq)]
/// Defines whether the background job still has processes to reap.
pub enum ProcessState {
    Running,
    Empty,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProcessState::Running => write!(f, "Running"),
            ProcessState::Empty => write!(f, "Empty"),
        }
    }
}

#[derive(Clone, Debug)]
/// A pipeline that was sent to the background. The shell keeps the processes it has yet to
/// reap, the pid it reported for the job, and the command line that started it.
pub struct BackgroundProcess {
    pid:       Pid,
    remaining: SmallVec<[Pid; 16]>,
    state:     ProcessState,
    status:    Status,
    name:      String,
}

impl BackgroundProcess {
    /// `pids` are in stage order; the job is reported under the last one.
    pub(super) fn new(pids: SmallVec<[Pid; 16]>, name: String) -> Self {
        let pid = pids.last().copied().unwrap_or_else(|| Pid::from_raw(0));
        BackgroundProcess {
            pid,
            remaining: pids,
            state: ProcessState::Running,
            status: Status::SUCCESS,
            name,
        }
    }

    pub fn pid(&self) -> Pid { self.pid }

    pub fn name(&self) -> &str { &self.name }

    pub fn is_running(&self) -> bool { self.state == ProcessState::Running }

    pub fn exists(&self) -> bool { self.state != ProcessState::Empty }

    pub fn forget(&mut self) { self.state = ProcessState::Empty }

    /// Reaps whichever processes of this job have finished, returning true once none remain.
    fn reap(&mut self, flags: Option<WaitPidFlag>) -> bool {
        let (pid, name, status) = (self.pid, &self.name, &mut self.status);
        self.remaining.retain(|&mut child| match sys::retry(|| waitpid(child, flags)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(WaitStatus::Exited(_, code)) => {
                if child == pid {
                    *status = Status::from_exit_code(code);
                }
                false
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                if child == pid {
                    *status = Status::from_signal(signal as i32);
                }
                false
            }
            Ok(_) => true,
            // Already reaped elsewhere, or not our child anymore.
            Err(Errno::ECHILD) => false,
            Err(why) => {
                eprintln!("minish: ({} {}) errored: {}", name, child, why);
                false
            }
        });
        self.remaining.is_empty()
    }
}

impl fmt::Display for BackgroundProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}\t{}", self.pid, self.state, self.name)
    }
}

/// Sends SIGTERM to every process in `pids` and then reaps them all.
pub(super) fn terminate_and_reap(pids: &[Pid]) {
    for &pid in pids {
        let _ = kill(pid, Signal::SIGTERM);
    }
    for &pid in pids {
        let _ = sys::retry(|| waitpid(pid, None));
    }
}

impl Shell {
    fn add_to_background(&mut self, job: BackgroundProcess) -> usize {
        match self.background.iter().position(|x| !x.exists()) {
            Some(id) => {
                self.background[id] = job;
                id
            }
            None => {
                let njobs = self.background.len();
                self.background.push(job);
                njobs
            }
        }
    }

    /// Registers a background job and reports its id and pid once.
    pub fn send_to_background(&mut self, process: BackgroundProcess) {
        let pid = process.pid();
        let njob = self.add_to_background(process) + 1;
        eprintln!("minish: bg [{}] {}", njob, pid);
    }

    /// The background jobs that have not been reaped yet.
    pub fn background_jobs(&self) -> impl Iterator<Item = &BackgroundProcess> {
        self.background.iter().filter(|job| job.is_running())
    }

    fn collect_background(&mut self, flags: Option<WaitPidFlag>) {
        for (id, job) in self.background.iter_mut().enumerate() {
            if job.is_running() && job.reap(flags) {
                eprintln!("minish: ([{}] {}) exited with {}", id + 1, job.pid, job.status);
                job.forget();
            }
        }
    }

    /// Reaps background jobs that have finished, without blocking on those still running.
    pub fn reap_background(&mut self) { self.collect_background(Some(WaitPidFlag::WNOHANG)) }

    /// Blocks until every background job has finished.
    pub fn wait_for_background(&mut self) { self.collect_background(None) }

    /// Waits, in stage order, on every process of a foreground pipeline. The status of the
    /// pipeline is the status of its last stage.
    pub fn watch_foreground(&mut self, pids: &[Pid]) -> Result<Status, PipelineError> {
        let mut status = Status::SUCCESS;
        let mut error = None;
        for &pid in pids {
            match sys::retry(|| waitpid(pid, None)) {
                Ok(WaitStatus::Exited(_, code)) => status = Status::from_exit_code(code),
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    status = Status::from_signal(signal as i32)
                }
                Ok(_) => (),
                Err(source) => {
                    if error.is_none() {
                        error = Some(PipelineError::WaitPid { pid, source });
                    }
                }
            }
        }

        match error {
            Some(why) => Err(why),
            None => Ok(status),
        }
    }
}
