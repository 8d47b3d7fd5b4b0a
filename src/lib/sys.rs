//! Thin wrappers over the handful of system calls the executor needs.

use nix::errno::Errno;
use std::{
    io::{self, Write},
    os::unix::io::RawFd,
};

pub use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};

/// Repeats a system call for as long as it is interrupted by a signal.
pub fn retry<T, F>(mut call: F) -> nix::Result<T>
where
    F: FnMut() -> nix::Result<T>,
{
    loop {
        match call() {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}

pub fn dup(fd: RawFd) -> nix::Result<RawFd> { retry(|| nix::unistd::dup(fd)) }

pub fn dup2(old: RawFd, new: RawFd) -> nix::Result<()> {
    retry(|| nix::unistd::dup2(old, new)).map(|_| ())
}

/// Flushes the buffered standard streams, so that their contents are not written twice once
/// the process is duplicated.
pub fn flush_std_streams() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

/// Terminates a forked child without running the parent's exit handlers.
pub fn fork_exit(status: i32) -> ! {
    flush_std_streams();
    unsafe { nix::libc::_exit(status) }
}
