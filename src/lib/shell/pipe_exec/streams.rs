use crate::{parser::pipelines::Redirection, sys};
use nix::{
    errno::Errno,
    fcntl::{open, OFlag},
    sys::stat::Mode,
};
use std::{
    ffi::{CStr, CString, NulError},
    fs::File,
    os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd},
};
use thiserror::Error;

/// A redirection target that could not be opened.
#[derive(Debug, Error)]
#[error("{path}: {source}")]
pub struct RedirectionError {
    path:   String,
    #[source]
    source: Errno,
}

/// Use dup2 to replace `new` with `old`, reporting but otherwise ignoring a failure.
pub(crate) fn redir(old: RawFd, new: RawFd) {
    if let Err(e) = sys::dup2(old, new) {
        eprintln!("minish: could not duplicate {} to {}: {}", old, new, e);
    }
}

/// Duplicates STDIN and STDOUT, in that order, and returns them as `File`s which close the
/// duplicates when dropped.
pub(crate) fn duplicate_streams() -> nix::Result<(Option<File>, File)> {
    // STDIN may have been closed for a background shell, so it is ok if it cannot be duplicated.
    let stdin = sys::dup(sys::STDIN_FILENO).ok().map(|fd| unsafe { File::from_raw_fd(fd) });
    let stdout = sys::dup(sys::STDOUT_FILENO).map(|fd| unsafe { File::from_raw_fd(fd) })?;
    Ok((stdin, stdout))
}

pub(crate) fn redirect_streams(inp: Option<File>, out: File) {
    if let Some(inp) = inp {
        redir(inp.as_raw_fd(), sys::STDIN_FILENO);
    }
    redir(out.as_raw_fd(), sys::STDOUT_FILENO);
}

/// A stage's redirection with its paths already converted for the system calls, so that
/// applying it after a fork needs no further conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PreparedRedirection {
    infile:  Option<CString>,
    outfile: Option<CString>,
    append:  bool,
}

impl PreparedRedirection {
    pub(crate) fn new(redirection: &Redirection) -> Result<Self, NulError> {
        let convert = |path: &Option<String>| path.as_deref().map(CString::new).transpose();
        let infile = convert(&redirection.infile)?;
        let outfile = convert(&redirection.outfile)?;
        Ok(PreparedRedirection { infile, outfile, append: redirection.append })
    }

    pub(crate) fn is_empty(&self) -> bool { self.infile.is_none() && self.outfile.is_none() }

    /// Rebinds standard input and output of the current process to the redirection targets.
    ///
    /// The input is bound before the output is opened, so a failure on the output may leave
    /// standard input already redirected.
    pub(crate) fn apply(&self) -> Result<(), RedirectionError> {
        if let Some(ref path) = self.infile {
            replace_with(path, OFlag::O_RDONLY, sys::STDIN_FILENO)?;
        }

        if let Some(ref path) = self.outfile {
            let mode = if self.append { OFlag::O_APPEND } else { OFlag::O_TRUNC };
            replace_with(path, OFlag::O_WRONLY | OFlag::O_CREAT | mode, sys::STDOUT_FILENO)?;
        }

        Ok(())
    }
}

fn replace_with(path: &CStr, flags: OFlag, target: RawFd) -> Result<(), RedirectionError> {
    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
    let fd = sys::retry(|| open(path, flags, mode)).map_err(|source| RedirectionError {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;

    if fd == target {
        // The standard descriptor was closed and the file took its place.
        return Ok(());
    }

    // Closed on return, once it has been duplicated onto the target.
    let file = unsafe { OwnedFd::from_raw_fd(fd) };
    sys::dup2(file.as_raw_fd(), target)
        .map_err(|source| RedirectionError { path: path.to_string_lossy().into_owned(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_bytes_are_rejected() {
        let redirection =
            Redirection { outfile: Some("bad\0name".into()), ..Redirection::default() };
        assert!(PreparedRedirection::new(&redirection).is_err());
    }

    #[test]
    fn empty_redirection() {
        let prepared = PreparedRedirection::new(&Redirection::default()).unwrap();
        assert!(prepared.is_empty());
        assert!(prepared.apply().is_ok());

        let redirection = Redirection { infile: Some("in".into()), ..Redirection::default() };
        assert!(!PreparedRedirection::new(&redirection).unwrap().is_empty());
    }

    #[test]
    fn missing_input_reports_the_path() {
        let redirection =
            Redirection { infile: Some("/no/such/file".into()), ..Redirection::default() };
        let err = PreparedRedirection::new(&redirection).unwrap().apply().unwrap_err();
        assert_eq!(Errno::ENOENT, err.source);
        assert!(err.to_string().starts_with("/no/such/file: "));
    }
}
