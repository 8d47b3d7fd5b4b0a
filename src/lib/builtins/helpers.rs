use std::fmt;

/// The exit status of a builtin, a stage, or a whole pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Status(i32);

impl Status {
    pub const FAILURE: Self = Status(1);
    pub const NO_SUCH_COMMAND: Self = Status(127);
    pub const SUCCESS: Self = Status(0);
    pub const TERMINATED: Self = Status(143);

    pub fn from_signal(signal: i32) -> Self { Status(128 + signal) }

    pub fn from_exit_code(code: i32) -> Self { Status(code) }

    /// Prints the message, if any, and returns a general failure.
    pub fn error<T: AsRef<str>>(err: T) -> Self {
        let err = err.as_ref();
        if !err.is_empty() {
            eprintln!("minish: {}", err);
        }
        Status::FAILURE
    }

    pub fn is_success(self) -> bool { self.0 == 0 }

    pub fn is_failure(self) -> bool { self.0 != 0 }

    pub fn as_os_code(self) -> i32 { self.0 }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<std::io::Result<()>> for Status {
    fn from(res: std::io::Result<()>) -> Self {
        match res {
            Ok(_) => Status::SUCCESS,
            Err(err) => Status::error(err.to_string()),
        }
    }
}
