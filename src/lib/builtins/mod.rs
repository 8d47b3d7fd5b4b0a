mod helpers;

pub use self::helpers::Status;

use crate::shell::Shell;
use itertools::Itertools;
use std::{
    env,
    io::{self, Write},
    path::PathBuf,
};

/// The type for builtin functions. Builtins have direct access to the shell.
pub type BuiltinFunction = fn(&[String], &mut Shell) -> Status;

macro_rules! map {
    ($($name:expr => $func:ident),+) => {{
        BuiltinMap {
            name: &[$($name),+],
            functions: &[$($func),+],
        }
    }}
}

/// Builtins are in A-Z order.
pub const BUILTINS: &BuiltinMap = &map!(
    "cd" => builtin_cd,
    "exit" => builtin_exit,
    "history" => builtin_history,
    "pwd" => builtin_pwd
);

/// A table of the builtins, sorted by name.
pub struct BuiltinMap {
    pub(crate) name:      &'static [&'static str],
    pub(crate) functions: &'static [BuiltinFunction],
}

impl BuiltinMap {
    pub fn contains_key(&self, func: &str) -> bool { self.name.iter().any(|&name| name == func) }

    pub fn keys(&self) -> &'static [&'static str] { self.name }

    pub fn get(&self, func: &str) -> Option<BuiltinFunction> {
        self.name.binary_search(&func).ok().map(|pos| self.functions[pos])
    }
}

pub fn builtin_cd(args: &[String], _: &mut Shell) -> Status {
    let dir = match args.get(1) {
        Some(dir) => PathBuf::from(dir),
        None => env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from),
    };

    match env::set_current_dir(&dir) {
        Ok(()) => {
            if let Ok(cwd) = env::current_dir() {
                env::set_var("PWD", cwd);
            }
            Status::SUCCESS
        }
        Err(why) => Status::error(format!("cd: {}: {}", dir.display(), why)),
    }
}

fn builtin_pwd(_: &[String], _: &mut Shell) -> Status {
    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(why) => return Status::error(format!("pwd: {}", why)),
    };
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    writeln!(stdout, "{}", cwd.display()).and_then(|_| stdout.flush()).into()
}

fn builtin_history(_: &[String], shell: &mut Shell) -> Status {
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let listing =
        shell.history.iter().enumerate().map(|(id, line)| format!("{}  {}", id + 1, line));
    let result = if shell.history.is_empty() {
        Ok(())
    } else {
        writeln!(stdout, "{}", listing.format("\n"))
    };
    result.and_then(|_| stdout.flush()).into()
}

fn builtin_exit(args: &[String], shell: &mut Shell) -> Status {
    let status = args.get(1).and_then(|status| status.parse::<i32>().ok()).map_or(
        Status::SUCCESS,
        Status::from_exit_code,
    );
    shell.exit(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn table_is_sorted() {
        let mut sorted = BUILTINS.keys().to_vec();
        sorted.sort();
        assert_eq!(sorted, BUILTINS.keys());
    }

    #[test]
    fn lookup() {
        assert!(BUILTINS.get("cd").is_some());
        assert!(BUILTINS.get("pwd").is_some());
        assert!(BUILTINS.get("history").is_some());
        assert!(BUILTINS.get("exit").is_some());
        assert!(BUILTINS.get("echo").is_none());
        assert!(BUILTINS.contains_key("history"));
    }

    #[test]
    #[serial]
    fn cd_changes_directory() {
        let original = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();
        let mut shell = Shell::new();

        let args = vec!["cd".to_string(), target.display().to_string()];
        assert_eq!(Status::SUCCESS, builtin_cd(&args, &mut shell));
        assert_eq!(target, env::current_dir().unwrap());

        env::set_current_dir(&original).unwrap();
    }

    #[test]
    #[serial]
    fn cd_defaults_to_home() {
        let original = env::current_dir().unwrap();
        let home = env::var_os("HOME");
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();
        env::set_var("HOME", &target);

        let mut shell = Shell::new();
        assert_eq!(Status::SUCCESS, builtin_cd(&["cd".to_string()], &mut shell));
        assert_eq!(target, env::current_dir().unwrap());

        match home {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }
        env::set_current_dir(&original).unwrap();
    }

    #[test]
    #[serial]
    fn cd_failure_is_not_fatal() {
        let original = env::current_dir().unwrap();
        let mut shell = Shell::new();
        let args = vec!["cd".to_string(), "/no/such/directory".to_string()];
        assert_eq!(Status::FAILURE, builtin_cd(&args, &mut shell));
        assert_eq!(original, env::current_dir().unwrap());
    }

    #[test]
    #[serial]
    fn lone_cd_moves_the_shell_but_piped_cd_does_not() {
        let original = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();
        let mut shell = Shell::new();

        let piped = format!("cd {} | true", target.display());
        assert!(shell.execute_command(&piped).unwrap().is_success());
        assert_eq!(original, env::current_dir().unwrap());

        let lone = format!("cd {}", target.display());
        assert!(shell.execute_command(&lone).unwrap().is_success());
        assert_eq!(target, env::current_dir().unwrap());

        env::set_current_dir(&original).unwrap();
    }
}
