//! Contains the binary logic of minish: reading lines from a script, a `-c` argument or the
//! terminal, and handing them to the shell.

use minish::{Shell, Status};
use std::{
    env,
    fs::OpenOptions,
    io::{self, BufRead, Write},
    path::Path,
};
use xdg::BaseDirectories;

pub const MAN_MINISH: &str = "NAME
    minish - a minimal pipeline shell

SYNOPSIS
    minish [options] [script]

DESCRIPTION
    minish runs pipelines of simple commands. Each stage may redirect its input with `< file`
    and its output with `> file` or `>> file`. A trailing `&` runs the pipeline in the
    background.

BUILTINS:
    cd [path]           change the current directory, to $HOME by default
    pwd                 print the current directory
    history             print the commands entered so far
    exit [status]       exit the shell

OPTIONS:
    -c <command>        evaluates the given command instead of reading from the commandline.

    -n or --no-execute
        do not execute any commands, just do syntax checking.

    -x
        print each pipeline before it is executed.

    -v or --version
        prints the version, platform and revision of minish then exits.

    -h or --help
        prints this manual then exits.

ARGS:
    <script>    A file to execute line by line. Blank lines and lines beginning with `#` are
                skipped.";

/// Runs a single line, reporting any failure of the shell itself on stderr.
pub fn execute_line(shell: &mut Shell, line: &str) -> Status {
    match shell.execute_command(line) {
        Ok(status) => status,
        Err(why) => {
            eprintln!("minish: {}", why);
            shell.previous_status()
        }
    }
}

/// Executes every line of a script, in order, skipping blanks and comments.
pub fn execute_script<R: BufRead>(shell: &mut Shell, reader: R) -> io::Result<Status> {
    for line in reader.lines() {
        let line = line?;
        let command = line.trim();
        if command.is_empty() || command.starts_with('#') {
            continue;
        }
        shell.reap_background();
        shell.history.push(command);
        execute_line(shell, command);
    }
    Ok(shell.previous_status())
}

pub struct InteractiveBinary {
    shell: Shell,
}

impl InteractiveBinary {
    const CONFIG_FILE_NAME: &'static str = "initrc";

    pub fn new(shell: Shell) -> Self { InteractiveBinary { shell } }

    fn create_config_file(base_dirs: BaseDirectories, file_name: &str) -> Result<(), io::Error> {
        let path = base_dirs.place_config_file(file_name)?;
        OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(())
    }

    fn execute_file(&mut self, path: &Path) -> io::Result<Status> {
        let file = std::fs::File::open(path)?;
        execute_script(&mut self.shell, io::BufReader::new(file))
    }

    fn exec_init_file(&mut self) {
        match BaseDirectories::with_prefix("minish") {
            Ok(base_dirs) => match base_dirs.find_config_file(Self::CONFIG_FILE_NAME) {
                Some(initrc) => {
                    if let Err(err) = self.execute_file(&initrc) {
                        eprintln!("minish: {}: {}", initrc.display(), err)
                    }
                }
                None => {
                    if let Err(err) = Self::create_config_file(base_dirs, Self::CONFIG_FILE_NAME) {
                        eprintln!("minish: could not create config file: {}", err);
                    }
                }
            },
            Err(err) => {
                eprintln!("minish: unable to get base directory: {}", err);
            }
        }
    }

    fn prompt() -> String {
        let cwd = env::current_dir()
            .map(|cwd| cwd.display().to_string())
            .unwrap_or_else(|_| "?".into());
        format!("minish:{}$ ", cwd)
    }

    /// Reads one line from the terminal. `None` marks the end of input.
    fn readln(stdin: &mut impl BufRead) -> Option<String> {
        print!("{}", Self::prompt());
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(why) => {
                eprintln!("minish: unable to read from stdin: {}", why);
                None
            }
        }
    }

    /// Creates an interactive session that reads commands from the terminal until the end
    /// of input, then exits with the status of the last command.
    pub fn execute_interactive(mut self) -> ! {
        self.exec_init_file();

        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        loop {
            self.shell.reap_background();
            let command = match Self::readln(&mut stdin) {
                Some(command) => command,
                None => break,
            };

            let command = command.trim();
            if command.is_empty() {
                continue;
            }
            self.shell.history.push(command);
            execute_line(&mut self.shell, command);
        }

        println!();
        let status = self.shell.previous_status();
        self.shell.exit(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minish::Options;

    #[test]
    fn scripts_skip_comments_and_blanks() {
        let mut shell = Shell::with_options(Options { no_exec: true, ..Options::default() });
        let script = "# a comment\n\n   \necho one\n  # indented comment\necho two | cat\n";
        assert_eq!(Status::SUCCESS, execute_script(&mut shell, script.as_bytes()).unwrap());
        assert_eq!(vec!["echo one", "echo two | cat"], shell.history.iter().collect::<Vec<_>>());
    }

    #[test]
    fn script_syntax_errors_are_not_fatal() {
        let mut shell = Shell::with_options(Options { no_exec: true, ..Options::default() });
        let status = execute_script(&mut shell, "echo >\necho fine\n".as_bytes()).unwrap();
        assert_eq!(Status::SUCCESS, status);

        let status = execute_script(&mut shell, "echo fine\ncat <\n".as_bytes()).unwrap();
        assert_eq!(Status::FAILURE, status);
    }
}
