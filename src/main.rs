mod binary;

use self::binary::{InteractiveBinary, MAN_MINISH};
use atty::Stream;
use minish::{Options, Shell, Status};
use std::{
    env,
    fs::File,
    io::{self, BufReader},
};

fn main() {
    let mut opts = Options::default();
    let mut command = None;
    let mut script = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-n" | "--no-execute" => opts.no_exec = true,
            "-x" => opts.print_comms = true,
            "-c" => {
                command = Some(args.by_ref().collect::<Vec<_>>().join(" "));
                break;
            }
            "-v" | "--version" => {
                println!("{}", minish::version());
                return;
            }
            "-h" | "--help" => {
                println!("{}", MAN_MINISH);
                return;
            }
            _ => {
                script = Some(arg);
                break;
            }
        }
    }

    let mut shell = Shell::with_options(opts);

    if let Some(command) = command {
        if command.trim().is_empty() {
            eprintln!("minish: -c requires an argument");
            shell.exit(Status::FAILURE);
        }
        shell.history.push(&command);
        binary::execute_line(&mut shell, &command);
    } else if let Some(path) = script {
        let result = File::open(&path)
            .and_then(|file| binary::execute_script(&mut shell, BufReader::new(file)));
        if let Err(why) = result {
            eprintln!("minish: {}: {}", path, why);
            shell.exit(Status::FAILURE);
        }
    } else if atty::is(Stream::Stdin) {
        InteractiveBinary::new(shell).execute_interactive();
    } else {
        let stdin = io::stdin();
        if let Err(why) = binary::execute_script(&mut shell, stdin.lock()) {
            eprintln!("minish: unable to read from stdin: {}", why);
        }
    }

    shell.wait_for_background();
    let status = shell.previous_status();
    shell.exit(status)
}
