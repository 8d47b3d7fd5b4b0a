use std::{
    env,
    fs::File,
    io::{self, Read, Write},
    path::Path,
    process::Command,
};

fn main() {
    match write_version_file() {
        Ok(_) => {}
        Err(e) => panic!("Failed to create a version file: {:?}", e),
    }
}

fn write_version_file() -> io::Result<()> {
    let version = env::var("CARGO_PKG_VERSION").unwrap();
    let target = env::var("TARGET").unwrap();
    let version_fname = Path::new(&env::var("OUT_DIR").unwrap()).join("version_string");
    let mut version_file = File::create(&version_fname)?;
    write!(
        &mut version_file,
        "r#\"minish {} ({})\nrev {}\"#",
        version,
        target,
        get_git_rev().trim()
    )?;
    Ok(())
}

/// Falls back to reading the ref file, and then to `unknown` for source tarballs.
fn get_git_rev() -> String {
    match Command::new("git").arg("rev-parse").arg("HEAD").output() {
        Ok(ref out) if out.status.success() => match String::from_utf8(out.stdout.clone()) {
            Ok(s) => s,
            Err(_) => git_rev_from_file().unwrap_or_else(|_| "unknown".into()),
        },
        _ => git_rev_from_file().unwrap_or_else(|_| "unknown".into()),
    }
}

fn git_rev_from_file() -> io::Result<String> {
    let git_file = Path::new(&env::var("CARGO_MANIFEST_DIR").unwrap())
        .join(".git")
        .join("refs")
        .join("heads")
        .join("master");
    let mut file = File::open(git_file)?;
    let mut rev = String::new();
    file.read_to_string(&mut rev)?;
    Ok(rev)
}
