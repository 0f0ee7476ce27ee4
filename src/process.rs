//! Process module.
//!
//! This module contains cross platform helpers around the
//! `std::process` crate, used to resolve secrets from shell commands.

use log::debug;
use std::{
    env, io,
    process::{Command, Output},
    result, string,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot run command {1:?}")]
    RunCmdError(#[source] io::Error, String),
    #[error("command {0:?} exited with status {1}")]
    ExitStatusError(String, i32),
    #[error("cannot parse command output")]
    ParseCmdOutputError(#[source] string::FromUtf8Error),
}

pub type Result<T> = result::Result<T, Error>;

/// Runs the given command through the platform shell and returns its
/// standard output as an UTF-8 string.
pub fn run(cmd: &str) -> Result<String> {
    debug!("running command: {}", cmd);

    let windows = cfg!(target_os = "windows")
        && env::var("MSYSTEM")
            .map(|env| !env.starts_with("MINGW"))
            .unwrap_or_default();

    let Output { status, stdout, .. } = if windows {
        Command::new("cmd").args(&["/C", cmd]).output()
    } else {
        Command::new("sh").arg("-c").arg(cmd).output()
    }
    .map_err(|err| Error::RunCmdError(err, cmd.to_owned()))?;

    if !status.success() {
        return Err(Error::ExitStatusError(
            cmd.to_owned(),
            status.code().unwrap_or(-1),
        ));
    }

    String::from_utf8(stdout).map_err(Error::ParseCmdOutputError)
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    #[test]
    fn run_echo() {
        assert_eq!("password\n", super::run("echo password").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn run_failing_cmd() {
        assert!(matches!(
            super::run("exit 3"),
            Err(super::Error::ExitStatusError(_, 3))
        ));
    }
}
