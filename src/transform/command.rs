// src/transform/command.rs

//! External filter commands (template renderers, style compilers).
//!
//! A filter reads a source file on stdin and writes the result to stdout.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

/// Result of running a filter to completion.
#[derive(Debug, Clone)]
pub struct FilterOutput {
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Run `cmd` through the platform shell with `input` on stdin.
///
/// Errors only when the process cannot be started or waited on; a non-zero
/// exit is reported through [`FilterOutput::success`].
pub fn run_filter(cmd: &str, input: &[u8], cwd: &Path) -> Result<FilterOutput> {
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    debug!(cmd = %cmd, cwd = %cwd.display(), "running filter");

    let mut child = command
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning filter command '{cmd}'"))?;

    // Feed stdin from another thread so a filter that writes before it has
    // read everything cannot deadlock against us.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        std::thread::spawn(move || stdin.write_all(&input))
    });

    let output = child
        .wait_with_output()
        .with_context(|| format!("waiting for filter command '{cmd}'"))?;

    if let Some(writer) = writer {
        // A filter may exit without reading all input (e.g. on a parse
        // error); the broken pipe that causes is not our failure.
        let _ = writer.join();
    }

    Ok(FilterOutput {
        success: output.status.success(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
