//! Drive a running `revtrace` from a test: watch its log output, then send
//! it a line or a signal while the search is still going.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStderr, ChildStdin, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// How long [`BackgroundRun::wait`] gives the process to exit.
const EXIT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BackgroundRun {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: BufReader<ChildStderr>,
    seen: String,
}

impl BackgroundRun {
    /// Spawn `command` with stdin and stderr piped and stdout discarded.
    ///
    /// Stdin stays open until [`BackgroundRun::wait`], so the ENTER
    /// listener neither fires nor sees EOF on its own.
    pub fn spawn(mut command: Command) -> Result<Self> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let mut child = command.spawn().context("Failed to spawn process")?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take().context("stderr was not captured")?;
        Ok(Self {
            child,
            stdin,
            stderr: BufReader::new(stderr),
            seen: String::new(),
        })
    }

    /// Block until a stderr line contains `needle`.
    pub fn wait_for_stderr(&mut self, needle: &str) -> Result<()> {
        loop {
            let mut line = String::new();
            let read = self.stderr.read_line(&mut line)?;
            if read == 0 {
                anyhow::bail!("process exited before logging {:?}:\n{}", needle, self.seen);
            }
            self.seen.push_str(&line);
            if line.contains(needle) {
                return Ok(());
            }
        }
    }

    /// Type ENTER into the process.
    pub fn send_line(&mut self) -> Result<()> {
        let stdin = self.stdin.as_mut().context("stdin already closed")?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    /// Send SIGTERM, as a service manager or `kill` would.
    #[cfg(unix)]
    pub fn terminate(&self) -> Result<()> {
        let pid = libc::pid_t::try_from(self.child.id()).context("pid out of range")?;
        // SAFETY: plain kill(2) on our own child's pid
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error()).context("kill failed");
        }
        Ok(())
    }

    /// Close stdin, collect the remaining stderr and wait for exit.
    pub fn wait(mut self) -> Result<(ExitStatus, String)> {
        drop(self.stdin.take());

        let start = Instant::now();
        let status = loop {
            if let Some(status) = self.child.try_wait()? {
                break status;
            }
            if start.elapsed() > EXIT_TIMEOUT {
                let _ = self.child.kill();
                anyhow::bail!("process did not exit in time:\n{}", self.seen);
            }
            std::thread::sleep(Duration::from_millis(50));
        };

        let mut rest = String::new();
        self.stderr.read_to_string(&mut rest)?;
        self.seen.push_str(&rest);
        Ok((status, std::mem::take(&mut self.seen)))
    }
}

impl Drop for BackgroundRun {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
