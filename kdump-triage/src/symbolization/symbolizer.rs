use log::{debug, info, warn};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::listing::{parse_listing, SymbolLocation};
use crate::domain::{FunctionRef, TriageError};

/// Debugger used when none is configured
pub const DEFAULT_DEBUGGER: &str = "gdb";

/// Default limit for one debugger invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Resolves a function reference inside a module binary to a source position
pub trait SymbolResolver {
    /// # Errors
    /// `SymbolNotFound` when the binary has no such symbol, or an environment
    /// error (`DebuggerUnavailable`, `SymbolResolutionTimeout`, `Io`).
    fn resolve(&self, binary: &Path, function: &FunctionRef) -> Result<SymbolLocation, TriageError>;
}

impl<T: SymbolResolver + ?Sized> SymbolResolver for &T {
    fn resolve(
        &self,
        binary: &Path,
        function: &FunctionRef,
    ) -> Result<SymbolLocation, TriageError> {
        (**self).resolve(binary, function)
    }
}

/// Symbol resolution through gdb in batch mode
///
/// Runs `gdb --batch -ex "list *(<function>)" <binary>` and parses the
/// listing header. The call blocks until gdb exits or the timeout expires, in
/// which case gdb is killed.
#[derive(Debug, Clone)]
pub struct GdbSymbolizer {
    program: String,
    leading_args: Vec<String>,
    timeout: Option<Duration>,
}

impl Default for GdbSymbolizer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBUGGER)
    }
}

impl GdbSymbolizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), leading_args: Vec::new(), timeout: Some(DEFAULT_TIMEOUT) }
    }

    /// Arguments placed before the batch options (e.g. `-nx`)
    #[must_use]
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// `None` waits for the debugger indefinitely
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, binary: &Path, function: &FunctionRef) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("--batch")
            .arg("-ex")
            .arg(format!("list *({function})"))
            .arg(binary)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run the debugger and return stdout followed by stderr
    fn run(&self, binary: &Path, function: &FunctionRef) -> Result<String, TriageError> {
        info!("Running {} on {} for {function}", self.program, binary.display());

        let mut child = self.command(binary, function).spawn().map_err(|source| {
            TriageError::DebuggerUnavailable { program: self.program.clone(), source }
        })?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        if let Some(limit) = self.timeout {
            if !wait_with_deadline(&mut child, limit)? {
                warn!("{} did not finish within {limit:?}, killing it", self.program);
                let _ = child.kill();
                let _ = child.wait();
                join_reader(stdout);
                join_reader(stderr);
                return Err(TriageError::SymbolResolutionTimeout {
                    function: function.to_string(),
                    timeout: limit,
                });
            }
        }

        let status = child.wait()?;
        debug!("{} exited with {status}", self.program);

        let mut output = join_reader(stdout);
        output.push_str(&join_reader(stderr));
        Ok(output)
    }
}

impl SymbolResolver for GdbSymbolizer {
    fn resolve(
        &self,
        binary: &Path,
        function: &FunctionRef,
    ) -> Result<SymbolLocation, TriageError> {
        let output = self.run(binary, function)?;
        match parse_listing(&output) {
            Some(location) => {
                info!("{function} is in {}:{}", location.path, location.line);
                Ok(location)
            }
            None => {
                debug!("Unrecognized debugger output:\n{output}");
                Err(TriageError::SymbolNotFound {
                    function: function.to_string(),
                    binary: binary.to_path_buf(),
                })
            }
        }
    }
}

/// Poll the child until it exits or `limit` elapses. Returns whether it exited.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> std::io::Result<bool> {
    let deadline = Instant::now() + limit;
    loop {
        if child.try_wait()?.is_some() {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
