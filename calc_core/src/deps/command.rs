//! Subprocess-backed [`Environment`].

use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::Environment;
use crate::config::DependencySettings;

/// Placeholder replaced by the probe module name in probe commands
pub const MODULE_PLACEHOLDER: &str = "{module}";

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long output readers may lag behind the exit (or kill) of the child.
const PIPE_GRACE: Duration = Duration::from_millis(500);
const STDERR_TAIL_LINES: usize = 20;

/// Probes and installs through configured commands.
///
/// - probe: `probe` with `{module}` substituted (appended when absent);
///   exit status 0 means present. Without a probe command the module is
///   looked up as an executable on `PATH`.
/// - install: `installer` followed by every missing requirement, run once,
///   killed when it exceeds the timeout.
#[derive(Debug, Clone)]
pub struct CommandEnvironment {
    probe: Vec<String>,
    installer: Vec<String>,
    timeout: Duration,
}

impl CommandEnvironment {
    pub fn new(probe: Vec<String>, installer: Vec<String>, timeout: Duration) -> Self {
        CommandEnvironment {
            probe,
            installer,
            timeout,
        }
    }

    pub fn from_settings(settings: &DependencySettings) -> Self {
        CommandEnvironment::new(
            settings.probe.clone(),
            settings.installer.clone(),
            settings.install_timeout(),
        )
    }

    fn probe_args(&self, module: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .probe
            .iter()
            .map(|arg| arg.replace(MODULE_PLACEHOLDER, module))
            .collect();
        if !self.probe.iter().any(|arg| arg.contains(MODULE_PLACEHOLDER)) {
            args.push(module.to_string());
        }
        args
    }
}

impl Environment for CommandEnvironment {
    fn probe(&self, module: &str) -> Result<bool, String> {
        if self.probe.is_empty() {
            return Ok(find_on_path(module).is_some());
        }
        let output = run_with_timeout(&self.probe_args(module), PROBE_TIMEOUT.min(self.timeout))?;
        Ok(output.status.success())
    }

    fn install(&self, requirements: &[String]) -> Result<(), String> {
        if self.installer.is_empty() {
            return Err(
                "no package installer configured (set `installer` under [dependencies])".to_string(),
            );
        }

        let mut args = self.installer.clone();
        args.extend(requirements.iter().cloned());

        let started = Instant::now();
        let output = run_with_timeout(&args, self.timeout)?;
        tracing::info!(
            command = %args.join(" "),
            status = %output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "installer finished"
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "Command '{}' returned non-zero {}\n{}",
                args.join(" "),
                output.status,
                output.diagnostics()
            ))
        }
    }
}

struct CommandOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn diagnostics(&self) -> String {
        diagnostics(&self.stdout, &self.stderr)
    }
}

/// Tail of stderr, or of stdout when stderr is empty.
fn diagnostics(stdout: &str, stderr: &str) -> String {
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    tail(text, STDERR_TAIL_LINES)
}

/// Run a command to completion, killing it once `timeout` elapses.
///
/// Output is collected by reader threads. Once the child has exited they get
/// at most [`PIPE_GRACE`] to reach end of file; a grandchild that inherited the
/// pipes can keep them open indefinitely, so whatever has been read by then is
/// returned and the readers are left behind.
fn run_with_timeout(args: &[String], timeout: Duration) -> Result<CommandOutput, String> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| "empty command".to_string())?;

    let mut child = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to start '{}': {}", program, e))?;

    // Drain both pipes so a chatty installer cannot block on a full buffer.
    let stdout = Capture::spawn(child.stdout.take());
    let stderr = Capture::spawn(child.stderr.take());

    let status = wait_until(&mut child, timeout).map_err(|e| format!("'{}': {}", program, e))?;
    let grace = Instant::now() + PIPE_GRACE;
    let stdout = stdout.finish(grace);
    let stderr = stderr.finish(grace);

    match status {
        Some(status) => Ok(CommandOutput { status, stdout, stderr }),
        None => Err(format!(
            "Command '{}' timed out after {}s\n{}",
            args.join(" "),
            timeout.as_secs_f32(),
            diagnostics(&stdout, &stderr)
        )),
    }
}

/// A pipe being read on its own thread into a shared buffer.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: thread::JoinHandle<()>,
}

impl Capture {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let reader = thread::spawn(move || {
            let Some(mut pipe) = pipe else { return };
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk) {
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                }
            }
        });
        Capture { buf, reader }
    }

    /// Wait for end of file until `deadline`, then return what was read.
    /// A reader still blocked at the deadline is detached.
    fn finish(self, deadline: Instant) -> String {
        while !self.reader.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        let bytes = self.buf.lock();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// `Ok(None)` when the child was killed at the deadline.
fn wait_until(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Locate an executable named `name` on `PATH`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", name));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_path_probe() {
        let env = CommandEnvironment::new(Vec::new(), Vec::new(), Duration::from_secs(5));
        assert!(env.probe("sh").unwrap());
        assert!(!env.probe("definitely_not_a_real_tool_42").unwrap());
    }

    #[test]
    fn test_command_probe_substitutes_module() {
        let env = CommandEnvironment::new(
            strings(&["sh", "-c", "test {module} = foo"]),
            Vec::new(),
            Duration::from_secs(5),
        );
        assert!(env.probe("foo").unwrap());
        assert!(!env.probe("bar").unwrap());
    }

    #[test]
    fn test_probe_appends_module_without_placeholder() {
        let env = CommandEnvironment::new(strings(&["true"]), Vec::new(), Duration::from_secs(5));
        assert_eq!(env.probe_args("foo"), strings(&["true", "foo"]));
    }

    #[test]
    fn test_missing_installer() {
        let env = CommandEnvironment::new(Vec::new(), Vec::new(), Duration::from_secs(5));
        let detail = env.install(&strings(&["foo"])).unwrap_err();
        assert!(detail.contains("no package installer configured"));
    }

    #[test]
    fn test_installer_success_and_failure() {
        let ok = CommandEnvironment::new(Vec::new(), strings(&["true"]), Duration::from_secs(5));
        ok.install(&strings(&["foo", "bar>=1.0"])).unwrap();

        let failing = CommandEnvironment::new(
            Vec::new(),
            strings(&["sh", "-c", "echo \"no matching distribution for $1\" >&2; exit 3", "installer"]),
            Duration::from_secs(5),
        );
        let detail = failing.install(&strings(&["bar>=1.0"])).unwrap_err();
        assert!(detail.contains("non-zero"));
        assert!(detail.contains("3"));
        assert!(detail.contains("no matching distribution for bar>=1.0"));
    }

    #[test]
    fn test_failure_falls_back_to_stdout() {
        let env = CommandEnvironment::new(
            Vec::new(),
            strings(&["sh", "-c", "echo resolver conflict; exit 1", "installer"]),
            Duration::from_secs(5),
        );
        let detail = env.install(&strings(&["foo"])).unwrap_err();
        assert!(detail.contains("resolver conflict"));
    }

    #[test]
    fn test_installer_timeout() {
        let env = CommandEnvironment::new(
            Vec::new(),
            strings(&["sleep"]),
            Duration::from_millis(200),
        );
        let started = Instant::now();
        let detail = env.install(&strings(&["5"])).unwrap_err();
        assert!(detail.contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_with_lingering_grandchild() {
        // The backgrounded sleep outlives the killed shell and keeps both pipes open.
        let env = CommandEnvironment::new(
            Vec::new(),
            strings(&["sh", "-c", "echo partial progress >&2; sleep 6 & wait", "installer"]),
            Duration::from_millis(500),
        );
        let started = Instant::now();
        let detail = env.install(&strings(&["foo"])).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
        assert!(detail.contains("timed out"));
        assert!(detail.contains("partial progress"));
    }

    #[test]
    fn test_exit_with_lingering_grandchild() {
        let env = CommandEnvironment::new(
            Vec::new(),
            strings(&["sh", "-c", "echo resolver conflict; (sleep 6 &); exit 1", "installer"]),
            Duration::from_secs(5),
        );
        let started = Instant::now();
        let detail = env.install(&strings(&["foo"])).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
        assert!(detail.contains("non-zero"));
        assert!(detail.contains("resolver conflict"));
    }

    #[test]
    fn test_unknown_program() {
        let env = CommandEnvironment::new(
            Vec::new(),
            strings(&["definitely_not_a_real_installer_42"]),
            Duration::from_secs(5),
        );
        let detail = env.install(&strings(&["foo"])).unwrap_err();
        assert!(detail.contains("failed to start"));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
        assert_eq!(tail("", 5), "");
    }
}
