//! # Dependency Resolution
//!
//! Calculators may declare third-party requirements in their
//! `[dependencies]` section. Before a calculator is instantiated the
//! [`DependencyResolver`] makes sure every requirement is present:
//!
//! 1. requirements already in the installed cache are skipped
//! 2. each remaining requirement is probed by its module name
//! 3. everything still missing is installed with one installer run
//! 4. success caches the requirements; failure is a [`CalcError::Dependency`]
//!
//! The probe and the installer belong to the host environment and are
//! reached through the [`Environment`] trait; [`CommandEnvironment`] runs
//! configured commands.
//!
//! ## Concurrency
//!
//! Steps 1 to 4 run under one mutex. A second caller waiting on the same
//! requirements re-checks the cache once it gets the lock, so concurrent
//! first requests never start duplicate installer processes. The installer
//! is a blocking call; async callers must run it on a blocking thread.

mod command;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::errors::{CalcError, CalcResult};

pub use command::CommandEnvironment;

/// Host capability used to probe for and install requirements.
pub trait Environment: Send + Sync {
    /// Whether a module with this name is present. `Err` means the probe
    /// itself failed.
    fn probe(&self, module: &str) -> Result<bool, String>;

    /// Install all requirements in one invocation. `Err` carries the
    /// diagnostic detail (exit status, stderr tail, timeout).
    fn install(&self, requirements: &[String]) -> Result<(), String>;
}

/// Module name probed for a requirement string.
///
/// Everything before the first `<`, `>`, `!`, `=`, `[` or space, trimmed,
/// with `-` replaced by `_`.
///
/// ```rust
/// use calc_core::deps::probe_module_name;
///
/// assert_eq!(probe_module_name("pydantic>=1.10,<2"), "pydantic");
/// assert_eq!(probe_module_name("scikit-learn[all]"), "scikit_learn");
/// ```
pub fn probe_module_name(requirement: &str) -> String {
    let end = requirement
        .find(|c| matches!(c, '<' | '>' | '!' | '=' | '[' | ' '))
        .unwrap_or(requirement.len());
    requirement[..end].trim().replace('-', "_")
}

/// Ensures declared requirements are installed, memoizing successes.
pub struct DependencyResolver {
    environment: Arc<dyn Environment>,
    installed: RwLock<HashSet<String>>,
    install_lock: Mutex<()>,
}

impl DependencyResolver {
    pub fn new(environment: Arc<dyn Environment>) -> Self {
        DependencyResolver {
            environment,
            installed: RwLock::new(HashSet::new()),
            install_lock: Mutex::new(()),
        }
    }

    /// Make sure every requirement is present, installing missing ones.
    ///
    /// # Errors
    ///
    /// `CalcError::Dependency` listing every requirement that was missing
    /// when the installer failed.
    pub fn ensure_installed(&self, requirements: &[String], calculator: Option<&str>) -> CalcResult<()> {
        if self.pending(requirements).is_empty() {
            return Ok(());
        }

        let _guard = self.install_lock.lock();
        let pending = self.pending(requirements);
        if pending.is_empty() {
            return Ok(());
        }

        let mut missing = Vec::new();
        for requirement in pending {
            let module = probe_module_name(requirement);
            match self.environment.probe(&module) {
                Ok(true) => {
                    tracing::debug!(requirement = %requirement, module = %module, "dependency present");
                    self.installed.write().insert(requirement.clone());
                }
                Ok(false) => missing.push(requirement.clone()),
                Err(e) => {
                    tracing::warn!(requirement = %requirement, module = %module, error = %e, "dependency probe failed");
                    missing.push(requirement.clone());
                }
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        tracing::info!(calculator = calculator.unwrap_or("-"), missing = ?missing, "installing dependencies");
        match self.environment.install(&missing) {
            Ok(()) => {
                self.installed.write().extend(missing);
                Ok(())
            }
            Err(detail) => {
                tracing::error!(calculator = calculator.unwrap_or("-"), missing = ?missing, "dependency installation failed");
                Err(CalcError::dependency(missing, calculator, Some(detail)))
            }
        }
    }

    /// Whether a requirement string is in the installed cache
    pub fn is_cached(&self, requirement: &str) -> bool {
        self.installed.read().contains(requirement)
    }

    fn pending<'a>(&self, requirements: &'a [String]) -> Vec<&'a String> {
        let installed = self.installed.read();
        let mut pending: Vec<&'a String> = Vec::new();
        for requirement in requirements {
            if !installed.contains(requirement) && !pending.contains(&requirement) {
                pending.push(requirement);
            }
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Environment where a fixed set of modules exists and installs either
    /// always succeed or always fail.
    struct FakeEnvironment {
        present: Mutex<HashSet<String>>,
        install_ok: bool,
        installs: AtomicUsize,
        probes: AtomicUsize,
        last_install: Mutex<Vec<String>>,
    }

    impl FakeEnvironment {
        fn new(present: &[&str], install_ok: bool) -> Arc<Self> {
            Arc::new(FakeEnvironment {
                present: Mutex::new(present.iter().map(|s| s.to_string()).collect()),
                install_ok,
                installs: AtomicUsize::new(0),
                probes: AtomicUsize::new(0),
                last_install: Mutex::new(Vec::new()),
            })
        }
    }

    impl Environment for FakeEnvironment {
        fn probe(&self, module: &str) -> Result<bool, String> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if module == "broken" {
                return Err("probe crashed".into());
            }
            Ok(self.present.lock().contains(module))
        }

        fn install(&self, requirements: &[String]) -> Result<(), String> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            *self.last_install.lock() = requirements.to_vec();
            if self.install_ok {
                Ok(())
            } else {
                Err("installer exited with exit status: 1".into())
            }
        }
    }

    fn reqs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_probe_module_name() {
        assert_eq!(probe_module_name("numpy"), "numpy");
        assert_eq!(probe_module_name("bar>=1.0"), "bar");
        assert_eq!(probe_module_name("typing-extensions!=4.0"), "typing_extensions");
        assert_eq!(probe_module_name("uvicorn[standard]"), "uvicorn");
        assert_eq!(probe_module_name("foo ; python_version"), "foo");
        assert_eq!(probe_module_name("pkg==2"), "pkg");
    }

    #[test]
    fn test_all_present_is_noop() {
        let env = FakeEnvironment::new(&["foo", "bar"], false);
        let resolver = DependencyResolver::new(env.clone());

        resolver.ensure_installed(&reqs(&["foo", "bar>=1.0"]), Some("demo")).unwrap();

        assert_eq!(env.installs.load(Ordering::SeqCst), 0);
        assert!(resolver.is_cached("bar>=1.0"));
        assert!(!resolver.is_cached("bar"));
    }

    #[test]
    fn test_empty_requirements() {
        let env = FakeEnvironment::new(&[], false);
        let resolver = DependencyResolver::new(env.clone());
        resolver.ensure_installed(&[], None).unwrap();
        assert_eq!(env.probes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_installed_in_one_batch() {
        let env = FakeEnvironment::new(&["foo"], true);
        let resolver = DependencyResolver::new(env.clone());

        resolver
            .ensure_installed(&reqs(&["foo", "bar>=1.0", "baz-qux"]), None)
            .unwrap();

        assert_eq!(env.installs.load(Ordering::SeqCst), 1);
        assert_eq!(*env.last_install.lock(), reqs(&["bar>=1.0", "baz-qux"]));
        assert!(resolver.is_cached("baz-qux"));
    }

    #[test]
    fn test_second_call_is_memoized() {
        let env = FakeEnvironment::new(&[], true);
        let resolver = DependencyResolver::new(env.clone());
        let list = reqs(&["foo", "bar"]);

        resolver.ensure_installed(&list, None).unwrap();
        let probes_after_first = env.probes.load(Ordering::SeqCst);
        resolver.ensure_installed(&list, None).unwrap();

        assert_eq!(env.installs.load(Ordering::SeqCst), 1);
        assert_eq!(env.probes.load(Ordering::SeqCst), probes_after_first);
    }

    #[test]
    fn test_install_failure_reports_missing() {
        let env = FakeEnvironment::new(&["foo"], false);
        let resolver = DependencyResolver::new(env.clone());

        let err = resolver
            .ensure_installed(&reqs(&["foo", "bar>=1.0"]), Some("demo"))
            .unwrap_err();

        match err {
            CalcError::Dependency { missing, calculator, detail } => {
                assert_eq!(missing, reqs(&["bar>=1.0"]));
                assert_eq!(calculator.as_deref(), Some("demo"));
                assert!(detail.unwrap().contains("exit status: 1"));
            }
            other => panic!("expected dependency error, got {:?}", other),
        }
        assert!(resolver.is_cached("foo"));
        assert!(!resolver.is_cached("bar>=1.0"));
    }

    #[test]
    fn test_probe_error_counts_as_missing() {
        let env = FakeEnvironment::new(&[], false);
        let resolver = DependencyResolver::new(env.clone());

        let err = resolver.ensure_installed(&reqs(&["broken"]), None).unwrap_err();
        assert!(matches!(err, CalcError::Dependency { ref missing, .. } if missing == &reqs(&["broken"])));
    }

    #[test]
    fn test_duplicates_probed_once() {
        let env = FakeEnvironment::new(&[], true);
        let resolver = DependencyResolver::new(env.clone());

        resolver.ensure_installed(&reqs(&["foo", "foo"]), None).unwrap();
        assert_eq!(env.probes.load(Ordering::SeqCst), 1);
        assert_eq!(*env.last_install.lock(), reqs(&["foo"]));
    }

    #[test]
    fn test_concurrent_callers_install_once() {
        let env = FakeEnvironment::new(&[], true);
        let resolver = Arc::new(DependencyResolver::new(env.clone()));
        let list = reqs(&["foo", "bar"]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                let list = list.clone();
                std::thread::spawn(move || resolver.ensure_installed(&list, None))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(env.installs.load(Ordering::SeqCst), 1);
    }
}
