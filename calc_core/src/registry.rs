//! # Calculator Registry
//!
//! Maps calculator names to factories and owns the two-phase load:
//!
//! 1. read the documentation block through the [`Namespace`]
//! 2. parse `[dependencies]` and hand them to the [`DependencyResolver`]
//! 3. instantiate the calculator and cache the instance
//!
//! Documentation lookups ([`Registry::available`], [`Registry::get_spec`],
//! [`Registry::fields`]) never instantiate anything, so listing works even
//! when a calculator's requirements are missing.
//!
//! ## Usage
//!
//! ```rust
//! use calc_core::config::Settings;
//! use calc_core::registry::Registry;
//! use serde_json::json;
//!
//! let registry = Registry::builtin(&Settings::default());
//! assert!(registry.available().contains_key("bmi"));
//!
//! let resp = registry
//!     .calculate("bmi", &json!({ "weight": 70, "height": 1.75, "unit_system": "metric" }))
//!     .unwrap();
//! assert_eq!(resp.interpretation.as_deref(), Some("Normal"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::calculators::{self, Calculator, CalculatorFactory};
use crate::config::Settings;
use crate::deps::{CommandEnvironment, DependencyResolver};
use crate::errors::{CalcError, CalcResult};
use crate::namespace::Namespace;
use crate::response::{self, CalculationResponse};
use crate::spec::{parse_dependencies, title, CalculatorSpec, InputField};

/// Registered calculators plus everything needed to load them.
pub struct Registry {
    namespace: Namespace,
    resolver: Arc<DependencyResolver>,
    factories: BTreeMap<String, CalculatorFactory>,
    loaded: RwLock<HashMap<String, Arc<dyn Calculator>>>,
}

impl Registry {
    /// Empty registry.
    pub fn new(namespace: Namespace, resolver: Arc<DependencyResolver>) -> Self {
        Registry {
            namespace,
            resolver,
            factories: BTreeMap::new(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Registry holding every calculator compiled into this crate, wired
    /// to the configured documentation directory and installer.
    ///
    /// Also fixes the version stamped into response metadata.
    pub fn builtin(settings: &Settings) -> Self {
        // First registry in the process wins.
        if !response::set_version(settings.version.clone()) {
            tracing::debug!(version = response::version(), "response version already set");
        }

        let environment = CommandEnvironment::from_settings(&settings.dependencies);
        let resolver = Arc::new(DependencyResolver::new(Arc::new(environment)));
        let mut registry = Registry::new(Namespace::from_settings(settings), resolver);
        for (name, factory) in calculators::builtin() {
            registry.register(name, factory);
        }
        registry
    }

    /// Add (or replace) a calculator. Returns `false` for names that are
    /// not plain identifiers.
    pub fn register(&mut self, name: impl Into<String>, factory: CalculatorFactory) -> bool {
        let name = name.into();
        if !crate::namespace::is_valid_name(&name) {
            tracing::warn!(calculator = %name, "rejected calculator name");
            return false;
        }
        self.loaded.write().remove(&name);
        self.factories.insert(name, factory);
        true
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// Name to title for every registered calculator.
    ///
    /// Calculators without documentation are listed under their bare name.
    pub fn available(&self) -> BTreeMap<String, String> {
        self.names()
            .map(|name| {
                let doc_config = self.namespace.read_doc_config(name);
                if doc_config.is_empty() {
                    tracing::debug!(calculator = name, "no documentation block, listing by name");
                }
                (name.to_string(), title(name, &doc_config))
            })
            .collect()
    }

    /// Documentation files that no registered factory claims. These are
    /// not calculators; callers report them so a misnamed file is noticed.
    pub fn unregistered_docs(&self) -> Vec<String> {
        self.namespace
            .documented()
            .into_iter()
            .filter(|name| !self.contains(name))
            .collect()
    }

    /// Documentation for a registered calculator, without loading it.
    pub fn get_spec(&self, name: &str) -> Option<CalculatorSpec> {
        if !self.contains(name) {
            return None;
        }
        Some(CalculatorSpec::new(name, self.namespace.read_doc_config(name)))
    }

    /// Declared input fields.
    pub fn fields(&self, name: &str) -> CalcResult<Vec<InputField>> {
        self.get_spec(name)
            .map(|spec| spec.inputs())
            .ok_or_else(|| CalcError::not_found(name))
    }

    /// Load a calculator, installing its requirements first.
    ///
    /// # Errors
    ///
    /// - `CalcError::NotFound` if `name` is not registered
    /// - `CalcError::Dependency` if a requirement could not be installed
    pub fn load(&self, name: &str) -> CalcResult<Arc<dyn Calculator>> {
        if let Some(calculator) = self.loaded.read().get(name) {
            return Ok(Arc::clone(calculator));
        }
        let factory = *self
            .factories
            .get(name)
            .ok_or_else(|| CalcError::not_found(name))?;

        self.ensure_dependencies(name)?;

        let calculator: Arc<dyn Calculator> = Arc::from(factory());
        tracing::info!(calculator = name, "calculator loaded");

        let mut loaded = self.loaded.write();
        Ok(Arc::clone(loaded.entry(name.to_string()).or_insert(calculator)))
    }

    /// Load `name` and run it on `inputs`.
    pub fn calculate(&self, name: &str, inputs: &Value) -> CalcResult<CalculationResponse> {
        self.load(name)?.calculate(inputs)
    }

    /// Resolve the requirements of every registered calculator, returning
    /// the ones that failed.
    pub fn resolve_all(&self) -> Vec<(String, CalcError)> {
        self.names()
            .filter_map(|name| {
                self.ensure_dependencies(name)
                    .err()
                    .map(|e| (name.to_string(), e))
            })
            .collect()
    }

    fn ensure_dependencies(&self, name: &str) -> CalcResult<()> {
        let requirements = parse_dependencies(&self.namespace.read_doc_config(name));
        if requirements.is_empty() {
            return Ok(());
        }
        tracing::debug!(calculator = name, requirements = ?requirements, "resolving dependencies");
        self.resolver.ensure_installed(&requirements, Some(name))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", &self.namespace)
            .field("calculators", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::Environment;
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Nothing is present and every install fails.
    struct BareEnvironment {
        installs: AtomicUsize,
    }

    impl Environment for BareEnvironment {
        fn probe(&self, _module: &str) -> Result<bool, String> {
            Ok(false)
        }

        fn install(&self, _requirements: &[String]) -> Result<(), String> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            Err("Command 'installer foo' returned non-zero exit status: 1".into())
        }
    }

    struct Echo;

    impl Calculator for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn calculate(&self, inputs: &Value) -> CalcResult<CalculationResponse> {
            Ok(CalculationResponse::new(inputs.clone()).stamped("echo"))
        }
    }

    fn echo_factory() -> Box<dyn Calculator> {
        Box::new(Echo)
    }

    fn bare_registry(dir: &std::path::Path) -> (Registry, Arc<BareEnvironment>) {
        let env = Arc::new(BareEnvironment { installs: AtomicUsize::new(0) });
        let resolver = Arc::new(DependencyResolver::new(env.clone()));
        (Registry::new(Namespace::dir_only(dir), resolver), env)
    }

    #[test]
    fn test_builtin_listing() {
        let registry = Registry::builtin(&Settings::default());
        let available = registry.available();

        assert_eq!(available.len(), 2);
        assert_eq!(available["bmi"], "# BMI Calculator");
        assert_eq!(available["dcct_ifcc"], "# DCCT/IFCC Converter");
        assert!(available.values().all(|t| !t.is_empty()));
    }

    #[test]
    fn test_spec_title_is_first_line() {
        let registry = Registry::builtin(&Settings::default());
        for name in ["bmi", "dcct_ifcc"] {
            let spec = registry.get_spec(name).unwrap();
            assert_eq!(spec.doc_config.lines().next().unwrap(), spec.title());
            assert_eq!(registry.available()[name], spec.title());
        }
    }

    #[test]
    fn test_fields_from_docs() {
        let registry = Registry::builtin(&Settings::default());
        let names: Vec<_> = registry
            .fields("bmi")
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["weight", "height", "unit_system"]);
        assert_eq!(
            registry.fields("nope").unwrap_err(),
            CalcError::not_found("nope")
        );
    }

    #[test]
    fn test_unknown_calculator() {
        let registry = Registry::builtin(&Settings::default());
        assert!(registry.get_spec("nonexistent_calc").is_none());
        assert!(matches!(
            registry.load("nonexistent_calc"),
            Err(CalcError::NotFound { ref name }) if name == "nonexistent_calc"
        ));
    }

    #[test]
    fn test_calculate_dispatch() {
        let registry = Registry::builtin(&Settings::default());
        let resp = registry
            .calculate("dcct_ifcc", &json!({ "value": 7.0, "input_unit": "dcct" }))
            .unwrap();
        assert!((resp.result_f64().unwrap() - 53.0).abs() < 0.5);

        let err = registry
            .calculate("bmi", &json!({ "weight": -1, "height": 1.75, "unit_system": "metric" }))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_load_is_cached() {
        let registry = Registry::builtin(&Settings::default());
        let first = registry.load("bmi").unwrap();
        let second = registry.load("bmi").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_undocumented_calculator_listed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let (mut registry, _env) = bare_registry(dir.path());
        registry.register("echo", echo_factory);

        assert_eq!(registry.available()["echo"], "echo");
        let spec = registry.get_spec("echo").unwrap();
        assert_eq!(spec.doc_config, "");
        assert!(registry.fields("echo").unwrap().is_empty());

        let resp = registry.calculate("echo", &json!({ "x": 1 })).unwrap();
        assert_eq!(resp.result, json!({ "x": 1 }));
    }

    #[test]
    fn test_failed_install_reports_requirement() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("echo.md"),
            "+++\n# Echo\n\n[dependencies]\n- foo\n+++\n",
        )
        .unwrap();
        let (mut registry, env) = bare_registry(dir.path());
        registry.register("echo", echo_factory);

        // Documentation still works without the requirement.
        assert_eq!(registry.available()["echo"], "# Echo");
        assert_eq!(registry.get_spec("echo").unwrap().dependencies(), vec!["foo"]);

        match registry.load("echo") {
            Err(CalcError::Dependency { missing, calculator, detail }) => {
                assert_eq!(missing, vec!["foo".to_string()]);
                assert_eq!(calculator.as_deref(), Some("echo"));
                assert!(detail.unwrap().contains("non-zero"));
            }
            other => panic!("expected dependency error, got {:?}", other.map(|c| c.name())),
        }
        assert_eq!(env.installs.load(Ordering::SeqCst), 1);

        let failures = registry.resolve_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "echo");
        assert!(failures[0].1.is_recoverable());
    }

    #[test]
    fn test_resolve_all_builtin_clean() {
        let registry = Registry::builtin(&Settings::default());
        assert!(registry.resolve_all().is_empty());
    }

    #[test]
    fn test_unregistered_docs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("echo.md"), "+++\n# Echo\n+++\n").unwrap();
        fs::write(dir.path().join("ecoh.md"), "+++\n# Typo\n+++\n").unwrap();
        let (mut registry, _env) = bare_registry(dir.path());
        registry.register("echo", echo_factory);

        assert_eq!(registry.unregistered_docs(), vec!["ecoh".to_string()]);
        assert!(!registry.available().contains_key("ecoh"));
        assert!(Registry::builtin(&Settings::default()).unregistered_docs().is_empty());
    }

    #[test]
    fn test_register_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let (mut registry, _env) = bare_registry(dir.path());
        assert!(!registry.register("../echo", echo_factory));
        assert!(registry.register("echo", echo_factory));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["echo"]);
    }
}
