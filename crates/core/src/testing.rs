//! In-memory collaborators and scripted wizards for tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use core_upgrader_store::{SqliteStore, Store, schema};
use toml::{Table, Value};

use crate::context::{ExtensionManager, ExtensionModel, UpgradeContext};
use crate::error::WizardError;
use crate::local_config::{self, LocalConfiguration};
use crate::prerequisite::Prerequisite;
use crate::wizard::{Confirmation, UpgradeWizard};

/// Local configuration held in memory.
#[derive(Debug, Default)]
pub struct MemoryLocalConfiguration {
    table: Mutex<Table>,
}

impl MemoryLocalConfiguration {
    pub fn from_toml(source: &str) -> Self {
        Self {
            table: Mutex::new(toml::from_str(source).expect("valid test toml")),
        }
    }

    pub fn snapshot(&self) -> Table {
        self.table.lock().expect("config mutex poisoned").clone()
    }
}

impl LocalConfiguration for MemoryLocalConfiguration {
    fn get(&self, path: &str) -> Option<Value> {
        let table = self.table.lock().expect("config mutex poisoned");
        local_config::lookup(&table, path).cloned()
    }

    fn set(&self, path: &str, value: Value) -> Result<(), WizardError> {
        let mut table = self.table.lock().expect("config mutex poisoned");
        local_config::insert(&mut table, path, value)
    }

    fn remove(&self, paths: &[&str]) -> Result<(), WizardError> {
        let mut table = self.table.lock().expect("config mutex poisoned");
        for path in paths {
            local_config::remove(&mut table, path);
        }
        Ok(())
    }
}

/// Extension registry with a fixed loaded set; `install` just marks loaded.
#[derive(Debug, Default)]
pub struct StaticExtensions {
    loaded: Mutex<HashSet<String>>,
    installed: Mutex<Vec<String>>,
    fail_install: bool,
}

impl StaticExtensions {
    pub fn new(loaded: &[&str]) -> Self {
        Self {
            loaded: Mutex::new(loaded.iter().map(|key| key.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    /// Composer packages passed to `install`, in order.
    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().expect("extensions mutex poisoned").clone()
    }
}

impl ExtensionManager for StaticExtensions {
    fn is_loaded(&self, key: &str) -> bool {
        self.loaded.lock().expect("extensions mutex poisoned").contains(key)
    }

    fn install(&self, extension: &ExtensionModel) -> Result<(), WizardError> {
        if self.fail_install {
            return Err(WizardError::Provisioning(format!(
                "cannot install {}",
                extension.composer_package
            )));
        }
        self.installed
            .lock()
            .expect("extensions mutex poisoned")
            .push(extension.composer_package.to_string());
        self.loaded
            .lock()
            .expect("extensions mutex poisoned")
            .insert(extension.key.to_string());
        Ok(())
    }
}

/// In-memory store plus collaborators, borrowed by [`TestHarness::context`].
pub struct TestHarness {
    pub store: SqliteStore,
    pub extensions: StaticExtensions,
    pub local_configuration: MemoryLocalConfiguration,
}

impl TestHarness {
    pub fn empty() -> Self {
        Self {
            store: SqliteStore::open_in_memory().expect("in-memory store"),
            extensions: StaticExtensions::default(),
            local_configuration: MemoryLocalConfiguration::default(),
        }
    }

    /// Store with every expected table already created.
    pub fn with_schema() -> Self {
        let harness = Self::empty();
        harness.execute(&schema::create_all_sql());
        harness
    }

    pub fn with_extensions(mut self, loaded: &[&str]) -> Self {
        self.extensions = StaticExtensions::new(loaded);
        self
    }

    pub fn with_local_configuration(mut self, source: &str) -> Self {
        self.local_configuration = MemoryLocalConfiguration::from_toml(source);
        self
    }

    pub fn context(&self) -> UpgradeContext<'_> {
        UpgradeContext::new(&self.store, &self.extensions, &self.local_configuration)
    }

    pub fn execute(&self, sql: &str) {
        self.store.execute_batch(sql).expect("test sql");
    }
}

/// Call counters shared between a [`ScriptedWizard`] and the test.
#[derive(Debug, Default)]
pub struct WizardCalls {
    pub update_necessary: AtomicUsize,
    pub execute_update: AtomicUsize,
}

impl WizardCalls {
    pub fn checks(&self) -> usize {
        self.update_necessary.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.execute_update.load(Ordering::SeqCst)
    }
}

/// Wizard whose behaviour is set up by the test. It stays necessary until it
/// executes successfully once.
pub struct ScriptedWizard {
    identifier: &'static str,
    prerequisites: Vec<&'static str>,
    run_after: Vec<&'static str>,
    confirmation: Option<Confirmation>,
    necessary: AtomicBool,
    check_error: Option<String>,
    execute_error: Option<String>,
    sql: Option<String>,
    calls: Arc<WizardCalls>,
}

impl ScriptedWizard {
    pub fn new(identifier: &'static str) -> Self {
        Self {
            identifier,
            prerequisites: Vec::new(),
            run_after: Vec::new(),
            confirmation: None,
            necessary: AtomicBool::new(true),
            check_error: None,
            execute_error: None,
            sql: None,
            calls: Arc::default(),
        }
    }

    pub fn after(mut self, identifiers: &[&'static str]) -> Self {
        self.run_after = identifiers.to_vec();
        self
    }

    pub fn requires(mut self, identifiers: &[&'static str]) -> Self {
        self.prerequisites = identifiers.to_vec();
        self
    }

    pub fn confirm_with(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    pub fn not_necessary(self) -> Self {
        self.necessary.store(false, Ordering::SeqCst);
        self
    }

    pub fn failing_check(mut self, message: &str) -> Self {
        self.check_error = Some(message.to_string());
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.execute_error = Some(message.to_string());
        self
    }

    /// SQL batch issued through the store on execution.
    pub fn executing(mut self, sql: &str) -> Self {
        self.sql = Some(sql.to_string());
        self
    }

    pub fn calls(&self) -> Arc<WizardCalls> {
        Arc::clone(&self.calls)
    }
}

impl UpgradeWizard for ScriptedWizard {
    fn identifier(&self) -> &'static str {
        self.identifier
    }

    fn title(&self) -> String {
        format!("Scripted {}", self.identifier)
    }

    fn description(&self) -> String {
        String::new()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        self.prerequisites.clone()
    }

    fn confirmation(&self) -> Option<Confirmation> {
        self.confirmation.clone()
    }

    fn run_after(&self) -> Vec<&'static str> {
        self.run_after.clone()
    }

    fn update_necessary(&self, _ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        self.calls.update_necessary.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.check_error {
            return Err(WizardError::Configuration(message.clone()));
        }
        Ok(self.necessary.load(Ordering::SeqCst))
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        self.calls.execute_update.fetch_add(1, Ordering::SeqCst);
        if let Some(sql) = &self.sql {
            ctx.store.execute_batch(sql)?;
        }
        if let Some(message) = &self.execute_error {
            return Err(WizardError::Configuration(message.clone()));
        }
        self.necessary.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Prerequisite backed by a flag, counting how often it is resolved.
pub struct ScriptedPrerequisite {
    identifier: &'static str,
    fulfilled: Arc<AtomicBool>,
    checks: Arc<AtomicUsize>,
    ensurable: bool,
}

impl ScriptedPrerequisite {
    pub fn new(identifier: &'static str, fulfilled: bool) -> Self {
        Self {
            identifier,
            fulfilled: Arc::new(AtomicBool::new(fulfilled)),
            checks: Arc::default(),
            ensurable: false,
        }
    }

    pub fn ensurable(mut self) -> Self {
        self.ensurable = true;
        self
    }

    pub fn checks(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.checks)
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fulfilled)
    }
}

impl Prerequisite for ScriptedPrerequisite {
    fn identifier(&self) -> &'static str {
        self.identifier
    }

    fn title(&self) -> String {
        format!("Scripted {}", self.identifier)
    }

    fn is_fulfilled(&self, _ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.fulfilled.load(Ordering::SeqCst))
    }

    fn ensure(&self, _ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        if !self.ensurable {
            return Err(WizardError::Configuration(format!(
                "{} cannot be ensured",
                self.identifier
            )));
        }
        self.fulfilled.store(true, Ordering::SeqCst);
        Ok(())
    }
}
