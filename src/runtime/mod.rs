use std::collections::HashMap;
use std::env;

/// Name of the variable consulted when resolving executables.
pub const PATH_VARIABLE: &str = "PATH";

/// Shell variable store.
///
/// Variables live for the whole interpreter process and are only ever
/// touched between lines, never while a pipeline is running. Lookup is by
/// name; no entry has a privileged position, `PATH` included.
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    variables: HashMap<String, String>,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Store seeded with the `PATH` of the process environment, if any.
    ///
    /// Used when no init file is available to define `PATH`.
    pub fn from_process_path() -> Self {
        let mut runtime = Self::new();
        if let Ok(path) = env::var(PATH_VARIABLE) {
            runtime.set_variable(PATH_VARIABLE, path);
        }
        runtime
    }

    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Insert or overwrite a variable.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Returns true if the variable existed
    pub fn remove_variable(&mut self, name: &str) -> bool {
        self.variables.remove(name).is_some()
    }

    pub fn path(&self) -> Option<&str> {
        self.get_variable(PATH_VARIABLE)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// All variables, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
}
