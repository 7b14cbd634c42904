use std::collections::HashMap;

use log::warn;

/// Immutable translation from true export names to their obfuscated counterparts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMapping {
    prefix: String,
    entries: HashMap<String, String>,
}

impl NameMapping {
    /// A mapping that passes every name through.
    pub fn empty(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), entries: HashMap::new() }
    }

    /// Pair `true_names[i]` with `obfuscated[i]` for every index both lists have.
    ///
    /// A length mismatch is logged and the extra entries of the longer list are dropped. A true
    /// name listed twice keeps its later pairing.
    pub fn build(prefix: impl Into<String>, true_names: &[String], obfuscated: &[String]) -> Self {
        if true_names.len() != obfuscated.len() {
            warn!(
                "Name list lengths differ: {} true names, {} obfuscated names; pairing the first {}",
                true_names.len(),
                obfuscated.len(),
                true_names.len().min(obfuscated.len())
            );
        }

        let mut entries = HashMap::with_capacity(true_names.len().min(obfuscated.len()));
        for (true_name, alias) in true_names.iter().zip(obfuscated) {
            if let Some(previous) = entries.insert(true_name.clone(), alias.clone()) {
                warn!("Duplicate true name {true_name}: {previous} replaced by {alias}");
            }
        }
        Self { prefix: prefix.into(), entries }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` belongs to the target library's naming convention.
    pub fn has_prefix(&self, name: &str) -> bool {
        name.as_bytes().starts_with(self.prefix.as_bytes())
    }

    pub fn get(&self, true_name: &str) -> Option<&str> {
        self.entries.get(true_name).map(String::as_str)
    }

    /// Translate `name`. Names without the prefix, and prefixed names with no entry, come back
    /// unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        if !self.has_prefix(name) {
            return name;
        }
        self.get(name).unwrap_or(name)
    }

    /// Entries sorted by true name.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> =
            self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        pairs.sort();
        pairs
    }
}
