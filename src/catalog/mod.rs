//! Class catalog: metadata for every node class a patch can construct.
//!
//! A [`ClassDescriptor`] lists a class's sockets and outputs. Each socket or
//! output may be known by several names; the first one is canonical and the
//! rest are aliases that refer to the same connection point. Class names may
//! be aliased too (`Sin` for `Sine`).

pub mod builtin;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// A socket or output with its accepted names. `names[0]` is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameSpec {
    pub names: Vec<String>,
}

impl NameSpec {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn canonical(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Shape of a node class: its sockets, outputs and positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDescriptor {
    pub name: String,
    pub sockets: Vec<NameSpec>,
    pub outputs: Vec<NameSpec>,
    /// Canonical socket names filled by positional arguments, in order.
    pub positional: Vec<String>,
    pub group: Option<String>,
}

impl ClassDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sockets: Vec::new(),
            outputs: Vec::new(),
            positional: Vec::new(),
            group: None,
        }
    }

    pub fn socket(mut self, names: &[&str]) -> Self {
        self.sockets.push(NameSpec::new(names));
        self
    }

    pub fn output(mut self, names: &[&str]) -> Self {
        self.outputs.push(NameSpec::new(names));
        self
    }

    pub fn positional(mut self, sockets: &[&str]) -> Self {
        self.positional = sockets.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Index of the socket known by `name` (canonical or alias).
    pub fn socket_index(&self, name: &str) -> Option<usize> {
        self.sockets.iter().position(|s| s.matches(name))
    }

    /// Index of the output known by `name` (canonical or alias).
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|o| o.matches(name))
    }

    pub fn canonical_socket(&self, name: &str) -> Option<&str> {
        self.socket_index(name).map(|i| self.sockets[i].canonical())
    }

    pub fn canonical_output(&self, name: &str) -> Option<&str> {
        self.output_index(name).map(|i| self.outputs[i].canonical())
    }

    pub fn has_socket(&self, name: &str) -> bool {
        self.socket_index(name).is_some()
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.output_index(name).is_some()
    }

    /// Canonical socket filled by the positional argument at `index`.
    pub fn positional_socket(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    /// Whether a whole object of this class can receive a signal: it has a
    /// mono `input` socket or a stereo `left`/`right` pair.
    pub fn can_be_input(&self) -> bool {
        self.has_socket("input") || (self.has_socket("left") && self.has_socket("right"))
    }

    /// Whether a whole object of this class can be read as a signal.
    pub fn can_be_output(&self) -> bool {
        self.has_output("output") || (self.has_output("left") && self.has_output("right"))
    }
}

/// Every registered class, plus class-name aliases.
#[derive(Debug, Clone, Default)]
pub struct ClassCatalog {
    classes: Vec<ClassDescriptor>,
    by_name: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class. A later registration under the same name replaces the
    /// earlier one.
    pub fn register(&mut self, descriptor: ClassDescriptor) {
        match self.by_name.get(&descriptor.name) {
            Some(&idx) => self.classes[idx] = descriptor,
            None => {
                self.by_name
                    .insert(descriptor.name.clone(), self.classes.len());
                self.classes.push(descriptor);
            }
        }
    }

    pub fn register_alias(&mut self, alias: &str, class_name: &str) {
        self.aliases
            .insert(alias.to_string(), class_name.to_string());
    }

    /// Look up a class by canonical name or alias.
    pub fn resolve(&self, name: &str) -> Option<&ClassDescriptor> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.by_name.get(canonical).map(|&idx| &self.classes[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// All classes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class names grouped by their documentation group tag. Classes with no
    /// tag are left out.
    pub fn groups(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for class in &self.classes {
            if let Some(group) = &class.group {
                groups.entry(group.as_str()).or_default().push(&class.name);
            }
        }
        groups
    }

    /// Alias names that resolve to `class_name`, sorted.
    pub fn aliases_of(&self, class_name: &str) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == class_name)
            .map(|(alias, _)| alias.as_str())
            .collect();
        aliases.sort_unstable();
        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ClassDescriptor {
        ClassDescriptor::new("LowPass12db")
            .socket(&["input"])
            .socket(&["cutoff", "frequency", "freq", "f"])
            .socket(&["resonance", "res", "q"])
            .output(&["output"])
            .positional(&["cutoff", "resonance"])
            .group("Filters")
    }

    #[test]
    fn socket_aliases_share_index() {
        let d = filter();
        assert_eq!(d.socket_index("cutoff"), Some(1));
        assert_eq!(d.socket_index("freq"), Some(1));
        assert_eq!(d.canonical_socket("f"), Some("cutoff"));
        assert_eq!(d.socket_index("gain"), None);
    }

    #[test]
    fn capability_from_sockets() {
        let d = filter();
        assert!(d.can_be_input());
        assert!(d.can_be_output());

        let stereo_out = ClassDescriptor::new("UserStereoOutput")
            .socket(&["left"])
            .socket(&["right"]);
        assert!(stereo_out.can_be_input());
        assert!(!stereo_out.can_be_output());

        let source = ClassDescriptor::new("UserInput").output(&["output"]);
        assert!(!source.can_be_input());
        assert!(source.can_be_output());
    }

    #[test]
    fn resolve_through_alias() {
        let mut catalog = ClassCatalog::new();
        catalog.register(filter());
        catalog.register_alias("LP", "LowPass12db");
        assert_eq!(catalog.resolve("LP").map(|d| d.name.as_str()), Some("LowPass12db"));
        assert!(catalog.resolve("HighPass").is_none());
        assert_eq!(catalog.aliases_of("LowPass12db"), vec!["LP"]);
    }

    #[test]
    fn register_replaces_same_name() {
        let mut catalog = ClassCatalog::new();
        catalog.register(filter());
        catalog.register(ClassDescriptor::new("LowPass12db").output(&["output"]));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.resolve("LowPass12db").is_some_and(|d| d.sockets.is_empty()));
    }

    #[test]
    fn groups_in_registration_order() {
        let mut catalog = ClassCatalog::new();
        catalog.register(filter());
        catalog.register(ClassDescriptor::new("LowPass24db").group("Filters"));
        catalog.register(ClassDescriptor::new("UserInput"));
        let groups = catalog.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["Filters"], vec!["LowPass12db", "LowPass24db"]);
    }
}
