//! The in-memory database of configuration options.

use rustc_hash::FxHashMap;

/// Tri-state value of a tracked option. Options start out [`Unset`] and
/// must all be [`Enabled`] or [`Disabled`] once resolution finishes.
///
/// [`Unset`]: OptionState::Unset
/// [`Enabled`]: OptionState::Enabled
/// [`Disabled`]: OptionState::Disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionState {
    #[default]
    Unset,
    Disabled,
    Enabled,
}

impl OptionState {
    pub fn from_enable(enable: bool) -> Self {
        if enable {
            OptionState::Enabled
        } else {
            OptionState::Disabled
        }
    }

    /// The textual value emitted into generated headers.
    pub fn as_define(self) -> &'static str {
        match self {
            OptionState::Unset => "",
            OptionState::Disabled => "0",
            OptionState::Enabled => "1",
        }
    }
}

/// One tracked feature flag.
#[derive(Debug, Clone)]
pub struct ConfigOption {
    /// Canonical upper-case name.
    pub name: String,
    /// Namespace tag such as `CONFIG_` or `HAVE_`; empty for fixed options.
    pub prefix: String,
    pub state: OptionState,
}

impl ConfigOption {
    /// The fully qualified tag as it appears in generated output.
    pub fn tag(&self) -> String {
        format!("{}{}", self.prefix, self.name)
    }
}

/// A literal substitution option outside the dependency graph.
#[derive(Debug, Clone)]
pub struct FixedValue {
    pub name: String,
    pub value: String,
}

/// Declaration-ordered store of options and fixed values.
///
/// The same bare name may appear under multiple prefixes (a device name in
/// both the indev and outdev namespaces); name lookups therefore resolve
/// to one *or more* entries, identified by index.
#[derive(Debug, Default)]
pub struct OptionStore {
    options: Vec<ConfigOption>,
    fixed: Vec<FixedValue>,
    by_name: FxHashMap<String, Vec<usize>>,
    by_tag: FxHashMap<String, usize>,
    config_end: usize,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigOption> {
        self.options.iter()
    }

    pub fn option(&self, index: usize) -> &ConfigOption {
        &self.options[index]
    }

    pub fn state(&self, index: usize) -> OptionState {
        self.options[index].state
    }

    pub fn set_state(&mut self, index: usize, state: OptionState) {
        self.options[index].state = state;
    }

    /// Append a new option. Names are normalized to upper case on entry;
    /// every lookup normalizes the same way.
    pub fn push(&mut self, name: &str, prefix: &str, state: OptionState) -> usize {
        let name = name.to_uppercase();
        let index = self.options.len();
        self.by_name.entry(name.clone()).or_default().push(index);
        self.by_tag
            .entry(format!("{}{}", prefix, name))
            .or_insert(index);
        self.options.push(ConfigOption {
            name,
            prefix: prefix.to_string(),
            state,
        });
        index
    }

    /// First entry matching the bare name.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name
            .get(&name.to_uppercase())
            .and_then(|v| v.first())
            .copied()
    }

    /// All entries matching the bare name, in declaration order.
    pub fn indices_of(&self, name: &str) -> Vec<usize> {
        self.by_name
            .get(&name.to_uppercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Entry matching the full `prefix + name` tag.
    pub fn get_prefixed(&self, tag: &str) -> Option<usize> {
        self.by_tag.get(&tag.to_uppercase()).copied()
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_valid_prefixed(&self, tag: &str) -> bool {
        self.get_prefixed(tag).is_some()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name)
            .map(|i| self.options[i].state == OptionState::Enabled)
            .unwrap_or(false)
    }

    /// Unconditional value assignment with no dependency propagation.
    /// Updates every entry sharing the bare name; returns whether any
    /// entry matched.
    pub fn fast_toggle(&mut self, name: &str, enable: bool) -> bool {
        let indices = self.indices_of(name);
        for &index in &indices {
            self.options[index].state = OptionState::from_enable(enable);
        }
        !indices.is_empty()
    }

    /// Mark the end of the exported option region. Entries appended later
    /// are temporary cross-reference stubs and are not emitted.
    pub fn mark_config_end(&mut self) {
        self.config_end = self.options.len();
    }

    /// Options that belong in generated output.
    pub fn exported(&self) -> &[ConfigOption] {
        let end = if self.config_end == 0 {
            self.options.len()
        } else {
            self.config_end
        };
        &self.options[..end]
    }

    pub fn push_fixed(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fixed.push(FixedValue {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn fixed_values(&self) -> &[FixedValue] {
        &self.fixed
    }

    pub fn fixed(&self, name: &str) -> Option<&FixedValue> {
        self.fixed.iter().find(|f| f.name == name)
    }

    pub fn set_fixed(&mut self, name: &str, value: impl Into<String>) {
        if let Some(fixed) = self.fixed.iter_mut().find(|f| f.name == name) {
            fixed.value = value.into();
        }
    }

    /// Append an accepted directive to the quoted provenance string kept in
    /// the `<PROJECT>_CONFIGURATION` fixed value.
    pub fn append_configuration(&mut self, project: &str, directive: &str) {
        let name = format!("{}_CONFIGURATION", project);
        if let Some(fixed) = self.fixed.iter_mut().find(|f| f.name == name) {
            let mut value = fixed.value.clone();
            if value.ends_with('"') {
                value.pop();
            }
            if value.len() > 1 {
                value.push(' ');
            }
            value.push_str(directive);
            value.push('"');
            fixed.value = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_normalized() {
        let mut store = OptionStore::new();
        store.push("aac_decoder", "CONFIG_", OptionState::Unset);
        assert!(store.is_valid("AAC_DECODER"));
        assert!(store.is_valid_prefixed("config_aac_decoder"));
        assert_eq!(store.option(0).name, "AAC_DECODER");
    }

    #[test]
    fn shared_bare_names_all_toggle() {
        let mut store = OptionStore::new();
        store.push("alsa", "CONFIG_INDEV_", OptionState::Unset);
        store.push("alsa", "CONFIG_OUTDEV_", OptionState::Unset);
        assert!(store.fast_toggle("alsa", true));
        assert_eq!(store.state(0), OptionState::Enabled);
        assert_eq!(store.state(1), OptionState::Enabled);
        assert_eq!(store.indices_of("ALSA"), vec![0, 1]);
    }

    #[test]
    fn configuration_string_accumulates() {
        let mut store = OptionStore::new();
        store.push_fixed("FFMPEG_CONFIGURATION", "\"\"");
        store.append_configuration("FFMPEG", "--disable-programs");
        store.append_configuration("FFMPEG", "--enable-gpl");
        assert_eq!(
            store.fixed("FFMPEG_CONFIGURATION").unwrap().value,
            "\"--disable-programs --enable-gpl\""
        );
    }

    #[test]
    fn exported_region_excludes_late_entries() {
        let mut store = OptionStore::new();
        store.push("a", "CONFIG_", OptionState::Unset);
        store.mark_config_end();
        store.push("late", "", OptionState::Unset);
        assert_eq!(store.exported().len(), 1);
        assert_eq!(store.len(), 2);
    }
}
