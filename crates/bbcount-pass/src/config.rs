//! Instrumentation settings.

/// Function that receives the hook call.
pub const DEFAULT_ENTRY: &str = "main";
/// Name of the global execution counter.
pub const DEFAULT_COUNTER: &str = "bbCounter";
/// Runtime hook that registers the exit-time dump.
pub const DEFAULT_HOOK: &str = "setupAtExit";

/// Policy when the counter global already exists in the module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnExisting {
    /// Refuse to instrument twice.
    #[default]
    Fail,
    /// Leave the module untouched and report no change.
    Skip,
}

/// Names and policies used by the counter pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstrumentConfig {
    pub entry: String,
    pub counter: String,
    pub hook: String,
    pub on_existing: OnExisting,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY.to_string(),
            counter: DEFAULT_COUNTER.to_string(),
            hook: DEFAULT_HOOK.to_string(),
            on_existing: OnExisting::Fail,
        }
    }
}

impl InstrumentConfig {
    /// Set the entry function.
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Set the counter global name.
    #[must_use]
    pub fn with_counter(mut self, counter: impl Into<String>) -> Self {
        self.counter = counter.into();
        self
    }

    /// Set the setup hook name.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hook = hook.into();
        self
    }

    /// Set the policy for modules that already carry the counter.
    #[must_use]
    pub const fn with_on_existing(mut self, policy: OnExisting) -> Self {
        self.on_existing = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InstrumentConfig::default();
        assert_eq!(config.entry, "main");
        assert_eq!(config.counter, "bbCounter");
        assert_eq!(config.hook, "setupAtExit");
        assert_eq!(config.on_existing, OnExisting::Fail);
    }

    #[test]
    fn test_builder() {
        let config = InstrumentConfig::default()
            .with_entry("start")
            .with_counter("hits")
            .with_on_existing(OnExisting::Skip);
        assert_eq!(config.entry, "start");
        assert_eq!(config.counter, "hits");
        assert_eq!(config.hook, DEFAULT_HOOK);
        assert_eq!(config.on_existing, OnExisting::Skip);
    }
}
