//! Runtime configuration for a projection [`Context`](crate::Context).

/// Tunables applied by a [`Context`](crate::Context) and everything it projects.
///
/// Built with [`Default`] and adjusted with the `with_*` setters:
///
/// ```ignore
/// let config = ProjectionConfig::default()
///     .with_strict_thread_affinity(false)
///     .with_listener_method_names("on", "off");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionConfig {
    /// Panic when a promise is touched off its creating thread.
    ///
    /// When disabled the violation is logged at warn level and the call
    /// proceeds.
    pub strict_thread_affinity: bool,

    /// Silently accept writes to names no projected interface declares.
    ///
    /// When disabled such writes fail with a type error.
    pub ignore_unknown_writes: bool,

    /// Return the same function object for repeated method reads.
    pub cache_method_functions: bool,

    /// Name of the listener registration method.
    pub add_listener_name: String,

    /// Name of the listener removal method.
    pub remove_listener_name: String,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            strict_thread_affinity: true,
            ignore_unknown_writes: true,
            cache_method_functions: true,
            add_listener_name: "addEventListener".to_string(),
            remove_listener_name: "removeEventListener".to_string(),
        }
    }
}

impl ProjectionConfig {
    /// Set [`strict_thread_affinity`](Self::strict_thread_affinity).
    pub fn with_strict_thread_affinity(mut self, strict: bool) -> Self {
        self.strict_thread_affinity = strict;
        self
    }

    /// Set [`ignore_unknown_writes`](Self::ignore_unknown_writes).
    pub fn with_ignore_unknown_writes(mut self, ignore: bool) -> Self {
        self.ignore_unknown_writes = ignore;
        self
    }

    /// Set [`cache_method_functions`](Self::cache_method_functions).
    pub fn with_cache_method_functions(mut self, cache: bool) -> Self {
        self.cache_method_functions = cache;
        self
    }

    /// Rename the listener method pair.
    pub fn with_listener_method_names(
        mut self,
        add: impl Into<String>,
        remove: impl Into<String>,
    ) -> Self {
        self.add_listener_name = add.into();
        self.remove_listener_name = remove.into();
        self
    }

    /// Check if `name` is one of the listener methods.
    pub fn is_listener_method(&self, name: &str) -> bool {
        name == self.add_listener_name || name == self.remove_listener_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProjectionConfig::default();
        assert!(config.strict_thread_affinity);
        assert!(config.ignore_unknown_writes);
        assert!(config.cache_method_functions);
        assert!(config.is_listener_method("addEventListener"));
        assert!(config.is_listener_method("removeEventListener"));
        assert!(!config.is_listener_method("dispatchEvent"));
    }

    #[test]
    fn setters_chain() {
        let config = ProjectionConfig::default()
            .with_strict_thread_affinity(false)
            .with_ignore_unknown_writes(false)
            .with_listener_method_names("on", "off");
        assert!(!config.strict_thread_affinity);
        assert!(!config.ignore_unknown_writes);
        assert!(config.is_listener_method("on"));
        assert!(!config.is_listener_method("addEventListener"));
    }
}
