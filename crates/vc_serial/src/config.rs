//! Engine and context configuration.
//!
//! Both structs deserialize with every field optional, so a partial RON or
//! JSON document only overrides what it names.

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// EngineConfig

/// Per-engine switches.
///
/// # Examples
///
/// ```
/// use vc_serial::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_sections(false)
///     .with_partial_results(true);
/// assert!(!config.sections);
/// assert!(config.partial_results);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wrap compound bodies in length-prefixed sections when the backend
    /// can backpatch. Writer and reader must agree.
    pub sections: bool,
    /// Null out dynamic slots whose extension cannot be resolved instead of
    /// failing the whole call.
    pub partial_results: bool,
    /// Clear identity state at the start of every top-level call.
    pub auto_reset: bool,
    /// Maximum payload nesting depth.
    pub max_depth: usize,
    /// Maximum number of graph slots a single decode may allocate.
    pub max_objects: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sections: true,
            partial_results: false,
            auto_reset: true,
            max_depth: 256,
            max_objects: 1 << 20,
        }
    }
}

impl EngineConfig {
    #[inline]
    pub fn with_sections(mut self, sections: bool) -> Self {
        self.sections = sections;
        self
    }

    #[inline]
    pub fn with_partial_results(mut self, partial_results: bool) -> Self {
        self.partial_results = partial_results;
        self
    }

    #[inline]
    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.auto_reset = auto_reset;
        self
    }

    #[inline]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }
}

// -----------------------------------------------------------------------------
// ContextConfig

/// Which type identity encoding a context uses for dynamic payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResolverKind {
    /// Fully qualified, version-qualified type names.
    Name,
    /// Explicit stable identifiers, preorder over generic arguments.
    #[default]
    StableId,
}

/// Settings for a [`SerialContext`](crate::SerialContext).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub resolver: ResolverKind,
    /// Enable the AOT guard. Off unless targeting a restricted runtime.
    pub guard_active: bool,
}

#[cfg(test)]
mod tests {
    use super::{ContextConfig, EngineConfig, ResolverKind};

    #[test]
    fn partial_ron_overrides() {
        let config: EngineConfig =
            ron::from_str("(sections: false, max_depth: 8)").unwrap();
        assert!(!config.sections);
        assert_eq!(config.max_depth, 8);
        assert!(config.auto_reset);
        assert_eq!(config.max_objects, EngineConfig::default().max_objects);
    }

    #[test]
    fn context_from_json() {
        let config: ContextConfig =
            serde_json::from_str(r#"{ "resolver": "Name", "guard_active": true }"#).unwrap();
        assert_eq!(config.resolver, ResolverKind::Name);
        assert!(config.guard_active);

        let empty: ContextConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ContextConfig::default());
        assert_eq!(empty.resolver, ResolverKind::StableId);
    }
}
