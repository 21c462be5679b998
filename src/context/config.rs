//! # Context tuning knobs.
//!
//! Provides [`ContextConfig`] per-tree settings for child-list compaction.
//!
//! The config is attached to a root via [`Context::with_config`](crate::Context::with_config)
//! and inherited by every child derived from it.
//!
//! ## Sentinel values
//! - `compact_threshold = 0` → treated as 1 (compact on every registration)

/// Tuning for a context tree.
///
/// Compaction affects memory footprint only, never correctness: a dead weak
/// reference can never be resolved, so dropping it from the child list is
/// invisible to observers. The defaults match the steady-state assumption
/// that roughly half of registered children have already died by the time a
/// compaction pass runs.
///
/// ## Field semantics
/// - `compact_threshold`: child registrations between automatic compaction
///   passes (`0` is treated as `1`)
#[derive(Clone, Copy, Debug)]
pub struct ContextConfig {
    /// Number of child registrations that triggers an automatic compaction
    /// pass over the parent's child list.
    ///
    /// Lower values trade CPU (more passes) for a tighter memory bound on
    /// long-lived parents that spawn many short-lived children.
    pub compact_threshold: usize,
}

impl Default for ContextConfig {
    /// Returns a config with `compact_threshold = 100`.
    fn default() -> Self {
        Self {
            compact_threshold: 100,
        }
    }
}

impl ContextConfig {
    /// Returns the effective threshold (minimum 1).
    #[inline]
    pub(crate) fn threshold(&self) -> usize {
        self.compact_threshold.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        assert_eq!(ContextConfig::default().compact_threshold, 100);
        assert_eq!(ContextConfig::default().threshold(), 100);
    }

    #[test]
    fn test_zero_threshold_clamps_to_one() {
        let cfg = ContextConfig {
            compact_threshold: 0,
        };
        assert_eq!(cfg.threshold(), 1);
    }
}
