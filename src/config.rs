//! Engine-wide configuration, read once at `Context::new` and otherwise
//! constructible directly for embedders with no environment (MCU targets).
//!
//! Grounded in the same builder-method idiom the teacher uses for its own
//! per-document knobs: no config-file crate, just a plain struct and `with_*`
//! setters.

use crate::constants::SHAPE_CACHE_SLOTS;

/// Knobs gated by spec.md §6's `CTX_*` environment variables, narrowed to the
/// subsystems this crate actually implements (the shape cache and the tiled
/// scheduler's worker count — display back ends are out of scope).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Mirrors `VECDRAW_SHAPE_CACHE`. Disabled by default, per spec.md §3
    /// ("Cache is disabled by default; enabling it is a runtime flag").
    pub shape_cache: bool,
    /// Mirrors `VECDRAW_THREADS`. Zero means "let the scheduler pick",
    /// consulted only when the `tiled-scheduler` feature is enabled.
    pub threads: usize,
    /// Shape cache slot count, default [`SHAPE_CACHE_SLOTS`].
    pub shape_cache_slots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { shape_cache: false, threads: 0, shape_cache_slots: SHAPE_CACHE_SLOTS }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shape_cache(mut self, enabled: bool) -> Self {
        self.shape_cache = enabled;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Reads `VECDRAW_SHAPE_CACHE` and `VECDRAW_THREADS` on top of the
    /// defaults. Absent or unparsable variables leave the default in place;
    /// this never fails, matching the core's "no error paths" posture.
    #[cfg(feature = "std")]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(val) = std::env::var("VECDRAW_SHAPE_CACHE") {
            cfg.shape_cache = matches!(val.as_str(), "1" | "true" | "on");
        }
        if let Ok(val) = std::env::var("VECDRAW_THREADS") {
            if let Ok(n) = val.parse::<usize>() {
                cfg.threads = n;
            }
        }
        cfg
    }

    #[cfg(not(feature = "std"))]
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_disables_shape_cache() {
        assert!(!EngineConfig::default().shape_cache);
    }

    #[test]
    fn builder_methods_chain() {
        let cfg = EngineConfig::new().with_shape_cache(true).with_threads(4);
        assert!(cfg.shape_cache);
        assert_eq!(cfg.threads, 4);
    }
}
