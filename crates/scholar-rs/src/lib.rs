//! Public SDK surface for Scholar.
//!
//! Re-exports the config, store and lifecycle crates and provides a logging
//! helper so embedding applications set up output the same way.

pub use scholar_rs_config as config;
pub use scholar_rs_core as core;
/// Re-export for convenience.
pub use scholar_rs_memory as memory;

/// Initialize env_logger with millisecond timestamps when the "logging"
/// feature is enabled. Safe to call more than once.
#[inline]
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::{config, core, init_logging, memory};
    use pretty_assertions::assert_eq;

    #[test]
    fn init_logging_is_repeatable() {
        init_logging();
        init_logging();
    }

    #[test]
    fn re_exports_resolve() {
        assert_eq!(core::DEFAULT_DB_PATH, ".scholar/memory.db");
        assert_eq!(config::ScholarConfig::default().memory.recall.limit, 5);
        assert_eq!(memory::MatchPolicy::default().prefix_chars, 30);
    }
}
