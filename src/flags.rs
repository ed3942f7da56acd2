//! Process-wide compile flags from the `ORC_CODE` environment variable.
//!
//! `ORC_CODE` carries a comma-separated list of flag names, parsed once and
//! immutable afterwards. Recognized flags:
//!
//! - `backup`: disable compilation for programs that carry a backup
//!   function, leaving the backup installed.
//! - `debug`: dump the generated assembly for successful compiles through
//!   the log at info level.
//!
//! Unrecognized names are preserved and queryable through
//! [`CompilerFlags::check`].

use std::sync::OnceLock;

/// Parsed `ORC_CODE` flag list.
#[derive(Debug, Clone, Default)]
pub struct CompilerFlags {
    list: Vec<String>,
    pub backup: bool,
    pub debug: bool,
}

impl CompilerFlags {
    fn parse(value: Option<&str>) -> Self {
        let list: Vec<String> = value
            .map(|v| {
                v.split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let backup = list.iter().any(|f| f == "backup");
        let debug = list.iter().any(|f| f == "debug");
        Self { list, backup, debug }
    }

    /// Whether the given flag name appeared in `ORC_CODE`.
    pub fn check(&self, flag: &str) -> bool {
        self.list.iter().any(|f| f == flag)
    }
}

/// The flags for this process, parsed from `ORC_CODE` on first use.
pub fn compiler_flags() -> &'static CompilerFlags {
    static FLAGS: OnceLock<CompilerFlags> = OnceLock::new();
    FLAGS.get_or_init(|| CompilerFlags::parse(std::env::var("ORC_CODE").ok().as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let flags = CompilerFlags::parse(None);
        assert!(!flags.backup);
        assert!(!flags.debug);
        assert!(!flags.check("backup"));
    }

    #[test]
    fn test_parse_list() {
        let flags = CompilerFlags::parse(Some("backup,debug"));
        assert!(flags.backup);
        assert!(flags.debug);
    }

    #[test]
    fn test_parse_unrecognized() {
        let flags = CompilerFlags::parse(Some("backup,frobnicate"));
        assert!(flags.backup);
        assert!(!flags.debug);
        assert!(flags.check("frobnicate"));
        assert!(!flags.check("emulate"));
    }

    #[test]
    fn test_parse_trailing_comma() {
        let flags = CompilerFlags::parse(Some("debug,"));
        assert!(flags.debug);
        assert!(!flags.check(""));
    }
}
