//! Optional ignore filtering for the tree walk
//!
//! Patterns use gitignore syntax and come from two sources:
//! 1. `.gitignore` at the monitored root (only when `use_gitignore` is set)
//! 2. Config-based patterns
//!
//! Both are empty by default, in which case every regular file is scanned

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Compiled ignore rules for one monitored root
pub struct IgnoreRules {
    /// Combined matcher, `None` when there is nothing to match
    matcher: Option<Gitignore>,
}

impl IgnoreRules {
    /// Rules that ignore nothing
    pub fn none() -> Self {
        Self { matcher: None }
    }

    /// Compile ignore rules for `root`
    pub fn load(root: &Path, config: &IgnoreConfig) -> Result<Self> {
        let gitignore_path = root.join(".gitignore");
        let use_gitignore = config.use_gitignore && gitignore_path.is_file();

        if !use_gitignore && config.patterns.is_empty() {
            return Ok(Self::none());
        }

        let mut builder = GitignoreBuilder::new(root);
        if use_gitignore {
            if let Some(err) = builder.add(&gitignore_path) {
                return Err(err.into());
            }
        }
        for pattern in &config.patterns {
            builder.add_line(None, pattern)?;
        }

        let matcher = builder.build()?;
        debug!(
            "Loaded {} ignore rule(s) for {}",
            matcher.num_ignores(),
            root.display()
        );

        Ok(Self {
            matcher: Some(matcher),
        })
    }

    /// Check if a path under the root should be skipped
    ///
    /// `is_dir` must describe the path itself; directory-only patterns
    /// such as `build/` only match directories.
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.matched(path, is_dir).is_ignore(),
            None => false,
        }
    }

    /// Whether any rule is active
    pub fn is_active(&self) -> bool {
        self.matcher.is_some()
    }
}

/// Ignore configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IgnoreConfig {
    /// Honour `.gitignore` at the monitored root (default: false)
    pub use_gitignore: bool,

    /// Additional gitignore-style patterns
    pub patterns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_ignores_nothing() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(".gitignore"), "*.log\n")?;

        let rules = IgnoreRules::load(temp_dir.path(), &IgnoreConfig::default())?;

        assert!(!rules.is_active());
        assert!(!rules.should_ignore(&temp_dir.path().join("debug.log"), false));
        assert!(!rules.should_ignore(&temp_dir.path().join(".git"), true));
        Ok(())
    }

    #[test]
    fn test_config_patterns() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        let config = IgnoreConfig {
            use_gitignore: false,
            patterns: vec!["*.swp".to_string(), "build/".to_string()],
        };

        let rules = IgnoreRules::load(root, &config)?;

        assert!(rules.is_active());
        assert!(rules.should_ignore(&root.join("notes.txt.swp"), false));
        assert!(rules.should_ignore(&root.join("src/main.rs.swp"), false));
        assert!(rules.should_ignore(&root.join("build"), true));
        assert!(!rules.should_ignore(&root.join("build"), false));
        assert!(!rules.should_ignore(&root.join("src/main.rs"), false));
        Ok(())
    }

    #[test]
    fn test_gitignore_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::write(root.join(".gitignore"), "*.log\ntarget/\n")?;

        let config = IgnoreConfig {
            use_gitignore: true,
            patterns: vec![],
        };
        let rules = IgnoreRules::load(root, &config)?;

        assert!(rules.should_ignore(&root.join("test.log"), false));
        assert!(rules.should_ignore(&root.join("target"), true));
        assert!(!rules.should_ignore(&root.join("README.md"), false));
        Ok(())
    }

    #[test]
    fn test_missing_gitignore_is_not_an_error() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let config = IgnoreConfig {
            use_gitignore: true,
            patterns: vec![],
        };

        let rules = IgnoreRules::load(temp_dir.path(), &config)?;
        assert!(!rules.is_active());
        Ok(())
    }
}
