//! Normalizes the caller's requested chat mode.
//!
//! ```rust
//! use gchat::ChatMode;
//!
//! assert_eq!(ChatMode::normalize(Some("discuss")), ChatMode::Discuss);
//! assert_eq!(ChatMode::normalize(Some("Discuss")), ChatMode::Build);
//! assert_eq!(ChatMode::normalize(None), ChatMode::Build);
//! ```

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    Discuss,
    #[default]
    Build,
}

impl ChatMode {
    /// Only the exact value `"discuss"` selects discussion; everything else builds.
    pub fn normalize(requested: Option<&str>) -> Self {
        match requested {
            Some("discuss") => Self::Discuss,
            None | Some("build") => Self::Build,
            Some(other) => {
                tracing::warn!(
                    phase = "mode",
                    requested = other,
                    "unrecognized chat mode coerced to build"
                );
                Self::Build
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discuss => "discuss",
            Self::Build => "build",
        }
    }

    /// Build mode asks the model for runnable project artifacts.
    pub fn produces_artifacts(self) -> bool {
        matches!(self, Self::Build)
    }
}

impl Display for ChatMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_but_exact_discuss_builds() {
        for requested in [None, Some("build"), Some(""), Some("DISCUSS"), Some(" discuss"), Some("chat")] {
            assert_eq!(ChatMode::normalize(requested), ChatMode::Build, "{requested:?}");
        }
        assert_eq!(ChatMode::normalize(Some("discuss")), ChatMode::Discuss);
    }

    #[test]
    fn only_build_produces_artifacts() {
        assert!(ChatMode::Build.produces_artifacts());
        assert!(!ChatMode::Discuss.produces_artifacts());
        assert_eq!(ChatMode::Discuss.to_string(), "discuss");
    }
}
