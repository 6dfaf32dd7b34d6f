//! Runtime identifier normalization
//!
//! Functions carry a free-form runtime string ("java17", "python3.10",
//! "nodejs18"). Prefix matching maps these onto the small set of runtimes the
//! dispatcher knows how to build and run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalRuntime {
    Java,
    Python,
    JavaScript,
}

impl CanonicalRuntime {
    pub const ALL: [CanonicalRuntime; 3] = [
        CanonicalRuntime::Java,
        CanonicalRuntime::Python,
        CanonicalRuntime::JavaScript,
    ];

    /// Source file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            CanonicalRuntime::Java => "java",
            CanonicalRuntime::Python => "py",
            CanonicalRuntime::JavaScript => "js",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalRuntime::Java => "java",
            CanonicalRuntime::Python => "python",
            CanonicalRuntime::JavaScript => "javascript",
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, CanonicalRuntime::Java)
    }
}

impl std::fmt::Display for CanonicalRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a raw runtime identifier to a canonical runtime, `None` if unknown.
pub fn normalize(raw: &str) -> Option<CanonicalRuntime> {
    let runtime = raw.trim().to_lowercase();
    if runtime.starts_with("java") && !runtime.starts_with("javascript") {
        Some(CanonicalRuntime::Java)
    } else if runtime.starts_with("python") {
        Some(CanonicalRuntime::Python)
    } else if runtime.starts_with("node") || runtime == "js" || runtime.starts_with("javascript") {
        Some(CanonicalRuntime::JavaScript)
    } else {
        None
    }
}
