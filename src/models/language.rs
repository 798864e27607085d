//! Language registry: extensions per language and the ordered tool list
//! each language is analysed with.

use std::fmt;
use std::path::Path;

use crate::models::tool::ToolId;

/// A supported source language.
///
/// Variants are declared in registration order; classification walks
/// [`Language::ALL`] front to back and the first extension match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    Python,
    JavaScript,
    Java,
    Cpp,
    Php,
    CSharp,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Self::Python,
        Self::JavaScript,
        Self::Java,
        Self::Cpp,
        Self::Php,
        Self::CSharp,
    ];

    /// Human-readable language name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::Java => "Java",
            Self::Cpp => "C/C++",
            Self::Php => "PHP",
            Self::CSharp => "C#",
        }
    }

    /// Lowercase file extensions, including the leading dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &[".py"],
            Self::JavaScript => &[".js", ".jsx", ".ts", ".tsx"],
            Self::Java => &[".java"],
            Self::Cpp => &[".c", ".cpp", ".cc", ".h", ".hpp"],
            Self::Php => &[".php"],
            Self::CSharp => &[".cs"],
        }
    }

    /// Tools run against files of this language, in execution order.
    pub fn tools(&self) -> &'static [ToolId] {
        match self {
            Self::Python => &[ToolId::Bandit, ToolId::Semgrep, ToolId::Pylint],
            Self::JavaScript => &[ToolId::Semgrep, ToolId::Eslint, ToolId::Jshint],
            Self::Java => &[ToolId::Semgrep, ToolId::Spotbugs, ToolId::Pmd],
            Self::Cpp => &[ToolId::Semgrep, ToolId::Cppcheck, ToolId::Flawfinder],
            Self::Php => &[ToolId::Semgrep, ToolId::Phpcs],
            Self::CSharp => &[ToolId::Semgrep, ToolId::Devskim],
        }
    }

    /// Name of the language-specific Semgrep registry pack (`p/<name>`).
    pub fn semgrep_pack(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Php => "php",
            Self::CSharp => "csharp",
        }
    }

    /// Classify a path by its extension (case-insensitive).
    ///
    /// Returns `None` for paths without an extension or with one no
    /// registered language claims.
    pub fn classify(path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        let dotted = format!(".{ext}");
        Self::ALL
            .into_iter()
            .find(|language| language.extensions().contains(&dotted.as_str()))
    }

    /// Every supported extension across all languages, in registration order.
    pub fn all_extensions() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .flat_map(|language| language.extensions().iter().copied())
            .collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(Language::classify(Path::new("app.py")), Some(Language::Python));
        assert_eq!(
            Language::classify(Path::new("src/ui/App.tsx")),
            Some(Language::JavaScript)
        );
        assert_eq!(Language::classify(Path::new("lib/util.hpp")), Some(Language::Cpp));
        assert_eq!(Language::classify(Path::new("Program.cs")), Some(Language::CSharp));
    }

    #[test]
    fn classification_ignores_case() {
        assert_eq!(Language::classify(Path::new("MAIN.PY")), Some(Language::Python));
        assert_eq!(Language::classify(Path::new("Index.Php")), Some(Language::Php));
    }

    #[test]
    fn unknown_or_missing_extension_is_unclassified() {
        assert_eq!(Language::classify(Path::new("README.md")), None);
        assert_eq!(Language::classify(Path::new("Makefile")), None);
        assert_eq!(Language::classify(Path::new(".gitignore")), None);
    }

    #[test]
    fn extensions_are_disjoint() {
        let all = Language::all_extensions();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn every_language_runs_semgrep_or_bandit_first() {
        for language in Language::ALL {
            let first = language.tools()[0];
            assert!(matches!(first, ToolId::Semgrep | ToolId::Bandit));
        }
    }
}
