//! Language detection from file paths

use crate::models::File;

/// Maps file extensions to language ids and elects a project's dominant
/// language by file count.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageDetector;

impl LanguageDetector {
    pub fn new() -> Self {
        Self
    }

    /// Language id for a single file path, by extension
    pub fn detect_language(&self, path: &str) -> Option<&'static str> {
        let extension = path.rsplit_once('.').map(|(_, ext)| ext)?;

        let language = match extension {
            "go" => "go",
            "py" => "python",
            "rs" => "rust",
            "js" | "mjs" | "cjs" => "javascript",
            "jsx" => "javascriptreact",
            "ts" | "mts" | "cts" => "typescript",
            "tsx" => "typescriptreact",
            "java" => "java",
            "c" | "h" => "c",
            "cc" | "cpp" | "cxx" | "hpp" => "cpp",
            "rb" => "ruby",
            "php" => "php",
            "cs" => "csharp",
            _ => return None,
        };

        Some(language)
    }

    /// The language with the most files among the project's files
    pub fn detect_main_language(&self, files: &[File]) -> Option<String> {
        let mut counts = std::collections::HashMap::new();

        for file in files {
            if let Some(language) = self.detect_language(&file.path) {
                *counts.entry(language).or_insert(0usize) += 1;
            }
        }

        counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(language, _)| language.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language_by_extension() {
        let detector = LanguageDetector::new();
        assert_eq!(detector.detect_language("cmd/main.go"), Some("go"));
        assert_eq!(detector.detect_language("app/models.py"), Some("python"));
        assert_eq!(detector.detect_language("README"), None);
        assert_eq!(detector.detect_language("binary.xyz"), None);
    }

    #[test]
    fn test_detect_main_language() {
        let detector = LanguageDetector::new();
        let files = vec![
            File::empty("main.go"),
            File::empty("server.go"),
            File::empty("script.py"),
            File::empty("README.md"),
        ];

        assert_eq!(detector.detect_main_language(&files), Some("go".to_string()));
    }

    #[test]
    fn test_detect_main_language_no_known_files() {
        let detector = LanguageDetector::new();
        let files = vec![File::empty("README"), File::empty("LICENSE")];
        assert_eq!(detector.detect_main_language(&files), None);
    }
}
