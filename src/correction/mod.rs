//! "Did you mean?" suggestions for commands that could not be resolved.

use crate::builtins::Builtin;
use crate::resolver::path_dirs;
use std::collections::BTreeSet;
use std::fs;
use strsim::jaro_winkler;

/// Minimum Jaro-Winkler similarity for a name to be offered.
pub const MIN_SIMILARITY: f64 = 0.85;
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub text: String,
    pub score: f64,
}

/// Names reachable through `path` (plus built-ins) that look like `input`,
/// best first.
pub fn suggest_command(input: &str, path: Option<&str>) -> Vec<Suggestion> {
    let mut candidates: BTreeSet<String> = Builtin::all()
        .iter()
        .map(|builtin| builtin.name().to_string())
        .collect();

    for dir in path.into_iter().flat_map(path_dirs) {
        if let Ok(entries) = fs::read_dir(dir) {
            candidates.extend(
                entries
                    .flatten()
                    .filter_map(|entry| entry.file_name().into_string().ok()),
            );
        }
    }

    rank(input, candidates)
}

fn rank(input: &str, candidates: impl IntoIterator<Item = String>) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = candidates
        .into_iter()
        .filter(|name| name != input)
        .map(|name| Suggestion {
            score: jaro_winkler(&name, input),
            text: name,
        })
        .filter(|s| s.score >= MIN_SIMILARITY)
        .collect();

    suggestions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.text.cmp(&b.text))
    });
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Render suggestions the way the interpreter prints them, or `None` when
/// there is nothing to offer.
pub fn format_suggestions(suggestions: &[Suggestion]) -> Option<String> {
    if suggestions.is_empty() {
        return None;
    }
    let mut out = String::from("Did you mean?");
    for suggestion in suggestions {
        out.push_str(&format!(
            "\n  {} ({}%)",
            suggestion.text,
            (suggestion.score * 100.0).round() as u32
        ));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_close_typo_is_suggested() {
        let suggestions = rank("gerp", names(&["grep", "git", "ls"]));
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].text, "grep");
    }

    #[test]
    fn test_unrelated_names_are_dropped() {
        assert!(rank("xyzzy", names(&["grep", "ls", "cat"])).is_empty());
    }

    #[test]
    fn test_at_most_three_best_first() {
        let suggestions = rank(
            "python",
            names(&["python2", "python3", "pythonw", "python3.11", "perl"]),
        );
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        for pair in suggestions.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_suggest_from_path_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        File::create(dir.path().join("sortx")).unwrap();
        let suggestions = suggest_command("sotrx", dir.path().to_str());
        assert_eq!(suggestions[0].text, "sortx");
    }

    #[test]
    fn test_format() {
        assert_eq!(format_suggestions(&[]), None);
        let text = format_suggestions(&[Suggestion {
            text: "grep".to_string(),
            score: 0.9,
        }])
        .unwrap();
        assert_eq!(text, "Did you mean?\n  grep (90%)");
    }
}
