//! Run-key construction.

/// Convert text to a filesystem-safe snake_case token.
///
/// Spaces and hyphens become underscores, everything is lowercased, characters
/// other than alphanumerics and underscores are dropped, runs of underscores
/// collapse to one, and leading/trailing underscores are trimmed.
pub fn to_snake_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars().flat_map(char::to_lowercase) {
        let c = if c == ' ' || c == '-' { '_' } else { c };
        if !(c.is_alphanumeric() || c == '_') {
            continue;
        }
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    out.trim_matches('_').to_string()
}

/// Key grouping every checkpoint of one generation run.
pub fn run_key(topic: &str, qa_rounds: u32) -> String {
    format!("{}_qa_{}", to_snake_case(topic), qa_rounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_examples() {
        assert_eq!(to_snake_case("Hello World"), "hello_world");
        assert_eq!(to_snake_case("A--B  C"), "a_b_c");
        assert_eq!(to_snake_case("_foo_"), "foo");
    }

    #[test]
    fn test_punctuation_is_stripped() {
        assert_eq!(to_snake_case("My Topic!! --2024"), "my_topic_2024");
        assert_eq!(to_snake_case("my topic 2024"), "my_topic_2024");
        assert_eq!(to_snake_case("C++ & Rust: a history"), "c_rust_a_history");
    }

    #[test]
    fn test_underscore_runs_collapse_across_removed_chars() {
        // "a _!_ b" -> "a__" + "_" + "_b" before collapsing
        assert_eq!(to_snake_case("a _!_ b"), "a_b");
        assert_eq!(to_snake_case("   "), "");
    }

    #[test]
    fn test_run_key() {
        assert_eq!(run_key("Quantum Computing", 2), "quantum_computing_qa_2");
        assert_ne!(run_key("Quantum Computing", 2), run_key("Quantum Computing", 3));
        assert_ne!(run_key("Black holes", 2), run_key("White holes", 2));
        assert_eq!(run_key("black-holes", 2), run_key("Black  Holes", 2));
    }
}
