use atrius_fhir_model::{Cardinality, MaxCardinality};

/// Wraps text at `width` columns, keeping existing line breaks.
///
/// `\r\n`, `\r` and `\n` all count as hard breaks and blank lines survive. Words longer
/// than `width` are split.
///
/// # Examples
///
/// ```
/// # use atrius_fhir_generator::format_helpers::wordwrap;
/// assert_eq!(wordwrap("one two three", 7), vec!["one two", "three"]);
/// assert_eq!(wordwrap("a\r\n\r\nb", 10), vec!["a", "", "b"]);
/// ```
pub fn wordwrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();

    for component in normalized.split('\n') {
        if component.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in component.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            // Long words are broken up; the pieces then wrap like ordinary words.
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Escapes text for use inside a triple-quoted Python docstring.
pub fn escape_docstring(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}

/// A double-quoted Python string literal.
pub fn python_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders a docstring block indented by `indent` spaces, wrapped to 79 columns.
///
/// Returns an empty string for empty documentation.
pub fn python_docstring(text: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let lines = wordwrap(&escape_docstring(text), 79usize.saturating_sub(indent + 3).max(20));
    if lines.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    if lines.len() == 1 {
        let line = lines[0].trim_end_matches('"');
        out.push_str(&format!("{}\"\"\"{}\"\"\"\n", pad, line));
        if line.len() != lines[0].len() {
            // A trailing quote would merge with the closing delimiter.
            out.clear();
            out.push_str(&format!("{}\"\"\"\n{}{}\n{}\"\"\"\n", pad, pad, lines[0], pad));
        }
        return out;
    }
    out.push_str(&format!("{}\"\"\"{}\n", pad, lines[0]));
    for line in &lines[1..] {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("{}{}\n", pad, line));
        }
    }
    out.push_str(&format!("{}\"\"\"\n", pad));
    out
}

/// Formats cardinality information into human-readable text.
pub fn format_cardinality(cardinality: &Cardinality) -> String {
    match (cardinality.min, cardinality.max) {
        (0, MaxCardinality::Bounded(1)) => "Optional (0..1)".to_string(),
        (1, MaxCardinality::Bounded(1)) => "Required (1..1)".to_string(),
        (0, MaxCardinality::Unbounded) => "Optional, Multiple (0..*)".to_string(),
        (1, MaxCardinality::Unbounded) => "Required, Multiple (1..*)".to_string(),
        _ => cardinality.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wordwrap_breaks_long_words() {
        assert_eq!(wordwrap("abcdefgh ij", 3), vec!["abc", "def", "gh", "ij"]);
        assert!(wordwrap("", 10).is_empty());
        assert_eq!(wordwrap("keep\n\nparagraphs", 40), vec!["keep", "", "paragraphs"]);
    }

    #[test]
    fn test_python_literals() {
        assert_eq!(python_string_literal("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(escape_docstring("say \"\"\"hi\"\"\""), "say \\\"\\\"\\\"hi\\\"\\\"\\\"");
        assert_eq!(python_docstring("Short.", 4), "    \"\"\"Short.\"\"\"\n");
        assert_eq!(python_docstring("", 4), "");
        assert_eq!(
            python_docstring("Ends with \"quote\"", 0),
            "\"\"\"\nEnds with \"quote\"\n\"\"\"\n"
        );
    }

    #[test]
    fn test_format_cardinality() {
        let card = Cardinality::parse(Some(0), Some("*")).unwrap();
        assert_eq!(format_cardinality(&card), "Optional, Multiple (0..*)");
        let card = Cardinality::parse(Some(2), Some("5")).unwrap();
        assert_eq!(format_cardinality(&card), "2..5");
    }
}
