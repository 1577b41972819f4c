//! Markdown inversion
//!
//! Models answer in Markdown: prose with fenced code blocks. When the answer
//! is going straight into a source file we want the opposite, code as-is and
//! prose turned into comments. [`invert`] does that with a line scanner that
//! toggles on every fence line.

const FENCE: &str = "```";

/// True for a line that opens or closes a fenced code block.
pub fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

/// Swap code and commentary in a Markdown answer.
///
/// Fence lines are dropped. Lines inside a fence are kept verbatim, lines
/// outside are wrapped as `prefix + line + suffix`. Text without any fence
/// line is returned unchanged, and an unterminated fence simply leaves the
/// trailing lines in the state of the last toggle.
///
/// ```
/// use quill::invert::invert;
///
/// let text = "a\n```\ncode\n```\nb";
/// assert_eq!(invert(text, "// ", ""), "// a\ncode\n// b");
/// ```
pub fn invert(text: &str, prefix: &str, suffix: &str) -> String {
    if !text.split('\n').any(is_fence) {
        return text.to_string();
    }

    let mut in_code = false;
    let mut out = Vec::new();
    for line in text.split('\n') {
        if is_fence(line) {
            in_code = !in_code;
            continue;
        }
        if in_code {
            out.push(line.to_string());
        } else {
            out.push(format!("{prefix}{line}{suffix}"));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_without_fences() {
        for text in ["", "plain prose", "fn main() {}\nlet x = 1;", "`` not a fence"] {
            assert_eq!(invert(text, "// ", ""), text);
        }
    }

    #[test]
    fn wraps_prose_and_keeps_code() {
        assert_eq!(
            invert("a\n```\ncode\n```\nb", "// ", ""),
            "// a\ncode\n// b"
        );
    }

    #[test]
    fn language_tag_and_indent_still_fence() {
        let text = "Here:\n  ```rust\nlet x = 1;\n  ```";
        assert_eq!(invert(text, "/* ", " */"), "/* Here: */\nlet x = 1;");
    }

    #[test]
    fn unterminated_fence_keeps_last_state() {
        let text = "intro\n```\nfirst\nsecond";
        assert_eq!(invert(text, "# ", ""), "# intro\nfirst\nsecond");
    }

    #[test]
    fn consecutive_fences_toggle_twice() {
        let text = "x\n```\n```\ny";
        assert_eq!(invert(text, ";; ", ""), ";; x\n;; y");
    }

    #[test]
    fn fence_only_input_is_empty() {
        assert_eq!(invert("```", "// ", ""), "");
    }

    #[test]
    fn detects_fence_lines() {
        assert!(is_fence("```"));
        assert!(is_fence("\t```python"));
        assert!(!is_fence("text ```"));
        assert!(!is_fence("``"));
    }
}
