//! Text extraction from fetched content: HTML main-content stripping, PDF
//! text recovery, and final cleaning shared by every input path.

use std::sync::OnceLock;

use regex::Regex;

/// Hard cap on cleaned text, in characters.
pub const MAX_TEXT_CHARS: usize = 200_000;

struct HtmlPatterns {
    drop_blocks: Regex,
    block_breaks: Regex,
    tags: Regex,
    numeric_entity: Regex,
}

fn html_patterns() -> &'static HtmlPatterns {
    static PATTERNS: OnceLock<HtmlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HtmlPatterns {
        // Non-content containers dropped wholesale. Spelled out per tag
        // because the engine has no backreferences.
        drop_blocks: Regex::new(
            r"(?is)<script\b[^>]*>.*?</script>|<style\b[^>]*>.*?</style>|<nav\b[^>]*>.*?</nav>|<header\b[^>]*>.*?</header>|<footer\b[^>]*>.*?</footer>|<noscript\b[^>]*>.*?</noscript>|<!--.*?-->",
        )
        .expect("html drop pattern"),
        // Closing block elements become paragraph breaks.
        block_breaks: Regex::new(r"(?i)</(p|div|h[1-6]|li|tr|section|article)>|<br\s*/?>")
            .expect("html break pattern"),
        tags: Regex::new(r"(?s)<[^>]*>").expect("html tag pattern"),
        numeric_entity: Regex::new(r"&#(?:(\d+)|x([0-9A-Fa-f]+));").expect("entity pattern"),
    })
}

/// Extract readable text from an HTML document: drop script/style/nav/
/// header/footer, preserve paragraph breaks, strip remaining tags, and
/// decode entities.
pub fn html_to_text(html: &str) -> String {
    let p = html_patterns();
    let without_blocks = p.drop_blocks.replace_all(html, " ");
    let with_breaks = p.block_breaks.replace_all(&without_blocks, "\n");
    let stripped = p.tags.replace_all(&with_breaks, " ");
    decode_entities(&stripped)
}

fn decode_entities(text: &str) -> String {
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    html_patterns()
        .numeric_entity
        .replace_all(&decoded, |caps: &regex::Captures| {
            let code = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .or_else(|| {
                    caps.get(2)
                        .and_then(|m| u32::from_str_radix(m.as_str(), 16).ok())
                });
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Extract text from a PDF body. Page texts arrive concatenated; downstream
/// cleaning treats form feeds as paragraph breaks.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| format!("PDF extraction failed: {e}"))
}

/// Final cleaning applied to every input path: strip control characters,
/// collapse whitespace runs while preserving paragraph breaks, cap length.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_TEXT_CHARS));
    let mut pending_space = false;
    let mut pending_breaks = 0u8;
    let mut chars_written = 0usize;

    for c in text.chars() {
        let mapped = match c {
            '\n' | '\x0c' => {
                pending_breaks = pending_breaks.saturating_add(1);
                continue;
            }
            // Tab and carriage return are both control and whitespace;
            // whitespace handling must win.
            c if c.is_whitespace() => {
                pending_space = true;
                continue;
            }
            c if c.is_control() => continue,
            c => c,
        };

        if chars_written > 0 {
            if pending_breaks > 0 {
                out.push('\n');
                if pending_breaks > 1 {
                    out.push('\n');
                    chars_written += 1;
                }
                chars_written += 1;
            } else if pending_space {
                out.push(' ');
                chars_written += 1;
            }
        }
        pending_breaks = 0;
        pending_space = false;

        out.push(mapped);
        chars_written += 1;
        if chars_written >= MAX_TEXT_CHARS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_drops_script_and_nav() {
        let html = r#"
            <html><head><style>.x{color:red}</style></head>
            <body>
            <nav>Home | About</nav>
            <script>alert("hi")</script>
            <p>Our net zero commitment stands.</p>
            <footer>Copyright</footer>
            </body></html>
        "#;
        let text = clean_text(&html_to_text(html));
        assert!(text.contains("net zero commitment"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("Home | About"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("color:red"));
    }

    #[test]
    fn test_html_preserves_paragraph_breaks() {
        let html = "<p>First paragraph.</p><p>Second paragraph.</p>";
        let text = clean_text(&html_to_text(html));
        assert!(text.contains("First paragraph.\n"));
        assert!(text.contains("Second paragraph."));
    }

    #[test]
    fn test_entity_decoding() {
        let html = "<p>Profit &amp; Loss &#8212; 40&#x25; growth</p>";
        let text = html_to_text(html);
        assert!(text.contains("Profit & Loss"));
        assert!(text.contains('—'));
        assert!(text.contains("40%"));
    }

    #[test]
    fn test_clean_text_strips_control_chars() {
        let dirty = "hello\u{0000}\u{0007} world\u{200b}";
        let clean = clean_text(dirty);
        assert!(clean.starts_with("hello"));
        assert!(!clean.contains('\u{0000}'));
        assert!(!clean.contains('\u{0007}'));
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("a    b\t\tc"), "a b c");
        assert_eq!(clean_text("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_text_caps_length() {
        let long = "word ".repeat(MAX_TEXT_CHARS);
        let clean = clean_text(&long);
        assert!(clean.chars().count() <= MAX_TEXT_CHARS + 1);
    }

    #[test]
    fn test_form_feed_becomes_break() {
        let text = clean_text("page one\x0cpage two");
        assert_eq!(text, "page one\npage two");
    }

    #[test]
    fn test_pdf_invalid_bytes_errors() {
        assert!(pdf_to_text(b"not a pdf").is_err());
    }
}
