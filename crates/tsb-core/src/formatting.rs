//! Formatting utilities (HTML escaping, line-preserving message chunking).

/// Escape HTML special characters for HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Split `text` into chunks of at most `limit` characters, breaking only at
/// line boundaries.
///
/// `chunks.join("\n") == text` always holds. A single line longer than
/// `limit` is emitted as a chunk of its own. Empty text yields no chunks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0usize;
    let mut chunk_has_line = false;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if chunk_has_line && chunk_len + 1 + line_len > limit {
            out.push(std::mem::take(&mut chunk));
            chunk_len = 0;
            chunk_has_line = false;
        }

        if chunk_has_line {
            chunk.push('\n');
            chunk_len += 1;
        }
        chunk.push_str(line);
        chunk_len += line_len;
        chunk_has_line = true;
    }

    if chunk_has_line {
        out.push(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_chunks_ok(text: &str, limit: usize) {
        let chunks = split_message(text, limit);
        assert_eq!(chunks.join("\n"), text, "round trip for limit {limit}");
        for c in &chunks {
            let len = c.chars().count();
            assert!(
                len <= limit || !c.contains('\n'),
                "chunk of {len} chars over limit {limit} must be a single line"
            );
        }
    }

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_message("a\nb", 10), vec!["a\nb".to_string()]);
        assert!(split_message("", 10).is_empty());
    }

    #[test]
    fn splits_at_line_boundaries() {
        let chunks = split_message("aaaa\nbbbb\ncccc", 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn over_length_line_is_emitted_alone() {
        let chunks = split_message("ab\nxxxxxxxxxx\ncd", 4);
        assert_eq!(chunks, vec!["ab", "xxxxxxxxxx", "cd"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 5 Cyrillic characters are 10 bytes.
        let chunks = split_message("привет\nмир", 10);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn round_trip_holds_for_awkward_inputs() {
        let samples = [
            "\n",
            "\n\n\n",
            "line\n",
            "\nline",
            "a\n\nb\n\n\nc",
            "один\nдва\nтри\nчетыре\nпять",
            "x",
        ];
        for text in samples {
            for limit in [1, 2, 3, 5, 8, 4000] {
                assert_chunks_ok(text, limit);
            }
        }
    }

    #[test]
    fn large_report_respects_limit() {
        let text = (0..2000)
            .map(|i| format!("📚 строка номер {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = split_message(&text, 4000);
        assert!(chunks.len() > 1);
        assert_chunks_ok(&text, 4000);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn multiline_text() -> impl Strategy<Value = String> {
            prop::collection::vec("\\PC{0,80}", 0..60).prop_map(|lines| lines.join("\n"))
        }

        proptest! {
            #[test]
            fn chunks_rejoin_to_the_input(text in multiline_text(), limit in 1usize..200) {
                let chunks = split_message(&text, limit);
                prop_assert_eq!(chunks.join("\n"), text);
            }

            #[test]
            fn multi_line_chunks_stay_within_limit(text in multiline_text(), limit in 1usize..200) {
                for chunk in split_message(&text, limit) {
                    let len = chunk.chars().count();
                    prop_assert!(len <= limit || !chunk.contains('\n'));
                }
            }

            #[test]
            fn default_limit_is_never_exceeded_by_short_lines(text in multiline_text()) {
                for chunk in split_message(&text, 4000) {
                    prop_assert!(chunk.chars().count() <= 4000);
                }
            }
        }
    }
}
