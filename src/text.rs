//! Plain-text rendering of HTML model descriptions

/// Signature of the description cleaner injected into the orchestrator
pub type DescriptionCleaner = fn(&str) -> String;

const BLOCK_TAGS: &[&str] = &["br", "p", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "tr"];

const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    // last, so "&amp;lt;" stays "&lt;"
    ("&amp;", "&"),
];

/// Strip HTML tags, turning block boundaries into line breaks
pub fn clean_description(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.chars();

    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }

        let mut tag = String::new();
        for t in chars.by_ref() {
            if t == '>' {
                break;
            }
            tag.push(t);
        }

        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let closing = tag.starts_with('/');
        if BLOCK_TAGS.contains(&name.as_str()) && (closing || name == "br") {
            out.push('\n');
        }
    }

    let mut decoded = out;
    for (entity, replacement) in ENTITIES {
        decoded = decoded.replace(entity, replacement);
    }

    let lines: Vec<&str> = decoded.lines().map(str::trim_end).collect();
    let mut text = String::new();
    let mut blank_run = 0;
    for line in lines {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        text.push_str(line);
        text.push('\n');
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags() {
        assert_eq!(
            clean_description("<p>Hello <strong>world</strong></p>"),
            "Hello world"
        );
    }

    #[test]
    fn test_block_boundaries_become_newlines() {
        assert_eq!(
            clean_description("<p>one</p><p>two</p>line<br/>break"),
            "one\ntwo\nline\nbreak"
        );
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(clean_description("a &amp; b &lt;3"), "a & b <3");
    }

    #[test]
    fn test_collapses_blank_runs() {
        assert_eq!(clean_description("<p>a</p><p></p><p></p><p>b</p>"), "a\n\nb");
    }

    #[test]
    fn test_empty() {
        assert_eq!(clean_description(""), "");
    }
}
