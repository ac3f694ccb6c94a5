use regex::{Regex, RegexBuilder};

/// A compiled wildcard pattern. `*` matches any sequence; everything else
/// is literal. Matching is anchored at both ends and case-insensitive, so
/// `lev*` matches `level` but not `elevated`.
pub struct Glob {
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> Self {
        let literal: Vec<String> = pattern.split('*').map(|part| regex::escape(part)).collect();
        let source = format!("^{}$", literal.join(".*"));
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .expect("escaped glob source is always a valid regex");
        Glob { regex }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[test]
fn test_anchored_both_ends() {
    let glob = Glob::new("lev*");
    assert!(glob.matches("level"));
    assert!(glob.matches("lev"));
    assert!(!glob.matches("elevated"));
}

#[test]
fn test_case_insensitive_and_literal_metachars() {
    let glob = Glob::new("eng.start*");
    assert!(glob.matches("ENG.START.ok"));
    assert!(!glob.matches("engXstart"));
}
