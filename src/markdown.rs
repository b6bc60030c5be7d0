use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)").unwrap());
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Role words that mark the line under a name as a job title.
const TITLE_KEYWORDS: &[&str] = &[
    "Founder", "Co-", "CEO", "CTO", "COO", "CFO", "CMO", "CPO", "Chief", "President", "Chair",
    "Partner", "Director", "Head of", "VP", "Vice President", "Officer", "Manager", "Lead",
    "Principal", "Engineer", "Developer",
];

const NOISE_PREFIXES: &[&str] = &["our ", "meet the", "join "];
const NOISE_PHRASES: &[&str] = &["read more", "learn more", "contact us", "view all", "see all"];

/// One element of a scraped page.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Link { text: String, url: String },
    MetaField { key: String, value: String },
    /// A short name line followed by a job-title line.
    Person { name: String, title: String },
    Text(String),
}

/// Drop image embeds and squeeze the blank lines they leave behind.
pub fn strip_images(md: &str) -> String {
    let without = IMAGE_RE.replace_all(md, "");
    BLANK_RUN_RE.replace_all(&without, "\n\n").into_owned()
}

/// Walks the trimmed lines of a page.
struct Cursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(markdown: &'a str) -> Self {
        Cursor { lines: markdown.lines().map(str::trim).collect(), pos: 0 }
    }

    /// Next non-blank line.
    fn next_line(&mut self) -> Option<&'a str> {
        while let Some(&line) = self.lines.get(self.pos) {
            self.pos += 1;
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }

    /// Index of the first line from `from` that is neither blank nor a bare `[](url)` icon link.
    fn skip_decorations(&self, from: usize) -> usize {
        let mut at = from;
        while self.lines.get(at).is_some_and(|l| l.is_empty() || l.starts_with("[](")) {
            at += 1;
        }
        at
    }

    /// Body of a link whose text spans lines: `[`, text lines, `](url)`.
    fn wrapped_link(&mut self) -> Vec<Block> {
        let mut words = Vec::new();
        while let Some(line) = self.next_line() {
            if let Some(rest) = line.strip_prefix("](") {
                let url = rest.split(')').next().unwrap_or(rest);
                return vec![Block::Link { text: words.join(" "), url: url.to_string() }];
            }
            words.push(line);
        }
        // unterminated: keep what was read as prose
        words.into_iter().map(|w| Block::Text(w.to_string())).collect()
    }
}

pub fn classify_lines(markdown: &str) -> Vec<Block> {
    let mut cursor = Cursor::new(markdown);
    let mut blocks = Vec::new();
    let mut people: HashSet<&str> = HashSet::new();

    while let Some(line) = cursor.next_line() {
        if line == "[" {
            blocks.extend(cursor.wrapped_link());
        } else if let Some((level, text)) = heading(line) {
            blocks.push(Block::Heading { level, text: strip_link_syntax(text) });
        } else if let Some(links) = link_line(line) {
            blocks.extend(links);
        } else if let Some((key, value)) = meta_field(line) {
            blocks.push(Block::MetaField { key: key.to_string(), value: value.to_string() });
        } else if could_be_name(line) {
            let at = cursor.skip_decorations(cursor.pos);
            let title = cursor.lines.get(at).copied().map(|l| l.trim_matches('*').trim());
            match title.filter(|t| is_title(t)) {
                Some(title) => {
                    cursor.pos = at + 1;
                    let name = line.trim_matches('*').trim();
                    if people.insert(name) {
                        blocks.push(Block::Person {
                            name: name.to_string(),
                            title: title.to_string(),
                        });
                    }
                }
                None => blocks.push(Block::Text(line.to_string())),
            }
        } else {
            blocks.push(Block::Text(line.to_string()));
        }
    }

    blocks
}

/// `## Text` → `(2, "Text")`.
fn heading(line: &str) -> Option<(u8, &str)> {
    let text = line.trim_start_matches('#');
    let level = line.len() - text.len();
    if !(1..=6).contains(&level) || !text.starts_with(char::is_whitespace) {
        return None;
    }
    let text = text.trim();
    (!text.is_empty()).then_some((level as u8, text))
}

/// A line made only of links (one or several).
fn link_line(line: &str) -> Option<Vec<Block>> {
    if !line.starts_with('[') {
        return None;
    }
    let rest = LINK_RE.replace_all(line, "");
    if !rest.chars().all(|c| c.is_whitespace() || matches!(c, '|' | '·' | ',')) {
        return None;
    }
    let links: Vec<Block> = LINK_RE
        .captures_iter(line)
        .map(|c| Block::Link { text: c[1].trim().to_string(), url: c[2].to_string() })
        .collect();
    (!links.is_empty()).then_some(links)
}

/// `Employees: 100-500` style label lines. Labels are short and capitalised.
fn meta_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    let well_formed = (2..=23).contains(&key.len())
        && key.starts_with(|c: char| c.is_ascii_uppercase())
        && key.chars().all(|c| c.is_ascii_alphabetic() || c == ' ');
    well_formed.then(|| (key, value.trim()))
}

fn could_be_name(line: &str) -> bool {
    line.len() < 60
        && !line.contains("](")
        && !line.contains(':')
        && !is_noise(line)
        && looks_like_name(line.trim_matches('*').trim())
}

fn is_title(line: &str) -> bool {
    !line.is_empty() && line.len() < 80 && TITLE_KEYWORDS.iter().any(|kw| line.contains(kw))
}

/// Two to four capitalised words, none of them a role keyword.
fn looks_like_name(s: &str) -> bool {
    let words: Vec<&str> = s.split_whitespace().collect();
    (2..=4).contains(&words.len())
        && !is_title(s)
        && words.iter().all(|w| {
            let mut chars = w.chars();
            chars.next().is_some_and(char::is_uppercase)
                && chars.all(|c| c.is_alphabetic() || matches!(c, '.' | '-' | '\''))
        })
}

fn is_noise(line: &str) -> bool {
    let lower = line.to_lowercase();
    NOISE_PREFIXES.iter().any(|p| lower.starts_with(p))
        || NOISE_PHRASES.iter().any(|p| lower.contains(p))
        || matches!(lower.as_str(), "team" | "leadership" | "management")
}

fn strip_link_syntax(s: &str) -> String {
    LINK_RE.replace_all(s, "$1").trim().to_string()
}
