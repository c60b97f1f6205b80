use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::knowledge::Section;

/// Headings indented this far are layout artefacts (centred sub-headings,
/// table cells), never top-level sections.
const MAX_HEADING_INDENT: usize = 25;

/// A heading may skip at most one number, e.g. when the PDF extractor
/// lost a line.
const MAX_HEADING_STEP: u32 = 2;

/// How far from a bare `๕.` line its title may appear.
const TITLE_LOOKAHEAD: usize = 2;

/// Longest line accepted as the title of a bare `๕.` heading.
const MAX_TITLE_CHARS: usize = 60;

static INLINE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9๐-๙]+)\.\s+(\S.*)$").expect("valid regex"));

static BARE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9๐-๙]+)\.$").expect("valid regex"));

/// Parsed document content
pub struct ParsedDocument {
    pub content: String,
    pub file_type: String,
}

/// Parse a document file into plain text
pub fn parse_file(path: &Path) -> Result<ParsedDocument, ParseError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "txt" => {
            let content = fs::read_to_string(path)?;
            Ok(ParsedDocument {
                content,
                file_type: "txt".into(),
            })
        }
        "md" | "markdown" => {
            let content = fs::read_to_string(path)?;
            Ok(ParsedDocument {
                content,
                file_type: "md".into(),
            })
        }
        "pdf" => {
            let bytes = fs::read(path)?;
            let content = pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ParseError::Pdf(e.to_string()))?;
            Ok(ParsedDocument {
                content,
                file_type: "pdf".into(),
            })
        }
        _ => Err(ParseError::UnsupportedType(ext)),
    }
}

/// Rewrite Thai digits (๐-๙) as ASCII digits.
pub fn thai_to_arabic_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '๐'..='๙' => char::from(b'0' + (c as u32 - '๐' as u32) as u8),
            _ => c,
        })
        .collect()
}

fn heading_number(digits: &str) -> Option<u32> {
    thai_to_arabic_digits(digits).parse().ok()
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn follows(n: u32, last: u32) -> bool {
    n > last && n <= last + MAX_HEADING_STEP
}

fn is_title_like(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && line.chars().count() <= MAX_TITLE_CHARS
        && !line.chars().any(|c| c.is_ascii_digit() || ('๐'..='๙').contains(&c))
        && !line.ends_with([':', '.'])
}

struct Heading {
    index: u32,
    title: String,
    line: usize,
    body_start: usize,
}

/// Numbered lines seen inside the current section that are not headings.
struct OpenList {
    number: u32,
    indent: usize,
}

struct BareTitle {
    title_line: usize,
    start: usize,
    body_start: usize,
}

/// Title of the bare heading at `at`. The next non-blank line wins when it
/// reads like a title, then the line above (not before `floor`), then the
/// next line anyway.
fn bare_title(lines: &[&str], at: usize, floor: usize) -> Option<BareTitle> {
    let non_blank = |j: &usize| !lines[*j].trim().is_empty();
    let below = (at + 1..lines.len().min(at + 1 + TITLE_LOOKAHEAD)).find(non_blank);
    let above = (floor.max(at.saturating_sub(TITLE_LOOKAHEAD))..at)
        .rev()
        .find(non_blank);

    match (below, above) {
        (Some(j), _) if is_title_like(lines[j]) => Some(BareTitle {
            title_line: j,
            start: at,
            body_start: j + 1,
        }),
        (_, Some(j)) if is_title_like(lines[j]) => Some(BareTitle {
            title_line: j,
            start: j,
            body_start: at + 1,
        }),
        (Some(j), _) => Some(BareTitle {
            title_line: j,
            start: at,
            body_start: j + 1,
        }),
        (None, _) => None,
    }
}

fn find_headings(lines: &[&str]) -> Vec<Heading> {
    let mut headings: Vec<Heading> = Vec::new();
    let mut last = 0u32;
    let mut list: Option<OpenList> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();
        let indent = indent_of(line);

        if indent >= MAX_HEADING_INDENT || trimmed.is_empty() {
            i += 1;
            continue;
        }

        let (number, inline_title) = if let Some(caps) = INLINE_HEADING.captures(trimmed) {
            (heading_number(&caps[1]), Some(caps[2].trim().to_string()))
        } else if let Some(caps) = BARE_HEADING.captures(trimmed) {
            (heading_number(&caps[1]), None)
        } else {
            i += 1;
            continue;
        };
        let Some(n) = number else {
            i += 1;
            continue;
        };

        // `2.` right after a `1.` list item continues the list unless it is
        // outdented from it.
        let continues_list = list
            .as_ref()
            .is_some_and(|l| l.number.checked_add(1) == Some(n) && indent >= l.indent);
        if !follows(n, last) || continues_list {
            list = Some(OpenList { number: n, indent });
            i += 1;
            continue;
        }

        match inline_title {
            Some(title) => {
                headings.push(Heading {
                    index: n,
                    title,
                    line: i,
                    body_start: i + 1,
                });
                i += 1;
            }
            None => {
                let floor = headings.last().map_or(0, |h| h.body_start);
                let Some(found) = bare_title(lines, i, floor) else {
                    i += 1;
                    continue;
                };
                headings.push(Heading {
                    index: n,
                    title: lines[found.title_line].trim().to_string(),
                    line: found.start,
                    body_start: found.body_start,
                });
                i = found.body_start.max(i + 1);
            }
        }
        last = n;
        list = None;
    }

    headings
}

/// Split extracted text into numbered sections.
///
/// Top-level headings look like `5. หลักประกันการเสนอราคา` or a bare `๕.`
/// with its title on the line below or above. Numbers must increase, and a
/// numbered list inside a section does not start new sections. Text before
/// the first heading belongs to no section; it stays in the document's raw
/// text only. Text with no recognisable heading becomes a single untitled
/// section 1. Returns an empty list for blank text.
pub fn split_sections(text: &str) -> Vec<Section> {
    if text.trim().is_empty() {
        return vec![];
    }

    let lines: Vec<&str> = text.lines().collect();
    let headings = find_headings(&lines);

    if headings.is_empty() {
        return vec![Section::new(1, "", text.trim())];
    }

    headings
        .iter()
        .enumerate()
        .map(|(k, heading)| {
            let end = headings.get(k + 1).map_or(lines.len(), |next| next.line);
            let start = heading.body_start.min(end);
            let body = lines[start..end].join("\n");
            Section::new(heading.index, heading.title.clone(), body.trim())
        })
        .collect()
}
