//! Source-level edits that keep a manifest's formatting intact
//!
//! Works on the raw lines of a block-style YAML document: locates the
//! top-level `images` key, the entries of its sequence and the keys of one
//! entry, and produces byte-range replacements. Anything it does not
//! recognise makes it return `None`; the caller re-checks every edit against
//! the semantic result anyway.

use std::ops::Range;

/// Shape of the `images` value in the parsed document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagesShape {
    /// No top-level `images` key
    Missing,
    /// `images` holds something other than a sequence (including null)
    NotSequence,
    /// `images` is a sequence with `len` entries
    Sequence {
        /// Number of entries
        len: usize,
    },
}

/// Which entry of the sequence gets edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Append a new entry after the last one
    Append,
    /// Set fields on the entry at `index`
    Update {
        /// Position of the entry in the sequence
        index: usize,
    },
}

/// A textual edit request derived from the semantic patch
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Shape of `images` before the patch
    pub shape: ImagesShape,
    /// Entry to touch
    pub target: Target,
    /// Keys and already rendered scalar values, in output order
    pub fields: Vec<(&'static str, String)>,
}

struct Line<'a> {
    /// Line content without its terminator
    text: &'a str,
    /// Byte offset of the line in the source
    start: usize,
    /// Byte offset just past the line terminator
    end: usize,
    has_newline: bool,
}

impl Line<'_> {
    fn indent(&self) -> usize {
        self.text.len() - self.text.trim_start_matches(' ').len()
    }

    fn body(&self) -> &str {
        &self.text[self.indent()..]
    }

    fn is_content(&self) -> bool {
        let body = self.body().trim_end();
        !body.is_empty() && !body.starts_with('#') && !is_document_marker(self.text)
    }

    fn is_seq_item(&self) -> bool {
        let body = self.body();
        body.trim_end() == "-" || body.starts_with("- ") || body.starts_with("-\t")
    }
}

struct KeyLine {
    key: String,
    line: usize,
    /// Absolute offset just past the key's colon
    after: usize,
    /// Value continues on more-indented lines
    multiline: bool,
}

type Edit = (Range<usize>, String);

/// Apply `request` to `src`, or `None` if the layout is not recognised
pub fn edit(src: &str, request: &EditRequest) -> Option<String> {
    let nl = newline(src);
    let lines = split_lines(src);
    let (root_indent, key_idx) = find_images_key(&lines);

    let edits = match (request.shape, key_idx) {
        (ImagesShape::Missing, None) => {
            let prefix = if src.is_empty() || src.ends_with('\n') {
                ""
            } else {
                nl
            };
            let pad = " ".repeat(root_indent);
            let block = format!(
                "{prefix}{pad}images:{nl}{}",
                render_entry(root_indent, root_indent + 2, &request.fields, nl)
            );
            vec![(src.len()..src.len(), block)]
        }
        (ImagesShape::Missing, Some(_)) | (_, None) => return None,
        (shape, Some(k)) => edit_images_value(&lines, k, root_indent, shape, request, nl)?,
    };

    Some(apply(src, edits))
}

/// Replace the whole `images` value with `block`, leaving every other line
/// untouched
///
/// `block` is a block sequence rendered at column zero with `\n` line ends.
/// Comments inside the old value are lost; a comment on the `images:` line
/// itself is kept.
pub fn replace_images(src: &str, block: &str) -> Option<String> {
    let nl = newline(src);
    let lines = split_lines(src);
    let (root_indent, key_idx) = find_images_key(&lines);
    let k = key_idx?;
    let value = ImagesValue::locate(&lines, k, root_indent)?;

    let key_line = &lines[k];
    let pad = " ".repeat(root_indent);
    let mut replacement = format!(
        "{}{}{nl}",
        &key_line.text[..value.head_len],
        value.comment_suffix()
    );
    for line in block.lines() {
        replacement.push_str(&format!("{pad}{line}{nl}"));
    }
    let end = value.region.last().map_or(key_line.end, |&j| lines[j].end);
    Some(apply(src, vec![(key_line.start..end, replacement)]))
}

fn newline(src: &str) -> &'static str {
    if src.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Root indentation and the line of the top-level `images` key, if any
fn find_images_key(lines: &[Line<'_>]) -> (usize, Option<usize>) {
    let content: Vec<usize> = (0..lines.len()).filter(|&i| lines[i].is_content()).collect();
    let root_indent = content.first().map_or(0, |&i| lines[i].indent());

    let key_idx = content.into_iter().find(|&i| {
        let line = &lines[i];
        line.indent() == root_indent
            && !line.is_seq_item()
            && parse_key(line.body()).is_some_and(|(key, _)| key == "images")
    });
    (root_indent, key_idx)
}

/// Where the value of the `images` key sits in the source
struct ImagesValue<'a> {
    /// Length of `images:` including indentation
    head_len: usize,
    /// Scalar or flow text on the key line
    inline: &'a str,
    /// Trailing comment on the key line
    comment: &'a str,
    /// Content lines belonging to the value
    region: Vec<usize>,
}

impl<'a> ImagesValue<'a> {
    fn locate(lines: &[Line<'a>], k: usize, root_indent: usize) -> Option<Self> {
        let key_line = &lines[k];
        let text: &'a str = key_line.text;
        let (_, after_rel) = parse_key(key_line.body())?;
        let head_len = key_line.indent() + after_rel;
        let rest = &text[head_len..];
        let span = value_span(rest)?;

        let region_end = (k + 1..lines.len())
            .find(|&j| {
                let line = &lines[j];
                is_document_marker(line.text)
                    || (line.is_content()
                        && (line.indent() < root_indent
                            || (line.indent() == root_indent && !line.is_seq_item())))
            })
            .unwrap_or(lines.len());
        let region = (k + 1..region_end)
            .filter(|&j| lines[j].is_content())
            .collect();

        Some(Self {
            head_len,
            inline: &rest[span.clone()],
            comment: rest[span.end..].trim(),
            region,
        })
    }

    fn comment_suffix(&self) -> String {
        if self.comment.is_empty() {
            String::new()
        } else {
            format!(" {}", self.comment)
        }
    }
}

fn edit_images_value(
    lines: &[Line<'_>],
    k: usize,
    root_indent: usize,
    shape: ImagesShape,
    request: &EditRequest,
    nl: &str,
) -> Option<Vec<Edit>> {
    let key_line = &lines[k];
    let value = ImagesValue::locate(lines, k, root_indent)?;
    let inline_value = value.inline;
    let region = &value.region;

    let block_seq = inline_value.is_empty()
        && region.first().is_some_and(|&j| lines[j].is_seq_item());
    let replaceable = match shape {
        ImagesShape::NotSequence => !block_seq && (inline_value.is_empty() || region.is_empty()),
        ImagesShape::Sequence { len: 0 } => inline_value == "[]" && region.is_empty(),
        ImagesShape::Sequence { .. } => false,
        ImagesShape::Missing => return None,
    };

    if replaceable {
        let end = region.last().map_or(key_line.end, |&j| lines[j].end);
        let replacement = format!(
            "{}{}{nl}{}",
            &key_line.text[..value.head_len],
            value.comment_suffix(),
            render_entry(root_indent, root_indent + 2, &request.fields, nl)
        );
        return Some(vec![(key_line.start..end, replacement)]);
    }

    let ImagesShape::Sequence { len } = shape else {
        return None;
    };
    if !block_seq {
        return None;
    }
    edit_block_sequence(lines, region, len, request, nl)
}

fn edit_block_sequence(
    lines: &[Line<'_>],
    region: &[usize],
    len: usize,
    request: &EditRequest,
    nl: &str,
) -> Option<Vec<Edit>> {
    let dash = lines[*region.first()?].indent();

    let mut items: Vec<Vec<usize>> = Vec::new();
    for &i in region {
        let line = &lines[i];
        if line.indent() < dash {
            return None;
        }
        if line.indent() == dash {
            if !line.is_seq_item() {
                return None;
            }
            items.push(vec![i]);
        } else {
            items.last_mut()?.push(i);
        }
    }
    if items.len() != len {
        return None;
    }

    match request.target {
        Target::Append => {
            let key_col = item_key_column(lines, &items[0], dash)
                .filter(|&c| c > dash)
                .unwrap_or(dash + 2);
            let last = &lines[*region.last()?];
            let entry = render_entry(dash, key_col, &request.fields, nl);
            Some(vec![insert_after(last, entry, nl)])
        }
        Target::Update { index } => {
            let item = items.get(index)?;
            let key_col = item_key_column(lines, item, dash)?;
            let keys = item_keys(lines, item, dash, key_col)?;

            let mut edits = Vec::new();
            let mut inserted = String::new();
            for (field, rendered) in &request.fields {
                let Some(key) = keys.iter().find(|k| k.key == *field) else {
                    inserted.push_str(&format!("{}{field}: {rendered}{nl}", " ".repeat(key_col)));
                    continue;
                };
                if key.multiline {
                    return None;
                }
                let line = &lines[key.line];
                let after_text = &line.text[key.after - line.start..];
                let span = value_span(after_text)?;
                if span.is_empty() {
                    edits.push((key.after..key.after, format!(" {rendered}")));
                } else {
                    let current = &after_text[span.clone()];
                    if current.starts_with('|') || current.starts_with('>') {
                        return None;
                    }
                    edits.push((
                        key.after + span.start..key.after + span.end,
                        rendered.clone(),
                    ));
                }
            }
            if !inserted.is_empty() {
                let last = &lines[*item.last()?];
                edits.push(insert_after(last, inserted, nl));
            }
            Some(edits)
        }
    }
}

/// Column where the keys of a sequence item's mapping start
fn item_key_column(lines: &[Line<'_>], item: &[usize], dash: usize) -> Option<usize> {
    inline_column(&lines[item[0]], dash).or_else(|| item.get(1).map(|&i| lines[i].indent()))
}

/// Column of the content following `- ` on an item's first line, if any
fn inline_column(line: &Line<'_>, dash: usize) -> Option<usize> {
    let after_dash = &line.text[dash + 1..];
    let spaces = after_dash.len() - after_dash.trim_start_matches(' ').len();
    let rest = after_dash[spaces..].trim_end();
    if rest.is_empty() || rest.starts_with('#') {
        None
    } else {
        Some(dash + 1 + spaces)
    }
}

fn item_keys(
    lines: &[Line<'_>],
    item: &[usize],
    dash: usize,
    key_col: usize,
) -> Option<Vec<KeyLine>> {
    let mut keys: Vec<KeyLine> = Vec::new();
    for (n, &i) in item.iter().enumerate() {
        let line = &lines[i];
        if n == 0 {
            match inline_column(line, dash) {
                None => continue,
                Some(col) if col != key_col => return None,
                Some(_) => {}
            }
        } else {
            if line.indent() > key_col {
                if let Some(last) = keys.last_mut() {
                    last.multiline = true;
                }
                continue;
            }
            if line.indent() < key_col {
                return None;
            }
        }
        let body = &line.text[key_col..];
        let (key, after_rel) = parse_key(body)?;
        keys.push(KeyLine {
            key,
            line: i,
            after: line.start + key_col + after_rel,
            multiline: false,
        });
    }
    Some(keys)
}

fn render_entry(dash: usize, key_col: usize, fields: &[(&'static str, String)], nl: &str) -> String {
    let key_col = if key_col > dash { key_col } else { dash + 2 };
    let mut out = String::new();
    for (n, (field, value)) in fields.iter().enumerate() {
        if n == 0 {
            out.push_str(&format!(
                "{}-{}{field}: {value}{nl}",
                " ".repeat(dash),
                " ".repeat(key_col - dash - 1)
            ));
        } else {
            out.push_str(&format!("{}{field}: {value}{nl}", " ".repeat(key_col)));
        }
    }
    out
}

fn insert_after(line: &Line<'_>, text: String, nl: &str) -> Edit {
    if line.has_newline {
        (line.end..line.end, text)
    } else {
        (line.end..line.end, format!("{nl}{text}"))
    }
}

fn apply(src: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = src.to_string();
    for (range, text) in edits {
        out.replace_range(range, &text);
    }
    out
}

fn split_lines(src: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    while start < src.len() {
        let (end, has_newline) = match src[start..].find('\n') {
            Some(i) => (start + i + 1, true),
            None => (src.len(), false),
        };
        let raw = &src[start..end];
        let raw = raw.strip_suffix('\n').unwrap_or(raw);
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        lines.push(Line {
            text,
            start,
            end,
            has_newline,
        });
        start = end;
    }
    lines
}

fn is_document_marker(text: &str) -> bool {
    (text.starts_with("---") || text.starts_with("..."))
        && text[3..].chars().next().is_none_or(char::is_whitespace)
}

/// Parse `key:` at the start of `s`
///
/// Returns the unquoted key and the offset just past the colon. The colon
/// must be followed by whitespace or the end of the line.
fn parse_key(s: &str) -> Option<(String, usize)> {
    let (key, key_end) = match s.chars().next()? {
        '"' => {
            let len = closing_double(s)?;
            (s[1..len - 1].to_string(), len)
        }
        '\'' => {
            let len = closing_single(s)?;
            (s[1..len - 1].replace("''", "'"), len)
        }
        '#' | '-' | '[' | '{' | '&' | '*' | '!' | '|' | '>' | '?' | '%' | '@' | '`' => {
            return None;
        }
        _ => {
            let colon = find_plain_colon(s)?;
            (s[..colon].trim_end().to_string(), colon)
        }
    };
    let rest = &s[key_end..];
    let gap = rest.len() - rest.trim_start_matches(' ').len();
    if !rest[gap..].starts_with(':') {
        return None;
    }
    let after = key_end + gap + 1;
    match s[after..].chars().next() {
        None | Some(' ' | '\t') => Some((key, after)),
        Some(_) => None,
    }
}

fn find_plain_colon(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'#' if i > 0 && bytes[i - 1] == b' ' => return None,
            b':' if bytes.get(i + 1).is_none_or(|&n| n == b' ' || n == b'\t') => {
                return Some(i);
            }
            _ => {}
        }
    }
    None
}

/// Byte range of the scalar in `s`, without surrounding blanks or comment
fn value_span(s: &str) -> Option<Range<usize>> {
    let lead = s.len() - s.trim_start().len();
    let rest = &s[lead..];
    let len = match rest.chars().next() {
        None | Some('#') => 0,
        Some('"') => closing_double(rest)?,
        Some('\'') => closing_single(rest)?,
        Some(_) => plain_len(rest),
    };
    Some(lead..lead + len)
}

fn plain_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let end = (1..bytes.len())
        .find(|&i| bytes[i] == b'#' && (bytes[i - 1] == b' ' || bytes[i - 1] == b'\t'))
        .unwrap_or(bytes.len());
    rest[..end].trim_end().len()
}

/// Length of a double-quoted scalar including both quotes
fn closing_double(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Length of a single-quoted scalar including both quotes
fn closing_single(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}
