//! Indentation for compact XML
//!
//! Works on the token stream of a document produced by this crate: no
//! comments, no CDATA, no `>` inside attribute values.

const INDENT: &str = "  ";

/// Re-indents a compact XML document with two spaces per level
///
/// An element holding only text stays on one line. Removing the leading
/// whitespace of every line and joining them yields the input again.
pub fn prettify(xml: &str) -> String {
    let tokens = tokenize(xml);
    let mut lines: Vec<String> = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];

        if token.starts_with("<?") || token.ends_with("/>") {
            lines.push(indented(depth, token));
        } else if token.starts_with("</") {
            depth = depth.saturating_sub(1);
            lines.push(indented(depth, token));
        } else if token.starts_with('<') {
            match leaf(&tokens, i) {
                Some(line) => {
                    lines.push(indented(depth, &line));
                    i += 3;
                    continue;
                }
                None => {
                    lines.push(indented(depth, token));
                    depth += 1;
                }
            }
        } else {
            lines.push(indented(depth, token));
        }

        i += 1;
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// `<tag>text</tag>` starting at `i`, joined into one line
fn leaf(tokens: &[&str], i: usize) -> Option<String> {
    let open = tokens.get(i)?;
    let text = tokens.get(i + 1)?;
    let close = tokens.get(i + 2)?;

    if text.starts_with('<') || !close.starts_with("</") {
        return None;
    }
    Some(format!("{}{}{}", open, text, close))
}

fn indented(depth: usize, token: &str) -> String {
    format!("{}{}", INDENT.repeat(depth), token)
}

/// Splits a document into tags and text runs
fn tokenize(xml: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = xml;

    while !rest.is_empty() {
        let end = if rest.starts_with('<') {
            rest.find('>').map(|pos| pos + 1).unwrap_or(rest.len())
        } else {
            rest.find('<').unwrap_or(rest.len())
        };

        let (token, tail) = rest.split_at(end);
        if !token.trim().is_empty() {
            tokens.push(token);
        }
        rest = tail;
    }

    tokens
}
