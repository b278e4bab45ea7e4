use rand::Rng;

/// Elements whose content is dropped along with the tags.
const RAW_TEXT_ELEMENTS: [&str; 6] = ["script", "style", "textarea", "noscript", "iframe", "xmp"];

/// Reduces a submitted display name to plain text.
///
/// Tags, comments and declarations are removed, the content of script-like elements is removed
/// with them, and what is left is entity-decoded then escaped once, so it can be rendered as-is.
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(after) = skip_markup(rest) {
                rest = after;
                continue;
            }
        }
        if ch == '&' {
            if let Some((decoded, len)) = decode_entity(rest) {
                push_escaped(&mut out, decoded);
                rest = &rest[len..];
                continue;
            }
        }
        push_escaped(&mut out, ch);
        rest = &rest[ch.len_utf8()..];
    }
    out.trim().to_owned()
}

/// `User_<n>` with `n` in `0..1000`.
pub fn fallback_name() -> String {
    format!("User_{}", rand::thread_rng().gen_range(0..1000u16))
}

/// Sanitized name, or a fallback when nothing survives sanitization.
pub fn display_name_candidate(raw: &str) -> String {
    let sanitized = sanitize_name(raw);
    if sanitized.is_empty() {
        fallback_name()
    } else {
        sanitized
    }
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        c if c.is_control() => {}
        c => out.push(c),
    }
}

/// `input` starts with `<`. Returns the text after the markup, or `None` when the `<` does not
/// open any markup and should be kept as text.
fn skip_markup(input: &str) -> Option<&str> {
    if let Some(body) = input.strip_prefix("<!--") {
        return Some(body.find("-->").map_or("", |end| &body[end + 3..]));
    }
    if input.starts_with("<!") || input.starts_with("<?") {
        return after_tag_end(input);
    }
    if let Some(body) = input.strip_prefix("</") {
        return if starts_with_alpha(body) {
            after_tag_end(input)
        } else {
            None
        };
    }

    let body = &input[1..];
    if !starts_with_alpha(body) {
        return None;
    }
    let name_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or_else(|| body.len());
    let name = body[..name_len].to_ascii_lowercase();
    let tag_end = match find_tag_end(body) {
        TagEnd::At(end) => end,
        TagEnd::OpenQuote => return Some(""),
        TagEnd::Missing => return None,
    };
    let after = &body[tag_end + 1..];

    let self_closing = body[..tag_end].ends_with('/');
    if self_closing || !RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
        return Some(after);
    }

    // ascii lowercasing keeps byte offsets, so positions found here index `after` too
    let lowered = after.to_ascii_lowercase();
    let closing = format!("</{}", name);
    match lowered.find(&closing) {
        Some(start) => after_tag_end(&after[start..]).or(Some("")),
        None => Some(""),
    }
}

fn after_tag_end(input: &str) -> Option<&str> {
    match find_tag_end(input) {
        TagEnd::At(end) => Some(&input[end + 1..]),
        TagEnd::OpenQuote => Some(""),
        TagEnd::Missing => None,
    }
}

enum TagEnd {
    At(usize),
    /// An attribute value was still quoted when the input ran out.
    OpenQuote,
    Missing,
}

/// Position of the `>` closing a tag. A `>` inside a quoted attribute value does not count.
fn find_tag_end(input: &str) -> TagEnd {
    let mut quote = None;
    let mut after_equals = false;
    for (index, c) in input.char_indices() {
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '>' => return TagEnd::At(index),
            '"' | '\'' if after_equals => quote = Some(c),
            _ => {}
        }
        after_equals = c == '=' || (after_equals && c.is_whitespace());
    }
    if quote.is_some() {
        TagEnd::OpenQuote
    } else {
        TagEnd::Missing
    }
}

/// `input` starts with `&`. Returns the referenced character and the byte length of the
/// reference, or `None` when it is not a reference this sanitizer knows.
fn decode_entity(input: &str) -> Option<(char, usize)> {
    let (end, _) = input
        .char_indices()
        .take(12)
        .find(|(_, c)| *c == ';')?;
    let reference = &input[1..end];
    let decoded = match reference {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let number = reference.strip_prefix('#')?;
            let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            std::char::from_u32(code)?
        }
    };
    Some((decoded, end + 1))
}

fn starts_with_alpha(input: &str) -> bool {
    input
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic())
}
