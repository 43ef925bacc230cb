//! Text helpers for the HTML transformer: whitespace normalization,
//! entity escaping, and the dotted-numeral heading split.

/// Normalize a text run for rich-text emission.
///
/// Leading whitespace is dropped, inner whitespace runs (spaces, tabs,
/// newlines) collapse to single spaces, and trailing whitespace collapses
/// to one trailing space. `"  hello   world  \n"` becomes `"hello world "`.
pub fn simplify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    // Drop leading whitespace entirely.
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Trim both ends and collapse inner whitespace; used when flattening
/// block text where trailing spaces carry no meaning.
pub fn collapse(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Escape text content for regenerated HTML.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '>' => out.push_str("&gt;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Find where a leading dotted numeral ("1", "2.3", "10.1 ") ends in a
/// heading title. Returns the byte index to split at, the numeral keeping
/// its trailing space. `None` when the title carries no such prefix.
///
/// Shape accepted: digit-run, optionally repeated `.` digit-run groups,
/// terminated by whitespace or a non-numeral character; a dot followed by
/// anything but a digit or whitespace aborts the split.
pub fn find_number(title: &str) -> Option<usize> {
    let mut chars = title.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_digit() => {}
        _ => return None,
    }

    enum State {
        Digit,
        Dot,
    }
    let mut state = State::Digit;
    for (i, c) in chars {
        match state {
            State::Digit => {
                if c.is_ascii_digit() {
                    // keep going
                } else if c == '.' {
                    state = State::Dot;
                } else if c.is_whitespace() {
                    return Some(i + c.len_utf8());
                } else {
                    return Some(i);
                }
            }
            State::Dot => {
                if c.is_ascii_digit() {
                    state = State::Digit;
                } else if c.is_whitespace() {
                    return Some(i + c.len_utf8());
                } else {
                    // A dot followed by anything else is not a numeral.
                    return None;
                }
            }
        }
    }
    None
}
