use super::ParsedProblem;

const CIRCLED_MARKERS: [char; 5] = ['①', '②', '③', '④', '⑤'];

/// Returns true when the whole token is a choice marker: one circled digit
/// glyph or one ASCII digit. `"12"` and `"1."` are not markers.
pub fn is_choice_marker(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => ch.is_ascii_digit() || CIRCLED_MARKERS.contains(&ch),
        _ => false,
    }
}

/// Splits OCR tokens (in emission order) into a stem and its answer choices.
///
/// Everything before the first marker is the stem. Each marker starts a
/// choice that runs up to the next marker or the end of input, and keeps the
/// marker text as its prefix. Without any marker the whole input is the stem.
pub fn segment<S: AsRef<str>>(tokens: &[S]) -> ParsedProblem {
    let markers = tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| is_choice_marker(token.as_ref()))
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();

    let Some(&first) = markers.first() else {
        return ParsedProblem {
            stem: join_trimmed(tokens),
            choices: Vec::new(),
        };
    };

    let choices = markers
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = markers.get(i + 1).copied().unwrap_or(tokens.len());
            join_trimmed(&tokens[start..end])
        })
        .collect();

    ParsedProblem {
        stem: join_trimmed(&tokens[..first]),
        choices,
    }
}

fn join_trimmed<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push_str(token.as_ref());
    }
    out.trim().to_string()
}
