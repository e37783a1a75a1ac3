// Utility functions for parsing

/// Split the header section into logical lines, unfolding continuation
/// lines (a line starting with SP or HTAB belongs to the previous header).
pub fn unfold_lines(head: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in head.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(previous) = lines.last_mut() {
                previous.push(' ');
                previous.push_str(line.trim_start());
                continue;
            }
        }
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    lines
}

/// Split a comma separated header value, ignoring commas inside quoted
/// strings and angle brackets.
pub fn split_list(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut angle_depth = 0usize;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => angle_depth += 1,
            '>' if !in_quotes => angle_depth = angle_depth.saturating_sub(1),
            ',' if !in_quotes && angle_depth == 0 => {
                parts.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(value[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Split a message into its header section and body at the first empty line
pub fn split_head_body(raw: &str) -> (&str, &str) {
    if let Some(index) = raw.find("\r\n\r\n") {
        return (&raw[..index], &raw[index + 4..]);
    }
    if let Some(index) = raw.find("\n\n") {
        return (&raw[..index], &raw[index + 2..]);
    }
    (raw, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfold_continuation_lines() {
        let lines = unfold_lines("Subject: I know you're there,\r\n  pick up the phone\r\nTo: <sip:b@c>");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Subject: I know you're there, pick up the phone");
    }

    #[test]
    fn test_split_list_respects_quotes_and_angles() {
        let parts = split_list("\"Smith, John\" <sip:j@a;x=1,2>, <sip:p2;lr>");
        assert_eq!(parts, vec!["\"Smith, John\" <sip:j@a;x=1,2>", "<sip:p2;lr>"]);
    }

    #[test]
    fn test_split_head_body() {
        assert_eq!(split_head_body("A: b\r\n\r\nbody"), ("A: b", "body"));
        assert_eq!(split_head_body("A: b\n\nbody"), ("A: b", "body"));
        assert_eq!(split_head_body("A: b"), ("A: b", ""));
    }
}
