//! Repair of a net-log whose writer was killed before the closing tokens were flushed.

/// Cut the document after the last complete event and close the `events`
/// array and the root object.
///
/// Returns `None` when the document never reached the `events` array.
pub(super) fn close_truncated(doc: &str) -> Option<String> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut cut = None;

    for (i, b) in doc.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                stack.push(b);
                // Opening of the events array: an empty prefix is still repairable.
                if stack == [b'{', b'['] && cut.is_none() {
                    cut = Some(i + 1);
                }
            }
            b'}' | b']' => {
                stack.pop();
                // An element of the top-level array just closed.
                if b == b'}' && stack == [b'{', b'['] {
                    cut = Some(i + 1);
                }
            }
            _ => {}
        }
    }

    cut.map(|end| format!("{}]}}", &doc[..end]))
}
