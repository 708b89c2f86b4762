const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Renders `s` as a quoted string literal.
///
/// Control bytes, bytes outside 7-bit ASCII and the quote itself are written
/// as `'#$HH'` segments: the literal is closed, the byte follows as a `#$HH`
/// character literal, and a new literal is opened.
pub fn quote(s: &str) -> String {
    let mut q = String::with_capacity(s.len() + 2);
    q.push('\'');
    for &b in s.as_bytes() {
        if b < 0x20 || b > 0x7f || b == b'\'' {
            q.push_str("'#$");
            q.push(char::from(HEX[usize::from(b >> 4)]));
            q.push(char::from(HEX[usize::from(b & 0x0f)]));
            q.push('\'');
        } else {
            q.push(char::from(b));
        }
    }
    q.push('\'');
    q
}
