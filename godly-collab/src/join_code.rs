//! Human-shareable join codes: the first 4 bytes of the 16-byte session
//! token, hex-encoded, followed by `:` and the decimal ephemeral port.

/// Formats a join code from a session token and the server's bound port.
/// Only the first 4 bytes of the token are encoded — enough to make
/// accidental collisions unlikely for a same-LAN join code, not a security
/// boundary.
#[must_use]
pub fn format_join_code(token: &[u8; 16], port: u16) -> String {
    let mut code = String::with_capacity(8 + 1 + 5);
    for byte in &token[..4] {
        code.push_str(&format!("{byte:02x}"));
    }
    code.push(':');
    code.push_str(&port.to_string());
    code
}

/// Parses a join code back into its 4-byte token prefix and port. `None` for
/// anything malformed: missing `:`, non-hex prefix, non-numeric or
/// out-of-range port.
#[must_use]
pub fn parse_join_code(code: &str) -> Option<([u8; 4], u16)> {
    let (hex_part, port_part) = code.split_once(':')?;
    if hex_part.len() != 8 {
        return None;
    }
    let mut token_prefix = [0u8; 4];
    for (i, chunk) in hex_part.as_bytes().chunks(2).enumerate() {
        let byte_str = std::str::from_utf8(chunk).ok()?;
        token_prefix[i] = u8::from_str_radix(byte_str, 16).ok()?;
    }
    let port: u16 = port_part.parse().ok()?;
    Some((token_prefix, port))
}
