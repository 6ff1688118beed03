/// Longest physical table name accepted, in bytes.
const MAX_TABLE_NAME_LEN: usize = 128;

/// Checks that `name` can be used as a physical table name.
///
/// Returns the reason the name is rejected.
pub fn verify_table_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("table name is empty");
    }

    if name.trim().is_empty() {
        return Err("table name is blank");
    }

    if name.trim() != name {
        return Err("table name has leading or trailing whitespace");
    }

    if name.len() > MAX_TABLE_NAME_LEN {
        return Err("table name is longer than 128 bytes");
    }

    if name
        .chars()
        .any(|c| c.is_control() || matches!(c, '"' | '\'' | '`'))
    {
        return Err("table name contains a quote or control character");
    }

    Ok(())
}
