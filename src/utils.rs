/// Returns the index encoded by a child name in canonical decimal form (`"0"`, `"12"`).
///
/// The name must print back to itself, so signs, spaces, leading zeros and empty names
/// are not indices.
pub fn parse_index_name(name: &str) -> Option<usize> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: usize = name.parse().ok()?;
    (index.to_string() == name).then_some(index)
}
