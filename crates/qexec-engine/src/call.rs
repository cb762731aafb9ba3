//! Stored-procedure call text

/// Build the escape-syntax call for `name` with one `?` per parameter.
///
/// Placeholders look the same for every mode; the mode only changes how each
/// parameter binds itself afterwards.
pub fn build_call_text(name: &str, parameter_count: usize) -> String {
    let placeholders = vec!["?"; parameter_count].join(",");
    format!("{{call {}({})}}", name, placeholders)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_call_text() {
        assert_eq!(build_call_text("now_utc", 0), "{call now_utc()}");
        assert_eq!(build_call_text("echo", 1), "{call echo(?)}");
        assert_eq!(build_call_text("add_tax", 3), "{call add_tax(?,?,?)}");
    }
}
