pub mod student;
pub mod user;

/// Loose email shape check: one `@` with text on both sides and a dotted domain
pub(crate) fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::looks_like_email;

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("ada@example.com"));
        assert!(looks_like_email("a.b@dept.school.edu"));
        assert!(!looks_like_email("ada"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("ada@@example.com"));
        assert!(!looks_like_email("ada@example..com"));
    }
}
