//! Crate-wide result alias

use super::errors::QuireError;

/// Result of any fallible Quire operation
pub type Result<T> = std::result::Result<T, QuireError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn halve(n: u64) -> Result<u64> {
        if n % 2 == 1 {
            return Err(QuireError::Validation(format!("{n} is odd")));
        }
        Ok(n / 2)
    }

    #[test]
    fn test_question_mark_propagates() -> Result<()> {
        assert_eq!(halve(halve(8)?)?, 2);
        assert!(matches!(halve(3), Err(QuireError::Validation(_))));
        Ok(())
    }
}
