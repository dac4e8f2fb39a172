//! Validation helpers for DTOs.

use validator::ValidationError;

/// Rejects strings that are empty once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects label lists containing a blank label or the same label twice
/// (case-insensitive, ignoring surrounding whitespace).
///
/// # Examples
///
/// ```ignore
/// validate_distinct_labels(&["City".into(), "Animal".into()]) // Ok
/// validate_distinct_labels(&["City".into(), " city".into()])  // Err - duplicate
/// ```
pub fn validate_distinct_labels(labels: &[String]) -> Result<(), ValidationError> {
    for (index, label) in labels.iter().enumerate() {
        let label = label.trim();
        if label.is_empty() {
            let mut err = ValidationError::new("blank_label");
            err.message = Some(format!("Label #{} is blank", index + 1).into());
            return Err(err);
        }
        if labels[..index]
            .iter()
            .any(|other| other.trim().eq_ignore_ascii_case(label))
        {
            let mut err = ValidationError::new("duplicate_label");
            err.message = Some(format!("Label `{label}` is listed twice").into());
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("alice").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank(" \t ").is_err());
    }

    #[test]
    fn test_validate_distinct_labels_valid() {
        assert!(validate_distinct_labels(&labels(&["City", "Animal", "Song"])).is_ok());
        assert!(validate_distinct_labels(&[]).is_ok());
    }

    #[test]
    fn test_validate_distinct_labels_invalid() {
        assert!(validate_distinct_labels(&labels(&["City", " "])).is_err()); // blank
        assert!(validate_distinct_labels(&labels(&["City", "city "])).is_err()); // duplicate
    }
}
