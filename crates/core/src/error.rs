/// A request payload that does not satisfy the entity schema.
///
/// The `Display` output is surfaced verbatim to API clients, so messages
/// name the offending field in the wire (camelCase) spelling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required string field is missing or blank.
    #[error("field '{field}' is required")]
    Required { field: &'static str },

    /// A list field contains an empty or whitespace-only entry.
    #[error("field '{field}' contains a blank entry")]
    BlankEntry { field: &'static str },

    /// A rendered list field contains an entry holding the list separator,
    /// which would split into two entries when read back from history.
    #[error("field '{field}' entry '{value}' must not contain ','")]
    Separator { field: &'static str, value: String },

    /// A set-like list field contains the same value twice.
    #[error("field '{field}' contains duplicate entry '{value}'")]
    Duplicate { field: &'static str, value: String },

    /// A closed-vocabulary field received a value outside its vocabulary.
    #[error("invalid {field} '{value}': expected one of {expected}")]
    UnknownValue {
        field: &'static str,
        value: String,
        expected: String,
    },
}

/// Require a non-blank string value.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Reject blank entries in a list field.
pub(crate) fn require_entries(field: &'static str, values: &[String]) -> Result<(), ValidationError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(ValidationError::BlankEntry { field });
    }
    Ok(())
}

/// Reject blank entries and entries holding `separator`.
pub(crate) fn require_list(
    field: &'static str,
    values: &[String],
    separator: &str,
) -> Result<(), ValidationError> {
    require_entries(field, values)?;
    match values.iter().find(|v| v.contains(separator)) {
        Some(value) => Err(ValidationError::Separator {
            field,
            value: value.clone(),
        }),
        None => Ok(()),
    }
}

/// Reject blank, separator-holding or repeated entries in an ordered-set
/// field.
pub(crate) fn require_unique(
    field: &'static str,
    values: &[String],
    separator: &str,
) -> Result<(), ValidationError> {
    require_list(field, values, separator)?;
    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(ValidationError::Duplicate {
                field,
                value: value.clone(),
            });
        }
    }
    Ok(())
}
