//! Change set helpers
//!
//! Each task builds its own sparse change set: one `Option` per field, `Some`
//! only where actual and desired differ. These helpers keep that uniform.

/// A sparse set of field changes between actual and desired state.
pub trait ChangeSet {
    /// Names of the fields that differ.
    fn changed_fields(&self) -> Vec<&'static str>;

    /// Check if nothing differs.
    fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }
}

/// Desired value of a field if it differs from the actual one.
pub fn field<T: PartialEq + Clone>(actual: &T, desired: &T) -> Option<T> {
    if actual == desired {
        None
    } else {
        Some(desired.clone())
    }
}

/// Like [`field`] for optional fields; an unset desired value never counts as a change.
pub fn optional_field<T: PartialEq + Clone>(actual: Option<&T>, desired: Option<&T>) -> Option<T> {
    match desired {
        Some(d) if actual != Some(d) => Some(d.clone()),
        _ => None,
    }
}

/// Collect the names of the `Some` entries of a change set.
pub fn present(fields: &[(&'static str, bool)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field() {
        assert_eq!(field(&"a", &"a"), None);
        assert_eq!(field(&"a", &"b"), Some("b"));
    }

    #[test]
    fn test_optional_field() {
        assert_eq!(optional_field(Some(&1), Some(&1)), None);
        assert_eq!(optional_field(Some(&1), Some(&2)), Some(2));
        assert_eq!(optional_field(None, Some(&2)), Some(2));
        assert_eq!(optional_field::<i32>(Some(&1), None), None);
    }

    #[test]
    fn test_present() {
        assert_eq!(
            present(&[("Name", false), ("PolicyDocument", true)]),
            vec!["PolicyDocument"]
        );
    }
}
