//! Parameter list macro.
//!
//! Builds a `Vec<QueryParam>` from heterogeneous values so call sites read
//! like the statement they bind to.

/// Build a positional parameter list.
///
/// # Example
///
/// ```
/// use adoption_db::params;
/// use adoption_db::models::QueryParam;
///
/// let p = params![1, "Rex", None::<String>];
/// assert_eq!(p[1], QueryParam::String("Rex".to_string()));
/// assert!(p[2].is_null());
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::models::QueryParam>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::models::QueryParam::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use crate::models::QueryParam;

    #[test]
    fn test_params_empty() {
        let p = params![];
        assert!(p.is_empty());
    }

    #[test]
    fn test_params_mixed_types() {
        let p = params![1, 2.5, true, "cat", String::from("x")];
        assert_eq!(
            p,
            vec![
                QueryParam::Int(1),
                QueryParam::Float(2.5),
                QueryParam::Bool(true),
                QueryParam::String("cat".to_string()),
                QueryParam::String("x".to_string()),
            ]
        );
    }
}
