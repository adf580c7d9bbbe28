/// Appends every non empty suffix to `sql`, each preceded by a space.
pub fn push_suffix(sql: &mut String, suffix: &[&str]) {
    for v in suffix.iter().filter(|v| !v.trim().is_empty()) {
        sql.push(' ');
        sql.push_str(v.trim());
    }
}

/// Splits `value` on the first occurrence of `separator`.
pub(crate) fn split_first<'s>(value: &'s str, separator: char) -> (&'s str, Option<&'s str>) {
    match value.split_once(separator) {
        Some((l, r)) => (l, Some(r)),
        None => (value, None),
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..$query
                .char_indices()
                .nth(497)
                .map(|(i, _)| i)
                .unwrap_or($query.len())]
                .trim_end(),
            if $query.chars().nth(497).is_some() {
                "..."
            } else {
                ""
            },
        )
    };
}

/// Logs the formatted message at the configured level when the configuration
/// is verbose.
#[macro_export]
macro_rules! verbose {
    ($crud:expr, $($arg:tt)+) => {
        if $crud.verbose {
            ::log::log!($crud.log_level, $($arg)+);
        }
    };
}
