use crate::{Value, util::split_first};

/// Which NULL and zero values a filter admits when building statements.
///
/// The default skips both. This is the build time policy: a NULL is never a
/// zero here and a nullable field holding `Some(zero)` counts as a present
/// value. Result routing uses its own rule, see [`RouteSkip`](crate::RouteSkip).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub nil: bool,
    pub zero: bool,
}

impl Policy {
    pub const ALL: Policy = Policy {
        nil: true,
        zero: true,
    };

    pub fn admits(&self, value: &Value, nullable: bool) -> bool {
        if value.is_null() {
            return self.nil;
        }
        if !nullable && value.is_zero() {
            return self.zero;
        }
        true
    }
}

/// One entry of a field list: `name` or `func(name)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector<'f> {
    pub name: &'f str,
    pub func: &'f str,
}

impl<'f> Selector<'f> {
    pub fn parse(entry: &'f str) -> Self {
        let entry = entry.trim().trim_end_matches(')');
        match entry.split_once('(') {
            Some((func, name)) => Selector {
                name: name.trim(),
                func: func.trim(),
            },
            None => Selector {
                name: entry,
                func: "",
            },
        }
    }
}

/// Parsed form of a single filter: `[alias.][^]field,func(field)#options`.
///
/// - An empty field list (or a lone `*`) selects every field.
/// - `^` turns the list into an exclusion list.
/// - Options are `all`, `nil`, `zero`, and `+sep` which carries the separator
///   used by [`Crud::join_wheref`](crate::Crud::join_wheref).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Filter<'f> {
    pub alias: &'f str,
    pub exclude: bool,
    pub selectors: Vec<Selector<'f>>,
    pub policy: Policy,
    pub separator: Option<&'f str>,
}

impl<'f> Filter<'f> {
    pub fn parse(filter: &'f str) -> Self {
        let filter = filter.trim();
        let filter = filter.strip_prefix('*').unwrap_or(filter).trim_start();
        let (fields, options) = split_first(filter, '#');
        let (alias, fields) = split_alias(fields.trim());
        let (exclude, fields) = match fields.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, fields),
        };
        let selectors = fields
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(Selector::parse)
            .collect();
        let (policy, separator) = parse_options(options.unwrap_or_default());
        Filter {
            alias,
            exclude,
            selectors,
            policy,
            separator,
        }
    }

    /// Split a `|` chain into its filters.
    pub fn parse_chain(chain: &'f str) -> Vec<Filter<'f>> {
        chain.split('|').map(Filter::parse).collect()
    }

    /// Position of the selector naming `column`.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.selectors.iter().position(|v| v.name == column)
    }

    /// Whether `column` takes part, and with which function.
    pub fn select(&self, column: &str) -> Option<&'f str> {
        if self.selectors.is_empty() {
            return Some("");
        }
        match (self.position(column), self.exclude) {
            (Some(i), false) => Some(self.selectors[i].func),
            (None, true) => Some(""),
            _ => None,
        }
    }

    /// The column prefixed by the alias, if any.
    pub fn qualify(&self, column: &str) -> String {
        if self.alias.is_empty() {
            column.to_owned()
        } else {
            format!("{}.{}", self.alias, column)
        }
    }

    pub fn is_count(filter: &str) -> bool {
        matches!(filter.trim(), "" | "*" | "count(*)" | "count(*)#all")
    }
}

/// Parse the options part of a filter or of a format list.
pub fn parse_options(options: &str) -> (Policy, Option<&str>) {
    let mut policy = Policy::default();
    let mut separator = None;
    for option in options.split(',').map(str::trim) {
        match option {
            "all" => policy = Policy::ALL,
            "nil" => policy.nil = true,
            "zero" => policy.zero = true,
            v if v.starts_with('+') && separator.is_none() => separator = Some(&v[1..]),
            _ => {}
        }
    }
    (policy, separator)
}

/// `alias.rest` when the text before the first dot is a plain identifier.
fn split_alias(fields: &str) -> (&str, &str) {
    if let Some((alias, rest)) = fields.split_once('.') {
        if !alias.is_empty() && alias.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return (alias, rest);
        }
    }
    ("", fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_list() {
        let filter = Filter::parse("id, name ,count(age)");
        assert_eq!(filter.alias, "");
        assert!(!filter.exclude);
        assert_eq!(filter.policy, Policy::default());
        assert_eq!(
            filter.selectors,
            vec![
                Selector { name: "id", func: "" },
                Selector { name: "name", func: "" },
                Selector {
                    name: "age",
                    func: "count"
                },
            ]
        );
    }

    #[test]
    fn parse_alias_and_options() {
        let filter = Filter::parse("u.id,name#nil,zero");
        assert_eq!(filter.alias, "u");
        assert_eq!(filter.policy, Policy::ALL);
        assert_eq!(filter.qualify("id"), "u.id");

        let filter = Filter::parse("count(u.id)#all");
        assert_eq!(filter.alias, "");
        assert_eq!(filter.selectors[0].name, "u.id");
    }

    #[test]
    fn parse_star_exclusion_and_separator() {
        assert_eq!(Filter::parse("*"), Filter::default());
        let filter = Filter::parse("*#all");
        assert!(filter.selectors.is_empty());
        assert_eq!(filter.policy, Policy::ALL);

        let filter = Filter::parse("^tid#all");
        assert!(filter.exclude);
        assert_eq!(filter.select("tid"), None);
        assert_eq!(filter.select("name"), Some(""));

        let filter = Filter::parse("#+or,zero");
        assert_eq!(filter.separator, Some("or"));
        assert_eq!(
            filter.policy,
            Policy {
                nil: false,
                zero: true
            }
        );
    }

    #[test]
    fn chain_and_count() {
        let chain = Filter::parse_chain("a,b|a,c");
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].selectors[1].name, "c");
        assert!(Filter::is_count(""));
        assert!(Filter::is_count("count(*)#all"));
        assert!(!Filter::is_count("count(id)"));
    }

    #[test]
    fn policy_admits() {
        let policy = Policy::default();
        assert!(!policy.admits(&Value::Int64(None), true));
        assert!(!policy.admits(&Value::Int64(Some(0)), false));
        assert!(policy.admits(&Value::Int64(Some(0)), true));
        assert!(policy.admits(&Value::Varchar(Some("x".into())), false));
        assert!(Policy::ALL.admits(&Value::Null, false));
    }
}
