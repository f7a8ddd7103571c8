use std::collections::HashSet;

/// Allow-list of senders.
///
/// Entries are numeric user ids or usernames (a leading `@` is ignored). An
/// empty list admits everybody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    ids: HashSet<i64>,
    usernames: HashSet<String>,
}

impl UserFilter {
    /// Admits everybody.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list such as `"12345, alice, @bob"`.
    pub fn parse(list: &str) -> Self {
        Self::from_entries(list.split(','))
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            match entry.parse::<i64>() {
                Ok(id) if entry.chars().all(|c| c.is_ascii_digit()) => {
                    filter.ids.insert(id);
                }
                _ => {
                    let name = entry.trim_start_matches('@').to_lowercase();
                    filter.usernames.insert(name);
                }
            }
        }
        filter
    }

    pub fn is_open(&self) -> bool {
        self.ids.is_empty() && self.usernames.is_empty()
    }

    pub fn is_allowed(&self, user_id: Option<i64>, username: Option<&str>) -> bool {
        if self.is_open() {
            return true;
        }
        if user_id.is_some_and(|id| self.ids.contains(&id)) {
            return true;
        }
        username.is_some_and(|name| {
            self.usernames
                .contains(&name.trim_start_matches('@').to_lowercase())
        })
    }

    /// Human-readable list for startup logs.
    pub fn describe(&self) -> Vec<String> {
        let mut ids: Vec<i64> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        let mut names: Vec<&String> = self.usernames.iter().collect();
        names.sort();
        ids.into_iter()
            .map(|id| id.to_string())
            .chain(names.into_iter().map(|n| format!("@{n}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_admits_everybody() {
        let filter = UserFilter::parse("");
        assert!(filter.is_open());
        assert!(filter.is_allowed(Some(1), None));
        assert!(filter.is_allowed(None, None));
        assert!(UserFilter::parse(" , ,").is_open());
    }

    #[test]
    fn ids_and_usernames_are_separated() {
        let filter = UserFilter::parse("12345, alice ,@Bob");
        assert!(filter.is_allowed(Some(12345), None));
        assert!(filter.is_allowed(Some(9), Some("alice")));
        assert!(filter.is_allowed(None, Some("bob")));
        assert!(!filter.is_allowed(Some(9), Some("mallory")));
        assert!(!filter.is_allowed(None, None));
    }

    #[test]
    fn negative_numbers_are_usernames_not_ids() {
        let filter = UserFilter::parse("-100");
        assert!(!filter.is_allowed(Some(-100), None));
    }

    #[test]
    fn describe_lists_sorted_entries() {
        let filter = UserFilter::parse("zed, 20, 3");
        assert_eq!(filter.describe(), vec!["3", "20", "@zed"]);
    }
}
