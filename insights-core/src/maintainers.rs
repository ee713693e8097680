//! Maintainer sets used to classify issue responses

use std::collections::HashSet;

/// Case-insensitive set of maintainer logins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintainerSet {
    logins: HashSet<String>,
}

impl MaintainerSet {
    /// Build a set from any list of logins; blanks are ignored
    pub fn new<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let logins = logins
            .into_iter()
            .map(|l| l.as_ref().trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Self { logins }
    }

    /// Parse a comma-separated list such as `"alice, Bob,carol"`
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn contains(&self, login: &str) -> bool {
        self.logins.contains(&login.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }

    /// Sorted logins, for display
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut logins: Vec<String> = self.logins.iter().cloned().collect();
        logins.sort();
        logins
    }
}
