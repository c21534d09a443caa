//! Message flags
//!
//! [`Flag`] is a single IMAP system flag or keyword, [`Flags`] the
//! set carried by every stored message. Flags are the only part of a
//! message that may change after it has been added to a folder.

use std::collections::BTreeSet;
use std::fmt;

/// A message flag.
///
/// System flags (prefixed with `\` in the IMAP protocol) have
/// dedicated variants. User-defined keyword flags use [`Flag::Keyword`].
///
/// # Examples
///
/// ```
/// use mockmail::Flag;
///
/// assert_eq!(Flag::Deleted.as_imap_str(), "\\Deleted");
/// assert_eq!(Flag::from("\\seen"), Flag::Seen);
/// assert_eq!(Flag::from("$Junk"), Flag::Keyword("$Junk".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    /// Message has been read (`\Seen`).
    Seen,
    /// Message has been answered (`\Answered`).
    Answered,
    /// Message is flagged for attention (`\Flagged`).
    Flagged,
    /// Message is marked for deletion (`\Deleted`).
    Deleted,
    /// Message is a draft (`\Draft`).
    Draft,
    /// Message arrived since the folder was last looked at (`\Recent`).
    Recent,
    /// A user-defined keyword flag (no `\` prefix).
    Keyword(String),
}

impl Flag {
    /// The IMAP wire representation of this flag.
    #[must_use]
    pub fn as_imap_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Keyword(kw) => kw,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}

impl From<&str> for Flag {
    fn from(s: &str) -> Self {
        let system = s.strip_prefix('\\').unwrap_or(s);
        if system.eq_ignore_ascii_case("seen") {
            Self::Seen
        } else if system.eq_ignore_ascii_case("answered") {
            Self::Answered
        } else if system.eq_ignore_ascii_case("flagged") {
            Self::Flagged
        } else if system.eq_ignore_ascii_case("deleted") {
            Self::Deleted
        } else if system.eq_ignore_ascii_case("draft") {
            Self::Draft
        } else if system.eq_ignore_ascii_case("recent") {
            Self::Recent
        } else {
            Self::Keyword(s.to_string())
        }
    }
}

impl From<String> for Flag {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// An ordered set of [`Flag`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags(BTreeSet<Flag>);

impl Flags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, flag: Flag) -> bool {
        self.0.insert(flag)
    }

    pub fn remove(&mut self, flag: &Flag) -> bool {
        self.0.remove(flag)
    }

    #[must_use]
    pub fn contains(&self, flag: &Flag) -> bool {
        self.0.contains(flag)
    }

    /// True when every flag of `other` is present. An empty `other`
    /// is always contained.
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        other.0.is_subset(&self.0)
    }

    /// True when at least one flag of `other` is present.
    #[must_use]
    pub fn contains_any(&self, other: &Self) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    /// Set (`set == true`) or clear every flag of `other`.
    pub fn apply(&mut self, other: &Self, set: bool) {
        for flag in &other.0 {
            if set {
                self.0.insert(flag.clone());
            } else {
                self.0.remove(flag);
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.0.iter()
    }
}

impl From<Flag> for Flags {
    fn from(flag: Flag) -> Self {
        Self(BTreeSet::from([flag]))
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Flag::as_imap_str).collect();
        write!(f, "({})", names.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_flags() {
        assert_eq!(Flag::Seen.as_imap_str(), "\\Seen");
        assert_eq!(Flag::Answered.as_imap_str(), "\\Answered");
        assert_eq!(Flag::Flagged.as_imap_str(), "\\Flagged");
        assert_eq!(Flag::Deleted.as_imap_str(), "\\Deleted");
        assert_eq!(Flag::Draft.as_imap_str(), "\\Draft");
        assert_eq!(Flag::Recent.as_imap_str(), "\\Recent");
    }

    #[test]
    fn parse_is_case_insensitive_for_system_flags() {
        assert_eq!(Flag::from("\\DELETED"), Flag::Deleted);
        assert_eq!(Flag::from("seen"), Flag::Seen);
        assert_eq!(
            Flag::from("$Important"),
            Flag::Keyword("$Important".to_string())
        );
    }

    #[test]
    fn contains_all_and_any() {
        let flags: Flags = [Flag::Seen, Flag::Deleted].into_iter().collect();
        assert!(flags.contains_all(&Flags::from(Flag::Seen)));
        assert!(!flags.contains_all(&[Flag::Seen, Flag::Draft].into_iter().collect()));
        assert!(flags.contains_any(&[Flag::Seen, Flag::Draft].into_iter().collect()));
        assert!(!flags.contains_any(&Flags::from(Flag::Draft)));
        assert!(flags.contains_all(&Flags::new()));
    }

    #[test]
    fn apply_sets_and_clears() {
        let mut flags = Flags::from(Flag::Recent);
        flags.apply(&[Flag::Seen, Flag::Flagged].into_iter().collect(), true);
        assert_eq!(flags.len(), 3);
        flags.apply(&Flags::from(Flag::Recent), false);
        assert!(!flags.contains(&Flag::Recent));
    }

    #[test]
    fn display_lists_flags() {
        let flags: Flags = [Flag::Deleted, Flag::Seen].into_iter().collect();
        assert_eq!(flags.to_string(), "(\\Seen \\Deleted)");
        assert_eq!(format!("{}", Flag::Keyword("$Junk".to_string())), "$Junk");
    }
}
