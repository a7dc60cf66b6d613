use std::{
    any::Any,
    borrow::Borrow,
    cmp::Ordering,
    fmt::Display,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::error::{AnalyticsError, Result};

/// Characters an identifier may never contain.
pub const BLACKLISTED_CHARACTERS: &[char] = &[
    '"', '!', '°', '^', '+', '-', '*', ':', ';', ',', '?', '=', '(', ')', '{', '}', '[', ']', '$',
    '%', '&', '/', '@', '<', '>', '|', '\'',
];

/// Check an identifier against the naming rules.
///
/// An identifier is non-empty, has no whitespace, does not start with a digit
/// and contains none of the [`BLACKLISTED_CHARACTERS`].
///
/// ```
/// # use codealytics::check_identifier;
/// assert!(check_identifier("_1Test").is_ok());
/// assert!(check_identifier("1Test").is_err());
/// ```
pub fn check_identifier(id: &str) -> Result<()> {
    let reason = if id.is_empty() {
        "identifier must not be empty"
    } else if id.chars().any(char::is_whitespace) {
        "identifier must not contain whitespace"
    } else if id.starts_with(|c: char| c.is_ascii_digit()) {
        "identifier must not start with a digit"
    } else if id.contains(BLACKLISTED_CHARACTERS) {
        "identifier contains a reserved character"
    } else {
        return Ok(());
    };
    Err(AnalyticsError::InvalidArgument {
        id: id.to_owned(),
        reason,
    })
}

/// The name a metric is registered under.
///
/// Identifiers compare, hash and order by their text no matter which variant
/// holds it, so the registry enumerates them lexicographically.
#[derive(Debug, Clone)]
pub enum Identifier {
    /// A static string identifier, borrowed for the life of the program.
    Str(&'static str),
    /// An owned identifier, typically generated at runtime.
    String(String),
    /// A shared identifier for names you hand around a lot.
    Shared(Arc<str>),
}

impl Identifier {
    /// an &str view of the identifier
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Str(s) => s,
            Identifier::String(s) => s,
            Identifier::Shared(s) => s,
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Identifier {}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        match id {
            Identifier::Str(s) => s.to_owned(),
            Identifier::String(s) => s,
            Identifier::Shared(s) => s.to_string(),
        }
    }
}

impl From<&'static str> for Identifier {
    #[inline]
    fn from(s: &'static str) -> Self {
        Self::Str(s)
    }
}

impl From<String> for Identifier {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Arc<str>> for Identifier {
    #[inline]
    fn from(s: Arc<str>) -> Self {
        Self::Shared(s)
    }
}

/// Anything that can be stored in the registry and shown on the dashboard.
///
/// This is implemented for every `Display + Send + Sync + 'static` type; you
/// never implement it by hand.
pub trait MetricValue: Any + Display + Send + Sync {}

impl<T> MetricValue for T where T: Any + Display + Send + Sync {}

/// Downcast a resolved metric value to a concrete type.
pub(crate) fn downcast_value<T: Any>(value: &dyn MetricValue) -> Option<&T> {
    let any: &dyn Any = value;
    any.downcast_ref::<T>()
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use crate::AnalyticsError;

    use super::{check_identifier, downcast_value, Identifier, MetricValue};

    #[test]
    fn identifier_rules() {
        for (id, valid) in [
            ("1Test", false),
            ("_1Test", true),
            ("-Alph", false),
            ("'Äglk", false),
            ("sdfs sfdsd", false),
            ("tab\there", false),
            ("(test)", false),
            (":test", false),
            ("", false),
            ("temp°", false),
            ("Äglk", true),
            ("cpu_load2", true),
            ("varString", true),
        ] {
            assert_eq!(valid, check_identifier(id).is_ok(), "identifier {id:?}");
        }
    }

    #[test]
    fn invalid_identifier_is_invalid_argument() {
        match check_identifier("9lives") {
            Err(AnalyticsError::InvalidArgument { id, reason }) => {
                assert_eq!("9lives", id);
                assert_eq!("identifier must not start with a digit", reason);
            }
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }

    #[test]
    fn identifiers_order_by_text_across_variants() {
        let ids = BTreeSet::from([
            Identifier::from(String::from("b")),
            Identifier::from("c"),
            Identifier::Shared("a".into()),
        ]);
        assert_eq!(
            vec!["a", "b", "c"],
            ids.iter().map(Identifier::as_str).collect::<Vec<_>>()
        );
        assert_eq!(Identifier::from("a"), Identifier::from(String::from("a")));
    }

    #[test]
    fn downcast_resolves_concrete_type() {
        let value: Box<dyn MetricValue> = Box::new(42_i32);
        assert_eq!(Some(&42), downcast_value::<i32>(&*value));
        assert_eq!(None, downcast_value::<i64>(&*value));
    }
}
