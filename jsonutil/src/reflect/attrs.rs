//! Visibility levels and the field attributes that declare them.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use facet_core::Field;

/// Attribute namespace of `#[facet(jsonutil::...)]`.
pub(crate) const NS: &str = "jsonutil";

/// Declared visibility of a field or getter, which doubles as the privacy
/// level used to filter them. Ordered from most open to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Visibility {
    /// Visible only inside the declaring type
    Private,
    /// Visible inside the declaring module
    Package,
    /// Visible to extending types
    Protected,
    /// Visible everywhere
    #[default]
    Public,
}

impl Visibility {
    /// All levels, most open first.
    pub const ALL: [Visibility; 4] = [
        Visibility::Private,
        Visibility::Package,
        Visibility::Protected,
        Visibility::Public,
    ];

    /// Numeric level, 0 for [`Visibility::Private`] up to 3 for
    /// [`Visibility::Public`].
    pub const fn level(self) -> usize {
        self as usize
    }

    /// The visibility with the given numeric level.
    pub fn from_level(level: usize) -> Option<Self> {
        Self::ALL.get(level).copied()
    }

    /// The visibility declared on `field`. When several visibility
    /// attributes are present the most restrictive one wins.
    pub fn of(field: &Field) -> Self {
        if field.has_attr(Some(NS), "private") {
            Visibility::Private
        } else if field.has_attr(Some(NS), "package") {
            Visibility::Package
        } else if field.has_attr(Some(NS), "protected") {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Private => "private",
            Visibility::Package => "package",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
        })
    }
}

impl FromStr for Visibility {
    type Err = String;

    /// Accepts the level names in any case, or their numeric levels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(level) = s.parse::<usize>() {
            return Visibility::from_level(level).ok_or_else(|| alloc::format!("no level {level}"));
        }
        Visibility::ALL
            .into_iter()
            .find(|v| alloc::format!("{v}").eq_ignore_ascii_case(s))
            .ok_or_else(|| alloc::format!("unknown privacy level {s:?}"))
    }
}

/// Returns true if `field` is left out of default projections.
pub(crate) fn is_transient(field: &Field) -> bool {
    field.has_attr(Some(NS), "transient")
        || field.has_builtin_attr("skip")
        || field.has_builtin_attr("skip_serializing")
}
