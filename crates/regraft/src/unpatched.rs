use crate::member::{Member, MemberKind};
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

///
/// Category
///
/// Storage categories of the unpatched ledger, one per member kind.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Category {
    Attributes,
    Properties,
    HybridProperties,
    Methods,
    ClassMethods,
    StaticMethods,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Attributes,
        Self::Properties,
        Self::HybridProperties,
        Self::Methods,
        Self::ClassMethods,
        Self::StaticMethods,
    ];

    /// Category a freshly classified member is stored under.
    #[must_use]
    pub const fn of(kind: MemberKind) -> Self {
        match kind {
            MemberKind::Attribute => Self::Attributes,
            MemberKind::Property => Self::Properties,
            MemberKind::HybridProperty => Self::HybridProperties,
            MemberKind::Method => Self::Methods,
            MemberKind::ClassMethod => Self::ClassMethods,
            MemberKind::StaticMethod => Self::StaticMethods,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attributes => "attributes",
            Self::Properties => "properties",
            Self::HybridProperties => "hybrid_properties",
            Self::Methods => "methods",
            Self::ClassMethods => "classmethods",
            Self::StaticMethods => "staticmethods",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

///
/// UnpatchedStore
///
/// Per-target append-only ledger: category -> member name -> ordered
/// history (oldest first) of previously-active implementations. A member
/// patched twice has a history of length 2 (original, then the first
/// patch's version), even though only the latest is current on the class.
///

#[derive(Clone, Debug, Default)]
pub struct UnpatchedStore {
    entries: BTreeMap<Category, BTreeMap<String, Vec<Member>>>,
}

impl UnpatchedStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Append a previously-active member to the history for `name`,
    /// returning the index it was recorded at.
    pub fn record(&mut self, category: Category, name: impl Into<String>, member: Member) -> usize {
        let history = self
            .entries
            .entry(category)
            .or_default()
            .entry(name.into())
            .or_default();
        history.push(member);

        history.len() - 1
    }

    /// Full history for `name` in `category`, oldest first.
    #[must_use]
    pub fn history(&self, category: Category, name: &str) -> &[Member] {
        self.entries
            .get(&category)
            .and_then(|names| names.get(name))
            .map_or(&[], Vec::as_slice)
    }

    /// History entry at `index`, if recorded.
    #[must_use]
    pub fn entry(&self, category: Category, name: &str, index: usize) -> Option<&Member> {
        self.history(category, name).get(index)
    }

    /// Most recent history entry: the layer immediately below the
    /// currently topmost patch.
    #[must_use]
    pub fn latest(&self, category: Category, name: &str) -> Option<&Member> {
        self.history(category, name).last()
    }

    /// Number of recorded layers for `name` in `category`.
    #[must_use]
    pub fn depth(&self, category: Category, name: &str) -> usize {
        self.history(category, name).len()
    }

    /// Returns `true` if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// Drop every recorded history. Used when a subclass of a patched
    /// class is defined and must start with a clean ledger.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// History depths per category and name, for introspection reports.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<&'static str, BTreeMap<String, usize>> {
        self.entries
            .iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(category, names)| {
                let depths = names
                    .iter()
                    .map(|(name, history)| (name.clone(), history.len()))
                    .collect();
                (category.as_str(), depths)
            })
            .collect()
    }
}

///
/// TESTS
///
