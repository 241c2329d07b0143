//! Locator strategy vocabulary.

use std::fmt;

/// The fixed strategy alphabet, in no particular order; ordering is the
/// business of [`crate::candidates::candidate_locators`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorKind {
    Xpath,
    Css,
    Id,
    Placeholder,
    Label,
    RoleButton,
    RoleLink,
    TextExact,
    TextContains,
}

impl LocatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            LocatorKind::Xpath => "xpath",
            LocatorKind::Css => "css",
            LocatorKind::Id => "id",
            LocatorKind::Placeholder => "placeholder",
            LocatorKind::Label => "label",
            LocatorKind::RoleButton => "role_button",
            LocatorKind::RoleLink => "role_link",
            LocatorKind::TextExact => "text_exact",
            LocatorKind::TextContains => "text_contains",
        }
    }
}

/// One candidate: a strategy kind plus its lookup value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorSpec {
    pub kind: LocatorKind,
    pub value: String,
}

impl LocatorSpec {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for LocatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind.name(), self.value)
    }
}

/// What kind of interaction the caller intends, which picks the middle
/// tier of the candidate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleHint {
    /// Typing targets: placeholder and label strategies apply.
    Input,
    /// Click targets: button and link role strategies apply.
    Click,
}

/// Opaque reference to a resolved element, minted by the page adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
