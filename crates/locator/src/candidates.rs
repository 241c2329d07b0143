//! Candidate strategy construction.
//!
//! Ordering contract:
//! 1. recorded xpath, recorded css selector, id parsed from an `id("...")`
//!    xpath fragment;
//! 2. role-specific strategies — placeholder and label for input targets,
//!    button and link roles for click targets;
//! 3. exact text, then case-insensitive contains-text, always last.
//!
//! Empty recorded fields simply contribute no candidate.

use webreplay_core_types::Target;

use crate::types::{LocatorKind, LocatorSpec, RoleHint};

/// Build the ordered candidate list for a step target.
pub fn candidate_locators(target: &Target, hint: RoleHint) -> Vec<LocatorSpec> {
    let mut out = Vec::new();

    let xpath = target.xpath.trim();
    if !xpath.is_empty() {
        out.push(LocatorSpec::new(LocatorKind::Xpath, xpath));
    }
    let css = target.css_selector.trim();
    if !css.is_empty() {
        out.push(LocatorSpec::new(LocatorKind::Css, css));
    }
    if let Some(id) = extract_id_from_xpath(xpath) {
        out.push(LocatorSpec::new(LocatorKind::Id, id));
    }

    let text = target.primary_text();
    match hint {
        RoleHint::Input => {
            let placeholder = target.placeholder.trim();
            if !placeholder.is_empty() {
                out.push(LocatorSpec::new(LocatorKind::Placeholder, placeholder));
            }
            if let Some(text) = text {
                out.push(LocatorSpec::new(LocatorKind::Label, text));
            }
        }
        RoleHint::Click => {
            if let Some(text) = text {
                out.push(LocatorSpec::new(LocatorKind::RoleButton, text));
                out.push(LocatorSpec::new(LocatorKind::RoleLink, text));
            }
        }
    }

    if let Some(text) = text {
        out.push(LocatorSpec::new(LocatorKind::TextExact, text));
        out.push(LocatorSpec::new(LocatorKind::TextContains, text));
    }

    out
}

/// Pull the element id out of a recorder xpath of the form `id("...")`.
/// Any other xpath shape yields nothing.
pub fn extract_id_from_xpath(xpath: &str) -> Option<String> {
    let rest = xpath.trim().strip_prefix("id(\"")?;
    let end = rest.find('"')?;
    let id = &rest[..end];
    (!id.is_empty()).then(|| id.to_string())
}
