//! Locator strategy to CSS/XPath query translation.

use webreplay_locator::{LocatorKind, LocatorSpec};

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// A concrete page query the session can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Css(String),
    Xpath(String),
}

/// Translate one strategy into a runnable query.
pub fn build_query(spec: &LocatorSpec) -> Query {
    let value = spec.value.as_str();
    match spec.kind {
        LocatorKind::Xpath => Query::Xpath(value.to_string()),
        LocatorKind::Css => Query::Css(value.to_string()),
        LocatorKind::Id => Query::Xpath(format!("//*[@id={}]", xpath_literal(value))),
        LocatorKind::Placeholder => {
            Query::Css(format!("[placeholder=\"{}\"]", css_attr_escape(value)))
        }
        LocatorKind::Label => {
            // Inputs reachable through a <label>: either labelled via
            // `for`, or nested inside the label element.
            let text = contains_insensitive("normalize-space(.)", value);
            Query::Xpath(format!(
                "//input[@id = //label[{text}]/@for] \
                 | //textarea[@id = //label[{text}]/@for] \
                 | //label[{text}]//input \
                 | //label[{text}]//textarea"
            ))
        }
        LocatorKind::RoleButton => {
            let text = contains_insensitive("normalize-space(.)", value);
            let val = contains_insensitive("@value", value);
            Query::Xpath(format!(
                "//button[{text}] \
                 | //*[@role=\"button\"][{text}] \
                 | //input[(@type=\"submit\" or @type=\"button\")][{val}]"
            ))
        }
        LocatorKind::RoleLink => {
            let text = contains_insensitive("normalize-space(.)", value);
            Query::Xpath(format!("//a[{text}] | //*[@role=\"link\"][{text}]"))
        }
        LocatorKind::TextExact => Query::Xpath(format!(
            "//*[normalize-space(text()) = {}]",
            xpath_literal(value)
        )),
        LocatorKind::TextContains => Query::Xpath(format!(
            "//*[text()[{}]]",
            contains_insensitive(".", value)
        )),
    }
}

/// Case-insensitive contains() predicate over an XPath expression.
fn contains_insensitive(expr: &str, value: &str) -> String {
    format!(
        "contains(translate({expr}, \"{UPPER}\", \"{LOWER}\"), {})",
        xpath_literal(&value.to_lowercase())
    )
}

/// Quote a string as an XPath literal. Values holding both quote kinds
/// fall back to a concat() expression, since XPath 1.0 has no escapes.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

fn css_attr_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
