//! Postback form state of ASP.NET WebForms pages.
//!
//! Sagres pages carry their state in hidden inputs (`__VIEWSTATE`,
//! `__EVENTVALIDATION`, ...) that must be echoed back on the next POST. A
//! [`FormSnapshot`] harvests those inputs from a page and is then mutated
//! into the body of the follow-up postback.

use scraper::Html;

use crate::parsers::selector;
use crate::transport::Page;

/// Names of form fields posted to the portal.
pub mod fields {
    pub const EVENT_TARGET: &str = "__EVENTTARGET";
    pub const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";
    pub const VIEW_STATE: &str = "__VIEWSTATE";
    pub const VIEW_STATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
    pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";
    pub const ASYNC_POST: &str = "__ASYNCPOST";
    pub const CLIENT_STATE: &str = "__aspnetForm_ClientStateInput";
    pub const SCRIPT_MANAGER: &str = "ctl00$smpManager";

    pub const LOGIN_USERNAME: &str = "ctl00$PageContent$LoginPanel$UserName";
    pub const LOGIN_PASSWORD: &str = "ctl00$PageContent$LoginPanel$Password";
    pub const LOGIN_BUTTON: &str = "ctl00$PageContent$LoginPanel$LoginButton";
    pub const LOGIN_CAPTCHA: &str = "g-recaptcha-response";
    pub const APPROVAL_BUTTON: &str = "ctl00$btnLogin";

    pub const SEMESTER_SELECT: &str = "ctl00$MasterPlaceHolder$ddPeriodosLetivos$ddPeriodosLetivos";
    pub const COURSE_VARIANT_SELECT: &str = "ctl00$MasterPlaceHolder$ddRegistroCurso";
    pub const GRADES_SUBMIT: &str = "ctl00$MasterPlaceHolder$imRecuperar";

    pub const ROWS_PER_PAGE: &str = "ctl00$MasterPlaceHolder$RowsPerPage1$ddMostrar";
    pub const MATERIALS_VIEW: &str = "ctl00$MasterPlaceHolder$pvMaterialApoio";
    pub const MATERIALS_PANEL: &str = "ctl00$MasterPlaceHolder$UpdatePanel1";

    pub const ALL_CLASSES_ROWS: &str = "ctl00$MasterPlaceHolder$ctl00$ddMostrar";
    pub const ALL_CLASSES_SUBMIT: &str = "ctl00$MasterPlaceHolder$FiltroClasses$imRecuperar";
    pub const ALL_CLASSES_PERIOD: &str = "ctl00$MasterPlaceHolder$FiltroClasses$ddPeriodosLetivos";
    pub const ALL_CLASSES_NAME: &str = "ctl00$MasterPlaceHolder$FiltroClasses$txbFiltroNome";

    pub const DEMAND_SAVE: &str = "ctl00$MasterPlaceHolder$btnSalvar";
}

/// Ordered set of form fields. Setting an existing name overwrites its value
/// in place; harvesting never removes a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    fields: Vec<(String, String)>,
}

impl FormSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every hidden input that carries a `value`, keyed by `name` (or `id`
    /// when the input has no name).
    pub fn harvest(document: &Html) -> Self {
        let hidden = selector(r#"input[type="hidden"][value]"#);
        let mut snapshot = Self::new();
        for input in document.select(&hidden) {
            let key = input
                .attr("name")
                .filter(|n| !n.is_empty())
                .or_else(|| input.attr("id").filter(|n| !n.is_empty()));
            if let (Some(key), Some(value)) = (key, input.attr("value")) {
                snapshot.set(key, value);
            }
        }
        snapshot
    }

    pub fn from_page(page: &Page) -> Self {
        Self::harvest(&page.document())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Copy of this snapshot with `overrides` applied.
    pub fn mutate(&self, overrides: &[(&str, &str)]) -> Self {
        let mut copy = self.clone();
        for (name, value) in overrides {
            copy.set(name, *value);
        }
        copy
    }

    /// Copy of this snapshot targeting a `__doPostBack(target, argument)` call.
    pub fn postback(&self, target: &str, argument: &str) -> Self {
        self.mutate(&[
            (fields::EVENT_TARGET, target),
            (fields::EVENT_ARGUMENT, argument),
        ])
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (k, v) in iter {
            let k: String = k.into();
            snapshot.set(&k, v);
        }
        snapshot
    }
}

/// Parse the target and argument out of a `javascript:__doPostBack('t','a')` href.
pub fn parse_do_postback(href: &str) -> Option<(String, String)> {
    let start = href.find("__doPostBack(")? + "__doPostBack(".len();
    let rest = &href[start..];
    let end = rest.rfind(')')?;
    let mut args = rest[..end].splitn(2, ',');
    let target = unquote(args.next()?);
    let argument = args.next().map(unquote).unwrap_or_default();
    Some((target, argument))
}

fn unquote(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .replace("\\'", "'")
}
