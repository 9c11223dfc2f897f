//! Extraction of values from the site's HTML pages.
//!
//! # Design
//! Each page the session has to read gets one extractor implementing
//! [`PageExtractor`]. All assumptions about markup live here, and every
//! mismatch surfaces as [`ApiError::LayoutChanged`] naming the page, so a site
//! redesign fails at this seam instead of as a wrong login.
//!
//! The helpers are deliberately naive string scanners tailored to the
//! Moodle templates the site uses. Tag and attribute names are matched
//! case-insensitively.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ApiError;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute pattern is valid")
});

static PROFILE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"user/profile\.php\?id=(\d+)").expect("profile pattern is valid")
});

/// Pulls one value out of one kind of page.
pub trait PageExtractor {
    type Output;

    /// Page name reported in [`ApiError::LayoutChanged`].
    const PAGE: &'static str;

    fn extract(&self, html: &str) -> Result<Self::Output, ApiError>;

    fn layout_changed(&self, detail: impl Into<String>) -> ApiError {
        let detail = detail.into();
        tracing::warn!(page = Self::PAGE, %detail, "page layout changed");
        ApiError::LayoutChanged {
            page: Self::PAGE,
            detail,
        }
    }
}

/// The one-time `logintoken` hidden field of the `#login` form.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginTokenExtractor;

impl PageExtractor for LoginTokenExtractor {
    type Output = String;
    const PAGE: &'static str = "login";

    fn extract(&self, html: &str) -> Result<String, ApiError> {
        let form = element_by_id(html, "form", "login")
            .ok_or_else(|| self.layout_changed("no form with id 'login'"))?;

        tags(form, "input")
            .map(attributes)
            .filter(|attrs| attr(attrs, "type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")))
            .find(|attrs| attr(attrs, "name") == Some("logintoken"))
            .and_then(|attrs| attr(&attrs, "value").map(str::to_string))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| self.layout_changed("login form has no hidden 'logintoken' input"))
    }
}

/// The numeric id in the first profile link of the footer login info.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserIdExtractor;

impl PageExtractor for UserIdExtractor {
    type Output = u64;
    const PAGE: &'static str = "profile";

    fn extract(&self, html: &str) -> Result<u64, ApiError> {
        let info = element_by_class(html, "div", "logininfo")
            .ok_or_else(|| self.layout_changed("no 'logininfo' block"))?;

        let href = tags(info, "a")
            .map(attributes)
            .find_map(|attrs| attr(&attrs, "href").map(str::to_string))
            .ok_or_else(|| self.layout_changed("'logininfo' block has no link"))?;

        PROFILE_ID_RE
            .captures(&href)
            .and_then(|caps| caps.get(1))
            .and_then(|id| id.as_str().parse().ok())
            .ok_or_else(|| self.layout_changed(format!("'{href}' is not a profile link")))
    }
}

/// Whether a page was rendered for a logged-in user.
pub fn is_logged_in(html: &str, marker: &str) -> bool {
    html.contains(marker)
}

// --- helpers ---

/// Inner HTML of the first `<tag ... id="id">` element, up to its closing tag.
fn element_by_id<'a>(html: &'a str, tag: &str, id: &str) -> Option<&'a str> {
    find_element(html, tag, |attrs| attr(attrs, "id") == Some(id))
}

/// Inner HTML of the first `<tag>` whose class list contains `class`.
/// Nested elements of the same tag are not balanced: the slice ends at the
/// first closing tag.
fn element_by_class<'a>(html: &'a str, tag: &str, class: &str) -> Option<&'a str> {
    find_element(html, tag, |attrs| {
        attr(attrs, "class").is_some_and(|c| c.split_whitespace().any(|c| c == class))
    })
}

fn find_element<'a>(
    html: &'a str,
    tag: &str,
    matches: impl Fn(&[(String, String)]) -> bool,
) -> Option<&'a str> {
    let lc = html.to_ascii_lowercase();
    let close = format!("</{tag}");
    let mut from = 0;
    while let Some((start, end)) = next_open_tag(&lc, tag, from) {
        if matches(attributes(&html[start..end]).as_slice()) {
            let inner_end = lc[end..].find(&close).map_or(html.len(), |i| end + i);
            return Some(&html[end..inner_end]);
        }
        from = end;
    }
    None
}

/// Byte range of the next `<tag ...>` opening tag at or after `from`.
/// `lc` must be the ASCII-lowercased document.
fn next_open_tag(lc: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{tag}");
    let mut pos = from;
    loop {
        let start = lc.get(pos..)?.find(&open)? + pos;
        let after = start + open.len();
        // Reject `<inputs` when looking for `<input`.
        let boundary = lc[after..].chars().next()?;
        if boundary.is_ascii_whitespace() || boundary == '>' || boundary == '/' {
            return Some((start, tag_end(lc, after)?));
        }
        pos = after;
    }
}

/// Index just past the `>` closing a tag, ignoring `>` inside quoted values.
fn tag_end(lc: &str, from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, c) in lc[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(from + i + 1),
            _ => {}
        }
    }
    None
}

/// Every `<tag ...>` opening tag in `html`, as raw text.
fn tags<'a>(html: &'a str, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let lc = html.to_ascii_lowercase();
    let mut from = 0;
    std::iter::from_fn(move || {
        let (start, end) = next_open_tag(&lc, tag, from)?;
        from = end;
        Some(&html[start..end])
    })
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(tag)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (caps[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r#"
        <html><body>
        <form class="mt-3" action="https://informatics.msk.ru/login/index.php" method="post" id="login">
            <input id="anchor" type="hidden" name="anchor" value="">
            <script>document.getElementById('anchor').value = location.hash;</script>
            <INPUT type="hidden" name="logintoken" value="Zx81abcDEF">
            <input type="text" name="username" id="username" value="">
        </form>
        </body></html>
    "#;

    const HOME_PAGE: &str = r#"
        <div id="page-footer"><div><div class="logininfo">Вы зашли под именем
            <a href="https://informatics.msk.ru/user/profile.php?id=123456" title="Просмотр профиля">Ivan</a>
            (<a href="https://informatics.msk.ru/login/logout.php?sesskey=x">Выход</a>)
        </div></div></div>
    "#;

    #[test]
    fn extracts_login_token() {
        let token = LoginTokenExtractor.extract(LOGIN_PAGE).unwrap();
        assert_eq!(token, "Zx81abcDEF");
    }

    #[test]
    fn missing_login_form_is_a_layout_change() {
        let err = LoginTokenExtractor
            .extract("<form id=\"other\"></form>")
            .unwrap_err();
        assert!(matches!(err, ApiError::LayoutChanged { page: "login", .. }));
    }

    #[test]
    fn form_without_token_is_a_layout_change() {
        let html = r#"<form id="login"><input type="hidden" name="anchor" value=""></form>"#;
        let err = LoginTokenExtractor.extract(html).unwrap_err();
        assert!(matches!(err, ApiError::LayoutChanged { page: "login", .. }));
    }

    #[test]
    fn token_outside_login_form_is_ignored() {
        let html = r#"<input type="hidden" name="logintoken" value="stray">
                      <form id="login"></form>"#;
        assert!(LoginTokenExtractor.extract(html).is_err());
    }

    #[test]
    fn extracts_user_id_from_first_profile_link() {
        assert_eq!(UserIdExtractor.extract(HOME_PAGE).unwrap(), 123456);
    }

    #[test]
    fn non_profile_link_is_a_layout_change() {
        let html = r#"<div class="logininfo"><a href="/login/index.php">Log in</a></div>"#;
        let err = UserIdExtractor.extract(html).unwrap_err();
        assert!(matches!(err, ApiError::LayoutChanged { page: "profile", .. }));
    }

    #[test]
    fn missing_login_info_is_a_layout_change() {
        let err = UserIdExtractor.extract("<div class=\"footer\"></div>").unwrap_err();
        assert!(matches!(err, ApiError::LayoutChanged { page: "profile", .. }));
    }

    #[test]
    fn logged_in_marker_detection() {
        assert!(is_logged_in(HOME_PAGE, "Вы зашли под именем"));
        assert!(!is_logged_in(LOGIN_PAGE, "Вы зашли под именем"));
    }

    #[test]
    fn quoted_angle_bracket_does_not_end_the_tag() {
        let html = r#"<form id="login">
            <input type="hidden" data-hint="a > b" name="logintoken" value="t0k">
            </form>"#;
        assert_eq!(LoginTokenExtractor.extract(html).unwrap(), "t0k");
    }

    #[test]
    fn attributes_accept_all_quote_styles() {
        let attrs = attributes(r#"<input TYPE=hidden name='a' value="b c">"#);
        assert_eq!(attr(&attrs, "type"), Some("hidden"));
        assert_eq!(attr(&attrs, "name"), Some("a"));
        assert_eq!(attr(&attrs, "value"), Some("b c"));
    }
}
