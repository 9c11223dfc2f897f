//! Route table and URL resolution.
//!
//! Templates use named placeholders (`{problem_id}`) that are filled
//! positionally, in the order they appear. Names only document the template.

use std::fmt::Display;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Which root a route lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// HTML pages served directly under the site origin.
    Frontend,
    /// JSON endpoints under the backend prefix.
    Backend,
}

impl Origin {
    fn label(self) -> &'static str {
        match self {
            Origin::Frontend => "front-end",
            Origin::Backend => "back-end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub template: &'static str,
    pub origin: Origin,
}

const fn route(name: &'static str, template: &'static str, origin: Origin) -> Route {
    Route {
        name,
        template,
        origin,
    }
}

pub static ROUTES: &[Route] = &[
    route("login", "login/index.php", Origin::Frontend),
    route(
        "problem",
        "mod/statements/view.php?chapterid={chapter_id}",
        Origin::Frontend,
    ),
    route("submit", "problem/{problem_id}/submit", Origin::Backend),
    route("run", "problem/run/{run_id}/source", Origin::Backend),
    route(
        "filter",
        "problem/{problem_id}/filter-runs?user_id={user_id}&from_timestamp={from_timestamp}\
         &to_timestamp={to_timestamp}&group_id={group_id}&lang_id={lang_id}\
         &status_id={status_id}&statement_id={statement_id}&count={count}\
         &with_comment={with_comment}&page={page}",
        Origin::Backend,
    ),
    route("source", "problem/run/{run_id}/source", Origin::Backend),
    route("protocol", "protocol/get/{run_id}", Origin::Backend),
];

/// Find a route by name within one origin's table.
pub fn lookup(name: &str, origin: Origin) -> Result<&'static Route, ApiError> {
    ROUTES
        .iter()
        .find(|r| r.name == name && r.origin == origin)
        .ok_or_else(|| ApiError::UnknownRoute {
            name: name.to_string(),
            origin: origin.label(),
        })
}

/// Resolve a route into an absolute URL.
pub fn resolve(
    config: &ClientConfig,
    name: &str,
    origin: Origin,
    params: &[&dyn Display],
) -> Result<String, ApiError> {
    let route = lookup(name, origin)?;
    let path = fill_template(route, params)?;

    let root = config.origin.trim_end_matches('/');
    Ok(match origin {
        Origin::Frontend => format!("{root}/{path}"),
        Origin::Backend => {
            let prefix = config.backend_prefix.trim_matches('/');
            if prefix.is_empty() {
                format!("{root}/{path}")
            } else {
                format!("{root}/{prefix}/{path}")
            }
        }
    })
}

fn fill_template(route: &Route, params: &[&dyn Display]) -> Result<String, ApiError> {
    let expected = route.template.matches('{').count();
    if expected != params.len() {
        return Err(ApiError::RouteParams {
            name: route.name.to_string(),
            expected,
            got: params.len(),
        });
    }

    let mut out = String::with_capacity(route.template.len());
    let mut rest = route.template;
    for param in params {
        // Counts matched above, and templates are static data with balanced braces.
        let (Some(open), Some(close)) = (rest.find('{'), rest.find('}')) else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(&urlencoding::encode(&param.to_string()));
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
