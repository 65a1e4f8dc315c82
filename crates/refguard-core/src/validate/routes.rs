//! Route declarations read from route files.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Report};

/// `app.Delete("/cities/:id", handler)` style call sites.
static VERB_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^\. \t\s]+\.(Get|Put|Post|Delete|Patch)\([`"]([^`"]+)[`"],[ ]?([^\)]+)\)"#)
        .expect("verb call pattern is valid")
});

/// `.route("/cities/:id", get(show).delete(remove))` style call sites.
static ROUTE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\.route\(\s*"([^"]+)"\s*,\s*((?:[A-Za-z_][A-Za-z0-9_]*::)*(?:get|put|post|delete|patch)\([^)]*\)(?:\s*\.\s*(?:get|put|post|delete|patch)\([^)]*\))*)"#,
    )
    .expect("route call pattern is valid")
});

static ROUTE_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(get|put|post|delete|patch)\(").expect("route verb pattern is valid")
});

/// Method of the routes the guard protects.
pub const DELETE_METHOD: &str = "DELETE";

/// Extensions of supported route files.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".go", ".rs", ".txt", ".json"];

/// A route declared by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRoute {
    /// Upper-case HTTP method.
    pub method: String,
    /// Route path, prefixed once loaded.
    pub path: String,
}

impl MappingRoute {
    /// Create a route, upper-casing the method.
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
        }
    }

    /// Whether this is a `DELETE` route.
    pub fn is_delete(&self) -> bool {
        self.method.eq_ignore_ascii_case(DELETE_METHOD)
    }
}

/// How a route file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFormat {
    /// Router call sites scanned out of source text.
    RawSource,
    /// JSON list of `{method, path}`.
    Json,
}

impl RouteFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("go") | Some("rs") | Some("txt") => Ok(RouteFormat::RawSource),
            Some("json") => Ok(RouteFormat::Json),
            ext => {
                let mut report = Report::new("load routes");
                let supported = SUPPORTED_EXTENSIONS.join(" | ");
                match ext {
                    Some(ext) => report.push(format!(
                        "file extension .{} of path {} is not supported, use one of {}",
                        ext,
                        path.display(),
                        supported
                    )),
                    None => report.push(format!(
                        "declare the file extension of path {}, use one of {}",
                        path.display(),
                        supported
                    )),
                }
                Err(Error::Config(report))
            }
        }
    }

    /// Parse every route of `text`, whatever its method.
    pub fn parse(&self, text: &str) -> Result<Vec<MappingRoute>, Error> {
        match self {
            RouteFormat::RawSource => Ok(parse_raw_routes(text)),
            RouteFormat::Json => parse_json_routes(text),
        }
    }
}

/// Scan router call sites out of source text, in source order.
pub fn parse_raw_routes(text: &str) -> Vec<MappingRoute> {
    let mut found: Vec<(usize, MappingRoute)> = Vec::new();

    for caps in VERB_CALL.captures_iter(text) {
        if let (Some(whole), Some(verb), Some(path)) = (caps.get(0), caps.get(1), caps.get(2)) {
            found.push((whole.start(), MappingRoute::new(verb.as_str(), path.as_str())));
        }
    }

    for caps in ROUTE_CALL.captures_iter(text) {
        let (Some(whole), Some(path), Some(handlers)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        for verb in ROUTE_VERB.captures_iter(handlers.as_str()) {
            found.push((whole.start(), MappingRoute::new(&verb[1], path.as_str())));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, route)| route).collect()
}

/// Parse a JSON list of routes.
pub fn parse_json_routes(text: &str) -> Result<Vec<MappingRoute>, Error> {
    let routes: Vec<MappingRoute> = serde_json::from_str(text)?;
    Ok(routes
        .into_iter()
        .map(|route| MappingRoute::new(route.method, route.path))
        .collect())
}

/// Keep `DELETE` routes only and prepend `prefix` to their paths.
pub fn delete_routes(routes: Vec<MappingRoute>, prefix: &str) -> Vec<MappingRoute> {
    routes
        .into_iter()
        .filter(MappingRoute::is_delete)
        .map(|route| MappingRoute {
            path: format!("{}{}", prefix, route.path),
            ..route
        })
        .collect()
}

/// Read the `DELETE` routes declared in a route file.
pub fn load_routes(path: impl AsRef<Path>, prefix: &str) -> Result<Vec<MappingRoute>, Error> {
    let path = path.as_ref();
    let format = RouteFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;

    let routes = delete_routes(format.parse(&text)?, prefix);
    debug!(path = %path.display(), routes = routes.len(), "loaded delete routes");
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GO_ROUTES: &str = r#"
        api.Get("/cities", controller.GetCity)
        api.Delete("/cities/:id", controller.DeleteCity)
        api.Delete(`/countries/:id`, controller.DeleteCountry)
        api.Post("/batch-actions/:action/:module", controller.Batch)
    "#;

    #[test]
    fn test_parse_verb_calls() {
        let routes = parse_raw_routes(GO_ROUTES);

        assert_eq!(routes.len(), 4);
        assert_eq!(routes[1], MappingRoute::new("DELETE", "/cities/:id"));
        assert_eq!(routes[2], MappingRoute::new("DELETE", "/countries/:id"));
        assert_eq!(routes[3].method, "POST");
    }

    #[test]
    fn test_parse_route_calls() {
        let routes = parse_raw_routes(
            r#"
            Router::new()
                .route("/cities", routing::get(list).post(create))
                .route("/cities/:id", get(show).delete(remove))
            "#,
        );

        assert_eq!(
            routes,
            vec![
                MappingRoute::new("GET", "/cities"),
                MappingRoute::new("POST", "/cities"),
                MappingRoute::new("GET", "/cities/:id"),
                MappingRoute::new("DELETE", "/cities/:id"),
            ]
        );
    }

    #[test]
    fn test_parse_json_uppercases() {
        let routes =
            parse_json_routes(r#"[{"method": "delete", "path": "/cities/:id"}]"#).unwrap();
        assert_eq!(routes, vec![MappingRoute::new("DELETE", "/cities/:id")]);

        assert!(matches!(parse_json_routes("{}"), Err(Error::Json(_))));
    }

    #[test]
    fn test_delete_routes_prefixed() {
        let routes = delete_routes(parse_raw_routes(GO_ROUTES), "/api/v1/master");
        assert_eq!(
            routes.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(),
            vec!["/api/v1/master/cities/:id", "/api/v1/master/countries/:id"]
        );
    }

    #[test]
    fn test_load_routes_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".go").tempfile().unwrap();
        file.write_all(GO_ROUTES.as_bytes()).unwrap();

        let routes = load_routes(file.path(), "/api/v1/master").unwrap();
        assert_eq!(routes.len(), 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = RouteFormat::from_path(Path::new("routes.yaml")).unwrap_err();
        match err {
            Error::Config(report) => {
                assert!(report.messages[0].contains(".yaml"));
                assert!(report.messages[0].contains(".go | .rs | .txt | .json"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            RouteFormat::from_path(Path::new("routes")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_routes("/nonexistent/routes.json", ""),
            Err(Error::Io(_))
        ));
    }
}
