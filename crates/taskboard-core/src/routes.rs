//! Route table for the front end.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Home,
    Projects,
    ProjectDetail(i64),
    Login,
    Signup,
}

impl Route {
    /// Map a path to a route. Anything unrecognised lands on `Home`.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["projects"] => Route::Projects,
            ["projects", id] => match id.parse::<i64>() {
                Ok(id) if id > 0 => Route::ProjectDetail(id),
                _ => Route::Home,
            },
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            _ => Route::Home,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Projects => "/projects".to_string(),
            Route::ProjectDetail(id) => format!("/projects/{}", id),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Projects | Route::ProjectDetail(_))
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Projects => "Projects",
            Route::ProjectDetail(_) => "Project",
            Route::Login => "Log in",
            Route::Signup => "Sign up",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/projects"), Route::Projects);
        assert_eq!(Route::parse("/projects/"), Route::Projects);
        assert_eq!(Route::parse("/projects/42"), Route::ProjectDetail(42));
        assert_eq!(Route::parse("/login?next=/projects"), Route::Login);
        assert_eq!(Route::parse("/signup#top"), Route::Signup);
    }

    #[test]
    fn test_parse_unknown_paths_fall_back_to_home() {
        assert_eq!(Route::parse("/nope"), Route::Home);
        assert_eq!(Route::parse("/projects/abc"), Route::Home);
        assert_eq!(Route::parse("/projects/0"), Route::Home);
        assert_eq!(Route::parse("/projects/1/tasks"), Route::Home);
    }

    #[test]
    fn test_path_round_trips() {
        for route in [
            Route::Home,
            Route::Projects,
            Route::ProjectDetail(7),
            Route::Login,
            Route::Signup,
        ] {
            assert_eq!(Route::parse(&route.path()), route);
        }
        assert_eq!(Route::ProjectDetail(7).to_string(), "/projects/7");
    }

    #[test]
    fn test_requires_auth() {
        assert!(Route::Projects.requires_auth());
        assert!(Route::ProjectDetail(1).requires_auth());
        assert!(!Route::Home.requires_auth());
        assert!(!Route::Login.requires_auth());
        assert!(!Route::Signup.requires_auth());
    }
}
