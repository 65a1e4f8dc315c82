//! Service route prefixes.

use serde::{Deserialize, Serialize};

/// Path prefix of each service exposing protected routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServicePrefix {
    Master,
    Integration,
    User,
    Payment,
    Email,
    Multimedia,
}

impl ServicePrefix {
    pub const MASTER: &'static str = "/api/v1/master";
    pub const INTEGRATION: &'static str = "/api/v1/integration";
    pub const USER: &'static str = "/api/v1/user";
    pub const PAYMENT: &'static str = "/api/v1/payment";
    pub const EMAIL: &'static str = "/api/v1/email";
    pub const MULTIMEDIA: &'static str = "/api/v1/multimedia";

    /// The path prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServicePrefix::Master => Self::MASTER,
            ServicePrefix::Integration => Self::INTEGRATION,
            ServicePrefix::User => Self::USER,
            ServicePrefix::Payment => Self::PAYMENT,
            ServicePrefix::Email => Self::EMAIL,
            ServicePrefix::Multimedia => Self::MULTIMEDIA,
        }
    }

    /// Single-delete pattern for a plural module under this prefix.
    ///
    /// The last character of `module` is optional, so `cities` also matches
    /// `citie`. The identifier is the only capture group.
    pub fn pattern(&self, module: &str) -> String {
        format!(".*{}/{}?/([^/]+)$", self.as_str(), module)
    }
}

impl std::fmt::Display for ServicePrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_master_pattern() {
        let pattern = ServicePrefix::Master.pattern("cities");
        assert_eq!(pattern, ".*/api/v1/master/cities?/([^/]+)$");

        let re = Regex::new(&pattern).unwrap();
        let caps = re.captures("/api/v1/master/cities/42").unwrap();
        assert_eq!(&caps[1], "42");
        assert!(re.is_match("/api/v1/master/citie/42"));
        assert!(!re.is_match("/api/v1/user/cities/42"));
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(ServicePrefix::Payment.as_str(), "/api/v1/payment");
        assert_eq!(ServicePrefix::Multimedia.to_string(), "/api/v1/multimedia");
    }
}
