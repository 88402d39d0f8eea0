use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    models::{Role, RouteClass},
    path::{is_normalized, matches_prefix},
};

/// RouteTable
///
/// Process-wide routing rules: which paths skip the gate, which are public,
/// which prefixes each role may reach and where each role lands. A table is
/// immutable once built; replacing rules means building a new table and
/// swapping the whole snapshot (see `GateState::reload`).
///
/// Every configured path other than a bypass prefix must already be
/// normalized so that comparisons against normalized request paths are plain
/// string comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTable {
    /// Plain string prefixes for framework internals, static assets and the
    /// API. Unlike allowlist entries they are not segment delimited: `/api`
    /// also covers `/api-docs`, while `/assets/` does not cover `/assets`.
    pub bypass_prefixes: Vec<String>,
    /// Exact infrastructure files (favicon, robots, sitemap).
    pub bypass_paths: BTreeSet<String>,
    /// Exact paths reachable without a credential.
    pub public_paths: BTreeSet<String>,
    /// Ordered allowlist of path prefixes per role.
    pub role_routes: BTreeMap<Role, Vec<String>>,
    /// Landing page per role. Roles missing here land on `default_home`.
    pub role_homes: BTreeMap<Role, String>,
    pub default_home: String,
    pub sign_in_path: String,
    pub not_found_path: String,
}

const USER_ROUTES: &[&str] = &[
    "/users/home",
    "/users/profile",
    "/users/referral",
    "/users/result",
    "/users/diposit",
    "/users/transaction",
    "/users/support",
    "/users/company",
    "/users/withdraw",
    "/users/history",
    "/users/transfer",
    "/users/bank",
    "/users/freefire",
    "/users/bingo",
    "/users/freefire-profile",
];

fn owned(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

impl Default for RouteTable {
    /// The application's built-in routes.
    fn default() -> Self {
        Self {
            bypass_prefixes: owned(&["/_next/", "/assets/", "/images/", "/public/", "/api"]),
            bypass_paths: owned(&["/favicon.ico", "/robots.txt", "/sitemap.xml"])
                .into_iter()
                .collect(),
            public_paths: owned(&[
                "/",
                "/users/sign-in",
                "/users/sign-up",
                "/users/send-otp",
                "/users/verify-otp",
                "/not-found",
            ])
            .into_iter()
            .collect(),
            role_routes: BTreeMap::from([
                (Role::User, owned(USER_ROUTES)),
                (Role::Agent, owned(&["/agents"])),
                (Role::Admin, owned(&["/admins"])),
            ]),
            role_homes: BTreeMap::from([
                (Role::Admin, "/admins".to_string()),
                (Role::Agent, "/agents".to_string()),
            ]),
            default_home: "/users/home".to_string(),
            sign_in_path: "/users/sign-in".to_string(),
            not_found_path: "/not-found".to_string(),
        }
    }
}

/// Checks run in priority order; the first one that matches decides the class.
const CLASSIFIERS: &[(RouteClass, fn(&RouteTable, &str) -> bool)] = &[
    (RouteClass::Bypass, RouteTable::is_bypass),
    (RouteClass::Public, RouteTable::is_public),
];

impl RouteTable {
    /// Parses a table from JSON and validates it. Fields left out of the
    /// document keep their built-in values.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let table: RouteTable = serde_json::from_str(raw)?;
        table.validate()?;
        Ok(table)
    }

    /// validate
    ///
    /// Rejects tables the gate cannot run safely with: configured paths that
    /// are not absolute and normalized, roles listed with no prefixes, role
    /// names outside the known set, and redirect targets that would redirect
    /// again.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(prefix) = self.bypass_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::InvalidPath(prefix.clone()));
        }

        let singles = [&self.default_home, &self.sign_in_path, &self.not_found_path];
        let all_paths = self
            .bypass_paths
            .iter()
            .chain(&self.public_paths)
            .chain(self.role_routes.values().flatten())
            .chain(self.role_homes.values())
            .chain(singles);

        for path in all_paths {
            if !is_normalized(path) {
                return Err(ConfigError::InvalidPath(path.clone()));
            }
        }

        if let Some((role, _)) = self.role_routes.iter().find(|(_, prefixes)| prefixes.is_empty()) {
            return Err(ConfigError::EmptyAllowlist(*role));
        }

        // An unknown name deserializes to `Unrecognized`; granting it routes
        // would hand them to every token with an unknown role.
        if self.role_routes.contains_key(&Role::Unrecognized)
            || self.role_homes.contains_key(&Role::Unrecognized)
        {
            return Err(ConfigError::UnknownRole);
        }

        // Sign-in and not-found must be reachable without the allowlist.
        for (name, path) in [
            ("sign_in_path", &self.sign_in_path),
            ("not_found_path", &self.not_found_path),
        ] {
            if self.classify(path) == RouteClass::Protected {
                return Err(ConfigError::UnreachableTarget { name, path: path.clone() });
            }
        }

        // Each role with an allowlist must be able to open its own home.
        for role in self.role_routes.keys() {
            let home = self.home_for(*role);
            if self.classify(home) == RouteClass::Protected && !self.is_authorized(*role, home) {
                return Err(ConfigError::UnreachableTarget {
                    name: "role home",
                    path: home.to_string(),
                });
            }
        }

        Ok(())
    }

    fn is_bypass(&self, path: &str) -> bool {
        self.bypass_paths.contains(path)
            || self.bypass_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(path)
    }

    /// classify
    ///
    /// Maps a normalized path to exactly one `RouteClass`.
    pub fn classify(&self, path: &str) -> RouteClass {
        CLASSIFIERS
            .iter()
            .find(|(_, matches)| matches(self, path))
            .map(|(class, _)| *class)
            .unwrap_or(RouteClass::Protected)
    }

    /// is_authorized
    ///
    /// True when the role's allowlist holds a prefix equal to `path` or a
    /// prefix that `path` continues with `/`. A role with no entry denies
    /// everything.
    pub fn is_authorized(&self, role: Role, path: &str) -> bool {
        self.role_routes
            .get(&role)
            .is_some_and(|prefixes| prefixes.iter().any(|base| matches_prefix(path, base)))
    }

    /// Landing page for `role`.
    pub fn home_for(&self, role: Role) -> &str {
        self.role_homes
            .get(&role)
            .map(String::as_str)
            .unwrap_or(&self.default_home)
    }
}
