use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    auth::CredentialVerifier,
    config::{AppConfig, ConfigError},
    models::{Credential, GateDecision, RouteClass},
    path::normalize,
    routes::RouteTable,
};

/// Gate
///
/// One immutable snapshot of everything a decision depends on: the route
/// table and the verifier holding the signing secret. Evaluating a request
/// touches no shared mutable state, so any number of requests can run
/// `evaluate` on the same snapshot at once.
#[derive(Debug, Clone)]
pub struct Gate {
    routes: RouteTable,
    verifier: CredentialVerifier,
}

impl Gate {
    pub fn new(routes: RouteTable, verifier: CredentialVerifier) -> Self {
        Self { routes, verifier }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.routes.clone(), CredentialVerifier::from_config(config))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decides the outcome for `raw_path` and an optional raw token.
    pub fn evaluate(&self, raw_path: &str, raw_token: Option<&str>) -> GateDecision {
        self.decide(raw_path, raw_token).1
    }

    /// decide
    ///
    /// Runs the full evaluation and also reports how the path was classified.
    /// Bypass paths return before the token is looked at.
    pub fn decide(&self, raw_path: &str, raw_token: Option<&str>) -> (RouteClass, GateDecision) {
        let path = normalize(raw_path);
        let class = self.routes.classify(&path);

        let decision = match class {
            RouteClass::Bypass => GateDecision::Forward,
            RouteClass::Public | RouteClass::Protected => {
                let credential = self.verifier.verify(raw_token);
                self.resolve(class, &path, credential.as_ref())
            }
        };

        tracing::debug!(
            path = %path,
            class = class.as_str(),
            decision = ?decision,
            "gate decision"
        );

        (class, decision)
    }

    /// resolve
    ///
    /// The decision table for an already classified, normalized path:
    ///
    /// | class     | credential            | decision                |
    /// |-----------|-----------------------|-------------------------|
    /// | bypass    | any                   | forward                 |
    /// | public    | none                  | forward                 |
    /// | public    | present               | redirect to role home   |
    /// | protected | none                  | redirect to sign-in     |
    /// | protected | present, allowed      | forward                 |
    /// | protected | present, not allowed  | redirect to not-found   |
    pub fn resolve(
        &self,
        class: RouteClass,
        path: &str,
        credential: Option<&Credential>,
    ) -> GateDecision {
        match (class, credential) {
            (RouteClass::Bypass, _) => GateDecision::Forward,
            (RouteClass::Public, None) => GateDecision::Forward,
            (RouteClass::Public, Some(cred)) => {
                GateDecision::RedirectTo(self.routes.home_for(cred.role).to_string())
            }
            (RouteClass::Protected, None) => {
                GateDecision::RedirectTo(self.routes.sign_in_path.clone())
            }
            (RouteClass::Protected, Some(cred)) if self.routes.is_authorized(cred.role, path) => {
                GateDecision::Forward
            }
            (RouteClass::Protected, Some(_)) => {
                GateDecision::RedirectTo(self.routes.not_found_path.clone())
            }
        }
    }
}

/// GateState
///
/// Shared handle to the current `Gate` snapshot. Readers clone the inner
/// `Arc` and evaluate against it, so a reload swaps the whole snapshot and
/// an in-flight request keeps the rules it started with.
#[derive(Clone)]
pub struct GateState {
    current: Arc<RwLock<Arc<Gate>>>,
    /// Name of the cookie carrying the session token.
    pub cookie_name: Arc<str>,
}

impl GateState {
    pub fn new(gate: Gate, cookie_name: impl Into<Arc<str>>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(gate))),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Gate::from_config(config), config.cookie_name.as_str())
    }

    /// The snapshot new evaluations should use.
    pub fn snapshot(&self) -> Arc<Gate> {
        self.current.read().clone()
    }

    /// reload
    ///
    /// Validates `routes` and swaps in a new snapshot that keeps the current
    /// verifier. On error the running snapshot is left untouched.
    pub fn reload(&self, routes: RouteTable) -> Result<(), ConfigError> {
        routes.validate()?;
        let verifier = self.snapshot().verifier.clone();
        *self.current.write() = Arc::new(Gate::new(routes, verifier));
        tracing::info!("route table reloaded");
        Ok(())
    }
}
