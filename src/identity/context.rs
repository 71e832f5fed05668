/// Source of "who is authenticated right now and with which authorities".
///
/// Implementations are request-scoped values handed to the identity service per call;
/// there is no process-wide security context.
pub trait AuthenticationContext: Send + Sync {
    /// Username of the authenticated principal, empty if none.
    fn current_username(&self) -> String;
    /// Authority strings in the provider's native order, empty if none.
    fn current_authorities(&self) -> Vec<String>;
    /// False for anonymous or missing principals.
    fn is_authenticated(&self) -> bool;
}

/// Authentication established by the surrounding layer for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authentication {
    pub username: Option<String>,
    pub authorities: Vec<String>,
    pub request_id: Option<String>,
}

impl Authentication {
    pub fn anonymous() -> Self { Self::default() }

    /// An empty username yields an anonymous context.
    pub fn authenticated<I, S>(username: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let username = username.into();
        if username.is_empty() {
            return Self::anonymous();
        }
        Self {
            username: Some(username),
            authorities: authorities.into_iter().map(Into::into).collect(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

impl AuthenticationContext for Authentication {
    fn current_username(&self) -> String {
        self.username.clone().unwrap_or_default()
    }

    fn current_authorities(&self) -> Vec<String> {
        if self.username.is_none() { return Vec::new(); }
        self.authorities.clone()
    }

    fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }
}
