pub struct Password(String);

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Password {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}

/// Username and password used to log in to a CI server.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Password,
}

impl Credentials {
    /// Returns `None` when no username is configured, meaning anonymous access.
    pub fn new(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        let username = username.map(str::trim).filter(|u| !u.is_empty())?;

        Some(Self {
            username: username.to_owned(),
            password: Password::from(password.unwrap_or_default()),
        })
    }
}
