use std::fmt;

use serde::{Deserialize, Serialize};

const SENSITIVE_PARAMS: &[&str] = &["password", "pass", "token", "api_key", "apikey"];

/// Connection target with secrets removed, safe to log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

impl RedactedConnection {
    /// Describe a connection assembled from discrete settings.
    pub fn from_parts(host: &str, port: u16, database: &str, user: Option<&str>) -> Self {
        let authority = match user {
            Some(user) => format!("{user}:***@"),
            None => String::new(),
        };
        Self {
            user: user.map(str::to_string),
            host: Some(host.to_string()),
            port: Some(port),
            database: Some(database.to_string()),
            redacted: format!("postgres://{authority}{host}:{port}/{database}"),
        }
    }
}

impl fmt::Display for RedactedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

/// Mask the password and sensitive query parameters of a connection URL.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let Some((scheme, rest)) = conn.split_once("://") else {
        return RedactedConnection {
            redacted: "***".to_string(),
            ..RedactedConnection::default()
        };
    };

    let (location, query) = match rest.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (rest, None),
    };
    let (authority, host_and_path) = match location.rsplit_once('@') {
        Some((authority, host_and_path)) => (Some(authority), host_and_path),
        None => (None, location),
    };
    let (host_port, database) = match host_and_path.split_once('/') {
        Some((host_port, database)) => (host_port, Some(database)),
        None => (host_and_path, None),
    };

    let mut out = RedactedConnection::default();
    let mut redacted = format!("{scheme}://");

    if let Some(authority) = authority {
        match authority.split_once(':') {
            Some((user, _password)) => {
                out.user = Some(user.to_string());
                redacted.push_str(&format!("{user}:***@"));
            }
            None => {
                out.user = Some(authority.to_string());
                redacted.push_str(&format!("{authority}@"));
            }
        }
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) => {
            out.host = Some(host.to_string()).filter(|host| !host.is_empty());
            out.port = port.parse().ok();
        }
        None if !host_port.is_empty() => out.host = Some(host_port.to_string()),
        None => {}
    }
    redacted.push_str(host_port);

    if let Some(database) = database {
        out.database = Some(database.to_string()).filter(|name| !name.is_empty());
        redacted.push('/');
        redacted.push_str(database);
    }

    if let Some(query) = query {
        redacted.push('?');
        redacted.push_str(&redact_query(query));
    }

    out.redacted = redacted;
    out
}

fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SENSITIVE_PARAMS.contains(&key.to_lowercase().as_str()) => {
                format!("{key}=***")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
