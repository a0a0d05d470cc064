use std::str::FromStr;
use std::time::Duration;

use crate::address::Address;
use crate::error::Error;

/// How the connection to the server is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encryption {
    /// No encryption at all; the whole exchange runs in plaintext.
    Insecure,
    /// Connect in plaintext, then upgrade in-band with `STARTTLS`
    /// before any credentials or envelope data are sent.
    #[default]
    StartTls,
    /// TLS from the first byte (the `smtps` convention, port 465).
    ImplicitTls,
}

impl FromStr for Encryption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insecure" => Ok(Encryption::Insecure),
            "starttls" => Ok(Encryption::StartTls),
            // "tls" is the historical spelling for implicit TLS.
            "implicit-tls" | "tls" => Ok(Encryption::ImplicitTls),
            other => Err(Error::UnsupportedEncryption(other.to_string())),
        }
    }
}

/// How the client authenticates once the transport is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Auth {
    /// Skip authentication entirely.
    #[default]
    None,
    /// `AUTH PLAIN` (RFC 4616).
    Plain,
    /// `AUTH CRAM-MD5` challenge-response (RFC 2195).
    CramMd5,
}

/// The configuration for a [`Mailer`](crate::Mailer).
///
/// A value can be parsed from an endpoint string of the form
/// `user:password@host:port`; every field not named there keeps
/// its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Hostname or IP of the server; also the name checked during
    /// TLS verification.
    pub host: String,
    /// Server port.
    pub port: u16,
    pub username: String,
    pub password: String,
    pub encryption: Encryption,
    pub auth: Auth,
    /// Used when a message does not carry a sender of its own.
    pub default_sender: Option<Address>,
    /// Name announced in the `EHLO`/`HELO` command.
    pub ehlo_domain: String,
    /// Deadline for establishing the TCP connection.
    pub dial_timeout: Duration,
    /// Deadline for each socket read and each socket write.
    pub io_timeout: Duration,
    /// Accept TLS certificates that fail verification. Only meant for
    /// lab servers with self-signed certificates.
    pub accept_invalid_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            encryption: Encryption::default(),
            auth: Auth::default(),
            default_sender: None,
            ehlo_domain: "localhost".to_string(),
            dial_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
            accept_invalid_certs: false,
        }
    }
}

impl FromStr for Config {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (username_password, host) =
            if let Some((user, host)) = s.split_once('@') {
                if let Some((username, password)) = user.split_once(':') {
                    let username_password =
                        (username.to_string(), password.to_string());
                    (Some(username_password), host)
                } else {
                    return Err("missing ':' in user");
                }
            } else {
                (None, s)
            };
        let mut config = Config::default();
        if let Some((address, port)) = host.split_once(':') {
            if address.is_empty() {
                return Err("invalid address");
            }
            config.host = address.to_string();
            config.port = port.parse().map_err(|_| "invalid port number")?;
        } else {
            if host.is_empty() {
                return Err("invalid address");
            }
            config.host = host.to_string();
        }
        if let Some((username, password)) = username_password {
            config.username = username;
            config.password = password;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Encryption};
    use crate::error::Error;

    #[test]
    fn parse_host() {
        assert_eq!(
            "127.0.0.1".parse(),
            Ok(Config {
                host: "127.0.0.1".to_string(),
                ..Config::default()
            })
        )
    }

    #[test]
    fn parse_host_port() {
        assert_eq!(
            "127.0.0.1:2525".parse(),
            Ok(Config {
                host: "127.0.0.1".to_string(),
                port: 2525,
                ..Config::default()
            })
        )
    }

    #[test]
    fn parse_user_pass_host() {
        assert_eq!(
            "user:pwd@127.0.0.1".parse(),
            Ok(Config {
                host: "127.0.0.1".to_string(),
                username: "user".to_string(),
                password: "pwd".to_string(),
                ..Config::default()
            })
        )
    }

    #[test]
    fn parse_user_pass_host_port() {
        assert_eq!(
            "user:pwd@127.0.0.1:465".parse(),
            Ok(Config {
                host: "127.0.0.1".to_string(),
                port: 465,
                username: "user".to_string(),
                password: "pwd".to_string(),
                ..Config::default()
            })
        )
    }

    #[test]
    fn parse_user_without_password() {
        assert_eq!(
            "user@127.0.0.1".parse::<Config>(),
            Err("missing ':' in user")
        )
    }

    #[test]
    fn parse_empty_host() {
        assert_eq!("".parse::<Config>(), Err("invalid address"));
        assert_eq!("user:pwd@".parse::<Config>(), Err("invalid address"));
    }

    #[test]
    fn parse_bad_port() {
        assert_eq!(
            "127.0.0.1:foo".parse::<Config>(),
            Err("invalid port number")
        )
    }

    #[test]
    fn encryption_mode_names() {
        assert_eq!("insecure".parse::<Encryption>().unwrap(), Encryption::Insecure);
        assert_eq!("starttls".parse::<Encryption>().unwrap(), Encryption::StartTls);
        assert_eq!("implicit-tls".parse::<Encryption>().unwrap(), Encryption::ImplicitTls);
        assert_eq!("tls".parse::<Encryption>().unwrap(), Encryption::ImplicitTls);
    }

    #[test]
    fn unknown_encryption_mode_is_rejected() {
        match "ssl".parse::<Encryption>() {
            Err(Error::UnsupportedEncryption(mode)) => assert_eq!(mode, "ssl"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
