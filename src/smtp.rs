use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use md5::Md5;
use native_tls::{TlsConnector, TlsStream};

use crate::error::Error;

/// A complete server reply: the status code
/// and one text entry per reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The three-digit status code.
    pub code: u16,
    /// The text after the code, one entry per line for
    /// multi-line replies.
    pub lines: Vec<String>,
}

impl Reply {
    /// Whether this is a positive completion (2xx).
    pub fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Whether this is a positive intermediate reply (3xx), such as
    /// the `354` that opens the data channel.
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// Whether the server reported an error (4xx or 5xx).
    pub fn is_error(&self) -> bool {
        self.code >= 400
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.lines.join(" "))
    }
}

/// The transport under a session: plain before any upgrade,
/// encrypted after.
pub(crate) enum Stream {
    Plain(TcpStream),
    Tls(TlsStream<TcpStream>),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(stream) => stream.read(buf),
            Stream::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(stream) => stream.write(buf),
            Stream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(stream) => stream.flush(),
            Stream::Tls(stream) => stream.flush(),
        }
    }
}

/// A blocking SMTP session over an established transport.
///
/// The session sequences single commands and their replies; which
/// commands run, and in which order, is up to the delivery engine.
pub(crate) struct Session<S> {
    stream: BufReader<S>,
}

impl<S: Read + Write> Session<S> {
    /// Wrap a connected transport and consume the server greeting.
    pub(crate) fn open(transport: S) -> Result<Self, Error> {
        let mut session = Session {
            stream: BufReader::new(transport),
        };
        let greeting = session.read_reply()?;
        if !greeting.is_positive() {
            return Err(Error::Protocol(greeting));
        }
        Ok(session)
    }

    /// Identify the client, falling back to `HELO` for servers that
    /// reject the extended hello.
    pub(crate) fn hello(&mut self, domain: &str) -> Result<Reply, Error> {
        let reply = self.command(&format!("EHLO {domain}"))?;
        if reply.is_positive() {
            Ok(reply)
        } else {
            self.expect(&format!("HELO {domain}"))
        }
    }

    /// Authenticate with `AUTH PLAIN` (RFC 4616), sending the
    /// credentials as an initial response.
    pub(crate) fn auth_plain(&mut self, username: &str, password: &str) -> Result<(), Error> {
        let credentials = plain_credentials(username, password);
        self.expect(&format!("AUTH PLAIN {credentials}")).map(drop)
    }

    /// Authenticate with the `CRAM-MD5` challenge-response scheme
    /// (RFC 2195).
    pub(crate) fn auth_cram_md5(&mut self, username: &str, password: &str) -> Result<(), Error> {
        let challenge = self.command("AUTH CRAM-MD5")?;
        if !challenge.is_intermediate() {
            return Err(Error::Protocol(challenge));
        }
        let encoded = challenge.lines.first().map(String::as_str).unwrap_or("");
        let decoded = Base64::decode_vec(encoded).map_err(|_| {
            Error::Transport(io::Error::new(
                io::ErrorKind::InvalidData,
                "malformed CRAM-MD5 challenge",
            ))
        })?;
        let response = cram_md5_response(username, password, &decoded)?;
        self.expect(&response).map(drop)
    }

    /// Announce the envelope sender.
    pub(crate) fn mail_from(&mut self, address: &str) -> Result<(), Error> {
        self.expect(&format!("MAIL FROM:<{address}>")).map(drop)
    }

    /// Enroll one envelope recipient.
    pub(crate) fn rcpt_to(&mut self, address: &str) -> Result<(), Error> {
        self.expect(&format!("RCPT TO:<{address}>")).map(drop)
    }

    /// Transmit the rendered payload as the message data.
    pub(crate) fn data(&mut self, payload: &str) -> Result<(), Error> {
        let reply = self.command("DATA")?;
        if !reply.is_intermediate() {
            return Err(Error::Protocol(reply));
        }
        let mut data = dot_stuff(payload);
        if !data.ends_with("\r\n") {
            data.push_str("\r\n");
        }
        data.push_str(".\r\n");
        self.send(&data)?;
        let reply = self.read_reply()?;
        if reply.is_positive() {
            Ok(())
        } else {
            Err(Error::Protocol(reply))
        }
    }

    /// End the session.
    pub(crate) fn quit(&mut self) -> Result<(), Error> {
        self.expect("QUIT").map(drop)
    }

    /// Send one command line and read the complete reply.
    fn command(&mut self, line: &str) -> Result<Reply, Error> {
        self.send(&format!("{line}\r\n"))?;
        self.read_reply()
    }

    /// Send a command and fail unless the reply is a positive
    /// completion.
    fn expect(&mut self, line: &str) -> Result<Reply, Error> {
        let reply = self.command(line)?;
        if reply.is_positive() {
            Ok(reply)
        } else {
            Err(Error::Protocol(reply))
        }
    }

    fn send(&mut self, data: &str) -> Result<(), Error> {
        #[cfg(feature = "tracing")]
        {
            use tracing::{event, Level};
            event!(Level::TRACE, send = data);
        }
        let stream = self.stream.get_mut();
        stream.write_all(data.as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    fn read_reply(&mut self) -> Result<Reply, Error> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if self.stream.read_line(&mut line)? == 0 {
                return Err(Error::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed during reply",
                )));
            }
            #[cfg(feature = "tracing")]
            {
                use tracing::{event, Level};
                event!(Level::TRACE, recv = line.as_str());
            }
            let text = line.trim_end();
            let code = text
                .get(..3)
                .and_then(|digits| digits.parse().ok())
                .ok_or_else(|| {
                    Error::Transport(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("malformed reply line {text:?}"),
                    ))
                })?;
            // A dash after the code marks a continued reply.
            let done = text.as_bytes().get(3) != Some(&b'-');
            lines.push(text.get(4..).unwrap_or("").to_string());
            if done {
                return Ok(Reply { code, lines });
            }
        }
    }
}

impl Session<Stream> {
    /// Issue `STARTTLS` and upgrade the connection in place.
    ///
    /// Consumes the session; nothing read or written before the
    /// upgrade carries over.
    pub(crate) fn starttls(
        mut self,
        connector: &TlsConnector,
        domain: &str,
    ) -> Result<Self, Error> {
        let reply = self.command("STARTTLS")?;
        if !reply.is_positive() {
            return Err(Error::Protocol(reply));
        }
        match self.stream.into_inner() {
            Stream::Plain(tcp) => {
                let tls = connector.connect(domain, tcp)?;
                Ok(Session {
                    stream: BufReader::new(Stream::Tls(tls)),
                })
            }
            Stream::Tls(_) => Err(Error::Transport(io::Error::new(
                io::ErrorKind::InvalidInput,
                "connection is already encrypted",
            ))),
        }
    }
}

/// Encode the PLAIN initial response: NUL, user, NUL, password,
/// all base64.
fn plain_credentials(username: &str, password: &str) -> String {
    let mut data = Vec::with_capacity(2 + username.len() + password.len());
    data.push(0);
    data.extend(username.bytes());
    data.push(0);
    data.extend(password.bytes());
    Base64::encode_string(&data)
}

/// Build the CRAM-MD5 response line:
/// base64 of `username SP hex(HMAC-MD5(password, challenge))`.
fn cram_md5_response(
    username: &str,
    password: &str,
    challenge: &[u8],
) -> Result<String, Error> {
    let mut mac = Hmac::<Md5>::new_from_slice(password.as_bytes()).map_err(|_| {
        Error::Transport(io::Error::new(
            io::ErrorKind::InvalidInput,
            "unusable CRAM-MD5 password",
        ))
    })?;
    mac.update(challenge);
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(Base64::encode_string(
        format!("{username} {digest}").as_bytes(),
    ))
}

/// Escape lines starting with a dot in the data section
/// (RFC 5321, section 4.5.2).
fn dot_stuff(payload: &str) -> String {
    payload
        .split('\n')
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with('.') {
                format!(".{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}
