use std::io;
use std::net::{TcpStream, ToSocketAddrs};

use native_tls::TlsConnector;

use crate::address::Address;
use crate::config::{Auth, Config, Encryption};
use crate::error::Error;
use crate::message::Message;
use crate::render;
use crate::smtp::{Session, Stream};

/// The delivery engine.
///
/// A mailer owns nothing but its [`Config`]. Every call to
/// [`send`](Mailer::send) renders the message, opens a fresh
/// connection, walks the SMTP exchange and tears the connection down
/// again; nothing is cached or pooled between sends. Since the
/// configuration is read-only after construction, a mailer can be
/// shared freely.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: Config,
}

impl Mailer {
    /// Create a mailer for the given configuration.
    pub fn new(config: Config) -> Self {
        Mailer { config }
    }

    /// The configuration this mailer was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Render and deliver one message.
    ///
    /// The envelope sender is the message's own sender, falling back
    /// to the configured default; the envelope recipients are the `To`
    /// addresses. Any failing step aborts the whole send with its
    /// error, without retries.
    pub fn send(&self, message: &impl Message) -> Result<(), Error> {
        let default_sender = self.config.default_sender.as_ref();
        let sender = render::effective_sender(message, default_sender)?;
        let payload = render::render(message, default_sender)?;
        match self.config.encryption {
            Encryption::ImplicitTls => {
                self.send_implicit_tls(sender, message.to(), &payload)
            }
            Encryption::StartTls => self.send_starttls(sender, message.to(), &payload),
            Encryption::Insecure => self.send_insecure(sender, message.to(), &payload),
        }
    }

    /// Encrypt first, then run the whole exchange over the encrypted
    /// channel.
    fn send_implicit_tls(
        &self,
        sender: &Address,
        recipients: &[Address],
        payload: &str,
    ) -> Result<(), Error> {
        let connector = self.tls_connector()?;
        let transport = self.connect()?;
        let transport = connector.connect(&self.config.host, transport)?;
        let mut session = Session::open(Stream::Tls(transport))?;
        session.hello(&self.config.ehlo_domain)?;
        self.submit(&mut session, sender, recipients, payload)
    }

    /// Plaintext greeting and hello, then an in-band upgrade before
    /// anything sensitive crosses the wire.
    fn send_starttls(
        &self,
        sender: &Address,
        recipients: &[Address],
        payload: &str,
    ) -> Result<(), Error> {
        let connector = self.tls_connector()?;
        let transport = self.connect()?;
        let mut session = Session::open(Stream::Plain(transport))?;
        session.hello(&self.config.ehlo_domain)?;
        let mut session = session.starttls(&connector, &self.config.host)?;
        // Extensions reset on upgrade; greet again.
        session.hello(&self.config.ehlo_domain)?;
        self.submit(&mut session, sender, recipients, payload)
    }

    /// The whole transaction in plaintext.
    fn send_insecure(
        &self,
        sender: &Address,
        recipients: &[Address],
        payload: &str,
    ) -> Result<(), Error> {
        let transport = self.connect()?;
        let mut session = Session::open(Stream::Plain(transport))?;
        session.hello(&self.config.ehlo_domain)?;
        self.submit(&mut session, sender, recipients, payload)
    }

    /// The tail every encryption mode shares: authenticate, set the
    /// envelope, transmit the payload, quit.
    fn submit(
        &self,
        session: &mut Session<Stream>,
        sender: &Address,
        recipients: &[Address],
        payload: &str,
    ) -> Result<(), Error> {
        match self.config.auth {
            Auth::Plain => {
                session.auth_plain(&self.config.username, &self.config.password)?
            }
            Auth::CramMd5 => {
                session.auth_cram_md5(&self.config.username, &self.config.password)?
            }
            Auth::None => {}
        }
        session.mail_from(sender.bare())?;
        for recipient in recipients {
            session.rcpt_to(recipient.bare())?;
        }
        session.data(payload)?;
        session.quit()
    }

    /// Open the TCP connection, trying every resolved address, and arm
    /// the configured deadlines.
    fn connect(&self) -> Result<TcpStream, Error> {
        let addresses = (self.config.host.as_str(), self.config.port).to_socket_addrs()?;
        let mut last_error = None;
        for address in addresses {
            match TcpStream::connect_timeout(&address, self.config.dial_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.config.io_timeout))?;
                    stream.set_write_timeout(Some(self.config.io_timeout))?;
                    return Ok(stream);
                }
                Err(error) => last_error = Some(error),
            }
        }
        Err(Error::Transport(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("host {:?} did not resolve", self.config.host),
            )
        })))
    }

    fn tls_connector(&self) -> Result<TlsConnector, Error> {
        let mut builder = TlsConnector::builder();
        if self.config.accept_invalid_certs {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        Ok(builder.build()?)
    }
}
