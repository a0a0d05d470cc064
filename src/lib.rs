//! Send email over SMTP with a small, fully synchronous client.
//!
//! A [`Mailer`] is configured once with server coordinates,
//! credentials, an encryption mode and an auth mode. Every call to
//! [`send`](Mailer::send) renders the message into a header block with
//! a base64-encoded body, opens its own connection, walks the SMTP
//! exchange and tears everything down again; nothing is shared between
//! sends.
//!
//! A message is anything implementing [`Message`]; [`Email`] is the
//! plain concrete type. With the `template` feature enabled, bodies
//! can be rendered from `tera` templates via `TemplateEmail`.
//!
//! # Examples
//!
//! ```no_run
//! use smtp_mailer::{Address, Auth, Config, Email, Encryption, Mailer};
//!
//! let mut config: Config = "user:secret@smtp.example.com:465".parse().unwrap();
//! config.encryption = Encryption::ImplicitTls;
//! config.auth = Auth::Plain;
//!
//! let email = Email::new(
//!     Address::with_name("noreply@example.com", "Noreply").unwrap(),
//!     vec![Address::new("someone@example.com").unwrap()],
//!     "Welcome",
//!     "<p>Welcome aboard!</p>",
//! );
//!
//! let mailer = Mailer::new(config);
//! mailer.send(&email).unwrap();
//! ```

#![forbid(unsafe_code)]

mod address;
mod config;
mod error;
mod mailer;
mod message;
mod render;
mod smtp;

#[cfg(feature = "template")]
mod template;

pub use address::Address;
pub use config::{Auth, Config, Encryption};
pub use error::Error;
pub use mailer::Mailer;
pub use message::{Email, Headers, Message};
pub use render::render;
pub use smtp::Reply;

#[cfg(feature = "template")]
pub use template::{Template, TemplateConfig, TemplateEmail, DEFAULT_LAYOUT_EXTENSION};
