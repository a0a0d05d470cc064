use std::fmt;

use crate::error::Error;

/// A mailbox identity: an address plus an optional display name.
///
/// The [`canonical`](Address::canonical) form is what ends up in header
/// values, the [`bare`](Address::bare) form in envelope commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    address: String,
    name: Option<String>,
}

impl Address {
    /// Create an address without a display name.
    pub fn new(address: impl Into<String>) -> Result<Self, Error> {
        let address = address.into();
        validate(&address)?;
        Ok(Address {
            address,
            name: None,
        })
    }

    /// Create an address with a display name.
    ///
    /// An empty name is treated as no name at all.
    pub fn with_name(
        address: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, Error> {
        let address = address.into();
        validate(&address)?;
        let name = name.into();
        let name = if name.is_empty() { None } else { Some(name) };
        Ok(Address { address, name })
    }

    /// The header form: `Name <address>`,
    /// or just the address when there is no name.
    pub fn canonical(&self) -> String {
        match &self.name {
            Some(name) => format!("{name} <{}>", self.address),
            None => self.address.clone(),
        }
    }

    /// The bare mailbox spec used in `MAIL FROM` and `RCPT TO`.
    pub fn bare(&self) -> &str {
        &self.address
    }

    /// The display name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Minimal mailbox syntax: a non-empty local part and domain separated
/// by `@`, free of whitespace and angle brackets.
fn validate(address: &str) -> Result<(), Error> {
    let well_formed = match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    let clean = !address
        .chars()
        .any(|c| c.is_whitespace() || c == '<' || c == '>');
    if well_formed && clean {
        Ok(())
    } else {
        Err(Error::InvalidAddress(address.to_string()))
    }
}
