use crate::address::Address;

/// Caller-supplied message headers.
///
/// Entries keep their insertion order and a name may carry several
/// values; names are matched case-sensitively, exactly as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Create an empty header collection.
    pub fn new() -> Self {
        Headers::default()
    }

    /// Append a value to the named header,
    /// creating the header at the end if it does not exist yet.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Replace the named header with a single value.
    ///
    /// An existing header keeps its position; a new one is appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// The first value of the named header.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.position(name)?;
        self.entries[index].1.first().map(String::as_str)
    }

    /// Whether the named header exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    /// Whether the collection holds no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order,
    /// one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }
}

/// What the renderer and the delivery engine need to know about
/// a message.
///
/// Any value exposing these accessors can be sent; the engine never
/// looks at the concrete type behind them.
pub trait Message {
    /// The sender, when the message carries one itself.
    fn from(&self) -> Option<&Address>;

    /// The `To` recipients; these are also the envelope recipients.
    fn to(&self) -> &[Address];

    /// The `Cc` recipients, named in headers only.
    fn cc(&self) -> &[Address];

    /// The `Bcc` recipients, named in headers only.
    fn bcc(&self) -> &[Address];

    /// Extra headers supplied by the caller.
    fn headers(&self) -> &Headers;

    /// The subject line.
    fn subject(&self) -> &str;

    /// The body, before any transfer encoding.
    fn body(&self) -> &str;
}

/// A plain message assembled field by field.
#[derive(Debug, Clone, Default)]
pub struct Email {
    pub from: Option<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub headers: Headers,
    pub subject: String,
    pub body: String,
}

impl Email {
    /// Shorthand for the common case: sender, recipients, subject, body.
    pub fn new(
        from: Address,
        to: Vec<Address>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Email {
            from: Some(from),
            to,
            subject: subject.into(),
            body: body.into(),
            ..Email::default()
        }
    }
}

impl Message for Email {
    fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    fn to(&self) -> &[Address] {
        &self.to
    }

    fn cc(&self) -> &[Address] {
        &self.cc
    }

    fn bcc(&self) -> &[Address] {
        &self.bcc
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn body(&self) -> &str {
        &self.body
    }
}
