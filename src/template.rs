//! Compose message bodies from `tera` templates.
//!
//! Only available with the `template` feature.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};

use crate::address::Address;
use crate::error::Error;
use crate::message::{Email, Headers, Message};

/// File extension used when scanning a layout directory without a
/// configured extension.
pub const DEFAULT_LAYOUT_EXTENSION: &str = "html";

/// The template itself is always registered under this name.
const MAIN_TEMPLATE: &str = "main";

/// Where to find the layouts a template may extend.
#[derive(Debug, Clone, Default)]
pub struct TemplateConfig {
    /// Layout files loaded one by one; each is registered under its
    /// file name.
    pub layout_files: Vec<PathBuf>,
    /// A directory scanned for layout files.
    pub layout_directory: Option<PathBuf>,
    /// Extension for the directory scan;
    /// [`DEFAULT_LAYOUT_EXTENSION`] when unset.
    pub layout_extension: Option<String>,
}

/// A template file together with the layouts it may extend.
#[derive(Debug, Clone)]
pub struct Template {
    file: PathBuf,
    config: TemplateConfig,
}

impl Template {
    /// Create a template from its main file and a layout
    /// configuration.
    pub fn new(file: impl Into<PathBuf>, config: TemplateConfig) -> Self {
        Template {
            file: file.into(),
            config,
        }
    }

    /// Render the template with `data` into a finished body.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String, Error> {
        let mut tera = Tera::default();
        if let Some(directory) = &self.config.layout_directory {
            let extension = self
                .config
                .layout_extension
                .as_deref()
                .unwrap_or(DEFAULT_LAYOUT_EXTENSION);
            let directory = directory.display().to_string();
            let glob = format!("{}/*.{extension}", directory.trim_end_matches('/'));
            tera.extend(&Tera::new(&glob)?)?;
        }
        let mut files: Vec<(&Path, Option<&str>)> = self
            .config
            .layout_files
            .iter()
            .map(|file| {
                let name = file.file_name().and_then(|name| name.to_str());
                (file.as_path(), name)
            })
            .collect();
        files.push((self.file.as_path(), Some(MAIN_TEMPLATE)));
        tera.add_template_files(files)?;
        let context = Context::from_serialize(data)?;
        Ok(tera.render(MAIN_TEMPLATE, &context)?)
    }
}

/// An [`Email`] whose body is rendered from a [`Template`].
///
/// The template is rendered once, up front; afterwards the value
/// answers the message accessors exactly like the email it wraps.
#[derive(Debug, Clone)]
pub struct TemplateEmail {
    email: Email,
}

impl TemplateEmail {
    /// Render `template` with `data` and store the output as the body
    /// of `email`.
    pub fn new<T: Serialize>(
        mut email: Email,
        template: &Template,
        data: &T,
    ) -> Result<Self, Error> {
        email.body = template.render(data)?;
        Ok(TemplateEmail { email })
    }

    /// The wrapped email, rendered body included.
    pub fn into_email(self) -> Email {
        self.email
    }
}

impl Message for TemplateEmail {
    fn from(&self) -> Option<&Address> {
        self.email.from()
    }

    fn to(&self) -> &[Address] {
        self.email.to()
    }

    fn cc(&self) -> &[Address] {
        self.email.cc()
    }

    fn bcc(&self) -> &[Address] {
        self.email.bcc()
    }

    fn headers(&self) -> &Headers {
        self.email.headers()
    }

    fn subject(&self) -> &str {
        self.email.subject()
    }

    fn body(&self) -> &str {
        self.email.body()
    }
}
