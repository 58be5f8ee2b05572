//! External link indexes: `package-list` and `element-list` files published alongside hosted
//! documentation.
//!
//! A plain Javadoc list holds one package name per line. Java 9+ `element-list` files may group
//! packages under `module:<name>` lines. Dokka-generated lists add `$dokka.` headers:
//!
//! ```text
//! $dokka.format:html-v1
//! $dokka.linkExtension:html
//! $dokka.location:kotlin.io.println(kotlin.Any)\u{1f}kotlin.io/println.html
//! kotlin
//! kotlin.io
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    identity::DeclarationId,
    location::anchor::anchor_for,
};

/// A dotted package name.
static PACKAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}_$][\p{L}\p{N}_$]*(\.[\p{L}_$][\p{L}\p{N}_$]*)*$")
        .expect("package name pattern must compile")
});

/// URL layout of a documentation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `java/lang/String.html`, members as `String.html#length--`.
    Javadoc,
    /// `kotlin/-string/index.html`, members as `kotlin/-string/length.html`.
    Dokka,
}

/// Parsed index of one external documentation site.
#[derive(Debug, Clone)]
pub struct ExternalLinkIndex {
    /// Base URL, always ending in `/`.
    base_url: String,
    /// URL layout of the site.
    style: LinkStyle,
    /// Page extension used by the site.
    extension: String,
    /// Known packages, mapped to the module directory they live under, if any.
    packages: HashMap<String, Option<String>>,
    /// Explicit relative locations keyed by identity text.
    locations: HashMap<String, String>,
}

impl ExternalLinkIndex {
    /// An index with no packages, for a site with the given style.
    pub fn new(base_url: &str, style: LinkStyle) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            style,
            extension: "html".to_string(),
            packages: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    /// Parse index text fetched for `base_url`. Malformed lines are skipped and reported.
    pub fn parse(base_url: &str, text: &str, diagnostics: &Diagnostics) -> Self {
        let mut index = Self::new(base_url, LinkStyle::Javadoc);
        let mut module: Option<String> = None;
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix("$dokka.") {
                index.parse_header(header);
            } else if let Some(name) = line.strip_prefix("module:") {
                module = Some(name.trim().to_string()).filter(|m| !m.is_empty());
            } else if PACKAGE_NAME.is_match(line) {
                index.packages.insert(line.to_string(), module.clone());
            } else {
                diagnostics.report(Diagnostic::SkippedIndexLine {
                    url: index.base_url.clone(),
                    line: number + 1,
                    content: raw.to_string(),
                });
            }
        }
        debug!(
            url = %index.base_url,
            packages = index.packages.len(),
            locations = index.locations.len(),
            "parsed external index"
        );
        index
    }

    /// Apply a `$dokka.` header, without its prefix.
    fn parse_header(&mut self, header: &str) {
        let Some((key, value)) = header.split_once(':') else {
            debug!(header, "ignoring malformed index header");
            return;
        };
        match key {
            "format" => {
                self.style = if value.starts_with("javadoc") {
                    LinkStyle::Javadoc
                } else {
                    LinkStyle::Dokka
                };
            }
            "linkExtension" => self.extension = value.trim().to_string(),
            "location" => {
                if let Some((id, url)) = value.split_once(['\u{1f}', '\t']) {
                    self.locations.insert(id.trim().to_string(), url.trim().to_string());
                }
            }
            _ => debug!(key, "ignoring unknown index header"),
        }
    }

    /// Register a package, for building indexes by hand.
    pub fn with_package(mut self, package: &str) -> Self {
        self.packages.insert(package.to_string(), None);
        self
    }

    /// Base URL of the site.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL layout of the site.
    pub fn style(&self) -> LinkStyle {
        self.style
    }

    /// Number of known packages.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Absolute URL for `id`, if the site documents it.
    ///
    /// Explicit locations win. Otherwise the longest known package enclosing the identity is
    /// located and the rest of the path is laid out by the site's link style.
    pub fn resolve(&self, id: &DeclarationId) -> Option<String> {
        let explicit = self
            .locations
            .get(&id.to_string())
            .or_else(|| self.locations.get(id.path()));
        if let Some(relative) = explicit {
            return Some(format!("{}{relative}", self.base_url));
        }

        if let Some(module) = self.packages.get(id.path()) {
            return Some(self.package_url(id.path(), module.as_deref()));
        }
        let (package, module) = id
            .enclosing_prefixes()
            .find_map(|prefix| self.packages.get(prefix).map(|m| (prefix, m.as_deref())))?;
        let rest: Vec<&str> = id.path()[package.len() + 1..].split('.').collect();
        let (types, member) = if id.is_callable() {
            let (member, types) = rest.split_last()?;
            (types, Some(member))
        } else {
            (rest.as_slice(), None)
        };
        Some(self.declaration_url(package, module, types, member.map(|_| id)))
    }

    /// Directory prefix for a package, including the module directory.
    fn package_dir(&self, package: &str, module: Option<&str>) -> String {
        let package_dir = match self.style {
            LinkStyle::Javadoc => package.replace('.', "/"),
            LinkStyle::Dokka => package.to_string(),
        };
        match module {
            Some(module) => format!("{}{module}/{package_dir}", self.base_url),
            None => format!("{}{package_dir}", self.base_url),
        }
    }

    /// URL of a package summary page.
    fn package_url(&self, package: &str, module: Option<&str>) -> String {
        let dir = self.package_dir(package, module);
        match self.style {
            LinkStyle::Javadoc => format!("{dir}/package-summary.{}", self.extension),
            LinkStyle::Dokka => format!("{dir}/index.{}", self.extension),
        }
    }

    /// URL of a type, or of a member when `member` is given.
    fn declaration_url(
        &self,
        package: &str,
        module: Option<&str>,
        types: &[&str],
        member: Option<&DeclarationId>,
    ) -> String {
        let dir = self.package_dir(package, module);
        let ext = &self.extension;
        match self.style {
            LinkStyle::Javadoc => {
                if types.is_empty() {
                    // A top-level callable has no class page; point at the package.
                    return format!("{dir}/package-summary.{ext}");
                }
                let page = format!("{dir}/{}.{ext}", types.join("."));
                match member {
                    Some(member) => format!("{page}#{}", anchor_for(member)),
                    None => page,
                }
            }
            LinkStyle::Dokka => {
                let mut url = dir;
                for ty in types {
                    url.push('/');
                    url.push_str(&dokka_name(ty));
                }
                match member {
                    Some(member) => format!("{url}/{}.{ext}", dokka_name(member.name())),
                    None => format!("{url}/index.{ext}"),
                }
            }
        }
    }
}

/// Dokka's file name encoding: every uppercase letter becomes `-` plus its lowercase form.
fn dokka_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for c in name.chars() {
        if c.is_uppercase() {
            out.push('-');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
