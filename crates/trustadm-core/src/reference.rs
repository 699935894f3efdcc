//! Repository reference parsing.
//!
//! Trust metadata is keyed by repository name and applies to mutable tags, so
//! every repository argument goes through [`parse_repository`] before any
//! trust-store call is made. The accepted grammar is the usual image
//! reference grammar:
//!
//! ```text
//! reference      := name [ ":" tag ] [ "@" digest ]
//! name           := [ domain "/" ] path-component [ "/" path-component ]*
//! domain         := domain-component [ "." domain-component ]* [ ":" port ]
//! path-component := [a-z0-9]+ ( separator [a-z0-9]+ )*
//! separator      := "." | "_" | "__" | "-"+
//! tag            := [\w][\w.-]{0,127}
//! ```
//!
//! Bare 64-character hex identifiers and digest references are refused with
//! [`Error::InvalidRepositoryName`]; anything else that fails the grammar is
//! [`Error::InvalidReferenceFormat`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Maximum length of the name portion of a reference.
pub const NAME_TOTAL_LENGTH_MAX: usize = 255;

const LOCALHOST: &str = "localhost";

#[allow(clippy::expect_used)]
static ANCHORED_IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").expect("identifier regex is valid"));

#[allow(clippy::expect_used)]
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let domain_component = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
    let domain = format!(r"{domain_component}(?:\.{domain_component})*(?::[0-9]+)?");
    let path_component = r"[a-z0-9]+(?:(?:[._]|__|[-]+)[a-z0-9]+)*";
    let tag = r"[\w][\w.-]{0,127}";
    let digest = r"[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9A-Fa-f]{32,}";
    let pattern = format!(
        r"^(?P<name>(?:(?P<domain>{domain})/)?(?P<path>{path_component}(?:/{path_component})*))(?::(?P<tag>{tag}))?(?:@(?P<digest>{digest}))?$"
    );
    Regex::new(&pattern).expect("reference regex is valid")
});

/// A validated repository reference.
///
/// Only the name (and optional tag) survive parsing; digests are refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName {
    domain: Option<String>,
    path: String,
    tag: Option<String>,
}

impl RepositoryName {
    /// Registry host, if the reference named one.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Repository path below the registry host.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Tag, if the reference carried one.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Repository name without the tag, used as the trust-store key.
    pub fn name(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{domain}/{}", self.path),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        Ok(())
    }
}

/// Parse and validate a repository reference for trust operations.
pub fn parse_repository(reference: &str) -> Result<RepositoryName> {
    if ANCHORED_IDENTIFIER_RE.is_match(reference) {
        return Err(Error::InvalidRepositoryName {
            name: reference.to_string(),
            reason: "cannot specify 64-byte hexadecimal strings".to_string(),
        });
    }

    let Some(caps) = REFERENCE_RE.captures(reference) else {
        if reference.is_empty() {
            return Err(Error::InvalidReferenceFormat(Some(
                "repository name must have at least one component".into(),
            )));
        }
        let lowered = reference.to_lowercase();
        if lowered != reference && REFERENCE_RE.is_match(&lowered) {
            return Err(Error::InvalidReferenceFormat(Some(
                "repository name must be lowercase".into(),
            )));
        }
        return Err(Error::InvalidReferenceFormat(None));
    };

    let full_name = caps.name("name").map_or("", |m| m.as_str());
    if full_name.len() > NAME_TOTAL_LENGTH_MAX {
        return Err(Error::InvalidReferenceFormat(Some(format!(
            "repository name must not be more than {NAME_TOTAL_LENGTH_MAX} characters"
        ))));
    }

    if caps.name("digest").is_some() {
        return Err(Error::InvalidRepositoryName {
            name: reference.to_string(),
            reason: "trust operates on tags and cannot target a digest reference".to_string(),
        });
    }

    let (domain, path) = split_domain(full_name);
    Ok(RepositoryName {
        domain: domain.map(str::to_string),
        path: path.to_string(),
        tag: caps.name("tag").map(|m| m.as_str().to_string()),
    })
}

/// Split the leading registry host from a name.
///
/// The first component is a host only when it looks like one: it contains a
/// `.` or `:`, is `localhost`, or has uppercase letters.
fn split_domain(name: &str) -> (Option<&str>, &str) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains(['.', ':'])
                || first == LOCALHOST
                || first.chars().any(|c| c.is_ascii_uppercase()) =>
        {
            (Some(first), rest)
        },
        _ => (None, name),
    }
}
