//! Capability claims.
//!
//! A claim is a declarative token by which a tool requests a capability.
//! Flat claims come from a closed set (`http.get`, `fs.write`, ...);
//! parameterised claims carry a namespace (`log.append:events`) that is
//! reused both as an on-disk directory name and as a script-visible global,
//! so the namespace grammar is deliberately narrow.

use crate::error::ClaimError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A flat claim drawn from the closed capability set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlatClaim {
    /// HTTP GET requests
    HttpGet,
    /// HTTP POST requests
    HttpPost,
    /// Read a file
    FsRead,
    /// Write a file
    FsWrite,
    /// List a directory
    FsList,
}

impl FlatClaim {
    /// All members of the closed flat-claim set
    pub const ALL: [FlatClaim; 5] = [
        Self::HttpGet,
        Self::HttpPost,
        Self::FsRead,
        Self::FsWrite,
        Self::FsList,
    ];

    /// Canonical claim string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HttpGet => "http.get",
            Self::HttpPost => "http.post",
            Self::FsRead => "fs.read",
            Self::FsWrite => "fs.write",
            Self::FsList => "fs.list",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// Verb of a parameterised `log` claim
///
/// Each verb installs exactly one function, so a tool may hold append
/// without query and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogVerb {
    /// `log.append:<ns>` grants `<ns>.append`
    Append,
    /// `log.query:<ns>` grants `<ns>.query`
    Query,
}

impl LogVerb {
    /// Verb name as it appears in the claim string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Query => "query",
        }
    }
}

/// A parsed capability claim
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Claim {
    /// Member of the closed flat set
    Flat(FlatClaim),

    /// Namespaced log capability, one verb per claim
    Log {
        /// Which log operation is granted
        verb: LogVerb,
        /// Directory name under the log root and script-visible table name
        namespace: String,
    },
}

impl Claim {
    /// Parse and validate a claim string.
    ///
    /// # Errors
    ///
    /// Returns an error describing which part of the grammar failed.
    pub fn parse(claim: &str) -> Result<Self, ClaimError> {
        if let Some(flat) = FlatClaim::parse(claim) {
            return Ok(Self::Flat(flat));
        }

        let Some((head, namespace)) = claim.split_once(':') else {
            return Err(ClaimError::Unknown {
                claim: claim.to_string(),
            });
        };
        let Some((prefix, verb)) = head.split_once('.') else {
            return Err(ClaimError::UnknownPrefix {
                prefix: head.to_string(),
            });
        };
        if prefix != "log" {
            return Err(ClaimError::UnknownPrefix {
                prefix: prefix.to_string(),
            });
        }
        let verb = match verb {
            "append" => LogVerb::Append,
            "query" => LogVerb::Query,
            other => {
                return Err(ClaimError::UnknownVerb {
                    prefix: prefix.to_string(),
                    verb: other.to_string(),
                })
            }
        };
        if !is_valid_namespace(namespace) {
            return Err(ClaimError::InvalidNamespace {
                namespace: namespace.to_string(),
            });
        }
        Ok(Self::Log {
            verb,
            namespace: namespace.to_string(),
        })
    }

    /// Whether a claim string is recognised
    #[must_use]
    pub fn is_valid(claim: &str) -> bool {
        Self::parse(claim).is_ok()
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat(flat) => write!(f, "{}", flat.as_str()),
            Self::Log { verb, namespace } => {
                write!(f, "log.{}:{}", verb.as_str(), namespace)
            }
        }
    }
}

/// Check that a namespace is safe for use as a directory name.
///
/// Only lowercase alphanumerics and hyphens: no dots, no path separators,
/// no traversal, never empty.
#[must_use]
pub fn is_valid_namespace(ns: &str) -> bool {
    !ns.is_empty()
        && ns
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
