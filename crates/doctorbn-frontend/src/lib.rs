//! # DoctorBN Frontend
//!
//! Loaders that turn serialized discrete Bayesian networks (BIF or Hugin NET)
//! into a validated in-memory [`Network`].

pub mod bif;
pub mod errors;
pub mod net;
pub mod network;

use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use bif::parse_bif;
pub use errors::FrontendError;
pub use net::parse_net;
pub use network::{Network, PotentialDecl, Variable, VariableDecl};

/// Serialization format of a network description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NetworkFormat {
    /// Bayesian Interchange Format (`.bif`).
    Bif,
    /// Hugin NET format (`.net`).
    Net,
}

impl NetworkFormat {
    /// Guess the format from a file extension (`bif` / `net`, case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.parse().ok()
    }
}

impl FromStr for NetworkFormat {
    type Err = FrontendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bif" => Ok(Self::Bif),
            "net" => Ok(Self::Net),
            _ => Err(FrontendError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for NetworkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bif => write!(f, "bif"),
            Self::Net => write!(f, "net"),
        }
    }
}

/// Load a network from its serialized text.
pub fn load_network(source: &str, format: NetworkFormat) -> Result<Network, FrontendError> {
    // Both grammars treat `\r` as whitespace, so CRLF uploads load unchanged.
    match format {
        NetworkFormat::Bif => parse_bif(source),
        NetworkFormat::Net => parse_net(source),
    }
}
