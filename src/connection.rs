use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use rusqlite::{Connection, Error as RusqliteError};

/// Identifies the target database. The connection it opens belongs to the
/// caller and is closed when dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionDescriptor {
    Path(PathBuf),
    InMemory,
}

impl ConnectionDescriptor {
    pub const IN_MEMORY: &'static str = ":memory:";

    pub fn open(&self) -> Result<Connection, RusqliteError> {
        let conn = match self {
            ConnectionDescriptor::Path(path) => Connection::open(path)?,
            ConnectionDescriptor::InMemory => Connection::open_in_memory()?,
        };
        debug!("Database opened at: {}", self);
        Ok(conn)
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ConnectionDescriptor::from(s))
    }
}

impl From<&str> for ConnectionDescriptor {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s == Self::IN_MEMORY {
            ConnectionDescriptor::InMemory
        } else {
            ConnectionDescriptor::Path(PathBuf::from(s))
        }
    }
}

impl From<&Path> for ConnectionDescriptor {
    fn from(path: &Path) -> Self {
        ConnectionDescriptor::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ConnectionDescriptor {
    fn from(path: PathBuf) -> Self {
        ConnectionDescriptor::Path(path)
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionDescriptor::Path(path) => write!(f, "{}", path.display()),
            ConnectionDescriptor::InMemory => f.write_str(Self::IN_MEMORY),
        }
    }
}
