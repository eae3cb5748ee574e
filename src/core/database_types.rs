//! Database type definitions
//!
//! This module defines the SQL dialects the mapper can introspect.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// MySQL/MariaDB database
    Mysql,
    /// SQLite database
    #[default]
    Sqlite,
}

impl DatabaseType {
    /// Convert database type to string representation
    pub fn to_str(&self) -> &'static str {
        match self {
            DatabaseType::Mysql => "mysql",
            DatabaseType::Sqlite => "sqlite",
        }
    }

    /// Statement that describes a table's columns in this dialect
    pub fn describe_statement(&self, table: &str) -> String {
        match self {
            DatabaseType::Mysql => format!("DESCRIBE {}", table),
            DatabaseType::Sqlite => format!("PRAGMA table_info({})", table),
        }
    }

    /// Port used when the configuration names none
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseType::Mysql => Some(3306),
            DatabaseType::Sqlite => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseType::Mysql),
            "sqlite" | "sqlite3" => Ok(DatabaseType::Sqlite),
            _ => Err(format!("Invalid database type: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_from_str() {
        assert_eq!("mysql".parse::<DatabaseType>().ok(), Some(DatabaseType::Mysql));
        assert_eq!("MariaDB".parse::<DatabaseType>().ok(), Some(DatabaseType::Mysql));
        assert_eq!("sqlite3".parse::<DatabaseType>().ok(), Some(DatabaseType::Sqlite));
        assert_eq!("postgres".parse::<DatabaseType>().ok(), None);
    }

    #[test]
    fn test_describe_statement() {
        assert_eq!(DatabaseType::Mysql.describe_statement("users"), "DESCRIBE users");
        assert_eq!(
            DatabaseType::Sqlite.describe_statement("users"),
            "PRAGMA table_info(users)"
        );
    }
}
