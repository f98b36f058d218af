//! Per-operation deadline configuration.

use crate::common::*;
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use std::time::Duration;

/// The deadline applied to each operation family.
///
/// Every store call made through docgate is bounded by one of these
/// durations. Defaults: connect 10s, ping 2s, insert one 5s, insert many 20s,
/// find one 5s, find many/all 30s, delete 2s. Disconnect reuses the connect
/// deadline.
///
/// `Deadlines` implements serde's traits so a host application can embed it
/// in its own configuration file.
///
/// # Examples
///
/// ```rust,ignore
/// use docgate::config::Deadlines;
/// use std::time::Duration;
///
/// let deadlines = Deadlines::default()
///     .with_find(Duration::from_secs(60))
///     .with_delete(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Deadlines {
    pub connect: Duration,
    pub ping: Duration,
    pub insert_one: Duration,
    pub insert_many: Duration,
    pub find_one: Duration,
    pub find: Duration,
    pub delete: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Deadlines {
            connect: DEFAULT_CONNECT_DEADLINE,
            ping: DEFAULT_PING_DEADLINE,
            insert_one: DEFAULT_INSERT_ONE_DEADLINE,
            insert_many: DEFAULT_INSERT_MANY_DEADLINE,
            find_one: DEFAULT_FIND_ONE_DEADLINE,
            find: DEFAULT_FIND_DEADLINE,
            delete: DEFAULT_DELETE_DEADLINE,
        }
    }
}

impl Deadlines {
    /// Applies the same deadline to every operation. Mostly useful in tests.
    pub fn uniform(deadline: Duration) -> Self {
        Deadlines {
            connect: deadline,
            ping: deadline,
            insert_one: deadline,
            insert_many: deadline,
            find_one: deadline,
            find: deadline,
            delete: deadline,
        }
    }

    pub fn with_connect(mut self, deadline: Duration) -> Self {
        self.connect = deadline;
        self
    }

    pub fn with_ping(mut self, deadline: Duration) -> Self {
        self.ping = deadline;
        self
    }

    pub fn with_insert_one(mut self, deadline: Duration) -> Self {
        self.insert_one = deadline;
        self
    }

    pub fn with_insert_many(mut self, deadline: Duration) -> Self {
        self.insert_many = deadline;
        self
    }

    pub fn with_find_one(mut self, deadline: Duration) -> Self {
        self.find_one = deadline;
        self
    }

    pub fn with_find(mut self, deadline: Duration) -> Self {
        self.find = deadline;
        self
    }

    pub fn with_delete(mut self, deadline: Duration) -> Self {
        self.delete = deadline;
        self
    }

    /// Rejects zero deadlines, which would fail every call immediately.
    pub fn validate(&self) -> GatewayResult<()> {
        let named = [
            ("connect", self.connect),
            ("ping", self.ping),
            ("insert_one", self.insert_one),
            ("insert_many", self.insert_many),
            ("find_one", self.find_one),
            ("find", self.find),
            ("delete", self.delete),
        ];

        match named.iter().find(|(_, deadline)| deadline.is_zero()) {
            Some((name, _)) => {
                log::error!("Deadline for {} must be greater than zero", name);
                Err(GatewayError::new(
                    &format!("deadline for {} must be greater than zero", name),
                    ErrorKind::InvalidOperation,
                ))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design() {
        let deadlines = Deadlines::default();
        assert_eq!(deadlines.connect, Duration::from_secs(10));
        assert_eq!(deadlines.ping, Duration::from_secs(2));
        assert_eq!(deadlines.insert_one, Duration::from_secs(5));
        assert_eq!(deadlines.insert_many, Duration::from_secs(20));
        assert_eq!(deadlines.find_one, Duration::from_secs(5));
        assert_eq!(deadlines.find, Duration::from_secs(30));
        assert_eq!(deadlines.delete, Duration::from_secs(2));
        assert!(deadlines.validate().is_ok());
    }

    #[test]
    fn setters_override_single_family() {
        let deadlines = Deadlines::default().with_find(Duration::from_secs(60));
        assert_eq!(deadlines.find, Duration::from_secs(60));
        assert_eq!(deadlines.find_one, Duration::from_secs(5));
    }

    #[test]
    fn zero_deadline_is_invalid() {
        let deadlines = Deadlines::default().with_delete(Duration::ZERO);
        let err = deadlines.validate().err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
        assert!(err.message().contains("delete"));
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let json = r#"{"find": {"secs": 45, "nanos": 0}}"#;
        let deadlines: Deadlines = serde_json::from_str(json).unwrap();
        assert_eq!(deadlines.find, Duration::from_secs(45));
        assert_eq!(deadlines.connect, Duration::from_secs(10));
    }

    #[test]
    fn uniform_sets_everything() {
        let deadlines = Deadlines::uniform(Duration::from_millis(50));
        assert_eq!(deadlines.connect, Duration::from_millis(50));
        assert_eq!(deadlines.delete, Duration::from_millis(50));
    }
}
