use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {field} '{value}', expected one of: {}", .expected.join(", "))]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

/// Wires an enum to its wire/storage text: `as_str`, `Display`, `FromStr`
/// and the rusqlite conversions all share one table of names.
macro_rules! text_enum {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        field: $field,
                        value: other.to_string(),
                        expected: Self::ALL,
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Recruiter,
    Admin,
}

text_enum!(Role, "role", {
    Student => "student",
    Recruiter => "recruiter",
    Admin => "admin",
});

impl Role {
    /// Roles a user may pick for themselves at registration.
    pub fn self_registrable(&self) -> bool {
        matches!(self, Role::Student | Role::Recruiter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePeriod {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Internship,
}

text_enum!(TimePeriod, "timePeriod", {
    FullTime => "Full-time",
    PartTime => "Part-time",
    Internship => "Internship",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    Job,
    Internship,
}

text_enum!(JobType, "jobType", {
    Job => "Job",
    Internship => "Internship",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

text_enum!(ApplicationStatus, "status", {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

impl ApplicationStatus {
    /// Only a decision can be set by a recruiter; `pending` is the initial state.
    pub fn is_decision(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Job,
    Application,
    Message,
}

text_enum!(NotificationKind, "type", {
    Job => "job",
    Application => "application",
    Message => "message",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("Full-time".parse::<TimePeriod>().unwrap(), TimePeriod::FullTime);
        assert_eq!("Internship".parse::<JobType>().unwrap(), JobType::Internship);
        assert_eq!("recruiter".parse::<Role>().unwrap(), Role::Recruiter);
        assert_eq!(ApplicationStatus::Accepted.to_string(), "accepted");
    }

    #[test]
    fn rejects_unknown_values_with_expected_list() {
        let err = "Contract".parse::<TimePeriod>().unwrap_err();
        assert_eq!(err.field, "timePeriod");
        assert_eq!(
            err.to_string(),
            "Invalid timePeriod 'Contract', expected one of: Full-time, Part-time, Internship"
        );
        assert!("Student".parse::<Role>().is_err());
    }

    #[test]
    fn serde_matches_text_names() {
        let json = serde_json::to_string(&TimePeriod::PartTime).unwrap();
        assert_eq!(json, "\"Part-time\"");
        let status: ApplicationStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(status, ApplicationStatus::Rejected);
    }

    #[test]
    fn only_students_and_recruiters_self_register() {
        assert!(Role::Student.self_registrable());
        assert!(Role::Recruiter.self_registrable());
        assert!(!Role::Admin.self_registrable());
        assert!(!ApplicationStatus::Pending.is_decision());
    }
}
