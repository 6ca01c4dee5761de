use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A form value that failed to parse into its domain type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidValue(pub String);

// -- Submission classification --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "course")]
    Certificate,
    Eca,
    Leave,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Certificate, Category::Eca, Category::Leave];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::Eca => "eca",
            Self::Leave => "leave",
        }
    }

    /// Prefix put in front of the title when naming the uploaded document.
    pub fn document_prefix(&self) -> &'static str {
        match self {
            Self::Certificate => "Certificate_",
            Self::Eca => "",
            Self::Leave => "Leave_",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "certificate" | "course" => Ok(Self::Certificate),
            "eca" => Ok(Self::Eca),
            "leave" => Ok(Self::Leave),
            other => Err(InvalidValue(format!("unknown category '{}'", other))),
        }
    }
}

/// Semester number, always within 1..=8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Semester(u8);

impl Semester {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub fn new(value: u8) -> Result<Self, InvalidValue> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidValue(format!(
                "semester must be between {} and {}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Semester {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Semester> for u8 {
    fn from(s: Semester) -> u8 {
        s.0
    }
}

impl FromStr for Semester {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| InvalidValue(format!("'{}' is not a semester number", s.trim())))?;
        Self::new(value)
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Class section, a single letter stored upper-case so comparisons ignore case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Section(char);

impl Section {
    pub fn letter(&self) -> char {
        self.0
    }
}

impl FromStr for Section {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(Self(c.to_ascii_uppercase())),
            _ => Err(InvalidValue(format!("'{}' is not a section letter", trimmed))),
        }
    }
}

impl TryFrom<String> for Section {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Section> for String {
    fn from(s: Section) -> String {
        s.0.to_string()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Records --

/// A recorded document submission. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub category: Category,
    pub owner_id: Uuid,
    pub title: String,
    pub semester: Semester,
    pub section: Section,
    pub document_link: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }
}

impl FromStr for Role {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            other => Err(InvalidValue(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// University-issued student id (AUID). Empty for teachers.
    pub external_id: String,
    pub section: Option<Section>,
    pub batch: String,
    pub role: Role,
    pub detained: bool,
    pub created_at: DateTime<Utc>,
}

/// A notice posted by a teacher to all students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    /// `None` when the stored date could not be parsed.
    pub date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub read_by: BTreeSet<Uuid>,
}

impl Message {
    pub fn is_read_by(&self, reader: Uuid) -> bool {
        self.read_by.contains(&reader)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamEntry {
    pub id: Uuid,
    pub exam_title: String,
    pub subject: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Where a signed-in user lands after authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landing {
    StudentDashboard,
    TeacherDashboard,
}
