use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Roles ---

/// Role
///
/// The RBAC field stored as `users.role_id`. The numeric values are part of the
/// storage contract and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    /// Maps a stored `role_id` to a role. Ids outside the known set resolve to
    /// `None`, which no allowed-role set ever contains.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Teacher),
            3 => Some(Role::Student),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            Role::Admin => 1,
            Role::Teacher => 2,
            Role::Student => 3,
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A row of the `users` table. Users are provisioned outside this service and
/// are read-only from its perspective.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub user_id: i64,
    // 1 = admin, 2 = teacher, 3 = student.
    pub role_id: i32,
    pub name: String,
}

/// Course
///
/// A row of the `courses` table. Only `teacher_id` and `is_available` are
/// mutated by this service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Course {
    pub course_id: i64,
    pub title: String,
    // At most one teacher at a time.
    pub teacher_id: Option<i64>,
    // Gates student enrolment and the default listing.
    pub is_available: bool,
}

/// CourseListing
///
/// A course joined with the name of its assigned teacher, as returned by the
/// listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CourseListing {
    pub course_id: i64,
    pub title: String,
    pub teacher_id: Option<i64>,
    pub is_available: bool,
    // Loaded via a LEFT JOIN on users with role_id = 2.
    #[sqlx(default)]
    pub teacher_name: Option<String>,
}

/// Enrolment
///
/// A row of the `enrolments` table linking a student to a course. `mark` stays
/// `None` until the course's teacher grades it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Enrolment {
    pub enrolment_id: i64,
    pub course_id: i64,
    // The enrolled student.
    pub user_id: i64,
    pub mark: Option<i32>,
}

/// EnrolmentDetail
///
/// Enriched enrolment row for the `/enrolments` listing: the enrolment joined
/// with its course title, the course's teacher and the student's name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrolmentDetail {
    pub enrolment_id: i64,
    pub mark: Option<i32>,
    pub course_id: i64,
    pub course_title: Option<String>,
    pub teacher_id: Option<i64>,
    pub teacher_name: Option<String>,
    pub student_id: i64,
    pub student_name: Option<String>,
}

// --- Response Envelope ---

/// ExecResult
///
/// The uniform envelope every endpoint answers with, success or failure.
///
/// `error_number` follows a closed convention: `0` success, `-1` generic
/// failure, `400` invalid input, `401` unauthorized, `404` not found.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExecResult {
    pub error_number: i32,
    pub output_message: String,
    #[schema(value_type = Option<Object>)]
    pub output_object: Option<serde_json::Value>,
}

impl ExecResult {
    pub const SUCCESS: i32 = 0;
    pub const GENERIC_FAILURE: i32 = -1;

    /// A successful envelope without a payload.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            error_number: Self::SUCCESS,
            output_message: message.into(),
            output_object: None,
        }
    }

    /// A successful envelope carrying `payload` as its `outputObject`.
    pub fn with_object<T: Serialize>(
        message: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            error_number: Self::SUCCESS,
            output_message: message.into(),
            output_object: Some(serde_json::to_value(payload)?),
        })
    }

    /// A successful listing envelope; the message reports the record count.
    pub fn listing<T: Serialize>(records: &[T]) -> Result<Self, serde_json::Error> {
        Self::with_object(
            format!("Execution completed. {} record(s) found.", records.len()),
            &records,
        )
    }

    /// A failure envelope. Failures never carry an `outputObject`.
    pub fn failure(error_number: i32, message: impl Into<String>) -> Self {
        Self {
            error_number,
            output_message: message.into(),
            output_object: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_number == Self::SUCCESS
    }
}
