use crate::models::{Course, CourseListing, Enrolment, EnrolmentDetail, Role};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;

// --- Query Scopes & Mutation Outcomes ---

/// EnrolmentScope
///
/// The filter predicate applied to the enrolment listing. Handlers pick the
/// scope from the caller's role; the query shape is identical for all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrolmentScope {
    /// Every enrolment (admins).
    All,
    /// Enrolments of courses taught by this teacher.
    TaughtBy(i64),
    /// Enrolments held by this student.
    HeldBy(i64),
}

/// AvailabilityChange
///
/// Result of flipping a course's availability flag. A request for the state the
/// course is already in is `Unchanged`, never a silent success.
#[derive(Debug, Clone)]
pub enum AvailabilityChange {
    Changed(Course),
    CourseNotFound,
    Unchanged,
}

#[derive(Debug, Clone)]
pub enum Assignment {
    Assigned(Course),
    CourseNotFound,
    AlreadyAssigned { teacher_id: i64 },
    /// The target user does not exist or is not a teacher.
    TeacherNotFound,
}

#[derive(Debug, Clone)]
pub enum Unassignment {
    Unassigned(Course),
    /// No course matches the (course, teacher) pair.
    NotAssigned,
}

#[derive(Debug, Clone)]
pub enum MarkUpdate {
    Marked(Enrolment),
    EnrolmentNotFound,
    /// The enrolment's course is taught by someone else (or nobody).
    NotCourseTeacher,
}

#[derive(Debug, Clone)]
pub enum Enrolling {
    Enrolled(Enrolment),
    /// The course is missing or its availability flag is off.
    CourseUnavailable,
    AlreadyEnrolled,
}

#[derive(Debug, Clone)]
pub enum Withdrawal {
    Withdrawn(Enrolment),
    EnrolmentNotFound,
    /// The enrolment has been graded and is locked.
    MarkAssigned(Enrolment),
}

/// Repository Trait
///
/// The storage client contract. Handlers only ever see `Arc<dyn Repository>`,
/// so tests substitute an in-memory implementation.
///
/// Every mutation is atomic with respect to its precondition: the check is part
/// of the write itself, and a follow-up read only classifies why nothing was
/// written. Storage failures are returned as `sqlx::Error` and never masked.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    /// Looks up the caller's role. `None` when the user does not exist or holds
    /// an unrecognised role id.
    async fn resolve_role(&self, user_id: i64) -> Result<Option<Role>, sqlx::Error>;

    // --- Listings ---
    async fn list_available_courses(&self) -> Result<Vec<CourseListing>, sqlx::Error>;
    async fn list_all_courses(&self) -> Result<Vec<CourseListing>, sqlx::Error>;
    async fn list_enrolments(
        &self,
        scope: EnrolmentScope,
    ) -> Result<Vec<EnrolmentDetail>, sqlx::Error>;

    // --- Admin Mutations ---
    async fn set_course_availability(
        &self,
        course_id: i64,
        available: bool,
    ) -> Result<AvailabilityChange, sqlx::Error>;
    async fn assign_teacher(
        &self,
        course_id: i64,
        teacher_id: i64,
    ) -> Result<Assignment, sqlx::Error>;
    async fn unassign_teacher(
        &self,
        course_id: i64,
        teacher_id: i64,
    ) -> Result<Unassignment, sqlx::Error>;

    // --- Teacher Mutations ---
    async fn set_mark(
        &self,
        enrolment_id: i64,
        teacher_id: i64,
        mark: i32,
    ) -> Result<MarkUpdate, sqlx::Error>;

    // --- Student Mutations ---
    async fn enrol(&self, course_id: i64, student_id: i64) -> Result<Enrolling, sqlx::Error>;
    async fn withdraw(&self, course_id: i64, student_id: i64) -> Result<Withdrawal, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the storage client across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. The pool is built at
/// process startup and handed in; it is the only shared resource.
pub struct PostgresRepository {
    pool: PgPool,
}

const COURSE_COLUMNS: &str = "course_id, title, teacher_id, is_available";
const ENROLMENT_COLUMNS: &str = "enrolment_id, course_id, user_id, mark";

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_course(&self, course_id: i64) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE course_id = $1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// fetch_course_listings
    ///
    /// Courses joined with their teacher's name. The join only matches users
    /// that actually hold the teacher role.
    async fn fetch_course_listings(
        &self,
        available_only: bool,
    ) -> Result<Vec<CourseListing>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT c.course_id, c.title, c.teacher_id, c.is_available, u.name AS teacher_name
            FROM courses c
            LEFT JOIN users u ON u.user_id = c.teacher_id AND u.role_id = "#,
        );
        builder.push_bind(Role::Teacher.id());

        if available_only {
            builder.push(" WHERE c.is_available = true");
        }
        builder.push(" ORDER BY c.course_id ASC");

        builder
            .build_query_as::<CourseListing>()
            .fetch_all(&self.pool)
            .await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn resolve_role(&self, user_id: i64) -> Result<Option<Role>, sqlx::Error> {
        let role_id =
            sqlx::query_scalar::<_, i32>("SELECT role_id FROM users WHERE user_id = $1 LIMIT 1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(role_id.and_then(Role::from_id))
    }

    async fn list_available_courses(&self) -> Result<Vec<CourseListing>, sqlx::Error> {
        self.fetch_course_listings(true).await
    }

    async fn list_all_courses(&self) -> Result<Vec<CourseListing>, sqlx::Error> {
        self.fetch_course_listings(false).await
    }

    /// list_enrolments
    ///
    /// Builds the enrolment listing with a parameterized filter chosen by `scope`.
    async fn list_enrolments(
        &self,
        scope: EnrolmentScope,
    ) -> Result<Vec<EnrolmentDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                e.enrolment_id, e.mark, e.course_id,
                c.title AS course_title,
                c.teacher_id, t.name AS teacher_name,
                e.user_id AS student_id, s.name AS student_name
            FROM enrolments e
            LEFT JOIN courses c ON c.course_id = e.course_id
            LEFT JOIN users t ON t.user_id = c.teacher_id AND t.role_id = "#,
        );
        builder.push_bind(Role::Teacher.id());
        builder.push(" LEFT JOIN users s ON s.user_id = e.user_id AND s.role_id = ");
        builder.push_bind(Role::Student.id());

        match scope {
            EnrolmentScope::All => {}
            EnrolmentScope::TaughtBy(teacher_id) => {
                builder.push(" WHERE c.teacher_id = ");
                builder.push_bind(teacher_id);
            }
            EnrolmentScope::HeldBy(student_id) => {
                builder.push(" WHERE e.user_id = ");
                builder.push_bind(student_id);
            }
        }
        builder.push(" ORDER BY e.enrolment_id ASC");

        builder
            .build_query_as::<EnrolmentDetail>()
            .fetch_all(&self.pool)
            .await
    }

    /// set_course_availability
    ///
    /// Only rows currently in the opposite state are updated, so concurrent
    /// duplicate requests cannot both succeed.
    async fn set_course_availability(
        &self,
        course_id: i64,
        available: bool,
    ) -> Result<AvailabilityChange, sqlx::Error> {
        let changed = sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses SET is_available = $2 \
             WHERE course_id = $1 AND is_available <> $2 \
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(course_id)
        .bind(available)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(course) = changed {
            return Ok(AvailabilityChange::Changed(course));
        }

        Ok(match self.fetch_course(course_id).await? {
            Some(_) => AvailabilityChange::Unchanged,
            None => AvailabilityChange::CourseNotFound,
        })
    }

    /// assign_teacher
    ///
    /// Sets the teacher only while the course is unassigned and the target user
    /// holds the teacher role.
    async fn assign_teacher(
        &self,
        course_id: i64,
        teacher_id: i64,
    ) -> Result<Assignment, sqlx::Error> {
        let assigned = sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses SET teacher_id = $2 \
             WHERE course_id = $1 AND teacher_id IS NULL \
               AND EXISTS (SELECT 1 FROM users WHERE user_id = $2 AND role_id = $3) \
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(course_id)
        .bind(teacher_id)
        .bind(Role::Teacher.id())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(course) = assigned {
            return Ok(Assignment::Assigned(course));
        }

        // Classification order: course existence, current assignment, then teacher.
        Ok(match self.fetch_course(course_id).await? {
            None => Assignment::CourseNotFound,
            Some(Course {
                teacher_id: Some(current),
                ..
            }) => Assignment::AlreadyAssigned {
                teacher_id: current,
            },
            Some(_) => Assignment::TeacherNotFound,
        })
    }

    async fn unassign_teacher(
        &self,
        course_id: i64,
        teacher_id: i64,
    ) -> Result<Unassignment, sqlx::Error> {
        let unassigned = sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses SET teacher_id = NULL \
             WHERE course_id = $1 AND teacher_id = $2 \
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(course_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match unassigned {
            Some(course) => Unassignment::Unassigned(course),
            None => Unassignment::NotAssigned,
        })
    }

    /// set_mark
    ///
    /// Joins the enrolment with its course inside the UPDATE so the teacher check
    /// and the write cannot be separated.
    async fn set_mark(
        &self,
        enrolment_id: i64,
        teacher_id: i64,
        mark: i32,
    ) -> Result<MarkUpdate, sqlx::Error> {
        let marked = sqlx::query_as::<_, Enrolment>(
            r#"
            UPDATE enrolments e SET mark = $3
            FROM courses c
            WHERE e.enrolment_id = $1 AND c.course_id = e.course_id AND c.teacher_id = $2
            RETURNING e.enrolment_id, e.course_id, e.user_id, e.mark
            "#,
        )
        .bind(enrolment_id)
        .bind(teacher_id)
        .bind(mark)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(enrolment) = marked {
            return Ok(MarkUpdate::Marked(enrolment));
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM enrolments WHERE enrolment_id = $1)",
        )
        .bind(enrolment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(if exists {
            MarkUpdate::NotCourseTeacher
        } else {
            MarkUpdate::EnrolmentNotFound
        })
    }

    /// enrol
    ///
    /// Inserts only when the course is available; the unique (course_id, user_id)
    /// constraint turns a duplicate into a no-op that is reported as a conflict.
    async fn enrol(&self, course_id: i64, student_id: i64) -> Result<Enrolling, sqlx::Error> {
        let inserted = sqlx::query_as::<_, Enrolment>(&format!(
            "INSERT INTO enrolments (course_id, user_id) \
             SELECT c.course_id, $2 FROM courses c \
             WHERE c.course_id = $1 AND c.is_available = true \
             ON CONFLICT (course_id, user_id) DO NOTHING \
             RETURNING {ENROLMENT_COLUMNS}"
        ))
        .bind(course_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(enrolment) = inserted {
            return Ok(Enrolling::Enrolled(enrolment));
        }

        let available = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM courses WHERE course_id = $1 AND is_available = true)",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(if available {
            Enrolling::AlreadyEnrolled
        } else {
            Enrolling::CourseUnavailable
        })
    }

    /// withdraw
    ///
    /// Deletes the enrolment only while it is ungraded.
    async fn withdraw(&self, course_id: i64, student_id: i64) -> Result<Withdrawal, sqlx::Error> {
        let deleted = sqlx::query_as::<_, Enrolment>(&format!(
            "DELETE FROM enrolments \
             WHERE course_id = $1 AND user_id = $2 AND mark IS NULL \
             RETURNING {ENROLMENT_COLUMNS}"
        ))
        .bind(course_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(enrolment) = deleted {
            return Ok(Withdrawal::Withdrawn(enrolment));
        }

        let remaining = sqlx::query_as::<_, Enrolment>(&format!(
            "SELECT {ENROLMENT_COLUMNS} FROM enrolments WHERE course_id = $1 AND user_id = $2"
        ))
        .bind(course_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match remaining {
            Some(enrolment) => Withdrawal::MarkAssigned(enrolment),
            None => Withdrawal::EnrolmentNotFound,
        })
    }
}
