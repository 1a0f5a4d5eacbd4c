use crate::{
    auth::{AuthUser, PathParams, parse_id, parse_mark},
    error::{ApiResult, AppError},
    models::{ExecResult, Role},
    repository::{
        Assignment, AvailabilityChange, Enrolling, EnrolmentScope, MarkUpdate, RepositoryState,
        Unassignment, Withdrawal,
    },
};
use axum::extract::State;

// --- Allowed Role Sets ---

const ANY_ROLE: &[Role] = &[Role::Admin, Role::Teacher, Role::Student];
const ADMIN_ONLY: &[Role] = &[Role::Admin];
const TEACHER_ONLY: &[Role] = &[Role::Teacher];
const STUDENT_ONLY: &[Role] = &[Role::Student];

// Every handler has the same shape: parse identifiers, pass the gate, run the
// storage operation, map its outcome onto the envelope.

// --- Shared Handlers (Admin, Teacher, Student) ---

/// list_available_courses
///
/// [Any Role] Lists courses whose availability flag is on, with teacher names.
#[utoipa::path(
    get,
    path = "/available",
    params(("user-id" = i64, Header, description = "Caller user ID")),
    responses(
        (status = 200, description = "Available courses in outputObject", body = ExecResult),
        (status = 400, description = "Invalid user-id header", body = ExecResult),
        (status = 401, description = "Unauthorised", body = ExecResult)
    )
)]
pub async fn list_available_courses(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
) -> ApiResult {
    caller.authorize(repo.as_ref(), ANY_ROLE).await?;

    let courses = repo.list_available_courses().await?;
    Ok(ExecResult::listing(&courses)?)
}

/// index
///
/// [Any Role] The root path serves the available-course listing.
#[utoipa::path(
    get,
    path = "/",
    params(("user-id" = i64, Header, description = "Caller user ID")),
    responses(
        (status = 200, description = "Available courses in outputObject", body = ExecResult),
        (status = 400, description = "Invalid user-id header", body = ExecResult),
        (status = 401, description = "Unauthorised", body = ExecResult)
    )
)]
pub async fn index(caller: AuthUser, state: State<RepositoryState>) -> ApiResult {
    list_available_courses(caller, state).await
}

/// list_enrolments
///
/// [Any Role] Lists enrolments. The filter depends on the caller's role: admins
/// see everything, teachers see enrolments of the courses they teach, students
/// see their own.
#[utoipa::path(
    get,
    path = "/enrolments",
    params(("user-id" = i64, Header, description = "Caller user ID")),
    responses(
        (status = 200, description = "Enrolments in outputObject", body = ExecResult),
        (status = 401, description = "Unauthorised", body = ExecResult)
    )
)]
pub async fn list_enrolments(caller: AuthUser, State(repo): State<RepositoryState>) -> ApiResult {
    let role = caller.authorize(repo.as_ref(), ANY_ROLE).await?;

    let scope = match role {
        Role::Admin => EnrolmentScope::All,
        Role::Teacher => EnrolmentScope::TaughtBy(caller.id),
        Role::Student => EnrolmentScope::HeldBy(caller.id),
    };
    let enrolments = repo.list_enrolments(scope).await?;
    Ok(ExecResult::listing(&enrolments)?)
}

// --- Admin Handlers ---

/// list_all_courses
///
/// [Admin] Lists every course, including unavailable ones.
#[utoipa::path(
    get,
    path = "/all",
    params(("user-id" = i64, Header, description = "Caller user ID")),
    responses(
        (status = 200, description = "All courses in outputObject", body = ExecResult),
        (status = 401, description = "Unauthorised", body = ExecResult)
    )
)]
pub async fn list_all_courses(caller: AuthUser, State(repo): State<RepositoryState>) -> ApiResult {
    caller.authorize(repo.as_ref(), ADMIN_ONLY).await?;

    let courses = repo.list_all_courses().await?;
    Ok(ExecResult::listing(&courses)?)
}

/// enable_course
///
/// [Admin] Turns a disabled course's availability on. Enabling an enabled course
/// is a conflict.
#[utoipa::path(
    post,
    path = "/enable/{course_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("user-id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Enabled; the course in outputObject", body = ExecResult),
        (status = 404, description = "Course not found", body = ExecResult),
        (status = 409, description = "Course already enabled", body = ExecResult)
    )
)]
pub async fn enable_course(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    PathParams(course_id): PathParams<String>,
) -> ApiResult {
    change_availability(caller, repo, &course_id, true).await
}

/// disable_course
///
/// [Admin] Turns an enabled course's availability off. Disabling a disabled
/// course is a conflict.
#[utoipa::path(
    post,
    path = "/disable/{course_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("user-id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Disabled; the course in outputObject", body = ExecResult),
        (status = 404, description = "Course not found", body = ExecResult),
        (status = 409, description = "Course already disabled", body = ExecResult)
    )
)]
pub async fn disable_course(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    PathParams(course_id): PathParams<String>,
) -> ApiResult {
    change_availability(caller, repo, &course_id, false).await
}

async fn change_availability(
    caller: AuthUser,
    repo: RepositoryState,
    raw_course_id: &str,
    available: bool,
) -> ApiResult {
    let course_id = parse_id(raw_course_id, "Course ID")?;
    caller.authorize(repo.as_ref(), ADMIN_ONLY).await?;

    let (verb, current) = if available {
        ("Enabled", "disabled")
    } else {
        ("Disabled", "enabled")
    };

    match repo.set_course_availability(course_id, available).await? {
        AvailabilityChange::Changed(course) => {
            tracing::info!(course_id, available, admin_id = caller.id, "course availability changed");
            Ok(ExecResult::with_object(
                format!("{verb} Course (ID: {course_id}) successfully."),
                &course,
            )?)
        }
        AvailabilityChange::Unchanged => Err(AppError::Conflict(format!(
            "Targeted Course (ID: {course_id}) is not {current} currently."
        ))),
        AvailabilityChange::CourseNotFound => Err(course_not_found(course_id)),
    }
}

/// assign_teacher
///
/// [Admin] Assigns a teacher to a course that has none. The target user must
/// exist and hold the teacher role.
#[utoipa::path(
    post,
    path = "/assign/{course_id}/{teacher_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("teacher_id" = i64, Path, description = "User ID of the teacher"),
        ("user-id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Assigned; the course in outputObject", body = ExecResult),
        (status = 404, description = "Course or teacher not found", body = ExecResult),
        (status = 409, description = "Course already has a teacher", body = ExecResult)
    )
)]
pub async fn assign_teacher(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    PathParams((course_id, teacher_id)): PathParams<(String, String)>,
) -> ApiResult {
    let course_id = parse_id(&course_id, "Course ID")?;
    let teacher_id = parse_id(&teacher_id, "Teacher ID (User ID for Teacher)")?;
    caller.authorize(repo.as_ref(), ADMIN_ONLY).await?;

    match repo.assign_teacher(course_id, teacher_id).await? {
        Assignment::Assigned(course) => {
            tracing::info!(course_id, teacher_id, admin_id = caller.id, "teacher assigned");
            Ok(ExecResult::with_object(
                format!(
                    "Assigned Teacher (User ID: {teacher_id}) to Course (ID: {course_id}) successfully."
                ),
                &course,
            )?)
        }
        Assignment::CourseNotFound => Err(course_not_found(course_id)),
        Assignment::AlreadyAssigned { teacher_id: current } => Err(AppError::Conflict(format!(
            "This Course (ID: {course_id}) has an existing Teacher (User ID: {current}) assignment."
        ))),
        Assignment::TeacherNotFound => Err(AppError::NotFound(format!(
            "Could not find targeted Teacher (User ID: {teacher_id})."
        ))),
    }
}

/// unassign_teacher
///
/// [Admin] Clears a course's teacher, only when the course is currently assigned
/// to the given teacher.
#[utoipa::path(
    post,
    path = "/unassign/{course_id}/{teacher_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("teacher_id" = i64, Path, description = "User ID of the teacher"),
        ("user-id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Unassigned; the course in outputObject", body = ExecResult),
        (status = 404, description = "No such course/teacher assignment", body = ExecResult)
    )
)]
pub async fn unassign_teacher(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    PathParams((course_id, teacher_id)): PathParams<(String, String)>,
) -> ApiResult {
    let course_id = parse_id(&course_id, "Course ID")?;
    let teacher_id = parse_id(&teacher_id, "Teacher ID (User ID for Teacher)")?;
    caller.authorize(repo.as_ref(), ADMIN_ONLY).await?;

    match repo.unassign_teacher(course_id, teacher_id).await? {
        Unassignment::Unassigned(course) => {
            tracing::info!(course_id, teacher_id, admin_id = caller.id, "teacher unassigned");
            Ok(ExecResult::with_object(
                format!(
                    "Unassigned Teacher (User ID: {teacher_id}) from Course (ID: {course_id}) successfully."
                ),
                &course,
            )?)
        }
        Unassignment::NotAssigned => Err(AppError::NotFound(format!(
            "Could not find targeted Course (ID: {course_id}) or it is not assigned to targeted Teacher (User ID: {teacher_id})."
        ))),
    }
}

// --- Teacher Handlers ---

/// set_mark
///
/// [Teacher] Sets the mark of an enrolment. Only the teacher assigned to the
/// enrolment's course may do so; re-marking is allowed.
#[utoipa::path(
    put,
    path = "/set-mark/{enrolment_id}/{new_mark}",
    params(
        ("enrolment_id" = i64, Path, description = "Enrolment ID"),
        ("new_mark" = i32, Path, description = "Mark to record"),
        ("user-id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Mark set; the enrolment in outputObject", body = ExecResult),
        (status = 404, description = "Enrolment not found", body = ExecResult),
        (status = 409, description = "Caller does not teach the course", body = ExecResult)
    )
)]
pub async fn set_mark(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    PathParams((enrolment_id, new_mark)): PathParams<(String, String)>,
) -> ApiResult {
    let enrolment_id = parse_id(&enrolment_id, "Enrolment ID value")?;
    let new_mark = parse_mark(&new_mark)?;
    caller.authorize(repo.as_ref(), TEACHER_ONLY).await?;

    match repo.set_mark(enrolment_id, caller.id, new_mark).await? {
        MarkUpdate::Marked(enrolment) => {
            tracing::info!(enrolment_id, mark = new_mark, teacher_id = caller.id, "mark set");
            Ok(ExecResult::with_object(
                format!("Set Mark ({new_mark}) for Enrolment (ID: {enrolment_id}) successfully."),
                &enrolment,
            )?)
        }
        MarkUpdate::EnrolmentNotFound => Err(AppError::NotFound(format!(
            "Could not find targeted Enrolment (ID: {enrolment_id})."
        ))),
        MarkUpdate::NotCourseTeacher => Err(AppError::Conflict(format!(
            "The Course of this Enrolment (ID: {enrolment_id}) is not assigned to current User (ID: {}).",
            caller.id
        ))),
    }
}

// --- Student Handlers ---

/// enrol
///
/// [Student] Enrols the caller in an available course, at most once.
#[utoipa::path(
    post,
    path = "/enroll/{course_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("user-id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Enrolled; the new enrolment in outputObject", body = ExecResult),
        (status = 404, description = "Course missing or unavailable", body = ExecResult),
        (status = 409, description = "Already enrolled", body = ExecResult)
    )
)]
pub async fn enrol(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    PathParams(course_id): PathParams<String>,
) -> ApiResult {
    let course_id = parse_id(&course_id, "Course ID")?;
    caller.authorize(repo.as_ref(), STUDENT_ONLY).await?;

    match repo.enrol(course_id, caller.id).await? {
        Enrolling::Enrolled(enrolment) => {
            tracing::info!(course_id, student_id = caller.id, enrolment_id = enrolment.enrolment_id, "student enrolled");
            Ok(ExecResult::with_object(
                format!("Enrolled in Course (ID: {course_id}) successfully."),
                &enrolment,
            )?)
        }
        Enrolling::CourseUnavailable => Err(AppError::NotFound(format!(
            "Could not find targeted Course (ID: {course_id}) or it is not available."
        ))),
        Enrolling::AlreadyEnrolled => Err(AppError::Conflict(format!(
            "This User (ID: {}) has already enrolled in this Course (ID: {course_id}).",
            caller.id
        ))),
    }
}

/// withdraw
///
/// [Student] Removes the caller's enrolment from a course while it is ungraded.
#[utoipa::path(
    delete,
    path = "/withdraw/{course_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("user-id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Withdrawn; the removed enrolment in outputObject", body = ExecResult),
        (status = 404, description = "Enrolment not found", body = ExecResult),
        (status = 409, description = "Enrolment already graded", body = ExecResult)
    )
)]
pub async fn withdraw(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    PathParams(course_id): PathParams<String>,
) -> ApiResult {
    let course_id = parse_id(&course_id, "Course ID")?;
    caller.authorize(repo.as_ref(), STUDENT_ONLY).await?;

    match repo.withdraw(course_id, caller.id).await? {
        Withdrawal::Withdrawn(enrolment) => {
            tracing::info!(course_id, student_id = caller.id, "student withdrew");
            Ok(ExecResult::with_object(
                format!("Withdrew from Course (ID: {course_id}) successfully."),
                &enrolment,
            )?)
        }
        Withdrawal::EnrolmentNotFound => Err(AppError::NotFound(format!(
            "Could not find targeted Enrolment (Course ID: {course_id}, User ID: {}).",
            caller.id
        ))),
        Withdrawal::MarkAssigned(_) => Err(AppError::Conflict(format!(
            "Cannot withdraw from current Course (ID: {course_id}) as mark has been assigned by the teacher."
        ))),
    }
}

fn course_not_found(course_id: i64) -> AppError {
    AppError::NotFound(format!("Could not find targeted Course (ID: {course_id})."))
}
