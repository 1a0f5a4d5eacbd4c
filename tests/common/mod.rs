#![allow(dead_code)]

use async_trait::async_trait;
use enrolment_portal::{
    models::{Course, CourseListing, Enrolment, EnrolmentDetail, Role, User},
    repository::{
        Assignment, AvailabilityChange, Enrolling, EnrolmentScope, MarkUpdate, Repository,
        RepositoryState, Unassignment, Withdrawal,
    },
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

// --- IN-MEMORY REPOSITORY ---

// Mirrors the Postgres semantics (conditional writes, classification of misses)
// and records every call so tests can prove what did and did not reach storage.

pub const MUTATIONS: &[&str] = &[
    "set_course_availability",
    "assign_teacher",
    "unassign_teacher",
    "set_mark",
    "enrol",
    "withdraw",
];

#[derive(Default)]
struct Store {
    users: BTreeMap<i64, User>,
    courses: BTreeMap<i64, Course>,
    enrolments: BTreeMap<i64, Enrolment>,
    next_enrolment_id: i64,
}

#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
    calls: Mutex<Vec<&'static str>>,
    // When set, every call fails like an unreachable database.
    pub fail_storage: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_storage: true,
            ..Self::default()
        }
    }

    pub fn with_user(self, user_id: i64, role: Role, name: &str) -> Self {
        self.store.lock().unwrap().users.insert(
            user_id,
            User {
                user_id,
                role_id: role.id(),
                name: name.to_string(),
            },
        );
        self
    }

    pub fn with_course(self, course_id: i64, teacher_id: Option<i64>, is_available: bool) -> Self {
        self.store.lock().unwrap().courses.insert(
            course_id,
            Course {
                course_id,
                title: format!("Course {course_id}"),
                teacher_id,
                is_available,
            },
        );
        self
    }

    pub fn with_enrolment(
        self,
        enrolment_id: i64,
        course_id: i64,
        user_id: i64,
        mark: Option<i32>,
    ) -> Self {
        {
            let mut store = self.store.lock().unwrap();
            store.enrolments.insert(
                enrolment_id,
                Enrolment {
                    enrolment_id,
                    course_id,
                    user_id,
                    mark,
                },
            );
            store.next_enrolment_id = store.next_enrolment_id.max(enrolment_id);
        }
        self
    }

    /// The standard cast: admin 1, teacher 10, second teacher 11, student 20,
    /// student 21 and a user with an unrecognised role id (30).
    pub fn seeded() -> Self {
        let repo = Self::new()
            .with_user(1, Role::Admin, "Ada Admin")
            .with_user(10, Role::Teacher, "Tom Teacher")
            .with_user(11, Role::Teacher, "Tess Teacher")
            .with_user(20, Role::Student, "Sam Student")
            .with_user(21, Role::Student, "Sue Student");
        repo.store.lock().unwrap().users.insert(
            30,
            User {
                user_id: 30,
                role_id: 9,
                name: "Ghost".to_string(),
            },
        );
        repo
    }

    pub fn into_state(self: Arc<Self>) -> RepositoryState {
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutation_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| MUTATIONS.contains(call))
            .count()
    }

    pub fn course(&self, course_id: i64) -> Option<Course> {
        self.store.lock().unwrap().courses.get(&course_id).cloned()
    }

    pub fn enrolment(&self, enrolment_id: i64) -> Option<Enrolment> {
        self.store.lock().unwrap().enrolments.get(&enrolment_id).cloned()
    }

    pub fn enrolments_for(&self, course_id: i64, user_id: i64) -> Vec<Enrolment> {
        self.store
            .lock()
            .unwrap()
            .enrolments
            .values()
            .filter(|e| e.course_id == course_id && e.user_id == user_id)
            .cloned()
            .collect()
    }

    fn record(&self, call: &'static str) -> Result<(), sqlx::Error> {
        self.calls.lock().unwrap().push(call);
        if self.fail_storage {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

fn name_with_role(store: &Store, user_id: Option<i64>, role: Role) -> Option<String> {
    user_id
        .and_then(|id| store.users.get(&id))
        .filter(|u| u.role_id == role.id())
        .map(|u| u.name.clone())
}

fn listing(store: &Store, course: &Course) -> CourseListing {
    CourseListing {
        course_id: course.course_id,
        title: course.title.clone(),
        teacher_id: course.teacher_id,
        is_available: course.is_available,
        teacher_name: name_with_role(store, course.teacher_id, Role::Teacher),
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn resolve_role(&self, user_id: i64) -> Result<Option<Role>, sqlx::Error> {
        self.record("resolve_role")?;
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .get(&user_id)
            .and_then(|u| Role::from_id(u.role_id)))
    }

    async fn list_available_courses(&self) -> Result<Vec<CourseListing>, sqlx::Error> {
        self.record("list_available_courses")?;
        let store = self.store.lock().unwrap();
        Ok(store
            .courses
            .values()
            .filter(|c| c.is_available)
            .map(|c| listing(&store, c))
            .collect())
    }

    async fn list_all_courses(&self) -> Result<Vec<CourseListing>, sqlx::Error> {
        self.record("list_all_courses")?;
        let store = self.store.lock().unwrap();
        Ok(store.courses.values().map(|c| listing(&store, c)).collect())
    }

    async fn list_enrolments(
        &self,
        scope: EnrolmentScope,
    ) -> Result<Vec<EnrolmentDetail>, sqlx::Error> {
        self.record("list_enrolments")?;
        let store = self.store.lock().unwrap();
        Ok(store
            .enrolments
            .values()
            .filter_map(|e| {
                let course = store.courses.get(&e.course_id);
                let teacher_id = course.and_then(|c| c.teacher_id);
                let visible = match scope {
                    EnrolmentScope::All => true,
                    EnrolmentScope::TaughtBy(id) => teacher_id == Some(id),
                    EnrolmentScope::HeldBy(id) => e.user_id == id,
                };
                visible.then(|| EnrolmentDetail {
                    enrolment_id: e.enrolment_id,
                    mark: e.mark,
                    course_id: e.course_id,
                    course_title: course.map(|c| c.title.clone()),
                    teacher_id,
                    teacher_name: name_with_role(&store, teacher_id, Role::Teacher),
                    student_id: e.user_id,
                    student_name: name_with_role(&store, Some(e.user_id), Role::Student),
                })
            })
            .collect())
    }

    async fn set_course_availability(
        &self,
        course_id: i64,
        available: bool,
    ) -> Result<AvailabilityChange, sqlx::Error> {
        self.record("set_course_availability")?;
        let mut store = self.store.lock().unwrap();
        Ok(match store.courses.get_mut(&course_id) {
            None => AvailabilityChange::CourseNotFound,
            Some(course) if course.is_available == available => AvailabilityChange::Unchanged,
            Some(course) => {
                course.is_available = available;
                AvailabilityChange::Changed(course.clone())
            }
        })
    }

    async fn assign_teacher(
        &self,
        course_id: i64,
        teacher_id: i64,
    ) -> Result<Assignment, sqlx::Error> {
        self.record("assign_teacher")?;
        let mut store = self.store.lock().unwrap();
        let is_teacher = store
            .users
            .get(&teacher_id)
            .is_some_and(|u| u.role_id == Role::Teacher.id());
        Ok(match store.courses.get_mut(&course_id) {
            None => Assignment::CourseNotFound,
            Some(Course {
                teacher_id: Some(current),
                ..
            }) => Assignment::AlreadyAssigned {
                teacher_id: *current,
            },
            Some(_) if !is_teacher => Assignment::TeacherNotFound,
            Some(course) => {
                course.teacher_id = Some(teacher_id);
                Assignment::Assigned(course.clone())
            }
        })
    }

    async fn unassign_teacher(
        &self,
        course_id: i64,
        teacher_id: i64,
    ) -> Result<Unassignment, sqlx::Error> {
        self.record("unassign_teacher")?;
        let mut store = self.store.lock().unwrap();
        Ok(match store.courses.get_mut(&course_id) {
            Some(course) if course.teacher_id == Some(teacher_id) => {
                course.teacher_id = None;
                Unassignment::Unassigned(course.clone())
            }
            _ => Unassignment::NotAssigned,
        })
    }

    async fn set_mark(
        &self,
        enrolment_id: i64,
        teacher_id: i64,
        mark: i32,
    ) -> Result<MarkUpdate, sqlx::Error> {
        self.record("set_mark")?;
        let mut store = self.store.lock().unwrap();
        let Some(course_id) = store.enrolments.get(&enrolment_id).map(|e| e.course_id) else {
            return Ok(MarkUpdate::EnrolmentNotFound);
        };
        let taught = store
            .courses
            .get(&course_id)
            .is_some_and(|c| c.teacher_id == Some(teacher_id));
        if !taught {
            return Ok(MarkUpdate::NotCourseTeacher);
        }
        let Some(enrolment) = store.enrolments.get_mut(&enrolment_id) else {
            return Ok(MarkUpdate::EnrolmentNotFound);
        };
        enrolment.mark = Some(mark);
        Ok(MarkUpdate::Marked(enrolment.clone()))
    }

    async fn enrol(&self, course_id: i64, student_id: i64) -> Result<Enrolling, sqlx::Error> {
        self.record("enrol")?;
        let mut store = self.store.lock().unwrap();
        let available = store
            .courses
            .get(&course_id)
            .is_some_and(|c| c.is_available);
        if !available {
            return Ok(Enrolling::CourseUnavailable);
        }
        let duplicate = store
            .enrolments
            .values()
            .any(|e| e.course_id == course_id && e.user_id == student_id);
        if duplicate {
            return Ok(Enrolling::AlreadyEnrolled);
        }
        store.next_enrolment_id += 1;
        let enrolment = Enrolment {
            enrolment_id: store.next_enrolment_id,
            course_id,
            user_id: student_id,
            mark: None,
        };
        store
            .enrolments
            .insert(enrolment.enrolment_id, enrolment.clone());
        Ok(Enrolling::Enrolled(enrolment))
    }

    async fn withdraw(&self, course_id: i64, student_id: i64) -> Result<Withdrawal, sqlx::Error> {
        self.record("withdraw")?;
        let mut store = self.store.lock().unwrap();
        let Some(enrolment) = store
            .enrolments
            .values()
            .find(|e| e.course_id == course_id && e.user_id == student_id)
            .cloned()
        else {
            return Ok(Withdrawal::EnrolmentNotFound);
        };
        if enrolment.mark.is_some() {
            return Ok(Withdrawal::MarkAssigned(enrolment));
        }
        store.enrolments.remove(&enrolment.enrolment_id);
        Ok(Withdrawal::Withdrawn(enrolment))
    }
}
