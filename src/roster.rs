//! Roster Coordinator.
//!
//! Class–student and course–student memberships are denormalized onto both
//! documents. Every mutation goes through this module so both sides stay in
//! step; editing either array directly is a correctness hazard. The two
//! writes are not atomic. A crash in between leaves a one-sided relation,
//! which removal tolerates.

use bson::doc;
use mongodb::Database;
use uuid::Uuid;

use crate::data::class::db::{problem as class_problem, ClassDbExt};
use crate::data::class::CLASS_COLLECTION_NAME;
use crate::data::course::db::{problem as course_problem, CourseDbExt};
use crate::data::course::COURSE_COLLECTION_NAME;
use crate::data::student::db::{problem as student_problem, StudentDbExt};
use crate::data::student::{Student, STUDENT_COLLECTION_NAME};
use crate::resp::problem::Problem;
use crate::util::{by_id, uuid_bson};

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn already_member() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Student is already a member.")
    }

    #[inline]
    pub fn student_not_registered(email: impl ToString) -> Problem {
        Problem::new_untyped(Status::NotFound, "No student registered with that email.")
            .insert_str("email", email)
            .clone()
    }
}

/// Membership decision taken on the loaded owner document before any write.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RosterChange {
    Added,
    AlreadyMember,
}

pub fn plan_add(members: &[Uuid], candidate: Uuid) -> RosterChange {
    if members.contains(&candidate) {
        RosterChange::AlreadyMember
    } else {
        RosterChange::Added
    }
}

async fn link(
    db: &Database,
    owner_collection: &str,
    owner_id: Uuid,
    student_id: Uuid,
    mirror_field: &str,
) -> Result<(), Problem> {
    db.collection::<bson::Document>(owner_collection)
        .update_one(
            by_id(owner_id),
            doc! { "$addToSet": { "students": uuid_bson(student_id) } },
            None,
        )
        .await
        .map_err(Problem::from)?;

    let mut mirror = bson::Document::new();
    mirror.insert(mirror_field, uuid_bson(owner_id));

    db.collection::<bson::Document>(STUDENT_COLLECTION_NAME)
        .update_one(by_id(student_id), doc! { "$addToSet": mirror }, None)
        .await
        .map_err(Problem::from)?;

    Ok(())
}

async fn unlink(
    db: &Database,
    owner_collection: &str,
    owner_id: Uuid,
    student_id: Uuid,
    mirror_field: &str,
) -> Result<(), Problem> {
    // $pull on both sides regardless of current state; a relation recorded
    // on only one document is still cleaned up.
    db.collection::<bson::Document>(owner_collection)
        .update_one(
            by_id(owner_id),
            doc! { "$pull": { "students": uuid_bson(student_id) } },
            None,
        )
        .await
        .map_err(Problem::from)?;

    let mut mirror = bson::Document::new();
    mirror.insert(mirror_field, uuid_bson(owner_id));

    db.collection::<bson::Document>(STUDENT_COLLECTION_NAME)
        .update_one(by_id(student_id), doc! { "$pull": mirror }, None)
        .await
        .map_err(Problem::from)?;

    Ok(())
}

pub trait RosterDbExt {
    async fn add_student_to_class(&self, class_id: Uuid, student_id: Uuid)
        -> Result<(), Problem>;

    async fn remove_student_from_class(
        &self,
        class_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), Problem>;

    /// Resolves an email to a student and enrolls them, returning the
    /// student for the response body.
    async fn invite_student_by_email(
        &self,
        class_id: Uuid,
        email: &str,
    ) -> Result<Student, Problem>;

    async fn add_student_to_course(
        &self,
        course_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), Problem>;

    async fn remove_student_from_course(
        &self,
        course_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), Problem>;
}

impl RosterDbExt for Database {
    async fn add_student_to_class(
        &self,
        class_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), Problem> {
        let class = self
            .get_class(class_id)
            .await?
            .ok_or_else(|| class_problem::not_found(class_id))?;

        if self.get_student(student_id).await?.is_none() {
            return Err(student_problem::not_found(student_id));
        }

        if plan_add(&class.students, student_id) == RosterChange::AlreadyMember {
            return Err(problem::already_member());
        }

        link(self, CLASS_COLLECTION_NAME, class_id, student_id, "classes").await
    }

    async fn remove_student_from_class(
        &self,
        class_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), Problem> {
        if self.get_class(class_id).await?.is_none() {
            return Err(class_problem::not_found(class_id));
        }

        unlink(self, CLASS_COLLECTION_NAME, class_id, student_id, "classes").await
    }

    async fn invite_student_by_email(
        &self,
        class_id: Uuid,
        email: &str,
    ) -> Result<Student, Problem> {
        let student = self
            .find_student_by_email(email)
            .await?
            .ok_or_else(|| problem::student_not_registered(email))?;

        self.add_student_to_class(class_id, student.id).await?;

        Ok(student)
    }

    async fn add_student_to_course(
        &self,
        course_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), Problem> {
        let course = self
            .get_course(course_id)
            .await?
            .ok_or_else(|| course_problem::not_found(course_id))?;

        if self.get_student(student_id).await?.is_none() {
            return Err(student_problem::not_found(student_id));
        }

        if plan_add(&course.students, student_id) == RosterChange::AlreadyMember {
            return Err(problem::already_member());
        }

        link(self, COURSE_COLLECTION_NAME, course_id, student_id, "courses").await
    }

    async fn remove_student_from_course(
        &self,
        course_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), Problem> {
        if self.get_course(course_id).await?.is_none() {
            return Err(course_problem::not_found(course_id));
        }

        unlink(self, COURSE_COLLECTION_NAME, course_id, student_id, "courses").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_add_of_same_student_reports_duplicate() {
        let student = Uuid::new_v4();
        let mut members: Vec<Uuid> = vec![];

        assert_eq!(plan_add(&members, student), RosterChange::Added);
        members.push(student);

        // state mutated once; the repeat is reported, not re-applied
        assert_eq!(plan_add(&members, student), RosterChange::AlreadyMember);
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn add_distinguishes_students() {
        let members = vec![Uuid::new_v4()];
        assert_eq!(plan_add(&members, Uuid::new_v4()), RosterChange::Added);
    }
}
