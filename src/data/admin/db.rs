use bson::doc;
use chrono::Utc;
use mongodb::Database;
use uuid::Uuid;

use super::{Admin, ADMIN_COLLECTION_NAME};
use crate::config::BootstrapAdmin;
use crate::data::credential::PasswordHash;
use crate::resp::problem::Problem;

pub trait AdminDbExt {
    async fn find_admin_by_email(&self, email: impl AsRef<str>) -> Result<Option<Admin>, Problem>;
}

impl AdminDbExt for Database {
    async fn find_admin_by_email(&self, email: impl AsRef<str>) -> Result<Option<Admin>, Problem> {
        self.collection(ADMIN_COLLECTION_NAME)
            .find_one(doc! { "email": email.as_ref().trim().to_lowercase() }, None)
            .await
            .map_err(Problem::from)
    }
}

/// Idempotent startup step: creates the first administrator account from
/// externally supplied credentials when none exist yet. Without credentials
/// the gap is logged and startup continues.
pub async fn ensure_default_admin(
    db: &Database,
    bootstrap: Option<&BootstrapAdmin>,
) -> Result<(), mongodb::error::Error> {
    let existing = db
        .collection::<Admin>(ADMIN_COLLECTION_NAME)
        .count_documents(None, None)
        .await?;

    if existing > 0 {
        return Ok(());
    }

    let bootstrap = match bootstrap {
        Some(it) => it,
        None => {
            tracing::warn!(
                "No administrator accounts exist and ADMIN_EMAIL/ADMIN_PASSWORD are not set. \
                 Admin endpoints will be unreachable until one is configured."
            );
            return Ok(());
        }
    };

    let admin = Admin {
        id: Uuid::new_v4(),
        name: "Administrator".to_string(),
        email: bootstrap.email.trim().to_lowercase(),
        pw_hash: PasswordHash::new(&bootstrap.password),
        created_at: Utc::now(),
    };

    db.collection(ADMIN_COLLECTION_NAME)
        .insert_one(
            bson::to_document(&admin).expect("Admin must be serializable to BSON"),
            None,
        )
        .await?;

    tracing::info!("Default administrator account created: {}", admin.email);

    Ok(())
}
