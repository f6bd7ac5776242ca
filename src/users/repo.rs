use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::auth::password::{hash_password, verify_password};
use crate::errors::AppError;
use crate::repo::{Columns, CrudRepo, Entity, SqlValue};
use crate::users::dto::{AdminUserUpdate, UserCreate, UserUpdate};

/// User record. The stored digest never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str =
        "id, email, first_name, last_name, password_hash, is_active, is_superuser, created_at";
    const NAME: &'static str = "User";

    fn id(&self) -> i32 {
        self.id
    }
}

struct NewUser {
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
}

impl Columns for NewUser {
    fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("email", self.email.clone().into()),
            ("first_name", self.first_name.clone().into()),
            ("last_name", self.last_name.clone().into()),
            ("password_hash", self.password_hash.clone().into()),
        ]
    }
}

/// Internal change set. `password_hash` already carries the digest by the
/// time it reaches the column mapping.
#[derive(Default)]
struct UserChanges {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    password_hash: Option<String>,
    is_active: Option<bool>,
    is_superuser: Option<bool>,
}

impl Columns for UserChanges {
    fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        let mut cols: Vec<(&'static str, SqlValue)> = Vec::new();
        if let Some(v) = &self.email {
            cols.push(("email", v.clone().into()));
        }
        if let Some(v) = &self.first_name {
            cols.push(("first_name", v.clone().into()));
        }
        if let Some(v) = &self.last_name {
            cols.push(("last_name", v.clone().into()));
        }
        if let Some(v) = &self.password_hash {
            cols.push(("password_hash", v.clone().into()));
        }
        if let Some(v) = self.is_active {
            cols.push(("is_active", v.into()));
        }
        if let Some(v) = self.is_superuser {
            cols.push(("is_superuser", v.into()));
        }
        cols
    }
}

/// [`CrudRepo`] specialization: creation hashes the password, and lookups by
/// the unique email back the authentication flow.
pub struct UserRepo {
    crud: CrudRepo<User>,
}

impl UserRepo {
    pub const fn new() -> Self {
        Self {
            crud: CrudRepo::new(),
        }
    }

    pub async fn get_by_id(&self, db: &PgPool, id: i32) -> Result<Option<User>, AppError> {
        self.crud.get(db, &[("id", id.into())]).await
    }

    pub async fn get_by_email(&self, db: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        self.crud.get(db, &[("email", email.into())]).await
    }

    pub async fn list(&self, db: &PgPool, skip: i64, limit: i64) -> Result<Vec<User>, AppError> {
        self.crud.list(db, skip, limit).await
    }

    /// Hash the plaintext password, then persist. Plaintext never reaches
    /// the database.
    pub async fn create(&self, db: &PgPool, input: &UserCreate) -> Result<User, AppError> {
        let row = NewUser {
            email: input.email.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            password_hash: hash_password(&input.password)?,
        };
        self.crud.create(db, &row).await
    }

    pub async fn update(
        &self,
        db: &PgPool,
        existing: &User,
        changes: &UserUpdate,
    ) -> Result<User, AppError> {
        let changes = UserChanges {
            email: changes.email.clone(),
            first_name: changes.first_name.clone(),
            last_name: changes.last_name.clone(),
            password_hash: match &changes.password {
                Some(p) => Some(hash_password(p)?),
                None => None,
            },
            ..Default::default()
        };
        self.crud.update(db, existing, &changes).await
    }

    pub async fn update_admin(
        &self,
        db: &PgPool,
        existing: &User,
        changes: &AdminUserUpdate,
    ) -> Result<User, AppError> {
        let changes = UserChanges {
            email: changes.email.clone(),
            first_name: changes.first_name.clone(),
            last_name: changes.last_name.clone(),
            password_hash: match &changes.password {
                Some(p) => Some(hash_password(p)?),
                None => None,
            },
            is_active: changes.is_active,
            is_superuser: changes.is_superuser,
        };
        self.crud.update(db, existing, &changes).await
    }

    pub async fn remove(&self, db: &PgPool, id: i32) -> Result<User, AppError> {
        self.crud.remove(db, &[("id", id.into())]).await
    }

    /// Look up by email and verify the password. Unknown email and wrong
    /// password both come back as `None`; callers cannot tell which failed.
    pub async fn authenticate(
        &self,
        db: &PgPool,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        let Some(user) = self.get_by_email(db, email).await? else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}
