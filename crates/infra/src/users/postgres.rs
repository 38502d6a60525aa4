//! Postgres-backed user store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `EmailInUse` |
//! | anything else | - | `Backend` |
//!
//! ## Thread Safety
//!
//! `PostgresUserStore` is `Send + Sync`; all queries go through the SQLx pool.
//! Reads are plain `SELECT`s and need no locking beyond what Postgres provides.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use medibook_auth::{Role, SecretHash};
use medibook_core::{Email, UserId};

use super::r#trait::{NewUser, Specialty, StoreError, UserRecord, UserStore};

const SELECT_USERS: &str = r#"
    SELECT
        u.id,
        u.firstname,
        u.lastname,
        u.email,
        u.password_hash,
        u.phone,
        u.sex,
        u.specialty,
        u.photo,
        u.created_at,
        COALESCE(array_agg(r.role ORDER BY r.role) FILTER (WHERE r.role IS NOT NULL), '{}') AS roles
    FROM users u
    LEFT JOIN user_roles r ON r.user_id = u.id
"#;

pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Create tables and seed the specialty catalog (idempotent).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(include_str!("../../migrations/0001_users.sql"))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip_all, fields(operation = "insert_user"))]
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let id = UserId::new();
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, firstname, lastname, email, password_hash, phone, sex, specialty, photo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_phc())
        .bind(&user.phone)
        .bind(&user.sex)
        .bind(&user.specialty)
        .bind(&user.photo)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| map_sqlx_error("insert_user", e))?;

        for role in &user.roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(id.as_uuid())
                .bind(role.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_user_role", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(UserRecord::from_new(id, user, created_at))
    }

    #[instrument(skip_all, fields(operation = "find_user_by_email"))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("{SELECT_USERS} WHERE u.email = $1 GROUP BY u.id");
        let row = sqlx::query(&sql)
            .bind(email.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    #[instrument(skip_all, fields(operation = "find_user_by_id"))]
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("{SELECT_USERS} WHERE u.id = $1 GROUP BY u.id");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    #[instrument(skip_all, fields(operation = "list_users_by_role"))]
    async fn list_by_role(&self, role: &Role) -> Result<Vec<UserRecord>, StoreError> {
        let sql = format!(
            "{SELECT_USERS} WHERE EXISTS (SELECT 1 FROM user_roles x WHERE x.user_id = u.id AND x.role = $1) \
             GROUP BY u.id ORDER BY u.created_at, u.id"
        );
        let rows = sqlx::query(&sql)
            .bind(role.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users_by_role", e))?;
        rows.iter().map(row_to_user).collect()
    }

    async fn list_specialties(&self) -> Result<Vec<Specialty>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM specialties ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_specialties", e))?;

        rows.iter()
            .map(|r| {
                Ok(Specialty {
                    id: r.try_get("id").map_err(|e| map_sqlx_error("list_specialties", e))?,
                    name: r.try_get("name").map_err(|e| map_sqlx_error("list_specialties", e))?,
                })
            })
            .collect()
    }
}

fn row_to_user(row: &PgRow) -> Result<UserRecord, StoreError> {
    let get = |e: sqlx::Error| map_sqlx_error("decode_user", e);

    let email: String = row.try_get("email").map_err(get)?;
    let email = Email::parse(&email).map_err(|e| StoreError::Backend(format!("stored email invalid: {e}")))?;
    let hash: String = row.try_get("password_hash").map_err(get)?;
    let roles: Vec<String> = row.try_get("roles").map_err(get)?;

    Ok(UserRecord {
        id: UserId::from_uuid(row.try_get::<uuid::Uuid, _>("id").map_err(get)?),
        firstname: row.try_get("firstname").map_err(get)?,
        lastname: row.try_get("lastname").map_err(get)?,
        email,
        password_hash: SecretHash::from_phc(hash),
        phone: row.try_get("phone").map_err(get)?,
        sex: row.try_get("sex").map_err(get)?,
        specialty: row.try_get("specialty").map_err(get)?,
        photo: row.try_get("photo").map_err(get)?,
        roles: roles.into_iter().map(Role::new).collect(),
        created_at: row.try_get("created_at").map_err(get)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                StoreError::EmailInUse
            } else {
                StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
            }
        }
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}
