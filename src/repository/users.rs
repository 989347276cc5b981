//! Users repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::PageQuery,
        user::{Permission, Role, User, UserCredentials, UserQuery},
    },
};

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.phone, u.address, u.created_at, u.updated_at";

/// Fields written on insert
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub role: Role,
}

/// Fields written on update, `None` leaves the column untouched
#[derive(Default)]
pub struct UserChanges<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub role: Option<Role>,
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Get user by email (case-insensitive)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users u WHERE LOWER(u.email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Password hash lookup for login
    pub async fn get_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, password FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credentials)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != $2)")
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    pub async fn get_roles(&self, user_id: i32) -> AppResult<Vec<Role>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.iter().filter_map(|n| n.parse().ok()).collect())
    }

    /// Union of the permissions granted by every role of the user
    pub async fn get_permissions(&self, user_id: i32) -> AppResult<Vec<Permission>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT p.name FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN user_roles ur ON ur.role_id = rp.role_id
            WHERE ur.user_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.iter().filter_map(|n| n.parse().ok()).collect())
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let page = PageQuery { page: query.page, per_page: query.per_page };

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref search) = query.search {
            params.push(super::contains_pattern(search));
            conditions.push(format!(
                r"(LOWER(u.name) LIKE ${} ESCAPE '\' OR LOWER(u.email) LIKE ${} ESCAPE '\')",
                params.len(),
                params.len()
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM users u {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT {} FROM users u
            {}
            ORDER BY u.name, u.id
            LIMIT {} OFFSET {}
            "#,
            USER_COLUMNS,
            where_clause,
            page.per_page(),
            page.offset()
        );
        let mut select_builder = sqlx::query_as::<_, User>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let users = select_builder.fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Users currently holding at least one overdue reservation
    pub async fn list_with_overdue(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {} FROM users u
            WHERE EXISTS (
                SELECT 1 FROM reservations r
                WHERE r.user_id = u.id
                  AND r.status = 'borrowed'
                  AND r.returned_at IS NULL
                  AND r.due_date < NOW()
            )
            ORDER BY u.name, u.id
            "#,
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Create a new user and attach its role
    pub async fn create(&self, user: &NewUser<'_>) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (name, email, password, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.phone)
        .bind(user.address)
        .fetch_one(&mut *tx)
        .await?;

        Self::assign_role(&mut tx, id, user.role).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Update an existing user
    pub async fn update(&self, id: i32, changes: &UserChanges<'_>) -> AppResult<User> {
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut params: Vec<Option<&str>> = Vec::new();

        for (column, value) in [
            ("name", changes.name),
            ("email", changes.email),
            ("password", changes.password_hash),
            ("phone", changes.phone),
            ("address", changes.address),
        ] {
            if value.is_some() {
                params.push(value);
                sets.push(format!("{} = ${}", column, params.len() + 1));
            }
        }

        let query = format!(
            "UPDATE users SET {} WHERE id = ${}",
            sets.join(", "),
            params.len() + 2
        );

        let mut tx = self.pool.begin().await?;

        let mut builder = sqlx::query(&query).bind(Utc::now());
        for param in &params {
            builder = builder.bind(*param);
        }
        let result = builder.bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        if let Some(role) = changes.role {
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::assign_role(&mut tx, id, role).await?;
        }

        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn assign_role(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        user_id: i32,
        role: Role,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE name = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Whether any reservation (open or returned) references the user
    pub async fn has_reservations(&self, id: i32) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reservations WHERE user_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        Ok(())
    }
}
