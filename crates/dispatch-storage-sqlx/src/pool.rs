use sqlx::{Pool, Postgres, Sqlite};
use std::borrow::Cow;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub(crate) enum DatabasePool {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
}

impl DatabasePool {
    pub(crate) async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        if database_url.starts_with("postgres") {
            return Ok(DatabasePool::Postgres(
                Pool::<Postgres>::connect(database_url).await?,
            ));
        }

        // The directory for the sqlite DB file may not exist yet in fresh
        // containers. Best-effort: if we can't create it, sqlx surfaces the
        // underlying error on connect.
        if let Some(path) = sqlite_db_path(database_url) {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    let _ = std::fs::create_dir_all(parent);
                }
            }

            if !path.as_os_str().is_empty() && !path.exists() {
                let _ = std::fs::File::create(&path);
            }
        }

        let connect_url = sqlite_url_with_create_mode(database_url);
        Ok(DatabasePool::Sqlite(
            Pool::<Sqlite>::connect(connect_url.as_ref()).await?,
        ))
    }

    /// Run each statement of the dialect's schema. Statements must be idempotent.
    pub(crate) async fn bootstrap(
        &self,
        sqlite_schema: &[&str],
        postgres_schema: &[&str],
    ) -> Result<(), sqlx::Error> {
        match self {
            DatabasePool::Sqlite(pool) => {
                for statement in sqlite_schema {
                    sqlx::query(statement).execute(pool).await?;
                }
            }
            DatabasePool::Postgres(pool) => {
                for statement in postgres_schema {
                    sqlx::query(statement).execute(pool).await?;
                }
            }
        }

        Ok(())
    }

    pub(crate) async fn ping(&self) -> Result<(), sqlx::Error> {
        match self {
            DatabasePool::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }

        Ok(())
    }
}

fn sqlite_db_path(database_url: &str) -> Option<PathBuf> {
    if !database_url.starts_with("sqlite:") {
        return None;
    }
    if database_url.starts_with("sqlite::memory:") {
        return None;
    }

    let mut rest = &database_url["sqlite:".len()..];

    // Reduce URL-ish leading slashes to a single leading slash.
    if rest.starts_with("///") {
        rest = &rest[2..];
    } else if rest.starts_with("//") {
        rest = &rest[1..];
    }

    let path_part = rest.split('?').next().unwrap_or(rest);
    if path_part.is_empty() {
        return None;
    }

    Some(PathBuf::from(path_part))
}

fn sqlite_url_with_create_mode(database_url: &str) -> Cow<'_, str> {
    if !database_url.starts_with("sqlite:") {
        return Cow::Borrowed(database_url);
    }
    if database_url.starts_with("sqlite::memory:") {
        return Cow::Borrowed(database_url);
    }
    if database_url.contains("mode=") {
        return Cow::Borrowed(database_url);
    }

    let sep = if database_url.contains('?') { '&' } else { '?' };
    Cow::Owned(format!("{database_url}{sep}mode=rwc"))
}
