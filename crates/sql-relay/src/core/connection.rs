use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

use rusqlite::{Connection, OpenFlags};
use tokio::sync::oneshot;

use crate::{
    cli::DEFAULT_CATALOG_QUERY,
    core::{
        limits::Limit,
        schema, service,
        types::{PagedResult, ResultSet},
    },
    error::{AppError, AppResult},
};

/// Handle to the thread that owns the database connection.
///
/// Tasks are served one at a time in arrival order, so both round-trips of a
/// paged query run back to back on the same connection.
#[derive(Debug, Clone)]
pub struct Database {
    tx: mpsc::Sender<DbTask>,
    pub db_path: PathBuf,
    catalog_query: Arc<str>,
}

impl Database {
    pub fn open(db_path: impl Into<PathBuf>, busy_timeout_ms: u64) -> AppResult<Self> {
        let db_path = absolute_lossy(&db_path.into())?;
        let (tx, rx) = mpsc::channel::<DbTask>();
        let path_for_thread = db_path.clone();
        thread::Builder::new()
            .name("sql-relay-db".into())
            .spawn(move || db_worker_main(path_for_thread, busy_timeout_ms, rx))?;
        tracing::info!(path = %db_path.display(), "database worker started");
        Ok(Self {
            tx,
            db_path,
            catalog_query: Arc::from(DEFAULT_CATALOG_QUERY),
        })
    }

    pub fn with_catalog_query(mut self, catalog_query: impl Into<Arc<str>>) -> Self {
        self.catalog_query = catalog_query.into();
        self
    }

    pub async fn execute(&self, sql: String) -> AppResult<ResultSet> {
        let (tx, rx) = oneshot::channel();
        self.send(DbTask::Execute { sql, respond_to: tx })?;
        rx.await.map_err(|_| AppError::Internal("db worker dropped response".into()))?
    }

    pub async fn execute_paged(&self, sql: String, limit: Limit) -> AppResult<PagedResult> {
        let (tx, rx) = oneshot::channel();
        self.send(DbTask::Paged {
            sql,
            limit,
            respond_to: tx,
        })?;
        rx.await.map_err(|_| AppError::Internal("db worker dropped response".into()))?
    }

    pub async fn catalog(&self) -> AppResult<ResultSet> {
        let (tx, rx) = oneshot::channel();
        self.send(DbTask::Catalog {
            query: self.catalog_query.to_string(),
            respond_to: tx,
        })?;
        rx.await.map_err(|_| AppError::Internal("db worker dropped response".into()))?
    }

    fn send(&self, task: DbTask) -> AppResult<()> {
        self.tx
            .send(task)
            .map_err(|_| AppError::Internal("db worker unavailable".into()))
    }
}

enum DbTask {
    Execute {
        sql: String,
        respond_to: oneshot::Sender<AppResult<ResultSet>>,
    },
    Paged {
        sql: String,
        limit: Limit,
        respond_to: oneshot::Sender<AppResult<PagedResult>>,
    },
    Catalog {
        query: String,
        respond_to: oneshot::Sender<AppResult<ResultSet>>,
    },
}

fn db_worker_main(db_path: PathBuf, busy_timeout_ms: u64, rx: mpsc::Receiver<DbTask>) {
    let conn = match open_conn(&db_path, busy_timeout_ms) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error=%e, path=%db_path.display(), "failed to open db in worker; failing tasks");
            let message = match e {
                AppError::DbOpenFailed { message, .. } => message,
                other => other.to_string(),
            };
            while let Ok(task) = rx.recv() {
                respond_err(
                    task,
                    AppError::DbOpenFailed {
                        path: db_path.clone(),
                        message: message.clone(),
                    },
                );
            }
            return;
        }
    };

    while let Ok(task) = rx.recv() {
        match task {
            DbTask::Execute { sql, respond_to } => {
                let res = service::execute_sql(&conn, &sql);
                log_outcome("execute", &res);
                let _ = respond_to.send(res);
            }
            DbTask::Paged {
                sql,
                limit,
                respond_to,
            } => {
                let res = service::execute_paged_sql(&conn, &sql, limit);
                log_outcome("execute_paged", &res);
                let _ = respond_to.send(res);
            }
            DbTask::Catalog { query, respond_to } => {
                let res = schema::list_catalog(&conn, &query);
                log_outcome("catalog", &res);
                let _ = respond_to.send(res);
            }
        }
    }
    tracing::debug!(path = %db_path.display(), "database worker stopped");
}

fn log_outcome<T>(task: &'static str, res: &AppResult<T>) {
    if let Err(e) = res {
        tracing::warn!(task, error = %e, "database task failed");
    }
}

fn respond_err(task: DbTask, err: AppError) {
    match task {
        DbTask::Execute { respond_to, .. } => {
            let _ = respond_to.send(Err(err));
        }
        DbTask::Paged { respond_to, .. } => {
            let _ = respond_to.send(Err(err));
        }
        DbTask::Catalog { respond_to, .. } => {
            let _ = respond_to.send(Err(err));
        }
    }
}

fn open_conn(path: &Path, busy_timeout_ms: u64) -> AppResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|source| AppError::DbOpenFailed {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(conn)
}

fn absolute_lossy(path: &Path) -> AppResult<PathBuf> {
    // The file may not exist yet, so canonicalize is not an option.
    if path.is_absolute() || path == Path::new(":memory:") {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
