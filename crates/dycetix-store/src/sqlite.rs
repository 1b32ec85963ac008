//! SQLite backend
//!
//! One connection behind a mutex; every trait call runs to completion while
//! holding it. Timestamps are stored as text through rusqlite's chrono
//! support, services as a JSON array of codes.
//!
//! Free-text search folds case with `fold_case`, a scalar function registered
//! on the connection that lowercases the same way the in-memory store does.

use crate::error::StoreError;
use crate::traits::{AdminStore, RequirementStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use dycetix_core::{
    normalize_email, AdminSession, AdminUser, AdminUserId, AttachmentId, ClientRequirement,
    FormAttachment, NewAdminUser, NewAttachment, NewRequirement, Page, PageRequest,
    RequirementFilter, RequirementId, RequirementStats, RequirementStatus, ServiceType,
    StatsAccumulator, Visibility,
};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSqlOutput, Type, Value};
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, ToSql,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

const REQUIREMENT_COLUMNS: &str = "id, first_name, last_name, email, phone, company, services, \
     other_service, project_description, budget_range, timeline, source, ip_address, user_agent, \
     status, priority, assigned_to, internal_notes, admin_response, response_sent_at, \
     created_at, updated_at";

const ATTACHMENT_COLUMNS: &str = "id, client_requirement_id, original_filename, storage_key, url, \
     file_size, mime_type, checksum, uploaded_by_ip, uploaded_by_user_agent, created_at";

const ADMIN_COLUMNS: &str = "id, email, first_name, last_name, role, password_hash, is_active, \
     is_staff, is_superuser, avatar_url, two_factor_enabled, last_ip, last_login, created_by, \
     created_at, updated_at";

/// Store backed by a SQLite database
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    ///
    /// # Errors
    /// Fails if the file cannot be opened or the schema cannot be installed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Private in-memory database
    ///
    /// # Errors
    /// Fails if the schema cannot be installed.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        register_fold_case(&conn)?;
        install_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Unicode lowercase as SQL `fold_case(text)`; `lower()` only folds ASCII
fn register_fold_case(conn: &Connection) -> Result<(), StoreError> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )?;
    Ok(())
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS admin_users (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          email TEXT NOT NULL UNIQUE,
          first_name TEXT NOT NULL DEFAULT '',
          last_name TEXT NOT NULL DEFAULT '',
          role TEXT NOT NULL,
          password_hash TEXT,
          is_active INTEGER NOT NULL,
          is_staff INTEGER NOT NULL,
          is_superuser INTEGER NOT NULL,
          avatar_url TEXT,
          two_factor_enabled INTEGER NOT NULL DEFAULT 0,
          last_ip TEXT,
          last_login TEXT,
          created_by INTEGER REFERENCES admin_users(id) ON DELETE SET NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS admin_sessions (
          session_key TEXT PRIMARY KEY,
          user_id INTEGER NOT NULL REFERENCES admin_users(id) ON DELETE CASCADE,
          created_at TEXT NOT NULL,
          expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS client_requirements (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          first_name TEXT NOT NULL,
          last_name TEXT NOT NULL,
          email TEXT NOT NULL,
          phone TEXT,
          company TEXT,
          services TEXT NOT NULL,
          other_service TEXT,
          project_description TEXT NOT NULL,
          budget_range TEXT,
          timeline TEXT,
          source TEXT,
          ip_address TEXT,
          user_agent TEXT,
          status TEXT NOT NULL DEFAULT 'new',
          priority TEXT NOT NULL DEFAULT 'medium',
          assigned_to INTEGER REFERENCES admin_users(id) ON DELETE SET NULL,
          internal_notes TEXT,
          admin_response TEXT,
          response_sent_at TEXT,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL,
          CHECK(json_valid(services))
        );

        CREATE INDEX IF NOT EXISTS idx_requirements_created
          ON client_requirements(created_at DESC, id DESC);
        CREATE INDEX IF NOT EXISTS idx_requirements_status
          ON client_requirements(status);
        CREATE INDEX IF NOT EXISTS idx_requirements_assigned
          ON client_requirements(assigned_to);

        CREATE TABLE IF NOT EXISTS form_attachments (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          client_requirement_id INTEGER
            REFERENCES client_requirements(id) ON DELETE CASCADE,
          original_filename TEXT NOT NULL,
          storage_key TEXT NOT NULL,
          url TEXT NOT NULL,
          file_size INTEGER NOT NULL,
          mime_type TEXT NOT NULL,
          checksum TEXT NOT NULL,
          uploaded_by_ip TEXT,
          uploaded_by_user_agent TEXT,
          created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_attachments_owner
          ON form_attachments(client_requirement_id);
        "#,
    )?;
    Ok(())
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    u64::try_from(n).map_err(|e| conversion_error(idx, e))
}

fn requirement_from_row(row: &Row<'_>) -> rusqlite::Result<ClientRequirement> {
    Ok(ClientRequirement {
        id: RequirementId(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        company: row.get(5)?,
        services: json(row, 6)?,
        other_service: row.get(7)?,
        project_description: row.get(8)?,
        budget_range: row.get(9)?,
        timeline: row.get(10)?,
        source: row.get(11)?,
        ip_address: row.get(12)?,
        user_agent: row.get(13)?,
        status: parsed(row, 14)?,
        priority: parsed(row, 15)?,
        assigned_to: row.get::<_, Option<i64>>(16)?.map(AdminUserId),
        internal_notes: row.get(17)?,
        admin_response: row.get(18)?,
        response_sent_at: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
    })
}

fn attachment_from_row(row: &Row<'_>) -> rusqlite::Result<FormAttachment> {
    Ok(FormAttachment {
        id: AttachmentId(row.get(0)?),
        client_requirement: row.get::<_, Option<i64>>(1)?.map(RequirementId),
        original_filename: row.get(2)?,
        storage_key: row.get(3)?,
        url: row.get(4)?,
        file_size: count(row, 5)?,
        mime_type: row.get(6)?,
        checksum: parsed(row, 7)?,
        uploaded_by_ip: row.get(8)?,
        uploaded_by_user_agent: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn admin_from_row(row: &Row<'_>) -> rusqlite::Result<AdminUser> {
    Ok(AdminUser {
        id: AdminUserId(row.get(0)?),
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: parsed(row, 4)?,
        password_hash: row.get(5)?,
        is_active: row.get(6)?,
        is_staff: row.get(7)?,
        is_superuser: row.get(8)?,
        avatar_url: row.get(9)?,
        two_factor_enabled: row.get(10)?,
        last_ip: row.get(11)?,
        last_login: row.get(12)?,
        created_by: row.get::<_, Option<i64>>(13)?.map(AdminUserId),
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<AdminSession> {
    Ok(AdminSession {
        session_key: row.get(0)?,
        user_id: AdminUserId(row.get(1)?),
        created_at: row.get(2)?,
        expires_at: row.get(3)?,
    })
}

/// Owned SQL value, encoded exactly as `params!` would bind it
fn sql_value(value: &dyn ToSql) -> Result<Value, StoreError> {
    match value.to_sql()? {
        ToSqlOutput::Owned(v) => Ok(v),
        ToSqlOutput::Borrowed(v) => Ok(v.into()),
        _ => Err(StoreError::Backend("unsupported bind value".to_string())),
    }
}

fn to_sqlite_i64<T: TryInto<i64>>(value: T) -> Result<i64, StoreError> {
    value
        .try_into()
        .map_err(|_| StoreError::Backend("numeric overflow".to_string()))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::ConstraintViolation
    )
}

fn visibility_clause(visibility: Visibility, clauses: &mut Vec<&'static str>, args: &mut Vec<Value>) {
    if let Visibility::OwnOrUnassigned(me) = visibility {
        clauses.push("(assigned_to IS NULL OR assigned_to = ?)");
        args.push(Value::Integer(me.get()));
    }
}

/// WHERE clause and positional arguments for a filter
fn filter_clause(filter: &RequirementFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        args.push(Value::Text(status.code().to_string()));
    }
    if let Some(admin) = filter.assigned_to {
        clauses.push("assigned_to = ?");
        args.push(Value::Integer(admin.get()));
    }
    if let Some(service) = filter.service {
        clauses.push(
            "EXISTS (SELECT 1 FROM json_each(client_requirements.services) AS s WHERE s.value = ?)",
        );
        args.push(Value::Text(service.code().to_string()));
    }
    if let Some(term) = &filter.search {
        clauses.push(
            "(instr(fold_case(first_name), ?) > 0 OR instr(fold_case(last_name), ?) > 0 \
             OR instr(fold_case(email), ?) > 0 \
             OR instr(fold_case(coalesce(company, '')), ?) > 0 \
             OR instr(fold_case(project_description), ?) > 0)",
        );
        for _ in 0..5 {
            args.push(Value::Text(term.as_str().to_string()));
        }
    }
    visibility_clause(filter.visibility, &mut clauses, &mut args);

    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (sql, args)
}

fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

#[async_trait]
impl RequirementStore for SqliteStore {
    async fn insert_requirement(
        &self,
        draft: NewRequirement,
        now: DateTime<Utc>,
    ) -> Result<ClientRequirement, StoreError> {
        let record = draft.into_record(RequirementId(0), now);
        let services = serde_json::to_string(&record.services)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO client_requirements (first_name, last_name, email, phone, company, \
             services, other_service, project_description, budget_range, timeline, source, \
             ip_address, user_agent, status, priority, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                record.first_name,
                record.last_name,
                record.email,
                record.phone,
                record.company,
                services,
                record.other_service,
                record.project_description,
                record.budget_range,
                record.timeline,
                record.source,
                record.ip_address,
                record.user_agent,
                record.status.code(),
                record.priority.code(),
                record.created_at,
                record.updated_at,
            ],
        )?;
        let id = RequirementId(conn.last_insert_rowid());
        Ok(ClientRequirement { id, ..record })
    }

    async fn get_requirement(
        &self,
        id: RequirementId,
    ) -> Result<Option<ClientRequirement>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {REQUIREMENT_COLUMNS} FROM client_requirements WHERE id = ?1");
        Ok(conn
            .query_row(&sql, params![id.get()], requirement_from_row)
            .optional()?)
    }

    async fn list_requirements(
        &self,
        filter: &RequirementFilter,
        page: PageRequest,
    ) -> Result<Page<ClientRequirement>, StoreError> {
        let (clause, mut args) = filter_clause(filter);
        let conn = self.conn.lock();

        let total = conn.query_row(
            &format!("SELECT COUNT(*) FROM client_requirements{clause}"),
            params_from_iter(args.iter()),
            |row| count(row, 0),
        )?;

        args.push(Value::Integer(to_sqlite_i64(page.limit)?));
        args.push(Value::Integer(to_sqlite_i64(page.offset)?));
        let mut stmt = conn.prepare(&format!(
            "SELECT {REQUIREMENT_COLUMNS} FROM client_requirements{clause} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), requirement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn save_requirement(&self, record: &ClientRequirement) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE client_requirements SET status = ?1, priority = ?2, assigned_to = ?3, \
             internal_notes = ?4, admin_response = ?5, response_sent_at = ?6, updated_at = ?7 \
             WHERE id = ?8",
            params![
                record.status.code(),
                record.priority.code(),
                record.assigned_to.map(AdminUserId::get),
                record.internal_notes,
                record.admin_response,
                record.response_sent_at,
                record.updated_at,
                record.id.get(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("requirement", record.id));
        }
        Ok(())
    }

    async fn recent_requirements(
        &self,
        since: DateTime<Utc>,
        limit: usize,
        visibility: Visibility,
    ) -> Result<Vec<ClientRequirement>, StoreError> {
        let mut clauses = vec!["created_at >= ?"];
        let mut args = vec![sql_value(&since)?];
        visibility_clause(visibility, &mut clauses, &mut args);
        args.push(Value::Integer(to_sqlite_i64(limit)?));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REQUIREMENT_COLUMNS} FROM client_requirements WHERE {} \
             ORDER BY created_at DESC, id DESC LIMIT ?",
            clauses.join(" AND ")
        ))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), requirement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn stats(&self, today: NaiveDate) -> Result<RequirementStats, StoreError> {
        let mut stats = StatsAccumulator::new(today).finish();
        let conn = self.conn.lock();

        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM client_requirements GROUP BY status")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let status: RequirementStatus = parsed(row, 0)?;
            let n = count(row, 1)?;
            stats.status_counts.insert(status, n);
            stats.total += n;
        }

        let mut stmt = conn.prepare(
            "SELECT s.value, COUNT(*) FROM client_requirements, \
             json_each(client_requirements.services) AS s GROUP BY s.value",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let service: ServiceType = parsed(row, 0)?;
            stats.service_counts.insert(service, count(row, 1)?);
        }

        let (start, end) = day_bounds(today);
        stats.today_count = conn.query_row(
            "SELECT COUNT(*) FROM client_requirements WHERE created_at >= ?1 AND created_at < ?2",
            params![start, end],
            |row| count(row, 0),
        )?;
        stats.unassigned_count = conn.query_row(
            "SELECT COUNT(*) FROM client_requirements WHERE status = ?1 AND assigned_to IS NULL",
            params![RequirementStatus::New.code()],
            |row| count(row, 0),
        )?;
        Ok(stats)
    }

    async fn delete_requirement(&self, id: RequirementId) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM client_requirements WHERE id = ?1",
            params![id.get()],
        )?;
        Ok(removed > 0)
    }

    async fn insert_attachment(
        &self,
        draft: NewAttachment,
        now: DateTime<Utc>,
    ) -> Result<FormAttachment, StoreError> {
        let record = draft.into_record(AttachmentId(0), now);
        let file_size = to_sqlite_i64(record.file_size)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if let Some(owner) = record.client_requirement {
            let exists = tx
                .query_row(
                    "SELECT 1 FROM client_requirements WHERE id = ?1",
                    params![owner.get()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !exists {
                return Err(StoreError::not_found("requirement", owner));
            }
        }
        tx.execute(
            "INSERT INTO form_attachments (client_requirement_id, original_filename, storage_key, \
             url, file_size, mime_type, checksum, uploaded_by_ip, uploaded_by_user_agent, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.client_requirement.map(RequirementId::get),
                record.original_filename,
                record.storage_key,
                record.url,
                file_size,
                record.mime_type,
                record.checksum.to_string(),
                record.uploaded_by_ip,
                record.uploaded_by_user_agent,
                record.created_at,
            ],
        )?;
        let id = AttachmentId(tx.last_insert_rowid());
        tx.commit()?;
        Ok(FormAttachment { id, ..record })
    }

    async fn attachments_for(&self, id: RequirementId) -> Result<Vec<FormAttachment>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM form_attachments \
             WHERE client_requirement_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![id.get()], attachment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn attachment_counts(
        &self,
        ids: &[RequirementId],
    ) -> Result<BTreeMap<RequirementId, u64>, StoreError> {
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT client_requirement_id, COUNT(*) FROM form_attachments \
             WHERE client_requirement_id IN ({placeholders}) GROUP BY client_requirement_id"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter().map(|id| id.get())), |row| {
                Ok((RequirementId(row.get(0)?), count(row, 1)?))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

#[async_trait]
impl AdminStore for SqliteStore {
    async fn insert_admin(
        &self,
        draft: NewAdminUser,
        now: DateTime<Utc>,
    ) -> Result<AdminUser, StoreError> {
        let record = draft.into_record(AdminUserId(0), now);

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if let Some(creator) = record.created_by {
            let exists = tx
                .query_row(
                    "SELECT 1 FROM admin_users WHERE id = ?1",
                    params![creator.get()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !exists {
                return Err(StoreError::not_found("admin", creator));
            }
        }
        let inserted = tx.execute(
            "INSERT INTO admin_users (email, first_name, last_name, role, password_hash, \
             is_active, is_staff, is_superuser, avatar_url, two_factor_enabled, created_by, \
             created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.email,
                record.first_name,
                record.last_name,
                record.role.code(),
                record.password_hash,
                record.is_active,
                record.is_staff,
                record.is_superuser,
                record.avatar_url,
                record.two_factor_enabled,
                record.created_by.map(AdminUserId::get),
                record.created_at,
                record.updated_at,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(StoreError::Conflict(format!(
                    "admin email already registered: {}",
                    record.email
                )));
            }
            Err(err) => return Err(err.into()),
        }
        let id = AdminUserId(tx.last_insert_rowid());
        tx.commit()?;
        Ok(AdminUser { id, ..record })
    }

    async fn get_admin(&self, id: AdminUserId) -> Result<Option<AdminUser>, StoreError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {ADMIN_COLUMNS} FROM admin_users WHERE id = ?1"),
                params![id.get()],
                admin_from_row,
            )
            .optional()?)
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminUser>, StoreError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {ADMIN_COLUMNS} FROM admin_users WHERE email = ?1"),
                params![normalize_email(email)],
                admin_from_row,
            )
            .optional()?)
    }

    async fn list_admins(&self) -> Result<Vec<AdminUser>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map([], admin_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn record_login(
        &self,
        id: AdminUserId,
        ip: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE admin_users SET last_login = ?1, last_ip = coalesce(?2, last_ip), \
             updated_at = ?1 WHERE id = ?3",
            params![at, ip, id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("admin", id));
        }
        Ok(())
    }

    async fn set_active(
        &self,
        id: AdminUserId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE admin_users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, now, id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("admin", id));
        }
        Ok(())
    }

    async fn insert_session(&self, session: &AdminSession) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let known = conn
            .query_row(
                "SELECT 1 FROM admin_users WHERE id = ?1",
                params![session.user_id.get()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !known {
            return Err(StoreError::not_found("admin", session.user_id));
        }
        let inserted = conn.execute(
            "INSERT INTO admin_sessions (session_key, user_id, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.session_key,
                session.user_id.get(),
                session.created_at,
                session.expires_at,
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => Err(StoreError::Conflict(
                "session key already issued".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_session(&self, key: &str) -> Result<Option<AdminSession>, StoreError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT session_key, user_id, created_at, expires_at FROM admin_sessions \
                 WHERE session_key = ?1",
                params![key],
                session_from_row,
            )
            .optional()?)
    }

    async fn delete_session(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM admin_sessions WHERE session_key = ?1",
            params![key],
        )?;
        Ok(removed > 0)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM admin_sessions WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_clause_is_empty_without_filters() {
        let (sql, args) = filter_clause(&RequirementFilter::new());
        assert!(sql.is_empty());
        assert!(args.is_empty());
    }

    #[test]
    fn filter_clause_binds_search_once_per_field() {
        let filter = RequirementFilter::new()
            .with_status(RequirementStatus::New)
            .with_search("Acme")
            .with_visibility(Visibility::OwnOrUnassigned(AdminUserId(3)));
        let (sql, args) = filter_clause(&filter);

        assert!(sql.starts_with(" WHERE status = ?"));
        assert_eq!(sql.matches('?').count(), args.len());
        assert_eq!(args.len(), 1 + 5 + 1);
        assert_eq!(args[1], Value::Text("acme".to_string()));
    }

    #[test]
    fn day_bounds_span_one_day() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let (start, end) = day_bounds(day);
        assert_eq!(start.date_naive(), day);
        assert_eq!(end - start, Duration::days(1));
    }
}
