//! SQLite storage backend for rota, built on sqlx.
//!
//! UUIDs are stored as TEXT, instants as unix seconds, calendar days as ISO
//! `YYYY-MM-DD` TEXT. The `idx_attendance_subject_day` unique index enforces
//! the one-record-per-subject-per-day invariant at the storage layer.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use rota_audit::{AuditAction, AuditEvent, AuditLog, AuditLogError, AuditLogFilter, AuditLogId};
use rota_storage::{
    AttendanceId, AttendanceRecord, CreateMeetingParams, CreateUserParams, MarkAttendanceParams,
    Meeting, MeetingId, MeetingStatus, Role, Store, StoreError, User, UserId,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Default cap applied to audit queries without an explicit limit.
const DEFAULT_AUDIT_QUERY_LIMIT: u32 = 1000;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.rota/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".rota");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

// ───────────────────────────── Row decoding helpers ─────────────────────────────

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

fn instant(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {}", secs)))
}

fn calendar_day(s: &str) -> Result<NaiveDate, StoreError> {
    s.parse().map_err(|_| StoreError::Backend(format!("invalid day: {}", s)))
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(s)
    }
}

type UserRow = (
    String,         // id
    String,         // name
    String,         // email
    String,         // role
    Option<String>, // created_by
    Vec<u8>,        // public_key
    i64,            // created_at
    i64,            // updated_at
);

const USER_COLUMNS: &str = "id,name,email,role,created_by,public_key,created_at,updated_at";

fn user_from_row(row: UserRow) -> Result<User, StoreError> {
    let (id, name, email, role, created_by, public_key, created_at, updated_at) = row;
    Ok(User {
        id: UserId(parse_uuid(&id)?),
        name,
        email,
        role: role
            .parse::<Role>()
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        created_by: created_by
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(UserId),
        public_key,
        created_at: instant(created_at)?,
        updated_at: instant(updated_at)?,
    })
}

type AttendanceRow = (
    String,      // id
    String,      // subject_user_id
    String,      // subject_name
    String,      // status
    Option<i64>, // check_in
    String,      // day
    String,      // marked_by
    i64,         // created_at
);

const ATTENDANCE_COLUMNS: &str =
    "id,subject_user_id,subject_name,status,check_in,day,marked_by,created_at";

fn attendance_from_row(row: AttendanceRow) -> Result<AttendanceRecord, StoreError> {
    let (id, subject_id, subject_name, status, check_in, day, marked_by, created_at) = row;
    Ok(AttendanceRecord {
        id: AttendanceId(parse_uuid(&id)?),
        subject_id: UserId(parse_uuid(&subject_id)?),
        subject_name,
        status: status
            .parse()
            .map_err(|e: rota_storage::ParseAttendanceStatusError| {
                StoreError::Backend(e.to_string())
            })?,
        check_in: check_in.map(instant).transpose()?,
        day: calendar_day(&day)?,
        marked_by: UserId(parse_uuid(&marked_by)?),
        created_at: instant(created_at)?,
    })
}

type MeetingRow = (
    String,         // id
    String,         // title
    Option<String>, // description
    i64,            // starts_at
    i64,            // duration_minutes
    String,         // organizer_id
    String,         // status
    Option<String>, // join_link
    i64,            // created_at
    i64,            // updated_at
);

const MEETING_COLUMNS: &str =
    "id,title,description,starts_at,duration_minutes,organizer_id,status,join_link,created_at,updated_at";

impl SqliteStore {
    fn meeting_from_row(row: MeetingRow, attendee_ids: Vec<UserId>) -> Result<Meeting, StoreError> {
        let (
            id,
            title,
            description,
            starts_at,
            duration_minutes,
            organizer_id,
            status,
            join_link,
            created_at,
            updated_at,
        ) = row;
        Ok(Meeting {
            id: MeetingId(parse_uuid(&id)?),
            title,
            description,
            starts_at: instant(starts_at)?,
            duration_minutes: duration_minutes as u32,
            organizer_id: UserId(parse_uuid(&organizer_id)?),
            attendee_ids,
            status: status
                .parse()
                .map_err(|e: rota_storage::ParseMeetingStatusError| {
                    StoreError::Backend(e.to_string())
                })?,
            join_link,
            created_at: instant(created_at)?,
            updated_at: instant(updated_at)?,
        })
    }

    async fn attendees_of(&self, meeting_id: &str) -> Result<Vec<UserId>, StoreError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT user_id FROM meeting_attendees WHERE meeting_id=? ORDER BY user_id",
        )
        .bind(meeting_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter()
            .map(|(id,)| parse_uuid(&id).map(UserId))
            .collect()
    }

    async fn meetings_from_rows(&self, rows: Vec<MeetingRow>) -> Result<Vec<Meeting>, StoreError> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let attendees = self.attendees_of(&row.0).await?;
            out.push(Self::meeting_from_row(row, attendees)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl Store for SqliteStore {
    // ───────────────────────────────────── Users ──────────────────────────────────────────

    async fn create_user(&self, params: &CreateUserParams) -> Result<UserId, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO users(id,name,email,role,created_by,public_key,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(&params.name)
        .bind(&params.email)
        .bind(params.role.as_str())
        .bind(params.created_by.as_ref().map(|c| c.0.to_string()))
        .bind(&params.public_key)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(UserId(id))
    }

    async fn get_user_by_id(&self, user_id: &UserId) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id=?",
            USER_COLUMNS
        ))
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(user_from_row).ok_or(StoreError::NotFound)?
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email=?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(user_from_row).ok_or(StoreError::NotFound)?
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at, id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(user_from_row).collect()
    }

    async fn list_users_created_by(&self, creator: &UserId) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE created_by=? ORDER BY created_at, id",
            USER_COLUMNS
        ))
        .bind(creator.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(user_from_row).collect()
    }

    // ───────────────────────────────────── Attendance ─────────────────────────────────────

    async fn insert_attendance(
        &self,
        params: &MarkAttendanceParams,
    ) -> Result<AttendanceRecord, StoreError> {
        let id = Uuid::now_v7();
        let created_at = Utc::now();
        sqlx::query(
            "INSERT INTO attendance(id,subject_user_id,subject_name,status,check_in,day,marked_by,created_at)
             VALUES(?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.subject_id.0.to_string())
        .bind(&params.subject_name)
        .bind(params.status.as_str())
        .bind(params.check_in.map(|t| t.timestamp()))
        .bind(params.day.to_string())
        .bind(params.marked_by.0.to_string())
        .bind(created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(AttendanceRecord {
            id: AttendanceId(id),
            subject_id: params.subject_id.clone(),
            subject_name: params.subject_name.clone(),
            status: params.status,
            check_in: params.check_in,
            day: params.day,
            marked_by: params.marked_by.clone(),
            created_at,
        })
    }

    async fn get_attendance_for_day(
        &self,
        subject: &UserId,
        day: NaiveDate,
    ) -> Result<AttendanceRecord, StoreError> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {} FROM attendance WHERE subject_user_id=? AND day=?",
            ATTENDANCE_COLUMNS
        ))
        .bind(subject.0.to_string())
        .bind(day.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(attendance_from_row).ok_or(StoreError::NotFound)?
    }

    async fn list_attendance(
        &self,
        subjects: Option<&[UserId]>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut sql = format!("SELECT {} FROM attendance", ATTENDANCE_COLUMNS);
        if let Some(subjects) = subjects {
            if subjects.is_empty() {
                return Ok(vec![]);
            }
            sql.push_str(" WHERE subject_user_id IN (");
            sql.push_str(&vec!["?"; subjects.len()].join(","));
            sql.push(')');
        }
        sql.push_str(" ORDER BY day DESC, created_at DESC");

        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql);
        if let Some(subjects) = subjects {
            for subject in subjects {
                query = query.bind(subject.0.to_string());
            }
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.into_iter().map(attendance_from_row).collect()
    }

    async fn list_attendance_for_day(
        &self,
        day: NaiveDate,
        subjects: Option<&[UserId]>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut sql = format!("SELECT {} FROM attendance WHERE day=?", ATTENDANCE_COLUMNS);
        if let Some(subjects) = subjects {
            if subjects.is_empty() {
                return Ok(vec![]);
            }
            sql.push_str(" AND subject_user_id IN (");
            sql.push_str(&vec!["?"; subjects.len()].join(","));
            sql.push(')');
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql).bind(day.to_string());
        if let Some(subjects) = subjects {
            for subject in subjects {
                query = query.bind(subject.0.to_string());
            }
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.into_iter().map(attendance_from_row).collect()
    }

    // ───────────────────────────────────── Meetings ───────────────────────────────────────

    async fn create_meeting(&self, params: &CreateMeetingParams) -> Result<MeetingId, StoreError> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            "INSERT INTO meetings(id,title,description,starts_at,duration_minutes,organizer_id,status,join_link,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(params.id.0.to_string())
        .bind(&params.title)
        .bind(&params.description)
        .bind(params.starts_at.timestamp())
        .bind(params.duration_minutes as i64)
        .bind(params.organizer_id.0.to_string())
        .bind(MeetingStatus::Scheduled.as_str())
        .bind(&params.join_link)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        for attendee in &params.attendee_ids {
            sqlx::query("INSERT INTO meeting_attendees(meeting_id,user_id) VALUES(?,?)")
                .bind(params.id.0.to_string())
                .bind(attendee.0.to_string())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(params.id.clone())
    }

    async fn get_meeting(&self, meeting_id: &MeetingId) -> Result<Meeting, StoreError> {
        let row = sqlx::query_as::<_, MeetingRow>(&format!(
            "SELECT {} FROM meetings WHERE id=?",
            MEETING_COLUMNS
        ))
        .bind(meeting_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => {
                let attendees = self.attendees_of(&row.0).await?;
                Self::meeting_from_row(row, attendees)
            }
        }
    }

    async fn list_meetings(&self) -> Result<Vec<Meeting>, StoreError> {
        let rows = sqlx::query_as::<_, MeetingRow>(&format!(
            "SELECT {} FROM meetings ORDER BY starts_at DESC",
            MEETING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        self.meetings_from_rows(rows).await
    }

    async fn list_meetings_for_user(&self, user_id: &UserId) -> Result<Vec<Meeting>, StoreError> {
        let rows = sqlx::query_as::<_, MeetingRow>(&format!(
            "SELECT DISTINCT m.{} FROM meetings m
             LEFT JOIN meeting_attendees a ON a.meeting_id=m.id
             WHERE m.organizer_id=? OR a.user_id=?
             ORDER BY m.starts_at DESC",
            MEETING_COLUMNS.replace(',', ",m.")
        ))
        .bind(user_id.0.to_string())
        .bind(user_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        self.meetings_from_rows(rows).await
    }

    async fn set_meeting_status(
        &self,
        meeting_id: &MeetingId,
        status: MeetingStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE meetings SET status=?, updated_at=? WHERE id=?")
            .bind(status.as_str())
            .bind(Utc::now().timestamp())
            .bind(meeting_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError> {
        sqlx::query(
            "INSERT INTO audit_log(id,action,actor_id,subject_id,detail,created_at)
             VALUES(?,?,?,?,?,?)",
        )
        .bind(event.id.0.to_string())
        .bind(event.action.to_string())
        .bind(event.actor_id.0.to_string())
        .bind(event.subject_id.as_ref().map(|s| s.0.to_string()))
        .bind(&event.detail)
        .bind(event.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AuditLogError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn query(&self, filter: AuditLogFilter) -> Result<Vec<AuditEvent>, AuditLogError> {
        let mut sql =
            String::from("SELECT id,action,actor_id,subject_id,detail,created_at FROM audit_log");
        let mut clauses = Vec::new();
        if filter.actor_id.is_some() {
            clauses.push("actor_id=?");
        }
        if filter.action.is_some() {
            clauses.push("action=?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut query =
            sqlx::query_as::<_, (String, String, String, Option<String>, Option<String>, i64)>(
                &sql,
            );
        if let Some(actor_id) = &filter.actor_id {
            query = query.bind(actor_id.0.to_string());
        }
        if let Some(action) = &filter.action {
            query = query.bind(action.to_string());
        }
        query = query.bind(filter.limit.unwrap_or(DEFAULT_AUDIT_QUERY_LIMIT) as i64);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuditLogError::Backend(e.to_string()))?;

        rows.into_iter()
            .map(|(id, action, actor_id, subject_id, detail, created_at)| {
                Ok(AuditEvent {
                    id: id
                        .parse::<AuditLogId>()
                        .map_err(|e| AuditLogError::Backend(e.to_string()))?,
                    action: action
                        .parse::<AuditAction>()
                        .map_err(AuditLogError::Backend)?,
                    actor_id: UserId(
                        Uuid::try_parse(&actor_id)
                            .map_err(|e| AuditLogError::Backend(e.to_string()))?,
                    ),
                    subject_id: subject_id
                        .as_deref()
                        .map(Uuid::try_parse)
                        .transpose()
                        .map_err(|e| AuditLogError::Backend(e.to_string()))?
                        .map(UserId),
                    detail,
                    created_at: DateTime::from_timestamp(created_at, 0)
                        .ok_or_else(|| AuditLogError::Backend("invalid timestamp".into()))?,
                })
            })
            .collect()
    }
}
