#![allow(dead_code)]

use auditorium_core::model::now_epoch_ms;
use auditorium_core::{
    Conference, ConferenceDraft, ConferenceService, ConferenceStatus, PageLimits,
    SchedulingPolicy, SqliteConferenceRepository, SqliteUserRepository, User, UserRepository,
    UserRole,
};
use rusqlite::Connection;

pub const HOUR: i64 = 3_600_000;
const DAY: i64 = 24 * HOUR;

/// Midnight of a day well after "now", so fixtures never count as ended.
pub fn future_day() -> i64 {
    (now_epoch_ms() / DAY + 30) * DAY
}

pub fn at(day: i64, hour: i64, minute: i64) -> i64 {
    day + hour * HOUR + minute * 60_000
}

pub fn user(conn: &Connection, name: &str) -> User {
    let repo = SqliteUserRepository::try_new(conn).unwrap();
    let user = User::new(
        name,
        format!("{}@example.org", name.to_lowercase()),
        UserRole::EventCoordinator,
        now_epoch_ms(),
    );
    repo.create_user(&user).unwrap();
    user
}

pub fn draft(title: &str, starts_at: i64, ends_at: i64, seats: u32) -> ConferenceDraft {
    ConferenceDraft {
        title: title.to_string(),
        description: format!("{title} description"),
        speaker_name: "Grace".to_string(),
        speaker_title: "Principal Engineer".to_string(),
        target_audience: "engineers".to_string(),
        prerequisites: None,
        seats,
        starts_at,
        ends_at,
    }
}

pub fn conference_service(conn: &Connection) -> ConferenceService<SqliteConferenceRepository<'_>> {
    ConferenceService::new(
        SqliteConferenceRepository::try_new(conn).unwrap(),
        SchedulingPolicy::default(),
        PageLimits::default(),
    )
}

pub fn approved_conference(
    conn: &Connection,
    host: &User,
    title: &str,
    starts_at: i64,
    ends_at: i64,
    seats: u32,
) -> Conference {
    let service = conference_service(conn);
    let created = service
        .create_conference(host.id, draft(title, starts_at, ends_at, seats))
        .unwrap();
    service
        .update_status(created.id, ConferenceStatus::Approved)
        .unwrap()
}
