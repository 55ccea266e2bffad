use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Timestamp layout used by every `created` field. Sorts correctly as a string.
pub const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn db_time(at: DateTime<Utc>) -> String {
    at.format(DB_TIME_FORMAT).to_string()
}

pub fn parse_db_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, DB_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Shifts a stored timestamp. Unparseable input is returned unchanged.
pub fn add_millis(value: &str, millis: i64) -> String {
    match parse_db_time(value) {
        Some(at) => db_time(at + Duration::milliseconds(millis)),
        None => value.to_string(),
    }
}

/// `later - earlier` in milliseconds, if both parse.
pub fn millis_between(earlier: &str, later: &str) -> Option<i64> {
    let earlier = parse_db_time(earlier)?;
    let later = parse_db_time(later)?;
    Some((later - earlier).num_milliseconds())
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn db_now(&self) -> String {
        db_time(self.now())
    }

    fn db_now_offset(&self, offset_ms: i64) -> String {
        db_time(self.now() + Duration::milliseconds(offset_ms))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant. Used for replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at(value: &str) -> Option<Self> {
        parse_db_time(value).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
