use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Position of a version row in an entity's history.
///
/// The mutable draft and the immutable committed snapshots are distinct
/// states, so they get distinct variants rather than a sentinel integer.
/// On the wire the draft is number 0 and committed snapshots are 1, 2, 3, …
/// (the legacy encoding), which serde preserves.
///
/// `Draft` orders below every committed number, so sorting version rows by
/// `number` puts the draft first and the newest snapshot last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum VersionNumber {
    /// The single mutable draft version every entity carries.
    #[default]
    Draft,
    /// A committed snapshot; the number is >= 1 and unique per entity.
    Committed(u32),
}

impl VersionNumber {
    /// Wire encoding: draft is 0, committed snapshots keep their number.
    pub fn as_number(self) -> u32 {
        match self {
            VersionNumber::Draft => 0,
            VersionNumber::Committed(n) => n,
        }
    }

    /// Decode the wire encoding. 0 is the draft, anything else a snapshot.
    pub fn from_number(n: u32) -> Self {
        if n == 0 {
            VersionNumber::Draft
        } else {
            VersionNumber::Committed(n)
        }
    }

    /// The committed number that follows this one. The number after the
    /// draft is 1.
    pub fn next(self) -> Self {
        VersionNumber::Committed(self.as_number() + 1)
    }

    pub fn is_draft(self) -> bool {
        matches!(self, VersionNumber::Draft)
    }
}

impl std::fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionNumber::Draft => write!(f, "draft"),
            VersionNumber::Committed(n) => write!(f, "v{n}"),
        }
    }
}

impl Serialize for VersionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_number())
    }
}

impl<'de> Deserialize<'de> for VersionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(VersionNumber::from_number(u32::deserialize(deserializer)?))
    }
}

/// Data-type tag for an entity field.
///
/// The tag decides which JSON schema the field's free-form `properties`
/// payload must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    SingleLineText,
    MultiLineText,
    Email,
    WholeNumber,
    DecimalNumber,
    DateTime,
    Boolean,
    Json,
    Lookup,
    OptionSet,
}

/// The mutable head record of a logical entity.
///
/// There is exactly one head record per logical entity and it is never
/// physically removed; soft deletion sets `deleted_at` and rewrites the
/// name columns to free them for reuse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
    /// The application this entity belongs to.
    pub app_id: String,
    pub name: String,
    pub display_name: String,
    pub plural_display_name: String,
    pub description: Option<String>,
    /// User currently holding the edit lock, if any.
    pub locked_by_user_id: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string. None when unlocked.
    pub locked_at: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string. Set when soft-deleted.
    pub deleted_at: Option<String>,
}

impl EntityRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A versioned snapshot of an entity's metadata.
///
/// The `(entity_id, number)` pair is unique. Committed rows are
/// immutable once created; only the draft row is updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityVersionRecord {
    pub id: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
    pub entity_id: String,
    pub number: VersionNumber,
    /// The commit this snapshot belongs to. None for the draft.
    pub commit_id: Option<String>,
    pub name: String,
    pub display_name: String,
    pub plural_display_name: String,
    pub description: Option<String>,
    /// Set on the draft row when its entity is soft-deleted.
    pub deleted: bool,
}

/// A field definition attached to exactly one entity version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityFieldRecord {
    pub id: String,
    /// Stable identity across version snapshots: copying a field into a new
    /// version creates a new row with a new `id` but the same `permanent_id`.
    pub permanent_id: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
    pub entity_version_id: String,
    pub name: String,
    pub display_name: String,
    pub data_type: DataType,
    /// Free-form properties payload, shaped by `data_type`.
    pub properties: serde_json::Value,
    pub required: bool,
    pub searchable: bool,
    pub description: Option<String>,
}

/// A named checkpoint grouping many entity versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    pub user_id: String,
    pub message: String,
}

// ── Create payloads ──────────────────────────────────────────────────────────
//
// The store generates ids and stamps created_at/updated_at, so create
// payloads carry only the caller-supplied columns.

#[derive(Debug, Clone)]
pub struct NewEntity {
    pub app_id: String,
    pub name: String,
    pub display_name: String,
    pub plural_display_name: String,
    pub description: Option<String>,
    pub locked_by_user_id: Option<String>,
    pub locked_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEntityVersion {
    pub entity_id: String,
    pub number: VersionNumber,
    pub commit_id: Option<String>,
    pub name: String,
    pub display_name: String,
    pub plural_display_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEntityField {
    pub entity_version_id: String,
    /// None lets the store mint a fresh permanent id; Some carries an
    /// existing one forward when a field is copied into a new version.
    pub permanent_id: Option<String>,
    pub name: String,
    pub display_name: String,
    pub data_type: DataType,
    pub properties: serde_json::Value,
    pub required: bool,
    pub searchable: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCommit {
    pub user_id: String,
    pub message: String,
}

/// Current time as an ISO 8601 / RFC 3339 string.
pub fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_encodes_as_zero() {
        assert_eq!(VersionNumber::Draft.as_number(), 0);
        assert_eq!(VersionNumber::from_number(0), VersionNumber::Draft);
    }

    #[test]
    fn committed_round_trips_through_wire_number() {
        for n in 1..=5u32 {
            let v = VersionNumber::from_number(n);
            assert_eq!(v, VersionNumber::Committed(n));
            assert_eq!(v.as_number(), n);
        }
    }

    #[test]
    fn draft_sorts_below_all_committed() {
        let mut numbers = vec![
            VersionNumber::Committed(3),
            VersionNumber::Draft,
            VersionNumber::Committed(1),
        ];
        numbers.sort();
        assert_eq!(
            numbers,
            vec![
                VersionNumber::Draft,
                VersionNumber::Committed(1),
                VersionNumber::Committed(3),
            ]
        );
    }

    #[test]
    fn next_after_draft_is_one() {
        assert_eq!(VersionNumber::Draft.next(), VersionNumber::Committed(1));
        assert_eq!(
            VersionNumber::Committed(4).next(),
            VersionNumber::Committed(5)
        );
    }

    #[test]
    fn version_number_serde_uses_integer() {
        let json = serde_json::to_string(&VersionNumber::Draft).unwrap();
        assert_eq!(json, "0");
        let json = serde_json::to_string(&VersionNumber::Committed(7)).unwrap();
        assert_eq!(json, "7");
        let v: VersionNumber = serde_json::from_str("0").unwrap();
        assert_eq!(v, VersionNumber::Draft);
        let v: VersionNumber = serde_json::from_str("2").unwrap();
        assert_eq!(v, VersionNumber::Committed(2));
    }

    #[test]
    fn data_type_serde_is_camel_case() {
        let json = serde_json::to_string(&DataType::SingleLineText).unwrap();
        assert_eq!(json, "\"singleLineText\"");
        let dt: DataType = serde_json::from_str("\"wholeNumber\"").unwrap();
        assert_eq!(dt, DataType::WholeNumber);
    }
}
