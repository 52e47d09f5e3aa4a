//! Domain models.
//!
//! Entity records mirror the JSON served by the entity API
//! (`id`, `name`, `createdAt`, `scheduledDate`). Points back the scroll demo.

use chrono::{DateTime, Datelike, Duration, Local, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================
// Entity
// ============================================

/// Entity as returned by the API (read)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_unset_time")]
    pub scheduled_date: Option<DateTime<Utc>>,
}

impl Entity {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unnamed Entity"
        } else {
            &self.name
        }
    }

    /// Scheduled date in local time, formatted for lists
    pub fn scheduled_label(&self) -> String {
        self.scheduled_date
            .map(|d| d.with_timezone(&Local).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn created_label(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// Create entity payload (write). The server assigns `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntity {
    pub name: String,
    pub scheduled_date: DateTime<Utc>,
}

/// The backend serializes an unset time as `0001-01-01T00:00:00Z`.
fn deserialize_unset_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(value.filter(|d| d.year() > 1))
}

// ============================================
// Points (scroll demo)
// ============================================

/// One row of the scroll demo
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// 1-based point number
    pub point: u32,
    pub created_at: Option<DateTime<Local>>,
}

/// Generate `size` points and pick the active one at random.
///
/// Returns the points and the active point number (`1..=size`), or `None`
/// when `size` is zero. Points up to the active one carry a creation date.
pub fn generate_points<R: Rng>(
    rng: &mut R,
    now: DateTime<Local>,
    size: u32,
) -> (Vec<Point>, Option<u32>) {
    if size == 0 {
        return (Vec::new(), None);
    }

    let active = rng.gen_range(1..=size);
    let points = (0..size)
        .map(|i| Point {
            point: i + 1,
            created_at: (i <= active).then(|| now + Duration::days(i64::from(i))),
        })
        .collect();

    (points, Some(active))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_entity_deserialization() {
        let json = r#"{
            "id": 5629499534213120,
            "name": "alpha",
            "createdAt": "2017-08-01T10:20:30.123456Z",
            "scheduledDate": "2017-09-01T00:00:00Z"
        }"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.id, 5629499534213120);
        assert_eq!(entity.name, "alpha");
        assert_eq!(
            entity.scheduled_date,
            Some(Utc.with_ymd_and_hms(2017, 9, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unset_scheduled_date() {
        let json = r#"{"id":1,"name":"a","createdAt":"2017-08-01T10:20:30Z","scheduledDate":"0001-01-01T00:00:00Z"}"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.scheduled_date, None);
        assert_eq!(entity.scheduled_label(), "-");

        let json = r#"{"id":2,"name":"b","createdAt":"2017-08-01T10:20:30Z"}"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.scheduled_date, None);
    }

    #[test]
    fn test_new_entity_wire_format() {
        let dto = NewEntity {
            name: "beta".to_string(),
            scheduled_date: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        };
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["name"], "beta");
        assert_eq!(value["scheduledDate"], "2030-01-02T03:04:05Z");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_display_name_fallback() {
        let entity = Entity {
            id: 1,
            name: "  ".to_string(),
            created_at: Utc::now(),
            scheduled_date: None,
        };
        assert_eq!(entity.display_name(), "Unnamed Entity");
    }

    #[test]
    fn test_generate_points() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let (points, active) = generate_points(&mut rng, now, 30);
        let active = active.unwrap();

        assert_eq!(points.len(), 30);
        assert!((1..=30).contains(&active));
        assert_eq!(points[0].point, 1);
        assert_eq!(points[29].point, 30);
        assert_eq!(points[0].created_at, Some(now));
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.created_at.is_some(), i as u32 <= active);
        }
    }

    #[test]
    fn test_generate_no_points() {
        let mut rng = StdRng::seed_from_u64(1);
        let (points, active) = generate_points(&mut rng, Local::now(), 0);
        assert!(points.is_empty());
        assert_eq!(active, None);
    }
}
