use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimetableError {
    #[error("Timetable payload contains no session list")]
    NoSessions,
    #[error("Timetable payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unsupported timetable payload of type {0}")]
    Unsupported(&'static str),
}

/// A single study session within a timetable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub week: u32,
    pub day: u32,
    pub duration_hours: f32,
    pub topic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub activities: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub materials: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub homework: String,
}

/// All sessions that belong to the same week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekGroup {
    pub week: u32,
    pub sessions: Vec<StudySession>,
}

/// An ordered sequence of study sessions, stored as it was generated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timetable {
    pub sessions: Vec<StudySession>,
}

impl Timetable {
    pub fn new(sessions: Vec<StudySession>) -> Self {
        Self { sessions }
    }

    /// Parses a timetable as returned by the generator.
    ///
    /// The generator is not consistent about its output: the sessions can
    /// arrive as a JSON array, as an object with a `timetable` field, or as a
    /// string containing either of those (sometimes inside a markdown code
    /// fence, sometimes surrounded by prose).
    pub fn parse(value: &Value) -> Result<Self, TimetableError> {
        match value {
            Value::Array(_) => Ok(Self::new(Vec::<StudySession>::deserialize(value)?)),
            Value::Object(map) => map
                .get("timetable")
                .or_else(|| map.get("schedule"))
                .ok_or(TimetableError::NoSessions)
                .and_then(Self::parse),
            Value::String(raw) => Self::parse_str(raw),
            Value::Null => Err(TimetableError::NoSessions),
            Value::Bool(_) => Err(TimetableError::Unsupported("bool")),
            Value::Number(_) => Err(TimetableError::Unsupported("number")),
        }
    }

    fn parse_str(raw: &str) -> Result<Self, TimetableError> {
        let raw = strip_code_fence(raw.trim());

        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            if !value.is_string() {
                return Self::parse(&value);
            }
        }

        let start = raw.find('[').ok_or(TimetableError::NoSessions)?;
        let end = raw.rfind(']').ok_or(TimetableError::NoSessions)?;

        if end < start {
            return Err(TimetableError::NoSessions);
        }

        let sessions: Vec<StudySession> = serde_json::from_str(&raw[start..=end])?;
        Ok(Self::new(sessions))
    }

    /// Groups the sessions by their week
    pub fn weeks(&self) -> Vec<WeekGroup> {
        group_by_week(&self.sessions)
    }

    /// The sum of all session durations
    pub fn total_hours(&self) -> f32 {
        self.sessions.iter().map(|s| s.duration_hours).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Groups every session under its declared week number.
/// Weeks come out in ascending order, sessions keep their relative order.
pub fn group_by_week(sessions: &[StudySession]) -> Vec<WeekGroup> {
    let mut weeks: BTreeMap<u32, Vec<StudySession>> = BTreeMap::new();

    for session in sessions {
        weeks.entry(session.week).or_default().push(session.clone());
    }

    weeks
        .into_iter()
        .map(|(week, sessions)| WeekGroup { week, sessions })
        .collect()
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(open) = raw.find("```") else {
        return raw;
    };

    let after_open = &raw[open + 3..];
    // Skip the language tag, e.g. ```json
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn session(week: u32, day: u32, topic: &str) -> StudySession {
        StudySession {
            week,
            day,
            duration_hours: 1.0,
            topic: topic.to_string(),
            activities: vec![],
            materials: vec![],
            homework: String::new(),
        }
    }

    #[test]
    fn test_parse_array_with_defaults() {
        let value = json!([
            { "week": 1, "day": 1, "durationHours": 1.5, "topic": "Fractions" },
            {
                "week": 1,
                "day": 3,
                "durationHours": 1,
                "topic": "Decimals",
                "activities": ["Worksheet"],
                "materials": null,
                "homework": "Page 12"
            }
        ]);

        let timetable = Timetable::parse(&value).unwrap();

        assert_eq!(timetable.sessions.len(), 2);
        assert!(timetable.sessions[0].activities.is_empty());
        assert_eq!(timetable.sessions[0].homework, "");
        assert!(timetable.sessions[1].materials.is_empty());
        assert_eq!(timetable.sessions[1].homework, "Page 12");
        assert_eq!(timetable.total_hours(), 2.5);
    }

    #[test]
    fn test_parse_embedded_string() {
        let raw = "Here is your plan:\n```json\n[{\"week\": 2, \"day\": 1, \"durationHours\": 2, \"topic\": \"Cells\"}]\n```\nGood luck!";
        let timetable = Timetable::parse(&Value::String(raw.to_string())).unwrap();

        assert_eq!(timetable.sessions, vec![StudySession {
            duration_hours: 2.0,
            ..session(2, 1, "Cells")
        }]);
    }

    #[test]
    fn test_parse_wrapped_object() {
        let raw = json!({ "timetable": "[{\"week\": 1, \"day\": 2, \"durationHours\": 1, \"topic\": \"Atoms\"}]" });
        let timetable = Timetable::parse(&raw).unwrap();

        assert_eq!(timetable.sessions[0].topic, "Atoms");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Timetable::parse(&Value::Null).is_err());
        assert!(Timetable::parse(&json!("no schedule today")).is_err());
        assert!(Timetable::parse(&json!([{ "week": "one" }])).is_err());
        assert!(Timetable::parse(&json!(42)).is_err());
    }

    #[test]
    fn test_group_by_week() {
        let sessions = vec![
            session(2, 1, "c"),
            session(1, 1, "a"),
            session(1, 4, "b"),
            session(2, 3, "d"),
            session(1, 6, "e"),
        ];

        let weeks = group_by_week(&sessions);

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].week, 1);
        assert_eq!(weeks[1].week, 2);

        let days: Vec<_> = weeks[0].sessions.iter().map(|s| s.day).collect();
        assert_eq!(days, vec![1, 4, 6]);

        let grouped: usize = weeks.iter().map(|w| w.sessions.len()).sum();
        assert_eq!(grouped, sessions.len());
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_week(&[]).is_empty());
    }
}
