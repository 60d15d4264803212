use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Mutable record kinds managed by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Patient,
    Visit,
    Encounter,
    Observation,
    Shift,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Patient,
        EntityKind::Visit,
        EntityKind::Encounter,
        EntityKind::Observation,
        EntityKind::Shift,
    ];

    /// Storage name, singular
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Patient => "patient",
            EntityKind::Visit => "visit",
            EntityKind::Encounter => "encounter",
            EntityKind::Observation => "observation",
            EntityKind::Shift => "shift",
        }
    }

    /// URL collection segment, plural
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Patient => "patients",
            EntityKind::Visit => "visits",
            EntityKind::Encounter => "encounters",
            EntityKind::Observation => "observations",
            EntityKind::Shift => "shifts",
        }
    }

    pub fn from_collection(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.collection() == segment)
    }

    /// Fields accepted on input and diffed for the audit trail, in audit order.
    pub fn tracked_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Patient => &[
                "medical_record_number",
                "full_name",
                "date_of_birth",
                "sex",
                "phone",
                "address",
                "allergies",
            ],
            EntityKind::Visit => &[
                "patient_id",
                "department",
                "reason_for_visit",
                "status",
                "scheduled_at",
                "checked_in_at",
            ],
            EntityKind::Encounter => &[
                "visit_id",
                "physician_id",
                "chief_complaint",
                "diagnosis",
                "treatment_plan",
                "notes",
            ],
            EntityKind::Observation => &[
                "patient_id",
                "nurse_id",
                "observed_at",
                "temperature_c",
                "pulse_bpm",
                "respiratory_rate",
                "blood_pressure",
                "spo2",
                "notes",
            ],
            EntityKind::Shift => &[
                "staff_id",
                "ward",
                "shift_date",
                "shift_type",
                "starts_at",
                "ends_at",
            ],
        }
    }

    pub fn tracks(&self, field: &str) -> bool {
        self.tracked_fields().contains(&field)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind '{}'", s))
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
