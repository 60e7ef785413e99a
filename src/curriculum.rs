use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Separator between unit and subject in a column name (`unit|subject`).
pub const KEY_SEPARATOR: char = '|';

/// Fully-qualified subject key: the (unit, subject) pair naming one gradable
/// column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectKey {
    unit: String,
    subject: String,
}

impl SubjectKey {
    pub fn new(unit: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            subject: subject.into(),
        }
    }

    /// Column name as stored in the grade table.
    pub fn column(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.unit, KEY_SEPARATOR, self.subject)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumUnit {
    pub id: String,
    pub coefficient: f64,
    pub subjects: Vec<Subject>,
}

/// Validated, immutable curriculum. The only way to get one is through
/// [`Curriculum::new`], so every instance has passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Curriculum {
    units: Vec<CurriculumUnit>,
    keys: Vec<SubjectKey>,
}

impl Curriculum {
    pub fn new(units: Vec<CurriculumUnit>) -> Result<Self, ConfigError> {
        if units.is_empty() {
            return Err(ConfigError::NoUnits);
        }

        let mut seen_units: HashSet<&str> = HashSet::new();
        let mut seen_keys: HashSet<SubjectKey> = HashSet::new();
        let mut keys = Vec::new();

        for unit in &units {
            check_identifier(&unit.id, "unit")?;
            check_coefficient(unit.coefficient, || format!("unit {:?}", unit.id))?;
            if !seen_units.insert(unit.id.as_str()) {
                return Err(ConfigError::DuplicateUnit {
                    unit: unit.id.clone(),
                });
            }
            if unit.subjects.is_empty() {
                return Err(ConfigError::EmptyUnit {
                    unit: unit.id.clone(),
                });
            }
            for subject in &unit.subjects {
                check_identifier(&subject.id, &format!("subject of unit {:?}", unit.id))?;
                check_coefficient(subject.coefficient, || {
                    format!("subject {:?} of unit {:?}", subject.id, unit.id)
                })?;
                let key = SubjectKey::new(&unit.id, &subject.id);
                if !seen_keys.insert(key.clone()) {
                    return Err(ConfigError::DuplicateSubjectKey {
                        key: key.column(),
                    });
                }
                keys.push(key);
            }
        }

        Ok(Self { units, keys })
    }

    /// Cohort configuration used when a workspace names no curriculum:
    /// seven teaching units weighted by ECTS, each graded through one subject.
    pub fn builtin() -> Self {
        const UNITS: [(&str, &str, f64); 7] = [
            ("ING05-ICY-LSH1", "LSH1", 5.0),
            ("ING05-ICY-Maths", "Maths", 5.0),
            ("ING05-ICY-Archi", "Archi", 4.0),
            ("ING05-ICY-Securite", "Securite", 3.0),
            ("ING05-ICY-Optimisation", "Optimisation", 3.0),
            ("ING05-ICY-DevApp", "DevApp", 6.0),
            ("ING05-ICY-SAE", "SAE", 3.0),
        ];
        let units = UNITS
            .iter()
            .map(|(unit, subject, coefficient)| CurriculumUnit {
                id: unit.to_string(),
                coefficient: *coefficient,
                subjects: vec![Subject {
                    id: subject.to_string(),
                    coefficient: 1.0,
                }],
            })
            .collect::<Vec<_>>();
        let keys = units
            .iter()
            .flat_map(|u| u.subjects.iter().map(|s| SubjectKey::new(&u.id, &s.id)))
            .collect();
        Self { units, keys }
    }

    pub fn units(&self) -> &[CurriculumUnit] {
        &self.units
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.id.as_str())
    }

    /// Every fully-qualified key, units in order, subjects in order.
    pub fn subject_keys(&self) -> &[SubjectKey] {
        &self.keys
    }

    pub fn key_for_column(&self, column: &str) -> Option<&SubjectKey> {
        let (unit, subject) = column.split_once(KEY_SEPARATOR)?;
        self.keys
            .iter()
            .find(|k| k.unit == unit && k.subject == subject)
    }

    pub fn columns(&self) -> Vec<String> {
        self.keys.iter().map(SubjectKey::column).collect()
    }
}

fn check_identifier(id: &str, context: &str) -> Result<(), ConfigError> {
    if id.trim().is_empty() {
        return Err(ConfigError::EmptyIdentifier {
            context: context.to_string(),
        });
    }
    if id.contains(KEY_SEPARATOR) {
        return Err(ConfigError::ReservedSeparator { id: id.to_string() });
    }
    Ok(())
}

fn check_coefficient(value: f64, context: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(ConfigError::NonPositiveCoefficient {
        context: context(),
        value,
    })
}
