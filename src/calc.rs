use crate::curriculum::{Curriculum, SubjectKey};
use crate::error::ValidationError;
use crate::table::{parse_grade, GradeTable};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Two-decimal rounding applied to every reported average:
/// `Int(100*x + 0.5) / 100`
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct WeightedMean {
    sum: f64,
    denom: f64,
}

impl WeightedMean {
    fn add(&mut self, value: f64, weight: f64) {
        self.sum += value * weight;
        self.denom += weight;
    }

    // Nothing added means no average, not zero.
    fn value(self) -> Option<f64> {
        if self.denom > 0.0 {
            Some(self.sum / self.denom)
        } else {
            None
        }
    }
}

/// Competition ranking over optional values, higher is better.
///
/// A present value ranks `1 + (number of strictly greater values)`, so ties
/// share a rank and consume the following slots (18, 15, 15, 10 ranks as
/// 1, 2, 2, 4). Absent values all share the terminal rank
/// `1 + (number of present values)`.
pub fn competition_ranks(values: &[Option<f64>]) -> Vec<u32> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    let terminal = present.len() as u32 + 1;

    values
        .iter()
        .map(|v| match v {
            Some(v) => present.partition_point(|x| x > v) as u32 + 1,
            None => terminal,
        })
        .collect()
}

/// A cell that could not be used as a grade. `student` is `None` for
/// column-level warnings (a column the curriculum does not know).
#[derive(Debug, Clone, PartialEq)]
pub struct CellWarning {
    pub student: Option<String>,
    pub column: String,
    pub error: ValidationError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitResult {
    pub unit: String,
    pub average: Option<f64>,
    pub rank: u32,
    pub graded_subjects: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentResult {
    pub name: String,
    pub units: Vec<UnitResult>,
    pub overall_average: Option<f64>,
    pub overall_rank: u32,
}

impl StudentResult {
    pub fn unit(&self, id: &str) -> Option<&UnitResult> {
        self.units.iter().find(|u| u.unit == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitRankEntry<'a> {
    pub name: &'a str,
    pub average: f64,
    pub rank: u32,
}

/// Derived view of one grade table. Built by [`compute_report`] and thrown
/// away after use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub students: BTreeMap<String, StudentResult>,
    pub warnings: Vec<CellWarning>,
}

impl Report {
    #[cfg(test)]
    pub fn student(&self, name: &str) -> Option<&StudentResult> {
        self.students.get(name)
    }

    /// Display order for the overall ranking: rank, then name.
    pub fn ranking(&self) -> Vec<&StudentResult> {
        let mut out: Vec<&StudentResult> = self.students.values().collect();
        out.sort_by(|a, b| {
            a.overall_rank
                .cmp(&b.overall_rank)
                .then_with(|| a.name.cmp(&b.name))
        });
        out
    }

    /// Display order for one unit. Only students with an average for the unit
    /// are listed.
    pub fn unit_ranking(&self, unit: &str) -> Vec<UnitRankEntry<'_>> {
        let mut out: Vec<UnitRankEntry<'_>> = self
            .students
            .values()
            .filter_map(|s| {
                let u = s.unit(unit)?;
                Some(UnitRankEntry {
                    name: &s.name,
                    average: u.average?,
                    rank: u.rank,
                })
            })
            .collect();
        out.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(b.name)));
        out
    }
}

struct PartialResult {
    name: String,
    units: Vec<(Option<f64>, usize)>,
    overall: Option<f64>,
}

/// Per-unit and overall weighted averages plus ranks for every student.
///
/// Missing subjects are left out of both the numerator and the denominator.
/// Malformed cells are treated as missing and reported in
/// [`Report::warnings`]; they never abort the computation.
pub fn compute_report(curriculum: &Curriculum, table: &GradeTable) -> Report {
    let mut warnings = Vec::new();

    for column in table.columns() {
        if curriculum.key_for_column(column).is_none() {
            warnings.push(CellWarning {
                student: None,
                column: column.to_string(),
                error: ValidationError::UnknownSubject {
                    key: column.to_string(),
                },
            });
        }
    }

    let unit_columns: Vec<Vec<(String, f64)>> = curriculum
        .units()
        .iter()
        .map(|u| {
            u.subjects
                .iter()
                .map(|s| (SubjectKey::new(&u.id, &s.id).column(), s.coefficient))
                .collect()
        })
        .collect();

    let mut partials: Vec<PartialResult> = Vec::with_capacity(table.len());
    for (name, row) in table.rows() {
        let mut overall = WeightedMean::default();
        let mut units = Vec::with_capacity(unit_columns.len());

        for (unit, columns) in curriculum.units().iter().zip(&unit_columns) {
            let mut acc = WeightedMean::default();
            let mut graded = 0_usize;
            for (column, coefficient) in columns {
                let Some(Some(cell)) = row.get(column) else {
                    continue;
                };
                match parse_grade(cell) {
                    Ok(v) => {
                        acc.add(v, *coefficient);
                        graded += 1;
                    }
                    Err(error) => warnings.push(CellWarning {
                        student: Some(name.to_string()),
                        column: column.clone(),
                        error,
                    }),
                }
            }
            let average = acc.value();
            if let Some(avg) = average {
                overall.add(avg, unit.coefficient);
            }
            units.push((average, graded));
        }

        partials.push(PartialResult {
            name: name.to_string(),
            units,
            overall: overall.value(),
        });
    }

    // Ranks are taken on the values users see, so displayed ties are ties.
    let overall_values: Vec<Option<f64>> = partials
        .iter()
        .map(|p| p.overall.map(round_off_2_decimals))
        .collect();
    let overall_ranks = competition_ranks(&overall_values);

    let unit_ranks: Vec<Vec<u32>> = (0..unit_columns.len())
        .map(|i| {
            let values: Vec<Option<f64>> = partials
                .iter()
                .map(|p| p.units[i].0.map(round_off_2_decimals))
                .collect();
            competition_ranks(&values)
        })
        .collect();

    let mut students = BTreeMap::new();
    for (idx, p) in partials.into_iter().enumerate() {
        let units = curriculum
            .units()
            .iter()
            .zip(&p.units)
            .enumerate()
            .map(|(i, (unit, (average, graded)))| UnitResult {
                unit: unit.id.clone(),
                average: average.map(round_off_2_decimals),
                rank: unit_ranks[i][idx],
                graded_subjects: *graded,
            })
            .collect();
        students.insert(
            p.name.clone(),
            StudentResult {
                name: p.name,
                units,
                overall_average: overall_values[idx],
                overall_rank: overall_ranks[idx],
            },
        );
    }

    Report { students, warnings }
}
