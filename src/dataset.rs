//! Storage and loading of the per-event columns of a replay
//!
//! The replay tree is consumed as a CSV export whose header row holds the
//! branch names and whose other rows hold one event each. Columns are immutable
//! once loaded.

use crate::{
    error::CutError,
    numeric::Float,
    schema::{self, ColumnSource, COIN_PION_COLUMNS, NUM_COLUMNS},
    Result,
};

use eyre::WrapErr;

use std::{collections::BTreeMap, fs::File, io::BufReader, io::Read, path::Path};

/// Set of named per-event columns, all of the same length
///
/// Column order is significant: it is the order of the fields of every event
/// row that is extracted from the set.
///
#[derive(Debug)]
pub struct EventColumns {
    /// Column names, in canonical order
    names: Vec<String>,

    /// Position of each column, by name
    index: BTreeMap<String, usize>,

    /// Column values, in the same order as `names`
    values: Vec<Vec<Float>>,

    /// Number of events (length of every column)
    num_events: usize,
}
//
impl EventColumns {
    /// Build a column set from ordered (name, values) pairs
    pub fn from_columns(
        columns: impl IntoIterator<Item = (String, Vec<Float>)>,
    ) -> std::result::Result<Self, CutError> {
        let mut names = Vec::new();
        let mut index = BTreeMap::new();
        let mut values = Vec::new();
        let mut num_events = None;
        for (name, column) in columns {
            match num_events {
                None => num_events = Some(column.len()),
                Some(n) if n != column.len() => {
                    return Err(CutError::Dataset(format!(
                        "column {} has {} events, expected {}",
                        name,
                        column.len(),
                        n
                    )))
                }
                Some(_) => {}
            }
            if index.insert(name.clone(), names.len()).is_some() {
                return Err(CutError::Dataset(format!("column {name} is duplicated")));
            }
            names.push(name);
            values.push(column);
        }
        Ok(Self {
            names,
            index,
            values,
            num_events: num_events.unwrap_or(0),
        })
    }

    /// Load the coincidence pion columns from a CSV export of a replay
    ///
    /// At most `max_events` events are read, if specified.
    ///
    pub fn load_csv(path: &Path, max_events: Option<usize>) -> Result<Self> {
        let file = File::open(path)
            .wrap_err_with(|| format!("Failed to open the event dataset {}", path.display()))?;
        let columns = Self::from_reader(BufReader::new(file), max_events)
            .wrap_err_with(|| format!("Failed to load events from {}", path.display()))?;
        log::info!(
            "Loaded {} events ({} columns) from {}",
            columns.num_events(),
            columns.names.len(),
            path.display()
        );
        Ok(columns)
    }

    /// Load the coincidence pion columns from any CSV source
    pub fn from_reader(reader: impl Read, max_events: Option<usize>) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader
            .headers()
            .wrap_err("Failed to read the branch names")?
            .clone();

        // Locate the replay branch backing each column, if any
        let find_branch = |branch: &str| {
            headers
                .iter()
                .position(|name| name == branch)
                .ok_or_else(|| CutError::Dataset(format!("branch {branch} is missing")))
        };
        let mut sources = Vec::with_capacity(NUM_COLUMNS);
        for spec in COIN_PION_COLUMNS.iter() {
            sources.push(match spec.source {
                ColumnSource::Branch(branch) => Some((find_branch(branch)?, false)),
                ColumnSource::BlockSum(branch) => Some((find_branch(branch)?, true)),
                ColumnSource::Projection { .. } => None,
            });
        }

        // Read the events
        let mut values = vec![Vec::new(); NUM_COLUMNS];
        let limit = max_events.unwrap_or(usize::MAX);
        for (event, record) in csv_reader.records().take(limit).enumerate() {
            let record = record.wrap_err_with(|| format!("Failed to read event {event}"))?;
            for ((column, source), spec) in values.iter_mut().zip(&sources).zip(&COIN_PION_COLUMNS) {
                let Some((field, block_sum)) = *source else {
                    continue;
                };
                let cell = record.get(field).unwrap_or("");
                let value = if block_sum {
                    sum_blocks(cell)
                } else {
                    parse_cell(cell)
                };
                column.push(value.wrap_err_with(|| {
                    format!("Bad value of {} in event {}", spec.name, event)
                })?);
            }
        }

        // Derive the track projections from the focal plane quantities
        for (idx, spec) in COIN_PION_COLUMNS.iter().enumerate() {
            if let ColumnSource::Projection {
                position,
                slope,
                distance,
            } = spec.source
            {
                let projected = {
                    let position = &values[schema_position(position)?];
                    let slope = &values[schema_position(slope)?];
                    position
                        .iter()
                        .zip(slope)
                        .map(|(&pos, &slope)| pos + slope * distance)
                        .collect::<Vec<_>>()
                };
                values[idx] = projected;
            }
        }

        let names = schema::header().into_iter().map(str::to_owned);
        Ok(Self::from_columns(names.zip(values))?)
    }

    /// Number of events in the set
    pub fn num_events(&self) -> usize {
        self.num_events
    }

    /// Column names, in canonical order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a column in canonical order (exact name match)
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Access a column by name (exact name match)
    pub fn column(&self, name: &str) -> Option<&[Float]> {
        self.position(name).map(|idx| self.column_at(idx))
    }

    /// Access a column by position
    pub fn column_at(&self, idx: usize) -> &[Float] {
        &self.values[idx]
    }

    /// Extract the fields of one event, in canonical order
    pub fn row(&self, event: usize) -> Vec<Float> {
        self.values.iter().map(|column| column[event]).collect()
    }
}

/// Position of a column in the canonical schema
fn schema_position(name: &str) -> std::result::Result<usize, CutError> {
    COIN_PION_COLUMNS
        .iter()
        .position(|spec| spec.name == name)
        .ok_or_else(|| CutError::Dataset(format!("column {name} is not part of the schema")))
}

/// Parse a scalar cell, where an empty cell means that there is no value
fn parse_cell(cell: &str) -> Result<Float> {
    if cell.is_empty() {
        return Ok(Float::NAN);
    }
    cell.parse::<Float>()
        .wrap_err_with(|| format!("`{cell}` is not a number"))
}

/// Sum a `;`-separated list of per-block values, ignoring missing entries
fn sum_blocks(cell: &str) -> Result<Float> {
    if cell.is_empty() {
        return Ok(Float::NAN);
    }
    let mut sum = 0.;
    for block in cell.split(';').map(str::trim).filter(|b| !b.is_empty()) {
        let value = parse_cell(block)?;
        if !value.is_nan() {
            sum += value;
        }
    }
    Ok(sum)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::{header, D_CALO, D_EXIT};

    /// CSV export with every branch, where each event's values are derived
    /// from the event index and the field position
    pub(crate) fn synthetic_csv(num_events: usize) -> String {
        let mut branches = Vec::new();
        for spec in COIN_PION_COLUMNS.iter() {
            match spec.source {
                ColumnSource::Branch(b) | ColumnSource::BlockSum(b) => branches.push(b),
                ColumnSource::Projection { .. } => {}
            }
        }
        let mut csv = branches.join(",");
        csv.push('\n');
        for event in 0..num_events {
            let row = branches
                .iter()
                .enumerate()
                .map(|(field, branch)| {
                    if *branch == "P.cal.fly.numGoodAdcHits" {
                        format!("1;{};2", event)
                    } else {
                        format!("{}", event as Float + 0.01 * field as Float)
                    }
                })
                .collect::<Vec<_>>();
            csv.push_str(&row.join(","));
            csv.push('\n');
        }
        csv
    }

    #[test]
    fn from_columns_rejects_ragged_columns() {
        let columns = vec![
            ("a".to_owned(), vec![1., 2., 3.]),
            ("b".to_owned(), vec![1., 2.]),
        ];
        assert!(matches!(
            EventColumns::from_columns(columns),
            Err(CutError::Dataset(_))
        ));
    }

    #[test]
    fn from_columns_preserves_order() {
        let columns = EventColumns::from_columns(vec![
            ("z".to_owned(), vec![1., 2.]),
            ("a".to_owned(), vec![3., 4.]),
        ])
        .unwrap();
        assert_eq!(columns.names(), ["z", "a"]);
        assert_eq!(columns.row(1), vec![2., 4.]);
        assert_eq!(columns.position("a"), Some(1));
        assert_eq!(columns.column("A"), None);
    }

    #[test]
    fn load_full_schema() {
        let csv = synthetic_csv(3);
        let columns = EventColumns::from_reader(csv.as_bytes(), None).unwrap();
        assert_eq!(columns.num_events(), 3);
        assert_eq!(columns.names(), header().as_slice());
        assert_eq!(columns.column("Cal_Adc_Hits").unwrap(), [3., 4., 5.]);

        let xfp = columns.column("P_dc_xfp").unwrap();
        let xpfp = columns.column("P_dc_xpfp").unwrap();
        let x_calo = columns.column("xCalo").unwrap();
        let x_exit = columns.column("xExit").unwrap();
        for event in 0..3 {
            assert_eq!(x_calo[event], xfp[event] + xpfp[event] * D_CALO);
            assert_eq!(x_exit[event], xfp[event] + xpfp[event] * D_EXIT);
        }
    }

    #[test]
    fn max_events_truncates() {
        let csv = synthetic_csv(10);
        let columns = EventColumns::from_reader(csv.as_bytes(), Some(4)).unwrap();
        assert_eq!(columns.num_events(), 4);
    }

    #[test]
    fn empty_and_nan_cells_are_nan() {
        assert!(parse_cell("").unwrap().is_nan());
        assert!(parse_cell("NaN").unwrap().is_nan());
        assert!(parse_cell("nan").unwrap().is_nan());
        assert!(parse_cell("abc").is_err());
        assert_eq!(sum_blocks("1; nan; 2.5").unwrap(), 3.5);
        assert!(sum_blocks("").unwrap().is_nan());
    }

    #[test]
    fn missing_branch_is_an_error() {
        let csv = "H.gtr.beta,H.gtr.th\n1,2\n";
        let err = EventColumns::from_reader(csv.as_bytes(), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CutError>(),
            Some(CutError::Dataset(_))
        ));
    }
}
