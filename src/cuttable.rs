//! Loading of cut definitions and of their run-dependent bounds
//!
//! Two files are involved. The cut-definition file lists, for every named
//! cut, an ordered set of expression templates:
//!
//! ```text
//! # Comments and blank lines are ignored
//! hms_accept = H_gtr_dp > hms_dp.low && H_gtr_dp < hms_dp.high
//! hms_accept = H_cal_etottracknorm > 0.7
//! coin_epi_cut_all_noRF = @hms_accept
//! coin_epi_cut_all_noRF = P_hgcer_npeSum > 1.5
//! ```
//!
//! Repeating a name appends a template to the cut, and `@name` pulls in all
//! the templates of a cut that was defined earlier in the file.
//!
//! The bounds table is a CSV file with columns `run_start`, `run_end`,
//! `symbol`, `low` and `high`, where each row provides the window of one bound
//! symbol for an inclusive range of run numbers.

use crate::{cutexpr, error::CutError, numeric::Float, Result};

use eyre::WrapErr;
use serde::Deserialize;

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

/// Numerical (low, high) window of a cut
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundPair {
    /// Lower end of the window
    pub low: Float,

    /// Upper end of the window
    pub high: Float,
}

/// Cut templates, as read from a cut-definition file
#[derive(Debug)]
pub struct CutDefinitions {
    /// Where the definitions come from (for error reporting)
    path: PathBuf,

    /// Ordered templates of each cut
    cuts: BTreeMap<String, Vec<String>>,
}
//
impl CutDefinitions {
    /// Load cut definitions from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read cut definitions from {}", path.display()))?;
        Ok(Self::parse(&text, path)?)
    }

    /// Parse the contents of a cut-definition file
    pub fn parse(text: &str, path: &Path) -> std::result::Result<Self, CutError> {
        let mut cuts: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            // The first '=' separates the cut name from its definition, the
            // following ones belong to comparison operators.
            let syntax_error = |message: &str| CutError::Syntax {
                expression: line.to_owned(),
                message: message.to_owned(),
            };
            let (name, body) = line
                .split_once('=')
                .ok_or_else(|| syntax_error("expected `cut_name = expression`"))?;
            let (name, body) = (name.trim(), body.trim());
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(syntax_error("invalid cut name"));
            }
            if body.is_empty() {
                return Err(syntax_error("empty cut definition"));
            }

            let templates = if let Some(included) = body.strip_prefix('@') {
                let included = included.trim();
                cuts.get(included)
                    .cloned()
                    .ok_or_else(|| CutError::UnknownCut {
                        cut: included.to_owned(),
                        path: path.to_owned(),
                    })?
            } else {
                vec![body.to_owned()]
            };
            cuts.entry(name.to_owned()).or_default().extend(templates);
        }
        Ok(Self {
            path: path.to_owned(),
            cuts,
        })
    }

    /// Ordered templates of a cut
    pub fn templates(&self, cut: &str) -> std::result::Result<&[String], CutError> {
        self.cuts
            .get(cut)
            .map(Vec::as_slice)
            .ok_or_else(|| CutError::UnknownCut {
                cut: cut.to_owned(),
                path: self.path.clone(),
            })
    }
}

/// Row of the bounds table
#[derive(Debug, Deserialize)]
struct BoundRow {
    run_start: u32,
    run_end: u32,
    symbol: String,
    low: Float,
    high: Float,
}

/// Bounds of all symbols, for one run
#[derive(Debug)]
pub struct RunBounds {
    bounds: BTreeMap<String, BoundPair>,
}
//
impl RunBounds {
    /// Load the bounds applicable to a run from a bounds table file
    pub fn load(path: &Path, run: u32) -> Result<Self> {
        let file = File::open(path)
            .wrap_err_with(|| format!("Failed to open the bounds table {}", path.display()))?;
        Self::from_reader(BufReader::new(file), path, run)
    }

    /// Load the bounds applicable to a run from any CSV source
    pub fn from_reader(reader: impl Read, path: &Path, run: u32) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);
        let mut matched_rows = 0;
        let mut bounds = BTreeMap::new();
        for (line, row) in csv_reader.deserialize::<BoundRow>().enumerate() {
            let row = row.wrap_err_with(|| {
                format!("Bad row {} in bounds table {}", line + 1, path.display())
            })?;
            if !(row.run_start..=row.run_end).contains(&run) {
                continue;
            }
            matched_rows += 1;
            if !(row.low.is_finite() && row.high.is_finite()) {
                return Err(CutError::Syntax {
                    expression: format!("{} bounds for run {}", row.symbol, run),
                    message: "bounds must be finite numbers".to_owned(),
                }
                .into());
            }
            if bounds.contains_key(&row.symbol) {
                log::warn!(
                    "Bound {} is defined more than once for run {}, keeping the first definition",
                    row.symbol,
                    run
                );
                continue;
            }
            log::debug!("{} = [{}, {}]", row.symbol, row.low, row.high);
            bounds.insert(
                row.symbol,
                BoundPair {
                    low: row.low,
                    high: row.high,
                },
            );
        }
        if matched_rows == 0 {
            return Err(CutError::ConfigNotFound {
                run,
                path: path.to_owned(),
            }
            .into());
        }
        Ok(Self { bounds })
    }

    /// Bounds of a symbol
    pub fn get(&self, symbol: &str) -> Option<BoundPair> {
        self.bounds.get(symbol).copied()
    }
}

/// A cut whose bounds have been resolved for a given run
#[derive(Clone, Debug)]
pub struct ResolvedCut {
    /// Name of the cut
    pub name: String,

    /// Ordered expression templates
    pub templates: Vec<String>,

    /// Every bound referenced by the templates
    pub bounds: BTreeMap<String, BoundPair>,
}
//
impl ResolvedCut {
    /// Bounds of a referenced symbol
    pub fn bound(&self, symbol: &str) -> Option<BoundPair> {
        self.bounds.get(symbol).copied()
    }
}

/// Resolved cuts for one run
#[derive(Debug)]
pub struct CutTable {
    cuts: Vec<ResolvedCut>,
}
//
impl CutTable {
    /// Load and resolve a set of cuts for a given run
    pub fn load(cut_names: &[&str], defs_path: &Path, bounds_path: &Path, run: u32) -> Result<Self> {
        let definitions = CutDefinitions::load(defs_path)?;
        let bounds = RunBounds::load(bounds_path, run)?;
        Ok(Self::resolve(cut_names, &definitions, &bounds)?)
    }

    /// Resolve the bounds of a set of cuts
    pub fn resolve(
        cut_names: &[&str],
        definitions: &CutDefinitions,
        bounds: &RunBounds,
    ) -> std::result::Result<Self, CutError> {
        let mut cuts = Vec::with_capacity(cut_names.len());
        for &name in cut_names {
            let templates = definitions.templates(name)?.to_vec();
            let mut cut_bounds = BTreeMap::new();
            for template in &templates {
                for bound_ref in cutexpr::bound_refs(template)? {
                    let pair = bounds.get(&bound_ref.symbol).ok_or_else(|| {
                        CutError::MissingBound {
                            cut: name.to_owned(),
                            symbol: bound_ref.symbol.clone(),
                        }
                    })?;
                    cut_bounds.insert(bound_ref.symbol, pair);
                }
            }
            cuts.push(ResolvedCut {
                name: name.to_owned(),
                templates,
                bounds: cut_bounds,
            });
        }
        Ok(Self { cuts })
    }

    /// Iterate over the resolved cuts, in the order they were requested
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedCut> {
        self.cuts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITIONS: &str = "
        # General acceptance
        hms_accept = H_gtr_dp > hms_dp.low && H_gtr_dp < hms_dp.high
        hms_accept = H_cal_etottracknorm >= 0.7   # PID

        prompt = @hms_accept
        prompt = rf.low < P_RF_Dist < rf.high
        bad = x > missing.low
    ";

    const BOUNDS: &str = "\
run_start,run_end,symbol,low,high
1000,1999,hms_dp,-8,8
1000,1999,rf,0.5,1.5
2000,2999,hms_dp,-10,10
1000,1999,rf,0.0,2.0
";

    fn path() -> PathBuf {
        PathBuf::from("coin_prod.cuts")
    }

    #[test]
    fn parse_definitions() {
        let defs = CutDefinitions::parse(DEFINITIONS, &path()).unwrap();
        assert_eq!(
            defs.templates("prompt").unwrap(),
            [
                "H_gtr_dp > hms_dp.low && H_gtr_dp < hms_dp.high",
                "H_cal_etottracknorm >= 0.7",
                "rf.low < P_RF_Dist < rf.high",
            ]
        );
        assert!(matches!(
            defs.templates("nope"),
            Err(CutError::UnknownCut { .. })
        ));
    }

    #[test]
    fn include_must_come_first() {
        let text = "a = @b\nb = x > 1\n";
        assert!(matches!(
            CutDefinitions::parse(text, &path()),
            Err(CutError::UnknownCut { cut, .. }) if cut == "b"
        ));
    }

    #[test]
    fn malformed_definition() {
        for text in ["just some text", "= x > 1", "a b = x > 1", "a ="] {
            assert!(
                matches!(
                    CutDefinitions::parse(text, &path()),
                    Err(CutError::Syntax { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn bounds_by_run() {
        let bounds = RunBounds::from_reader(BOUNDS.as_bytes(), &path(), 1500).unwrap();
        assert_eq!(bounds.get("hms_dp"), Some(BoundPair { low: -8., high: 8. }));
        // The first matching row wins
        assert_eq!(bounds.get("rf"), Some(BoundPair { low: 0.5, high: 1.5 }));

        let bounds = RunBounds::from_reader(BOUNDS.as_bytes(), &path(), 2999).unwrap();
        assert_eq!(bounds.get("hms_dp"), Some(BoundPair { low: -10., high: 10. }));
        assert_eq!(bounds.get("rf"), None);
    }

    #[test]
    fn run_without_bounds() {
        let err = RunBounds::from_reader(BOUNDS.as_bytes(), &path(), 42).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CutError>(),
            Some(CutError::ConfigNotFound { run: 42, .. })
        ));
    }

    #[test]
    fn bounds_must_be_finite() {
        let table = "run_start,run_end,symbol,low,high\n1,10,rf,nan,1.5\n11,99,rf,0.5,1.5\n";
        let err = RunBounds::from_reader(table.as_bytes(), &path(), 5).unwrap_err();
        assert!(matches!(err.downcast_ref::<CutError>(), Some(CutError::Syntax { .. })));
        // Rows for other runs are not checked
        let bounds = RunBounds::from_reader(table.as_bytes(), &path(), 50).unwrap();
        assert_eq!(bounds.get("rf"), Some(BoundPair { low: 0.5, high: 1.5 }));
    }

    #[test]
    fn resolve_cuts() {
        let defs = CutDefinitions::parse(DEFINITIONS, &path()).unwrap();
        let bounds = RunBounds::from_reader(BOUNDS.as_bytes(), &path(), 1234).unwrap();
        let table = CutTable::resolve(&["prompt", "hms_accept"], &defs, &bounds).unwrap();
        let prompt = table.iter().find(|cut| cut.name == "prompt").unwrap();
        assert_eq!(prompt.templates.len(), 3);
        assert_eq!(prompt.bounds.len(), 2);
        assert_eq!(table.iter().find(|cut| cut.name == "hms_accept").unwrap().bounds.len(), 1);
        let names: Vec<_> = table.iter().map(|cut| cut.name.as_str()).collect();
        assert_eq!(names, ["prompt", "hms_accept"]);
    }

    #[test]
    fn missing_bound_symbol() {
        let defs = CutDefinitions::parse(DEFINITIONS, &path()).unwrap();
        let bounds = RunBounds::from_reader(BOUNDS.as_bytes(), &path(), 2500).unwrap();
        assert!(matches!(
            CutTable::resolve(&["prompt"], &defs, &bounds),
            Err(CutError::MissingBound { symbol, .. }) if symbol == "rf"
        ));
        assert!(matches!(
            CutTable::resolve(&["bad"], &defs, &bounds),
            Err(CutError::MissingBound { symbol, .. }) if symbol == "missing"
        ));
    }
}
