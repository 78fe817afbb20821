//! Sorting of the events of a run into the output categories
//!
//! Every category is an independent selection over the full, unfiltered set of
//! events: an event may appear in several categories.

use crate::{
    cuttable::BoundPair,
    dataset::EventColumns,
    error::CutError,
    evcut::{CutSet, EventCut},
    numeric::Float,
    scheduling,
    schema::MISSING_MASS,
    target, Result,
};

use eyre::eyre;

/// Cut applied to all coincidence events, without RF timing selection
pub const CUT_ALL_NO_RF: &str = "coin_epi_cut_all_noRF";

/// Cut applied to all coincidence events, with the RF timing selection
pub const CUT_ALL_RF: &str = "coin_epi_cut_all_RF";

/// Cut selecting events in the prompt RF window
pub const CUT_PROMPT_RF: &str = "coin_epi_cut_prompt_RF";

/// Cut selecting events in the random RF windows
pub const CUT_RANDOM_RF: &str = "coin_epi_cut_rand_RF";

/// Every cut needed to build the output categories
pub const CUT_NAMES: [&str; 4] = [CUT_ALL_NO_RF, CUT_ALL_RF, CUT_PROMPT_RF, CUT_RANDOM_RF];

/// Output category of the analysis
///
/// Variants are declared in output order, which `Category::ALL` follows.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    /// Every event
    Uncut,

    /// Events passing the cuts, without RF timing selection
    NoRF,

    /// Events passing the cuts, with RF timing selection
    AllRF,

    /// Events in the prompt RF window
    Prompt,

    /// Prompt events whose missing mass lies within the target's window
    PromptMM,

    /// Events in the random RF windows
    Random,
}
//
impl Category {
    /// Every category, in output order
    pub const ALL: [Category; 6] = [
        Category::Uncut,
        Category::NoRF,
        Category::AllRF,
        Category::Prompt,
        Category::PromptMM,
        Category::Random,
    ];

    /// Name of the output table of this category
    pub fn table_name(self) -> &'static str {
        match self {
            Category::Uncut => "Uncut",
            Category::NoRF => "Cut_noRF",
            Category::AllRF => "Cut_All",
            Category::Prompt => "Cut_Prompt",
            Category::PromptMM => "Cut_Prompt_MM",
            Category::Random => "Cut_Random",
        }
    }

    /// Name of the cut that selects this category, if any
    pub fn cut_name(self) -> Option<&'static str> {
        match self {
            Category::Uncut => None,
            Category::NoRF => Some(CUT_ALL_NO_RF),
            Category::AllRF => Some(CUT_ALL_RF),
            Category::Prompt | Category::PromptMM => Some(CUT_PROMPT_RF),
            Category::Random => Some(CUT_RANDOM_RF),
        }
    }
}

/// The events of one output category
#[derive(Debug)]
pub struct FilteredCollection<'columns> {
    /// Category of the events
    pub category: Category,

    /// Column names, shared by every category
    pub header: &'columns [String],

    /// Fields of each selected event, in header order
    pub rows: Vec<Vec<Float>>,
}
//
impl FilteredCollection<'_> {
    /// Name of the output table
    pub fn name(&self) -> &'static str {
        self.category.table_name()
    }

    /// Number of selected events
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Truth that no event was selected
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Applies the cuts of a run to its events
pub struct FilterPipeline<'a> {
    columns: &'a EventColumns,
    /// Cut of each category, indexed in `Category::ALL` order
    cuts: Vec<Option<&'a EventCut>>,
    missing_mass: &'a [Float],
    mm_window: BoundPair,
}
//
impl<'a> FilterPipeline<'a> {
    /// Set up the pipeline, checking that every category can be built
    pub fn new(columns: &'a EventColumns, cuts: &'a CutSet, mm_window: BoundPair) -> Result<Self> {
        let category_cuts = Category::ALL
            .iter()
            .map(|category| {
                category
                    .cut_name()
                    .map(|name| {
                        cuts.get(name)
                            .ok_or_else(|| eyre!("Cut {} was not compiled", name))
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;
        let missing_mass = columns
            .column(MISSING_MASS)
            .ok_or_else(|| CutError::Dataset(format!("column {MISSING_MASS} is missing")))?;
        Ok(Self {
            columns,
            cuts: category_cuts,
            missing_mass,
            mm_window,
        })
    }

    /// Compute which events belong to a category
    pub fn mask(&self, category: Category) -> Vec<bool> {
        let mut mask = match self.cuts[category as usize] {
            Some(cut) => cut.mask(self.columns),
            None => vec![true; self.columns.num_events()],
        };
        if category == Category::PromptMM {
            for (pass, &mm) in mask.iter_mut().zip(self.missing_mass) {
                *pass = *pass && target::in_window(self.mm_window, mm);
            }
        }
        mask
    }

    /// Build the events of one category
    pub fn filter(&self, category: Category) -> FilteredCollection<'a> {
        let rows = self
            .mask(category)
            .into_iter()
            .enumerate()
            .filter(|&(_, pass)| pass)
            .map(|(event, _)| self.columns.row(event))
            .collect::<Vec<_>>();
        log::info!("{}: {} events", category.table_name(), rows.len());
        FilteredCollection {
            category,
            header: self.columns.names(),
            rows,
        }
    }

    /// Build every output category, in output order
    pub fn run(&self) -> Vec<FilteredCollection<'a>> {
        scheduling::run_categories(&Category::ALL, |category| self.filter(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cuttable::{CutDefinitions, CutTable, RunBounds},
        dataset::tests::synthetic_csv,
        schema::NUM_COLUMNS,
    };
    use std::path::Path;

    const DEFINITIONS: &str = "
        base = dp.low < H_gtr_dp < dp.high
        coin_epi_cut_all_noRF = @base
        coin_epi_cut_all_RF = @base
        coin_epi_cut_all_RF = P_RF_Dist > 0
        coin_epi_cut_prompt_RF = @coin_epi_cut_all_RF
        coin_epi_cut_prompt_RF = rf_prompt.low < P_RF_Dist < rf_prompt.high
        coin_epi_cut_rand_RF = @coin_epi_cut_all_RF
        coin_epi_cut_rand_RF = P_RF_Dist >= rf_prompt.high
    ";

    const BOUNDS: &str = "\
run_start,run_end,symbol,low,high
1,100,dp,-8,8
1,100,rf_prompt,0.5,1.5
";

    /// Small event set with the columns used by the test cuts
    fn columns() -> EventColumns {
        EventColumns::from_columns(vec![
            ("H_gtr_dp".to_owned(), vec![0.0, 1.0, -9.0, 2.0, 3.0, 0.0, Float::NAN, 4.0]),
            ("P_RF_Dist".to_owned(), vec![1.0, 1.0, 1.0, 1.8, 0.0, 1.2, 1.0, 1.1]),
            (MISSING_MASS.to_owned(), vec![0.94, 0.90, 0.94, 0.95, 0.95, 0.98, 0.94, Float::NAN]),
        ])
        .unwrap()
    }

    fn cut_set(columns: &EventColumns) -> CutSet {
        let defs = CutDefinitions::parse(DEFINITIONS, Path::new("test.cuts")).unwrap();
        let bounds =
            RunBounds::from_reader(BOUNDS.as_bytes(), Path::new("bounds.csv"), 42).unwrap();
        let table = CutTable::resolve(&CUT_NAMES, &defs, &bounds).unwrap();
        CutSet::compile(&table, columns).unwrap()
    }

    const LH2: BoundPair = BoundPair {
        low: 0.90,
        high: 0.98,
    };

    #[test]
    fn categories() {
        let columns = columns();
        let cuts = cut_set(&columns);
        let pipeline = FilterPipeline::new(&columns, &cuts, LH2).unwrap();
        let output = pipeline.run();

        let names: Vec<_> = output.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            ["Uncut", "Cut_noRF", "Cut_All", "Cut_Prompt", "Cut_Prompt_MM", "Cut_Random"]
        );
        let counts: Vec<_> = output.iter().map(|c| c.len()).collect();
        assert_eq!(counts, [8, 6, 5, 4, 1, 1]);

        // Row count matches the mask of the category
        for collection in &output {
            let selected = pipeline.mask(collection.category).iter().filter(|&&p| p).count();
            assert_eq!(collection.len(), selected);
            for row in &collection.rows {
                assert_eq!(row.len(), collection.header.len());
            }
        }
    }

    #[test]
    fn prompt_mm_is_a_subset_of_prompt() {
        let columns = columns();
        let cuts = cut_set(&columns);
        let pipeline = FilterPipeline::new(&columns, &cuts, LH2).unwrap();
        let prompt = pipeline.mask(Category::Prompt);
        let prompt_mm = pipeline.mask(Category::PromptMM);
        for (&p, &pmm) in prompt.iter().zip(&prompt_mm) {
            assert!(!pmm || p);
        }
        // Events 1 and 5 sit on the window edges, event 7 has no missing mass
        assert_eq!(prompt_mm, [true, false, false, false, false, false, false, false]);
        assert_eq!(prompt, [true, true, false, false, false, true, false, true]);
    }

    #[test]
    fn mm_window_depends_on_target() {
        let columns = columns();
        let cuts = cut_set(&columns);
        let ld2 = BoundPair {
            low: 0.88,
            high: 1.04,
        };
        let pipeline = FilterPipeline::new(&columns, &cuts, ld2).unwrap();
        assert_eq!(pipeline.filter(Category::PromptMM).len(), 3);
    }

    #[test]
    fn reruns_are_identical() {
        let columns = columns();
        let cuts = cut_set(&columns);
        let pipeline = FilterPipeline::new(&columns, &cuts, LH2).unwrap();
        let first = pipeline.run();
        let second = pipeline.run();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.category, b.category);
            assert_eq!(a.len(), b.len());
            for (ra, rb) in a.rows.iter().zip(&b.rows) {
                // Compare bit patterns so that NaN fields compare equal
                let bits = |row: &Vec<Float>| row.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
                assert_eq!(bits(ra), bits(rb));
            }
        }
    }

    #[test]
    fn missing_cut_is_an_error() {
        let columns = columns();
        let defs = CutDefinitions::parse(DEFINITIONS, Path::new("test.cuts")).unwrap();
        let bounds =
            RunBounds::from_reader(BOUNDS.as_bytes(), Path::new("bounds.csv"), 42).unwrap();
        let table = CutTable::resolve(&[CUT_ALL_NO_RF], &defs, &bounds).unwrap();
        let cuts = CutSet::compile(&table, &columns).unwrap();
        assert!(FilterPipeline::new(&columns, &cuts, LH2).is_err());
    }

    #[test]
    fn full_schema_rows() {
        let columns = EventColumns::from_reader(synthetic_csv(5).as_bytes(), None).unwrap();
        let cuts = cut_set(&columns);
        let pipeline = FilterPipeline::new(&columns, &cuts, LH2).unwrap();
        let uncut = pipeline.filter(Category::Uncut);
        assert_eq!(uncut.len(), 5);
        assert_eq!(uncut.header.len(), NUM_COLUMNS);
        assert_eq!(uncut.rows[3], columns.row(3));
    }
}
