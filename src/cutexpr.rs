//! Rendering of cut expression templates into concrete expressions
//!
//! Cut templates refer to run-dependent bounds as `symbol.low` and
//! `symbol.high`. Once the bounds of a run are known, every such reference is
//! replaced by its numerical value, leaving expressions that only mention event
//! variables and constants.

use crate::{cuttable::ResolvedCut, error::CutError};

use std::ops::Range;

/// Which end of a bound pair is referenced
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundField {
    Low,
    High,
}

/// A `symbol.low` or `symbol.high` reference inside of a template
#[derive(Clone, Debug, PartialEq)]
pub struct BoundRef {
    /// Name of the bound pair in the bounds table
    pub symbol: String,

    /// End of the bound pair
    pub field: BoundField,

    /// Location of the reference in the template
    span: Range<usize>,
}

/// List the bound references of a template, in order of appearance
pub fn bound_refs(template: &str) -> Result<Vec<BoundRef>, CutError> {
    let bytes = template.as_bytes();
    let mut refs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).map_or(false, u8::is_ascii_digit)) {
            // Skip numbers so that exponents are not mistaken for names
            i += 1;
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric()
                    || bytes[i] == b'.'
                    || ((bytes[i] == b'+' || bytes[i] == b'-')
                        && matches!(bytes[i - 1], b'e' | b'E')))
            {
                i += 1;
            }
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
            {
                i += 1;
            }
            let word = &template[start..i];
            if let Some((symbol, field)) = word.split_once('.') {
                let field = match field {
                    "low" => BoundField::Low,
                    "high" => BoundField::High,
                    _ => {
                        return Err(CutError::InvalidBound {
                            symbol: symbol.to_owned(),
                            field: field.to_owned(),
                        })
                    }
                };
                refs.push(BoundRef {
                    symbol: symbol.to_owned(),
                    field,
                    span: start..i,
                });
            }
        } else {
            i += 1;
        }
    }
    Ok(refs)
}

/// Replace the bound references of one template with their values
pub fn render(template: &str, cut: &ResolvedCut) -> Result<String, CutError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for bound_ref in bound_refs(template)? {
        let bounds = cut
            .bound(&bound_ref.symbol)
            .ok_or_else(|| CutError::MissingBound {
                cut: cut.name.clone(),
                symbol: bound_ref.symbol.clone(),
            })?;
        let value = match bound_ref.field {
            BoundField::Low => bounds.low,
            BoundField::High => bounds.high,
        };
        rendered.push_str(&template[last..bound_ref.span.start]);
        rendered.push_str(&value.to_string());
        last = bound_ref.span.end;
    }
    rendered.push_str(&template[last..]);
    Ok(rendered)
}

/// Build the ordered list of concrete expressions of a cut
pub fn build_expressions(cut: &ResolvedCut) -> Result<Vec<String>, CutError> {
    let expressions = cut
        .templates
        .iter()
        .map(|template| render(template, cut))
        .collect::<Result<Vec<_>, _>>()?;
    for expression in &expressions {
        log::debug!("{}: {}", cut.name, expression);
    }
    Ok(expressions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuttable::BoundPair;

    fn cut(templates: &[&str]) -> ResolvedCut {
        ResolvedCut {
            name: "test_cut".to_owned(),
            templates: templates.iter().map(|t| t.to_string()).collect(),
            bounds: [
                ("hms_dp".to_owned(), BoundPair { low: -8.0, high: 8.0 }),
                ("rf".to_owned(), BoundPair { low: 0.5, high: 1.25 }),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn finds_references() {
        let refs = bound_refs("H_gtr_dp > hms_dp.low && H_gtr_dp<hms_dp.high").unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].symbol, "hms_dp");
        assert_eq!(refs[0].field, BoundField::Low);
        assert_eq!(refs[1].field, BoundField::High);
    }

    #[test]
    fn numbers_are_not_references() {
        assert!(bound_refs("x > 1.5e-3 && y < .5 && z > 2E+2").unwrap().is_empty());
    }

    #[test]
    fn bad_field_is_rejected() {
        assert!(matches!(
            bound_refs("x > rf.mid"),
            Err(CutError::InvalidBound { .. })
        ));
    }

    #[test]
    fn renders_values() {
        let c = cut(&["H_gtr_dp > hms_dp.low and H_gtr_dp < hms_dp.high", "rf.low < P_RF_Dist < rf.high"]);
        let expressions = build_expressions(&c).unwrap();
        assert_eq!(
            expressions,
            ["H_gtr_dp > -8 and H_gtr_dp < 8", "0.5 < P_RF_Dist < 1.25"]
        );
    }

    #[test]
    fn bound_only_expression() {
        let c = cut(&["hms_dp.low < hms_dp.high"]);
        assert_eq!(build_expressions(&c).unwrap(), ["-8 < 8"]);
    }

    #[test]
    fn missing_bound() {
        let c = cut(&["x > aero.low"]);
        assert!(matches!(
            build_expressions(&c),
            Err(CutError::MissingBound { symbol, .. }) if symbol == "aero"
        ));
    }
}
