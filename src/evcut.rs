//! Mechanism to apply cuts to recorded events

use crate::{
    cutexpr,
    cuttable::{BoundPair, CutTable, ResolvedCut},
    dataset::EventColumns,
    error::CutError,
    expr::{Binding, CompileError, CompiledExpr},
};

use std::collections::BTreeMap;

/// A named cut, ready to be applied to the events of a run
///
/// An event is kept if it passes every expression of the cut.
///
#[derive(Clone, Debug)]
pub struct EventCut {
    /// Name of the cut
    name: String,

    /// Source text and compiled form of each expression, in definition order
    expressions: Vec<(String, CompiledExpr)>,
}
//
impl EventCut {
    /// Render and compile a resolved cut against a set of event columns
    pub fn new(cut: &ResolvedCut, columns: &EventColumns) -> Result<Self, CutError> {
        let expressions = cutexpr::build_expressions(cut)?;
        Self::compile(&cut.name, expressions, &cut.bounds, columns)
    }

    /// Compile concrete expressions
    ///
    /// Identifiers are bound to event columns first, then to the `low` and
    /// `high` ends of the cut's bounds (spelled `symbol.low` and
    /// `symbol.high`). Anything else is an unknown variable.
    ///
    pub fn compile(
        name: &str,
        expressions: Vec<String>,
        bounds: &BTreeMap<String, BoundPair>,
        columns: &EventColumns,
    ) -> Result<Self, CutError> {
        let bind = |ident: &str| {
            if let Some(col) = columns.position(ident) {
                return Some(Binding::Column(col));
            }
            let (symbol, field) = ident.split_once('.')?;
            let pair = bounds.get(symbol)?;
            match field {
                "low" => Some(Binding::Scalar(pair.low)),
                "high" => Some(Binding::Scalar(pair.high)),
                _ => None,
            }
        };
        let expressions = expressions
            .into_iter()
            .map(|text| {
                let compiled = CompiledExpr::compile(&text, bind).map_err(|e| match e {
                    CompileError::Unknown(variable) => CutError::UnknownVariable {
                        cut: name.to_owned(),
                        name: variable,
                        expression: text.clone(),
                    },
                    CompileError::Syntax(message) => CutError::Syntax {
                        expression: text.clone(),
                        message,
                    },
                })?;
                Ok((text, compiled))
            })
            .collect::<Result<Vec<_>, CutError>>()?;
        Ok(Self {
            name: name.to_owned(),
            expressions,
        })
    }

    /// Name of the cut
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source text of the expressions of the cut
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.expressions.iter().map(|(text, _)| text.as_str())
    }

    /// Decide whether an event passes the cut or should be rejected
    pub fn keep(&self, columns: &EventColumns, event: usize) -> bool {
        self.expressions
            .iter()
            .all(|(_, expr)| expr.eval(columns, event))
    }

    /// Compute the pass/fail decision of every event
    pub fn mask(&self, columns: &EventColumns) -> Vec<bool> {
        (0..columns.num_events())
            .map(|event| self.keep(columns, event))
            .collect()
    }
}

/// Every cut of a run, compiled together
///
/// Compiling all cuts up front means that a misconfigured cut is reported
/// before any event is filtered.
///
#[derive(Debug)]
pub struct CutSet {
    cuts: Vec<EventCut>,
}
//
impl CutSet {
    /// Compile all cuts of a cut table
    pub fn compile(table: &CutTable, columns: &EventColumns) -> Result<Self, CutError> {
        let cuts = table
            .iter()
            .map(|cut| EventCut::new(cut, columns))
            .collect::<Result<Vec<_>, _>>()?;
        for cut in &cuts {
            log::info!("Cut {}:", cut.name());
            for expression in cut.expressions() {
                log::info!("    {}", expression);
            }
        }
        Ok(Self { cuts })
    }

    /// Access a compiled cut by name
    pub fn get(&self, name: &str) -> Option<&EventCut> {
        self.cuts.iter().find(|cut| cut.name() == name)
    }
}
