//! Allocation matrix output and its CSV form.

use std::collections::HashMap;
use std::fmt::Display;
use std::io;

use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;

use crate::error::PlannerError;
use crate::interaction::round_probability;
use crate::polyline::Polyline;
use crate::traits::{Coordinate, Id};

/// One demand point's row.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationRow<D> {
    demand_id: D,
    /// Rounded to 4 decimals.
    probabilities: Vec<f64>,
    #[serde(skip)]
    exact: Vec<f64>,
    #[serde(skip)]
    in_range: Vec<bool>,
    #[serde(skip)]
    coordinate: Coordinate,
}

impl<D> AllocationRow<D> {
    pub(crate) fn new(demand_id: D, coordinate: Coordinate, exact: Vec<f64>, in_range: Vec<bool>) -> Self {
        let probabilities = exact.iter().map(|&p| round_probability(p)).collect();
        Self {
            demand_id,
            probabilities,
            exact,
            in_range,
            coordinate,
        }
    }

    pub fn demand_id(&self) -> &D {
        &self.demand_id
    }

    /// Probabilities rounded to 4 decimals, in supply column order.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Full-precision probabilities, in supply column order.
    pub fn exact_probabilities(&self) -> &[f64] {
        &self.exact
    }

    /// Whether each supply column lies within the distance cutoff.
    pub fn in_range(&self) -> &[bool] {
        &self.in_range
    }

    /// True when no supply point contributes to this row.
    pub fn is_excluded(&self) -> bool {
        self.exact.iter().all(|&p| p == 0.0)
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }
}

/// An in-range (demand, supply) pair with its straight-line geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Link<'a, D, S> {
    pub demand_id: &'a D,
    pub supply_id: &'a S,
    pub geometry: Polyline,
}

/// Demand-to-supply probabilities plus aggregate supply weights.
///
/// Rows follow the demand input order and columns the supply input order.
/// Built once by the allocation engine and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationMatrix<D: Id, S: Id> {
    supply_ids: Vec<S>,
    rows: Vec<AllocationRow<D>>,
    /// Rounded to the nearest whole unit.
    weights: Vec<i64>,
    #[serde(skip)]
    exact_weights: Vec<f64>,
    #[serde(skip)]
    supply_coordinates: Vec<Coordinate>,
    #[serde(skip)]
    demand_index: HashMap<D, usize>,
    #[serde(skip)]
    supply_index: HashMap<S, usize>,
}

impl<D: Id, S: Id> AllocationMatrix<D, S> {
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    pub(crate) fn new(
        supply_ids: Vec<S>,
        supply_coordinates: Vec<Coordinate>,
        rows: Vec<AllocationRow<D>>,
        exact_weights: Vec<f64>,
    ) -> Self {
        let demand_index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.demand_id.clone(), i))
            .collect();
        let supply_index = supply_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let weights = exact_weights.iter().map(|w| w.round() as i64).collect();

        Self {
            supply_ids,
            rows,
            weights,
            exact_weights,
            supply_coordinates,
            demand_index,
            supply_index,
        }
    }

    pub fn supply_ids(&self) -> &[S] {
        &self.supply_ids
    }

    pub fn rows(&self) -> &[AllocationRow<D>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, demand_id: &D) -> Option<&AllocationRow<D>> {
        self.demand_index.get(demand_id).map(|&i| &self.rows[i])
    }

    /// Rounded probability of `demand_id` choosing `supply_id`.
    pub fn probability(&self, demand_id: &D, supply_id: &S) -> Option<f64> {
        let column = *self.supply_index.get(supply_id)?;
        self.row(demand_id).map(|row| row.probabilities[column])
    }

    pub fn exact_probability(&self, demand_id: &D, supply_id: &S) -> Option<f64> {
        let column = *self.supply_index.get(supply_id)?;
        self.row(demand_id).map(|row| row.exact[column])
    }

    /// Sum over demand points of probability times demand, rounded.
    pub fn supply_weight(&self, supply_id: &S) -> Option<i64> {
        self.supply_index.get(supply_id).map(|&i| self.weights[i])
    }

    pub fn exact_supply_weight(&self, supply_id: &S) -> Option<f64> {
        self.supply_index.get(supply_id).map(|&i| self.exact_weights[i])
    }

    pub fn supply_weights(&self) -> impl Iterator<Item = (&S, i64)> + '_ {
        self.supply_ids.iter().zip(self.weights.iter().copied())
    }

    /// Non-zero rounded shares of one demand point, in column order.
    pub fn shares(&self, demand_id: &D) -> Vec<(&S, f64)> {
        let Some(row) = self.row(demand_id) else {
            return Vec::new();
        };
        self.supply_ids
            .iter()
            .zip(row.probabilities.iter().copied())
            .filter(|(_, p)| *p != 0.0)
            .collect()
    }

    /// Every in-range (demand, supply) pair.
    pub fn links(&self) -> impl Iterator<Item = Link<'_, D, S>> + '_ {
        self.rows.iter().flat_map(move |row| {
            row.in_range
                .iter()
                .enumerate()
                .filter(|(_, in_range)| **in_range)
                .map(move |(column, _)| Link {
                    demand_id: &row.demand_id,
                    supply_id: &self.supply_ids[column],
                    geometry: Polyline::segment(row.coordinate, self.supply_coordinates[column]),
                })
        })
    }

    /// Write the matrix as CSV: `[demand_header, supply ids...]`, then one
    /// row per demand point with 4-decimal probabilities.
    pub fn write_csv<W: io::Write>(&self, writer: W, demand_header: &str) -> Result<(), PlannerError>
    where
        D: Display,
        S: Display,
    {
        let mut csv = WriterBuilder::new().from_writer(writer);

        let mut header = Vec::with_capacity(self.supply_ids.len() + 1);
        header.push(demand_header.to_string());
        header.extend(self.supply_ids.iter().map(|id| id.to_string()));
        csv.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.probabilities.len() + 1);
            record.push(row.demand_id.to_string());
            record.extend(row.probabilities.iter().map(|p| format!("{:.4}", p)));
            csv.write_record(&record)?;
        }

        csv.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// An allocation matrix read back from CSV, keyed by the ids as written.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationTable {
    demand_header: String,
    supply_ids: Vec<String>,
    rows: Vec<(String, Vec<f64>)>,
}

impl AllocationTable {
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, PlannerError> {
        let mut csv = ReaderBuilder::new().from_reader(reader);
        let headers = csv.headers()?.clone();

        let mut columns = headers.iter();
        let demand_header = columns
            .next()
            .ok_or_else(|| PlannerError::MalformedTable {
                line: 1,
                reason: "missing header row".to_string(),
            })?
            .to_string();
        let supply_ids: Vec<String> = columns.map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in csv.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let mut fields = record.iter();
            let demand_id = fields.next().unwrap_or_default().to_string();
            let values = fields
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|err| PlannerError::MalformedTable {
                        line,
                        reason: format!("'{}' is not a probability: {}", field, err),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push((demand_id, values));
        }

        Ok(Self {
            demand_header,
            supply_ids,
            rows,
        })
    }

    pub fn demand_header(&self) -> &str {
        &self.demand_header
    }

    pub fn supply_ids(&self) -> &[String] {
        &self.supply_ids
    }

    pub fn demand_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|(id, _)| id.as_str())
    }

    pub fn row(&self, demand_id: &str) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(id, _)| id == demand_id)
            .map(|(_, values)| values.as_slice())
    }

    /// Non-zero shares of one demand point.
    pub fn shares(&self, demand_id: &str) -> Vec<(&str, f64)> {
        let Some(values) = self.row(demand_id) else {
            return Vec::new();
        };
        self.supply_ids
            .iter()
            .map(String::as_str)
            .zip(values.iter().copied())
            .filter(|(_, p)| *p != 0.0)
            .collect()
    }

    /// Per-supply column sums.
    pub fn column_totals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.supply_ids.len()];
        for (_, values) in &self.rows {
            for (total, value) in totals.iter_mut().zip(values) {
                *total += value;
            }
        }
        totals
    }
}
