//! Declarative charts and their rasterization.
//!
//! Reporters describe what to draw as a [`Figure`]; a [`ChartRenderer`]
//! turns it into PNG bytes. Keeping the description separate lets the
//! reporters be tested without touching fonts or pixels.

pub mod plotters;

pub use self::plotters::PlottersRenderer;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::date_util::format_iso;
use crate::error::{Error, Result};

/// How panels are arranged on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One panel filling the canvas.
    Single,
    /// Four panels, two by two.
    Grid2x2,
    /// One full-width panel above a two by two grid.
    WideTopGrid2x2,
}

impl Layout {
    pub fn panel_count(self) -> usize {
        match self {
            Layout::Single => 1,
            Layout::Grid2x2 => 4,
            Layout::WideTopGrid2x2 => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Line,
    Bar,
}

/// One named series. `values[i]` belongs to the panel's `labels[i]`;
/// `None` leaves a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub kind: PanelKind,
    /// Categorical x axis.
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    /// Multiplier applied to the largest value to get the y axis limit.
    pub headroom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub file_name: String,
    pub layout: Layout,
    pub panels: Vec<Panel>,
}

/// Encoded PNG plus the file name it is delivered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub trait ChartRenderer {
    fn render(&self, figure: &Figure) -> Result<ChartImage>;
}

impl Figure {
    /// Check that panels fit the layout and every series lines up with its labels.
    pub fn validate(&self) -> Result<()> {
        if self.panels.len() != self.layout.panel_count() {
            return Err(Error::Render(format!(
                "layout {:?} needs {} panels, figure '{}' has {}",
                self.layout,
                self.layout.panel_count(),
                self.title,
                self.panels.len()
            )));
        }
        for panel in &self.panels {
            for series in &panel.series {
                if series.values.len() != panel.labels.len() {
                    return Err(Error::Render(format!(
                        "series '{}' in panel '{}' has {} values for {} labels",
                        series.name,
                        panel.title,
                        series.values.len(),
                        panel.labels.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Panel {
    /// Single-series panel over dated values.
    pub fn dated(
        title: &str,
        x_desc: &str,
        y_desc: &str,
        kind: PanelKind,
        headroom: f64,
        points: &[(NaiveDate, f64)],
    ) -> Self {
        Panel {
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: y_desc.to_string(),
            kind,
            labels: points.iter().map(|(d, _)| format_iso(*d)).collect(),
            series: vec![Series {
                name: title.to_string(),
                values: points.iter().map(|(_, v)| Some(*v)).collect(),
            }],
            headroom,
        }
    }

    /// Largest and smallest plotted values, `(0, 0)` for an empty panel.
    pub fn value_range(&self) -> (f64, f64) {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .fold((0.0_f64, 0.0_f64), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

/// Pivot long `(x, group, value)` rows into categorical labels and one
/// series per group. Labels and groups come out sorted; missing cells are
/// `None`.
pub fn pivot<X, G>(rows: impl IntoIterator<Item = (X, G, f64)>) -> (Vec<X>, Vec<Series>)
where
    X: Ord + Clone,
    G: Ord + Clone + ToString,
{
    let mut cells: BTreeMap<(G, X), f64> = BTreeMap::new();
    let mut xs = BTreeSet::new();
    let mut groups = BTreeSet::new();
    for (x, g, v) in rows {
        xs.insert(x.clone());
        groups.insert(g.clone());
        *cells.entry((g, x)).or_default() += v;
    }

    let xs: Vec<X> = xs.into_iter().collect();
    let series = groups
        .into_iter()
        .map(|g| Series {
            name: g.to_string(),
            values: xs
                .iter()
                .map(|x| cells.get(&(g.clone(), x.clone())).copied())
                .collect(),
        })
        .collect();
    (xs, series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::d;

    fn panel(values: Vec<Option<f64>>, labels: usize) -> Panel {
        Panel {
            title: "p".into(),
            x_desc: "x".into(),
            y_desc: "y".into(),
            kind: PanelKind::Bar,
            labels: (0..labels).map(|i| i.to_string()).collect(),
            series: vec![Series {
                name: "s".into(),
                values,
            }],
            headroom: 1.2,
        }
    }

    #[test]
    fn test_pivot_fills_gaps() {
        let rows = vec![
            (d(2025, 7, 1), "ads", 3.0),
            (d(2025, 7, 1), "organic", 5.0),
            (d(2025, 7, 2), "organic", 6.0),
        ];
        let (dates, series) = pivot(rows);
        assert_eq!(dates, vec![d(2025, 7, 1), d(2025, 7, 2)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "ads");
        assert_eq!(series[0].values, vec![Some(3.0), None]);
        assert_eq!(series[1].values, vec![Some(5.0), Some(6.0)]);
    }

    #[test]
    fn test_value_range_includes_negatives() {
        let p = panel(vec![Some(-4.0), None, Some(10.0)], 3);
        assert_eq!(p.value_range(), (-4.0, 10.0));
        assert_eq!(panel(vec![], 0).value_range(), (0.0, 0.0));
    }

    #[test]
    fn test_validate_panel_count() {
        let figure = Figure {
            title: "t".into(),
            file_name: "t.png".into(),
            layout: Layout::Grid2x2,
            panels: vec![panel(vec![Some(1.0)], 1)],
        };
        assert!(matches!(figure.validate(), Err(Error::Render(_))));
    }

    #[test]
    fn test_validate_series_length() {
        let figure = Figure {
            title: "t".into(),
            file_name: "t.png".into(),
            layout: Layout::Single,
            panels: vec![panel(vec![Some(1.0)], 2)],
        };
        assert!(figure.validate().is_err());
    }

    #[test]
    fn test_dated_panel() {
        let p = Panel::dated(
            "DAU",
            "Date",
            "Users",
            PanelKind::Line,
            1.2,
            &[(d(2025, 7, 1), 10.0), (d(2025, 7, 2), 12.0)],
        );
        assert_eq!(p.labels, vec!["2025-07-01", "2025-07-02"]);
        assert_eq!(p.series[0].values, vec![Some(10.0), Some(12.0)]);
    }
}
