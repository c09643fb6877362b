use std::io::Cursor;

use ::plotters::coord::Shift;
use ::plotters::prelude::*;
use image::{ImageFormat, RgbImage};

use super::{ChartImage, ChartRenderer, Figure, Layout, Panel, PanelKind};
use crate::error::{Error, Result};

const PALETTE: [RGBColor; 6] = [
    RGBColor(0x4c, 0x72, 0xb0),
    RGBColor(0xdd, 0x84, 0x52),
    RGBColor(0x55, 0xa8, 0x68),
    RGBColor(0xc4, 0x4e, 0x52),
    RGBColor(0x81, 0x72, 0xb3),
    RGBColor(0x93, 0x78, 0x60),
];

/// Share of a category slot covered by its bar group.
const BAR_GROUP_WIDTH: f64 = 0.8;

fn render_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

/// Rasterizes figures with `plotters` into an RGB buffer and encodes PNG.
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    /// Canvas size for multi-panel layouts.
    pub grid_size: (u32, u32),
    pub single_size: (u32, u32),
    pub font: String,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self {
            grid_size: (1600, 1400),
            single_size: (1400, 700),
            font: "sans-serif".to_string(),
        }
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, figure: &Figure) -> Result<ChartImage> {
        figure.validate()?;

        let (width, height) = match figure.layout {
            Layout::Single => self.single_size,
            Layout::Grid2x2 | Layout::WideTopGrid2x2 => self.grid_size,
        };
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;
            let body = root
                .titled(&figure.title, (self.font.as_str(), 32).into_font().style(FontStyle::Bold))
                .map_err(render_err)?;

            for (area, panel) in self.split(&body, figure.layout).iter().zip(&figure.panels) {
                self.draw_panel(area, panel)?;
            }
            root.present().map_err(render_err)?;
        }

        let image = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| Error::Render("pixel buffer does not match canvas size".into()))?;
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;

        log::debug!(
            "Rendered '{}' ({}x{}, {} bytes)",
            figure.file_name,
            width,
            height,
            png.get_ref().len()
        );
        Ok(ChartImage {
            file_name: figure.file_name.clone(),
            bytes: png.into_inner(),
        })
    }
}

impl PlottersRenderer {
    fn split<'a>(
        &self,
        area: &DrawingArea<BitMapBackend<'a>, Shift>,
        layout: Layout,
    ) -> Vec<DrawingArea<BitMapBackend<'a>, Shift>> {
        match layout {
            Layout::Single => vec![area.clone()],
            Layout::Grid2x2 => area.split_evenly((2, 2)),
            Layout::WideTopGrid2x2 => {
                let (_, height) = area.dim_in_pixel();
                let (top, bottom) = area.split_vertically(height as i32 / 3);
                let mut areas = vec![top];
                areas.extend(bottom.split_evenly((2, 2)));
                areas
            }
        }
    }

    fn draw_panel(&self, area: &DrawingArea<BitMapBackend<'_>, Shift>, panel: &Panel) -> Result<()> {
        let slots = panel.labels.len().max(1);
        let (lo, hi) = panel.value_range();
        let y_hi = if hi > 0.0 { hi * panel.headroom } else { 1.0 };
        let y_lo = if lo < 0.0 { lo * panel.headroom } else { 0.0 };

        let mut chart = ChartBuilder::on(area)
            .caption(&panel.title, (self.font.as_str(), 22).into_font().style(FontStyle::Bold))
            .margin(12)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..(slots as f64 - 0.5), y_lo..y_hi)
            .map_err(render_err)?;

        let labels = &panel.labels;
        let label_at = |x: &f64| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(slots.min(12))
            .x_label_formatter(&label_at)
            .x_desc(&panel.x_desc)
            .y_desc(&panel.y_desc)
            .label_style((self.font.as_str(), 14))
            .draw()
            .map_err(render_err)?;

        match panel.kind {
            PanelKind::Line => {
                for (i, series) in panel.series.iter().enumerate() {
                    let color = PALETTE[i % PALETTE.len()];
                    let points: Vec<(f64, f64)> = series
                        .values
                        .iter()
                        .enumerate()
                        .filter_map(|(x, v)| v.map(|v| (x as f64, v)))
                        .collect();
                    chart
                        .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
                        .map_err(render_err)?
                        .label(series.name.as_str())
                        .legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                        });
                    chart
                        .draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))
                        .map_err(render_err)?;
                }
            }
            PanelKind::Bar => {
                let groups = panel.series.len().max(1);
                let width = BAR_GROUP_WIDTH / groups as f64;
                for (i, series) in panel.series.iter().enumerate() {
                    let color = PALETTE[i % PALETTE.len()];
                    let offset = -BAR_GROUP_WIDTH / 2.0 + i as f64 * width;
                    chart
                        .draw_series(series.values.iter().enumerate().filter_map(|(x, v)| {
                            let left = x as f64 + offset;
                            v.map(|v| Rectangle::new([(left, 0.0), (left + width, v)], color.filled()))
                        }))
                        .map_err(render_err)?
                        .label(series.name.as_str())
                        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], color.filled()));
                }
            }
        }

        if panel.series.len() > 1 {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK)
                .label_font((self.font.as_str(), 14))
                .draw()
                .map_err(render_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::metrics::{feed_digest, join_messaging_days, messaging_digest};
    use crate::report::feed::feed_figure;
    use crate::report::labels::RU;
    use crate::report::messaging::messaging_figure;
    use crate::report::trends::{audience_figure, trends_figure};
    use crate::store::memory::fixtures::d;
    use crate::store::{
        CohortStatus, CohortTransition, FeedTotals, MessagingTotals, SourceDau, SourceFeed,
        SourceMessages, UserDayMessages,
    };

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    /// Render and check the result is a PNG of the expected canvas size.
    fn assert_png(figure: &Figure, size: (u32, u32)) {
        let image = PlottersRenderer::default().render(figure).unwrap();
        assert_eq!(image.file_name, figure.file_name);
        assert!(image.bytes.starts_with(&PNG_SIGNATURE));
        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), size);
    }

    #[test]
    fn test_renders_feed_figure() {
        let rows: Vec<FeedTotals> = [(100, 900, 90), (105, 0, 0), (140, 1200, 150)]
            .iter()
            .enumerate()
            .map(|(i, &(dau, views, likes))| FeedTotals {
                date: d(2025, 7, 15 + i as u32),
                dau,
                views,
                likes,
            })
            .collect();
        let digest = feed_digest(&rows).unwrap();
        assert_png(&feed_figure(&RU, &digest), PlottersRenderer::default().grid_size);
    }

    #[test]
    fn test_renders_messaging_figure() {
        let totals = vec![
            MessagingTotals { date: d(2025, 7, 16), sent: 8, dau: 2 },
            MessagingTotals { date: d(2025, 7, 17), sent: 6, dau: 1 },
        ];
        let per_user = vec![
            UserDayMessages { date: d(2025, 7, 16), sent: 3 },
            UserDayMessages { date: d(2025, 7, 16), sent: 5 },
            UserDayMessages { date: d(2025, 7, 17), sent: 6 },
        ];
        let digest = messaging_digest(join_messaging_days(&totals, &per_user)).unwrap();
        assert_png(&messaging_figure(&RU, &digest), PlottersRenderer::default().grid_size);
    }

    #[test]
    fn test_renders_trends_figure() {
        let mut dau = Vec::new();
        let mut feed = Vec::new();
        let mut messages = Vec::new();
        for day in 14..=17 {
            for (source, scale) in [("ads", 1), ("organic", 3)] {
                dau.push(SourceDau {
                    date: d(2025, 7, day),
                    source: source.into(),
                    dau: 10 * scale,
                });
                feed.push(SourceFeed {
                    date: d(2025, 7, day),
                    source: source.into(),
                    likes: 4 * scale,
                    views: 20 * scale,
                });
                // organic messages only start on the 16th
                if source == "ads" || day >= 16 {
                    messages.push(SourceMessages {
                        date: d(2025, 7, day),
                        source: source.into(),
                        sent: 7 * scale,
                        senders: 2 * scale,
                    });
                }
            }
        }
        let figure = trends_figure(&RU, &dau, &feed, &messages);
        assert_png(&figure, PlottersRenderer::default().grid_size);
    }

    #[test]
    fn test_renders_audience_with_departed_users() {
        let transition = |this: NaiveDate, status, users| CohortTransition {
            this_week: this,
            previous_week: this - chrono::Duration::weeks(1),
            status,
            users,
        };
        let cohorts = vec![
            transition(d(2025, 7, 7), CohortStatus::New, 12),
            transition(d(2025, 7, 14), CohortStatus::Departed, -5),
            transition(d(2025, 7, 14), CohortStatus::Old, 7),
            transition(d(2025, 7, 14), CohortStatus::New, 3),
        ];
        assert_png(&audience_figure(&RU, &cohorts), PlottersRenderer::default().single_size);
    }

    #[test]
    fn test_renders_empty_audience() {
        assert_png(&audience_figure(&RU, &[]), PlottersRenderer::default().single_size);
    }

    #[test]
    fn test_mismatched_layout_is_rejected_before_drawing() {
        let figure = Figure {
            title: "Broken".into(),
            file_name: "broken.png".into(),
            layout: Layout::WideTopGrid2x2,
            panels: Vec::new(),
        };
        let err = PlottersRenderer::default().render(&figure).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_default_sizes() {
        let r = PlottersRenderer::default();
        assert_eq!(r.grid_size, (1600, 1400));
        assert_eq!(r.single_size, (1400, 700));
    }
}
