use crate::models::{AppState, DatasetState, View};
use crate::stats::Describe;
use crate::views::{
    ColumnSummary, CorrelationMatrix, Distribution, GroupedBoxes, MissingCount, Overview,
    ViewOutput,
};
use eframe::egui;
use eframe::egui::{
    Align, Align2, Color32, FontId, Layout, Pos2, Rect, RichText, Sense, Stroke, Ui, Vec2,
    epaint::TextShape,
};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Line, Plot, PlotPoints};
use std::ops::RangeInclusive;

pub const TITLE: &str = "PC Urinary Marker Analysis";
const DESCRIPTION: &str =
    "This app provides an overview and analysis of the urinary marker dataset.";
const FOOTER: &str = "Developed for quick insights into urinary marker data.";

const SKY_BLUE: Color32 = Color32::from_rgb(135, 206, 235);
const PLOT_HEIGHT: f32 = 320.0;

pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    if let DatasetState::Unavailable(err) = &state.dataset {
        ui.colored_label(Color32::RED, format!("Error loading dataset. {}", err));
        return;
    }

    ui.heading(RichText::new(TITLE).size(28.0).strong());
    ui.label(DESCRIPTION);
    if let Some(ds) = state.dataset.dataset() {
        ui.weak(format!("{} ({})", ds.name, ds.path.display()));
    }
    ui.separator();

    for view in View::ALL {
        if view == View::Distribution {
            ui.add_space(8.0);
            ui.heading("Data Distribution");
            column_selector(ui, state);
        }
        view_section(ui, state, view);
    }

    ui.add_space(8.0);
    ui.separator();
    ui.label(FOOTER);
}

fn column_selector(ui: &mut Ui, state: &mut AppState) {
    let choices = state.histogram_choices();
    if choices.is_empty() {
        ui.label("No numeric columns to visualize.");
        return;
    }

    let mut selected = state.histogram_column.clone().unwrap_or_default();
    ui.horizontal(|ui| {
        ui.label("Select a column to visualize:");
        egui::ComboBox::from_id_salt("histogram_column_combo")
            .selected_text(selected.clone())
            .show_ui(ui, |ui| {
                for name in &choices {
                    ui.selectable_value(&mut selected, name.clone(), name.as_str());
                }
            });
    });

    if !selected.is_empty() && state.histogram_column.as_deref() != Some(selected.as_str()) {
        tracing::debug!("Histogram column set to {}", selected);
        state.histogram_column = Some(selected);
    }
}

fn view_section(ui: &mut Ui, state: &mut AppState, view: View) {
    let mut on = state.is_enabled(view);
    if ui.checkbox(&mut on, view.toggle_label()).changed() {
        state.set_enabled(view, on);
    }
    if !on {
        return;
    }

    match state.output(view) {
        Some(Ok(output)) => {
            ui.indent(("view", view as u8), |ui| render_output(ui, view, output));
        }
        Some(Err(err)) => {
            ui.colored_label(Color32::RED, err.to_string());
        }
        None => {}
    }
    ui.add_space(6.0);
}

fn render_output(ui: &mut Ui, view: View, output: &ViewOutput) {
    match output {
        ViewOutput::Overview(o) => render_overview(ui, o),
        ViewOutput::Summary(s) => render_summary(ui, s),
        ViewOutput::Missing(m) => render_missing(ui, m),
        ViewOutput::Distribution(d) => render_distribution(ui, d),
        ViewOutput::Correlation(c) => render_correlation(ui, c),
        ViewOutput::Grouped(g) => render_grouped(ui, view, g),
    }
}

fn text_table(ui: &mut Ui, id: &str, header: &[String], rows: &[Vec<String>]) {
    if header.is_empty() {
        ui.label("(no columns)");
        return;
    }
    ui.push_id(id, |ui| {
        egui::ScrollArea::horizontal().show(ui, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .cell_layout(Layout::left_to_right(Align::Center))
                .columns(Column::auto().at_least(60.0), header.len())
                .header(20.0, |mut row| {
                    for name in header {
                        row.col(|ui| {
                            ui.strong(name.as_str());
                        });
                    }
                })
                .body(|mut body| {
                    for cells in rows {
                        body.row(18.0, |mut row| {
                            for cell in cells {
                                row.col(|ui| {
                                    ui.label(cell.as_str());
                                });
                            }
                        });
                    }
                });
        });
    });
}

fn render_overview(ui: &mut Ui, o: &Overview) {
    ui.label(format!("Shape of the dataset: ({}, {})", o.rows, o.columns));
    text_table(ui, "overview_head", &o.header, &o.head);

    ui.add_space(4.0);
    ui.label("Column information:");
    let header: Vec<String> = ["#", "Column", "Non-Null Count", "Dtype"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows: Vec<Vec<String>> = o
        .info
        .iter()
        .enumerate()
        .map(|(i, c)| {
            vec![
                i.to_string(),
                c.name.clone(),
                format!("{} non-null", c.non_null),
                c.dtype.clone(),
            ]
        })
        .collect();
    text_table(ui, "overview_info", &header, &rows);
}

fn fmt_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.6}", v),
        None => "NaN".to_string(),
    }
}

fn render_summary(ui: &mut Ui, summary: &[ColumnSummary]) {
    if summary.is_empty() {
        ui.label("No numeric columns to summarize.");
        return;
    }
    let mut header = vec![String::new()];
    header.extend(summary.iter().map(|s| s.name.clone()));

    let stat_rows: [(&str, fn(&Describe) -> Option<f64>); 8] = [
        ("count", |d| Some(d.count as f64)),
        ("mean", |d| d.mean),
        ("std", |d| d.std),
        ("min", |d| d.min),
        ("25%", |d| d.q25),
        ("50%", |d| d.median),
        ("75%", |d| d.q75),
        ("max", |d| d.max),
    ];
    let rows: Vec<Vec<String>> = stat_rows
        .iter()
        .map(|(name, pick)| {
            let mut row = vec![name.to_string()];
            row.extend(summary.iter().map(|s| fmt_stat(pick(&s.stats))));
            row
        })
        .collect();
    text_table(ui, "summary_table", &header, &rows);
}

fn render_missing(ui: &mut Ui, missing: &[MissingCount]) {
    let header = vec!["Column".to_string(), "Missing".to_string()];
    let rows: Vec<Vec<String>> = missing
        .iter()
        .map(|m| vec![m.name.clone(), m.missing.to_string()])
        .collect();
    text_table(ui, "missing_table", &header, &rows);
}

fn render_distribution(ui: &mut Ui, d: &Distribution) {
    ui.label(RichText::new(format!("Distribution of {}", d.column)).strong());
    let Some(h) = &d.histogram else {
        ui.label(format!("{} has no non-null values.", d.column));
        return;
    };
    if d.dropped > 0 {
        ui.weak(format!("{} null or non-finite values left out", d.dropped));
    }

    let width = h.bin_width();
    let bars: Vec<Bar> = h
        .centers()
        .zip(&h.counts)
        .map(|(x, &count)| {
            Bar::new(x, count as f64)
                .width(width)
                .fill(SKY_BLUE)
                .stroke(Stroke::new(1.0, Color32::BLACK))
        })
        .collect();

    Plot::new("distribution_plot")
        .height(PLOT_HEIGHT)
        .allow_scroll(false)
        .x_axis_label(d.column.clone())
        .y_axis_label("Frequency")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(&d.column));
        });
}

/// Cool-warm diverging map over [-1, 1].
pub fn coolwarm(value: f64) -> Color32 {
    const COOL: [f32; 3] = [59.0, 76.0, 192.0];
    const MID: [f32; 3] = [221.0, 221.0, 221.0];
    const WARM: [f32; 3] = [180.0, 4.0, 38.0];

    let t = value.clamp(-1.0, 1.0) as f32;
    let (from, to, s) = if t < 0.0 {
        (COOL, MID, t + 1.0)
    } else {
        (MID, WARM, t)
    };
    let ch = |i: usize| (from[i] + (to[i] - from[i]) * s).round() as u8;
    Color32::from_rgb(ch(0), ch(1), ch(2))
}

fn render_correlation(ui: &mut Ui, m: &CorrelationMatrix) {
    ui.label(RichText::new("Correlation Matrix").strong());
    let n = m.labels.len();
    if n == 0 {
        ui.label("No numeric columns to correlate.");
        return;
    }

    let text_color = ui.visuals().text_color();
    let font = FontId::proportional(11.0);
    let galleys: Vec<_> = m
        .labels
        .iter()
        .map(|l| ui.painter().layout_no_wrap(l.clone(), font.clone(), text_color))
        .collect();
    let margin = galleys.iter().map(|g| g.size().x).fold(0.0, f32::max) + 8.0;

    let cell = (520.0 / n as f32).clamp(14.0, 48.0);
    let grid = cell * n as f32;
    let bar_width = 16.0;
    let size = Vec2::new(margin + grid + 24.0 + bar_width + 40.0, grid + margin);
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let origin = response.rect.min + Vec2::new(margin, 0.0);

    for row in 0..n {
        for col in 0..n {
            let rect = Rect::from_min_size(
                origin + Vec2::new(col as f32 * cell, row as f32 * cell),
                Vec2::splat(cell),
            );
            match m.get(row, col) {
                Some(r) => {
                    painter.rect_filled(rect.shrink(0.5), 0.0, coolwarm(r));
                    if cell >= 34.0 {
                        painter.text(
                            rect.center(),
                            Align2::CENTER_CENTER,
                            format!("{:.2}", r),
                            FontId::proportional(10.0),
                            Color32::BLACK,
                        );
                    }
                }
                None => {
                    painter.rect_filled(rect.shrink(0.5), 0.0, Color32::from_gray(40));
                }
            }
        }
    }

    for (i, galley) in galleys.iter().enumerate() {
        let center = i as f32 * cell + cell / 2.0;
        let size = galley.size();

        let y_pos = Pos2::new(origin.x - 4.0 - size.x, origin.y + center - size.y / 2.0);
        painter.galley(y_pos, galley.clone(), text_color);

        let x_pos = Pos2::new(origin.x + center + size.y / 2.0, origin.y + grid + 4.0);
        painter.add(
            TextShape::new(x_pos, galley.clone(), text_color)
                .with_angle(std::f32::consts::FRAC_PI_2),
        );
    }

    // color bar, +1 at the top
    let bar_left = origin.x + grid + 24.0;
    let steps = 40;
    let step_h = grid / steps as f32;
    for s in 0..steps {
        let value = 1.0 - 2.0 * (s as f64 + 0.5) / steps as f64;
        let rect = Rect::from_min_size(
            Pos2::new(bar_left, origin.y + s as f32 * step_h),
            Vec2::new(bar_width, step_h + 0.5),
        );
        painter.rect_filled(rect, 0.0, coolwarm(value));
    }
    for (value, y) in [(1.0, 0.0), (0.0, grid / 2.0), (-1.0, grid)] {
        painter.text(
            Pos2::new(bar_left + bar_width + 4.0, origin.y + y),
            Align2::LEFT_CENTER,
            format!("{:.1}", value),
            FontId::proportional(10.0),
            text_color,
        );
    }

    if let Some(pos) = response.hover_pos() {
        let rel = pos - origin;
        if rel.x >= 0.0 && rel.y >= 0.0 {
            let (col, row) = ((rel.x / cell) as usize, (rel.y / cell) as usize);
            if row < n && col < n {
                let value = m
                    .get(row, col)
                    .map(|r| format!("{:.3}", r))
                    .unwrap_or_else(|| "undefined".to_string());
                response.on_hover_text(format!(
                    "{} / {}: {}",
                    m.labels[row], m.labels[col], value
                ));
            }
        }
    }
}

struct BoxStyle {
    fill: Color32,
    stroke: Color32,
    median: Color32,
}

fn box_style(view: View) -> BoxStyle {
    match view {
        View::Ca19_9ByDiagnosis => BoxStyle {
            fill: Color32::from_rgb(173, 216, 230),
            stroke: Color32::from_rgb(31, 119, 180),
            median: Color32::RED,
        },
        View::Lyve1ByStage => BoxStyle {
            fill: Color32::from_rgb(152, 223, 138),
            stroke: Color32::from_rgb(44, 160, 44),
            median: Color32::from_rgb(148, 103, 189),
        },
        _ => BoxStyle {
            fill: Color32::from_rgb(158, 202, 225),
            stroke: Color32::from_rgb(31, 119, 180),
            median: Color32::from_rgb(255, 127, 14),
        },
    }
}

fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let idx = mark.value.round();
        if idx < 0.0 || (mark.value - idx).abs() > 1e-6 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    }
}

fn render_grouped(ui: &mut Ui, view: View, g: &GroupedBoxes) {
    ui.label(RichText::new(g.title).strong());
    if g.groups.is_empty() {
        ui.label("No rows with values to plot.");
        return;
    }

    let style = box_style(view);
    let box_width = 0.5;
    let elems: Vec<BoxElem> = g
        .groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let s = group.summary;
            BoxElem::new(
                i as f64,
                BoxSpread::new(s.lower_whisker, s.q1, s.median, s.q3, s.upper_whisker),
            )
            .name(format!("{} (n={})", group.label, group.count))
            .box_width(box_width)
            .whisker_width(box_width * 0.6)
            .fill(style.fill)
            .stroke(Stroke::new(1.5, style.stroke))
        })
        .collect();
    let medians: Vec<Line> = g
        .groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let (x, m) = (i as f64, group.summary.median);
            Line::new(PlotPoints::from(vec![
                [x - box_width / 2.0, m],
                [x + box_width / 2.0, m],
            ]))
            .color(style.median)
            .width(2.5)
        })
        .collect();
    let labels = g.groups.iter().map(|group| group.label.clone()).collect();

    Plot::new(("grouped_plot", view as u8))
        .height(PLOT_HEIGHT)
        .allow_scroll(false)
        .x_axis_formatter(category_formatter(labels))
        .x_axis_label(g.x_label)
        .y_axis_label(g.y_label)
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(elems).name(g.y_label));
            for line in medians {
                plot_ui.line(line);
            }
        });
}
