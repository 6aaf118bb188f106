//! Renders the absentee list as a PNG table for the Discord report.
//!
//! The table is laid out first ([`ReportTable::layout`]) so its geometry can be checked without a
//! font, then drawn with plotters onto an RGB buffer and encoded by `image`.

use chrono::NaiveDate;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, register_font};
use std::path::Path;

use crate::dashboard::Absentee;
use crate::error::{Error, Result};
use crate::export;

const FONT_FAMILY: &str = "report";
const FONT_SIZE: u32 = 18;
const TITLE_SIZE: u32 = 24;
/// Pixels per half-width character cell.
const CHAR_UNIT: u32 = 10;
const PADDING: u32 = 24;
const CELL_PADDING: u32 = 12;
const TITLE_HEIGHT: u32 = 44;
const NOTICE_HEIGHT: u32 = 32;
const ROW_HEIGHT: u32 = 36;
const MIN_COLUMN_WIDTHS: [u32; 3] = [80, 100, 160];

pub const HEADERS: [&str; 3] = ["좌석", "이름", "비고"];
pub const NO_ABSENTEES: &str = "결석자 없음";

const HEADER_FILL: RGBColor = RGBColor(229, 231, 235);
const STRIPE_FILL: RGBColor = RGBColor(249, 250, 251);
const BORDER: RGBColor = RGBColor(209, 213, 219);
const ABSENT_TEXT: RGBColor = RGBColor(185, 28, 28);
const PRE_ABSENT_TEXT: RGBColor = RGBColor(126, 34, 206);
const MUTED_TEXT: RGBColor = RGBColor(107, 114, 128);
const NOTICE_TEXT: RGBColor = RGBColor(180, 83, 9);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Absent,
    PreAbsent,
    /// The placeholder row of an empty list.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: [String; 3],
    pub kind: RowKind,
}

/// A fully measured table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub title: String,
    pub notice: Option<String>,
    pub rows: Vec<TableRow>,
    pub column_widths: [u32; 3],
    pub width: u32,
    pub height: u32,
}

/// Width of `text` in half-width cells; Hangul and other wide characters take two.
pub fn display_width(text: &str) -> u32 {
    text.chars().map(|c| if is_wide(c) { 2 } else { 1 }).sum()
}

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA960..=0xA97F
        | 0xAC00..=0xD7A3
        | 0xD7B0..=0xD7FF
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}

fn text_pixels(text: &str) -> u32 {
    display_width(text) * CHAR_UNIT
}

impl ReportTable {
    pub fn layout(date: NaiveDate, absentees: &[Absentee], notice: Option<&str>) -> Self {
        let title = format!(
            "{} 결석자 현황 ({}명)",
            export::display_date(date),
            absentees.len()
        );
        let notice = notice
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| format!("공지: {text}"));

        let rows: Vec<TableRow> = if absentees.is_empty() {
            vec![TableRow {
                cells: [NO_ABSENTEES.to_string(), String::new(), String::new()],
                kind: RowKind::Empty,
            }]
        } else {
            absentees
                .iter()
                .map(|absentee| TableRow {
                    cells: [
                        absentee.seat_id.clone(),
                        absentee.name.clone(),
                        absentee.note.clone(),
                    ],
                    kind: if absentee.is_pre_absent() {
                        RowKind::PreAbsent
                    } else {
                        RowKind::Absent
                    },
                })
                .collect()
        };

        let mut column_widths = MIN_COLUMN_WIDTHS;
        for (column, header) in HEADERS.iter().enumerate() {
            let widest = rows
                .iter()
                .map(|row| text_pixels(&row.cells[column]))
                .chain(std::iter::once(text_pixels(header)))
                .max()
                .unwrap_or(0);
            column_widths[column] = column_widths[column].max(widest + 2 * CELL_PADDING);
        }

        let table_width: u32 = column_widths.iter().sum();
        let title_width = text_pixels(&title) * TITLE_SIZE / FONT_SIZE;
        let notice_width = notice.as_deref().map(text_pixels).unwrap_or(0);
        let width = table_width.max(title_width).max(notice_width) + 2 * PADDING;

        let notice_height = if notice.is_some() { NOTICE_HEIGHT } else { 0 };
        let height = 2 * PADDING
            + TITLE_HEIGHT
            + notice_height
            + ROW_HEIGHT * (rows.len() as u32 + 1);

        Self {
            title,
            notice,
            rows,
            column_widths,
            width,
            height,
        }
    }

    /// The top edge of the header row.
    fn table_top(&self) -> u32 {
        PADDING + TITLE_HEIGHT + if self.notice.is_some() { NOTICE_HEIGHT } else { 0 }
    }
}

/// Reads a TrueType font for the renderer. The bytes live for the rest of the process.
pub fn load_font(path: &Path) -> Result<&'static [u8]> {
    let bytes = std::fs::read(path)?;
    Ok(Box::leak(bytes.into_boxed_slice()))
}

fn render_error(err: impl std::fmt::Display) -> Error {
    Error::Render(err.to_string())
}

/// Draws `table` and returns the encoded PNG.
pub fn render_png(table: &ReportTable, font: &'static [u8]) -> Result<Vec<u8>> {
    register_font(FONT_FAMILY, FontStyle::Normal, font)
        .map_err(|_| Error::Render("invalid font".to_string()))?;

    let (width, height) = (table.width, table.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let left = PADDING as i32;
        let title_style = TextStyle::from((FONT_FAMILY, TITLE_SIZE).into_font()).color(&BLACK);
        root.draw(&Text::new(
            table.title.clone(),
            (left, PADDING as i32),
            title_style,
        ))
        .map_err(render_error)?;

        if let Some(notice) = &table.notice {
            let style = TextStyle::from((FONT_FAMILY, FONT_SIZE).into_font()).color(&NOTICE_TEXT);
            root.draw(&Text::new(
                notice.clone(),
                (left, (PADDING + TITLE_HEIGHT) as i32),
                style,
            ))
            .map_err(render_error)?;
        }

        let right = left + table.column_widths.iter().sum::<u32>() as i32;
        let mut top = table.table_top() as i32;
        let row_height = ROW_HEIGHT as i32;

        let header = HEADERS.map(str::to_string);
        draw_row(&root, &header, &table.column_widths, (left, right), top, HEADER_FILL, &BLACK)?;

        for (index, row) in table.rows.iter().enumerate() {
            top += row_height;
            let fill = if index % 2 == 1 { STRIPE_FILL } else { WHITE };
            let color = match row.kind {
                RowKind::Absent => ABSENT_TEXT,
                RowKind::PreAbsent => PRE_ABSENT_TEXT,
                RowKind::Empty => MUTED_TEXT,
            };
            draw_row(&root, &row.cells, &table.column_widths, (left, right), top, fill, &color)?;
        }

        let bottom = top + row_height;
        root.draw(&Rectangle::new(
            [(left, table.table_top() as i32), (right, bottom)],
            BORDER.stroke_width(1),
        ))
        .map_err(render_error)?;

        root.present().map_err(render_error)?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&buffer, width, height, ColorType::Rgb8)
        .map_err(render_error)?;

    tracing::debug!(width, height, bytes = png.len(), "rendered report table");
    Ok(png)
}

fn draw_row<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    cells: &[String; 3],
    widths: &[u32; 3],
    (left, right): (i32, i32),
    top: i32,
    fill: RGBColor,
    color: &RGBColor,
) -> Result<()> {
    let bottom = top + ROW_HEIGHT as i32;
    root.draw(&Rectangle::new([(left, top), (right, bottom)], fill.filled()))
        .map_err(render_error)?;
    root.draw(&PathElement::new(
        vec![(left, bottom), (right, bottom)],
        BORDER.stroke_width(1),
    ))
    .map_err(render_error)?;

    let style = TextStyle::from((FONT_FAMILY, FONT_SIZE).into_font())
        .color(color)
        .pos(Pos::new(HPos::Left, VPos::Center));

    let mut x = left;
    for (cell, width) in cells.iter().zip(widths) {
        if !cell.is_empty() {
            root.draw(&Text::new(
                cell.clone(),
                (x + CELL_PADDING as i32, top + ROW_HEIGHT as i32 / 2),
                style.clone(),
            ))
            .map_err(render_error)?;
        }
        x += *width as i32;
    }

    Ok(())
}
