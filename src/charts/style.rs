//! Chart Style Module
//! Shared palette and figure geometry for the static charts.

use plotters::prelude::*;

/// Default output resolution.
pub const DEFAULT_DPI: u32 = 300;

/// Color palette, cycled for multi-bar rankings.
pub const PALETTE: [RGBColor; 8] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(243, 156, 18),  // Orange
    RGBColor(155, 89, 182),  // Purple
    RGBColor(26, 188, 156),  // Teal
    RGBColor(230, 126, 34),  // Carrot
    RGBColor(52, 73, 94),    // Midnight Blue
];

/// Get color for a bar or series by position.
pub fn palette_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Figure geometry in inches, rendered at a fixed DPI.
///
/// Font sizes and line widths are given in points (1/72 inch) and scaled to
/// pixels so that a chart keeps its proportions at any resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Figure {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Figure {
    pub fn new(width_in: f64, height_in: f64, dpi: u32) -> Self {
        Self {
            width_in,
            height_in,
            dpi,
        }
    }

    /// Pixel dimensions of the bitmap.
    pub fn pixels(&self) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }

    /// Points to pixels, for font sizes.
    pub fn pt(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }

    /// Points to whole pixels, for margins, label areas and strokes.
    pub fn px(&self, points: f64) -> u32 {
        self.pt(points).round().max(1.0) as u32
    }

    /// Regular sans-serif font at `points`.
    pub fn font(&self, points: f64) -> FontDesc<'static> {
        ("sans-serif", self.pt(points)).into_font()
    }

    /// Bold sans-serif font at `points`, used for titles.
    pub fn bold_font(&self, points: f64) -> FontDesc<'static> {
        self.font(points).style(FontStyle::Bold)
    }
}
