// src/render/mod.rs
//! Fixed-layout renderers for the 32×32 panel.
//!
//! All drawing goes through `DrawTarget<Color = Rgb888>`; the renderers
//! are pure with respect to scheduler state. Each screen renderer takes
//! an `x_offset` and a `clear_first` flag so the scheduler can compose
//! the slide transition: the outgoing screen clears the frame and draws
//! shifted left, the incoming screen draws on top shifted in from the
//! right edge.

pub mod status;
pub mod transit;
pub mod weather;

use embedded_graphics::{
    mono_font::{MonoTextStyle, iso_8859_1::FONT_4X6},
    pixelcolor::Rgb888,
};

use crate::PANEL_WIDTH;

/// Glyph advance of the panel font.
pub(crate) const CHAR_WIDTH: i32 = 4;

/// Vertical distance between text rows.
pub(crate) const LINE_HEIGHT: i32 = 9;

pub(crate) fn text_style(color: Rgb888) -> MonoTextStyle<'static, Rgb888> {
    MonoTextStyle::new(&FONT_4X6, color)
}

/// Pixel width of a string in the panel font.
pub(crate) fn text_width(s: &str) -> i32 {
    s.chars().count() as i32 * CHAR_WIDTH
}

/// X coordinate that centers a string on the panel.
pub(crate) fn center_x(s: &str) -> i32 {
    ((PANEL_WIDTH as i32 - text_width(s)) / 2).max(0)
}
