// src/render/transit.rs
//! Transit screen: one line per configured row, with the row label on the
//! left and a three character countdown token right aligned. Rows with
//! multiple queued tokens cycle through them on a fixed cadence.

use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    text::{Baseline, Text},
};

use super::{text_style, CHAR_WIDTH, LINE_HEIGHT};
use crate::model::TransitRow;
use crate::transit::{token3, NO_ARRIVALS};
use crate::PANEL_WIDTH;

const TOP_Y: i32 = 2;
const TOKEN_CHARS: i32 = 3;

/// Draw the transit screen.
///
/// `now_ms` drives token cycling: every `toggle_ms` the displayed token for
/// each row advances by one, wrapping per row.
pub fn draw<D>(
    display: &mut D,
    rows: &[TransitRow],
    now_ms: u64,
    toggle_ms: u32,
    x_offset: i32,
    clear_first: bool,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    if clear_first {
        display.clear(Rgb888::BLACK)?;
    }

    let cycle = (now_ms / u64::from(toggle_ms.max(1))) as usize;
    let token_x = PANEL_WIDTH as i32 - TOKEN_CHARS * CHAR_WIDTH + x_offset;
    let label_chars = ((PANEL_WIDTH as i32 - TOKEN_CHARS * CHAR_WIDTH - 1) / CHAR_WIDTH) as usize;

    for (i, row) in rows.iter().enumerate() {
        let y = TOP_Y + i as i32 * LINE_HEIGHT;
        let style = text_style(row.color);

        let label = if row.label.len() > label_chars {
            &row.label[..label_chars]
        } else {
            row.label.as_str()
        };
        Text::with_baseline(label, Point::new(x_offset, y), style, Baseline::Top)
            .draw(display)?;

        let raw = row
            .tokens
            .get(cycle % row.tokens.len().max(1))
            .map(|t| t.as_str())
            .unwrap_or(NO_ARRIVALS);
        let token = token3(raw);
        Text::with_baseline(token.as_str(), Point::new(token_x, y), style, Baseline::Top)
            .draw(display)?;
    }

    Ok(())
}
