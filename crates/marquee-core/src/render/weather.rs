// src/render/weather.rs
//! Weather screen: local 24h clock, colorized temperature, and either
//! today's high/low or the condition text.

use core::fmt::Write;

use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    text::{Baseline, Text},
};
use heapless::String;

use super::{center_x, text_style, LINE_HEIGHT};
use crate::model::WeatherSnapshot;
use crate::theme::{local_hour_minute, temp_to_color_f, ThemeState};

const TOP_Y: i32 = 3;

/// Draw the weather screen.
///
/// Absent snapshot fields render as placeholders; this never fails on a
/// partially filled snapshot.
pub fn draw<D>(
    display: &mut D,
    theme: &ThemeState,
    wx: &WeatherSnapshot,
    now_unix: u64,
    x_offset: i32,
    clear_first: bool,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    if clear_first {
        display.clear(Rgb888::BLACK)?;
    }

    let (hh, mm) = local_hour_minute(now_unix, wx.utc_offset_seconds);
    let mut clock_line: String<8> = String::new();
    let _ = write!(clock_line, "{:02}:{:02}", hh, mm);

    let mut temp_line: String<8> = String::new();
    match wx.temp_f {
        Some(t) => {
            let _ = write!(temp_line, "{}\u{b0}F", t as i32);
        }
        None => {
            let _ = temp_line.push_str("--\u{b0}F");
        }
    }

    let mut range_line: String<12> = String::new();
    match (wx.high_f, wx.low_f) {
        (Some(high), Some(low)) => {
            let _ = write!(range_line, "{}\u{b0}/{}\u{b0}", high as i32, low as i32);
        }
        _ => {
            let _ = range_line.push_str(wx.condition.as_str());
        }
    }

    Text::with_baseline(
        clock_line.as_str(),
        Point::new(center_x(clock_line.as_str()) + x_offset, TOP_Y),
        text_style(theme.primary),
        Baseline::Top,
    )
    .draw(display)?;

    Text::with_baseline(
        temp_line.as_str(),
        Point::new(center_x(temp_line.as_str()) + x_offset, TOP_Y + LINE_HEIGHT),
        text_style(temp_to_color_f(wx.temp_f)),
        Baseline::Top,
    )
    .draw(display)?;

    Text::with_baseline(
        range_line.as_str(),
        Point::new(
            center_x(range_line.as_str()) + x_offset,
            TOP_Y + 2 * LINE_HEIGHT,
        ),
        text_style(theme.highlight),
        Baseline::Top,
    )
    .draw(display)?;

    Ok(())
}
