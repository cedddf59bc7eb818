// src/render/status.rs
//! Two line status overlay used during connection and boot, plus the
//! [`PanelStatus`] adapter that lets the connectivity layer report progress
//! on whatever panel the platform provides.

use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    text::{Baseline, Text},
};

use super::{center_x, text_style, LINE_HEIGHT};
use crate::platform::{MatrixPanel, StatusDisplay};

/// Draw up to two centered lines of white status text on a cleared panel.
pub fn draw<D>(display: &mut D, line1: &str, line2: Option<&str>) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    display.clear(Rgb888::BLACK)?;

    let style = text_style(Rgb888::WHITE);
    let y1 = if line2.is_some() { 7 } else { 13 };

    Text::with_baseline(
        line1,
        Point::new(center_x(line1), y1),
        style,
        Baseline::Top,
    )
    .draw(display)?;

    if let Some(line2) = line2 {
        Text::with_baseline(
            line2,
            Point::new(center_x(line2), y1 + LINE_HEIGHT),
            style,
            Baseline::Top,
        )
        .draw(display)?;
    }

    Ok(())
}

/// Adapts a [`MatrixPanel`] into the [`StatusDisplay`] the connectivity
/// manager expects, flushing after each update so progress is visible even
/// while the main loop is blocked.
pub struct PanelStatus<'a, P: MatrixPanel>(pub &'a mut P);

impl<P: MatrixPanel> StatusDisplay for PanelStatus<'_, P> {
    fn show(&mut self, line1: &str, line2: &str) {
        let _ = draw(self.0, line1, Some(line2));
        self.0.flush();
    }
}
