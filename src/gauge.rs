// Linear three-zone gauge, drawn on an iced canvas.
//
// Reproduces the instrument-panel bar: low/normal/high colored zones split
// at the configured thresholds, with a black pin at the current value.

use iced::mouse;
use iced::widget::canvas::{self, Path, Stroke};
use iced::{Color, Point, Rectangle, Renderer, Size, Theme};

use crate::config::ChannelConfig;

pub struct LinearGauge {
    cfg: ChannelConfig,
    colors: [Color; 3],
    value: f32,
}

impl LinearGauge {
    pub fn new(cfg: ChannelConfig, colors: [Color; 3], value: f32) -> Self {
        Self { cfg, colors, value }
    }
}

/// Maps a value to a horizontal pixel offset, clamped to the bar.
pub fn val_to_px(value: f32, min: f32, max: f32, width: f32) -> f32 {
    let v = value.clamp(min, max);
    (v - min) / (max - min) * width
}

impl<Message> canvas::Program<Message> for LinearGauge {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let w = frame.width();
        let h = frame.height();

        let x_low = val_to_px(self.cfg.low, self.cfg.min, self.cfg.max, w);
        let x_high = val_to_px(self.cfg.high, self.cfg.min, self.cfg.max, w);

        frame.fill_rectangle(
            Point::new(0.0, 5.0),
            Size::new(x_low, h - 10.0),
            self.colors[0],
        );
        frame.fill_rectangle(
            Point::new(x_low, 5.0),
            Size::new(x_high - x_low, h - 10.0),
            self.colors[1],
        );
        frame.fill_rectangle(
            Point::new(x_high, 5.0),
            Size::new(w - x_high, h - 10.0),
            self.colors[2],
        );

        let pin_x = val_to_px(self.value, self.cfg.min, self.cfg.max, w);
        frame.stroke(
            &Path::line(Point::new(pin_x, 0.0), Point::new(pin_x, h)),
            Stroke::default().with_width(3.0).with_color(Color::BLACK),
        );

        vec![frame.into_geometry()]
    }
}

/// Parses "#RRGGBB" into a Color.
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::from_rgb8(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_endpoints_and_midpoint() {
        assert_eq!(val_to_px(10.0, 10.0, 35.0, 200.0), 0.0);
        assert_eq!(val_to_px(35.0, 10.0, 35.0, 200.0), 200.0);
        assert_eq!(val_to_px(22.5, 10.0, 35.0, 200.0), 100.0);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(val_to_px(-40.0, 10.0, 35.0, 200.0), 0.0);
        assert_eq!(val_to_px(99.0, 10.0, 35.0, 200.0), 200.0);
        // the bad-data sentinel pins to the left edge
        assert_eq!(val_to_px(-1.0, 10.0, 35.0, 200.0), 0.0);
    }

    #[test]
    fn parses_hex_colors() {
        let c = parse_hex_color("#4CAF50").unwrap();
        assert!((c.r - 0x4C as f32 / 255.0).abs() < 1e-6);
        assert!((c.g - 0xAF as f32 / 255.0).abs() < 1e-6);
        assert!((c.b - 0x50 as f32 / 255.0).abs() < 1e-6);

        assert!(parse_hex_color("4CAF50").is_none());
        assert!(parse_hex_color("#4CAF5").is_none());
        assert!(parse_hex_color("#GGGGGG").is_none());
    }
}
