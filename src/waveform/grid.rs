use super::view::SurfaceGeometry;

/// Grid spacings offered in the editor, in seconds.
pub const GRID_SIZE_PRESETS: [f64; 4] = [0.5, 1.0, 2.0, 5.0];
/// Finest grid spacing accepted for snapping and drawing.
pub const MIN_GRID_SIZE_SECONDS: f64 = 0.01;
/// Tick budget per frame; denser grids are not drawn.
const MAX_VISIBLE_TICKS: u64 = 4_096;

/// One vertical grid line on the waveform surface.
#[derive(Clone, Debug, PartialEq)]
pub struct GridTick {
    pub seconds: f64,
    /// Horizontal position after zoom and scroll.
    pub x_px: f64,
    pub label: String,
}

/// Grid lines every `interval_seconds` that fall inside the visible surface.
///
/// Only the visible index range is walked. Intervals finer than
/// [`MIN_GRID_SIZE_SECONDS`], or grids needing more than a few thousand
/// visible ticks, yield nothing.
pub fn grid_ticks(
    duration_seconds: f64,
    interval_seconds: f64,
    geometry: &SurfaceGeometry,
) -> Vec<GridTick> {
    if !(duration_seconds.is_finite() && duration_seconds > 0.0)
        || !(interval_seconds.is_finite() && interval_seconds >= MIN_GRID_SIZE_SECONDS)
        || !geometry.is_usable()
    {
        return Vec::new();
    }
    let pixels_per_second = geometry.content_width_px() / duration_seconds;
    let tick_spacing_px = interval_seconds * pixels_per_second;
    let scroll = geometry.viewport.scroll_offset_px();
    let count = (duration_seconds / interval_seconds).floor() as u64;
    let first = (scroll / tick_spacing_px).ceil().max(0.0) as u64;
    let last = ((scroll + geometry.width_px) / tick_spacing_px).floor() as u64;
    let last = last.min(count);
    if first > last {
        return Vec::new();
    }
    if last - first >= MAX_VISIBLE_TICKS {
        return Vec::new();
    }
    (first..=last)
        .filter_map(|index| {
            let seconds = index as f64 * interval_seconds;
            let x_px = seconds * pixels_per_second - geometry.viewport.scroll_offset_px();
            (0.0..=geometry.width_px)
                .contains(&x_px)
                .then(|| GridTick {
                    seconds,
                    x_px,
                    label: format_time(seconds),
                })
        })
        .collect()
}

/// Format seconds as `m:ss`, flooring partial seconds.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::WaveformViewport;

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(600.2), "10:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn ticks_cover_duration_at_unit_zoom() {
        let geometry = SurfaceGeometry::new(1_000.0, WaveformViewport::default());
        let ticks = grid_ticks(10.0, 2.0, &geometry);
        let positions: Vec<f64> = ticks.iter().map(|tick| tick.x_px).collect();
        assert_eq!(positions, vec![0.0, 200.0, 400.0, 600.0, 800.0, 1_000.0]);
        assert_eq!(ticks[3].label, "0:06");
    }

    #[test]
    fn tiny_or_dense_intervals_draw_nothing() {
        let geometry = SurfaceGeometry::new(1_000.0, WaveformViewport::default());
        assert!(grid_ticks(10.0, 1e-9, &geometry).is_empty());
        assert!(grid_ticks(3_600.0, 0.5, &geometry).is_empty());
        assert!(!grid_ticks(1.0, MIN_GRID_SIZE_SECONDS, &geometry).is_empty());
        assert_eq!(grid_ticks(1_000.0, 0.5, &geometry).len(), 2_001);
    }

    #[test]
    fn zoom_and_scroll_hide_offscreen_ticks() {
        let viewport = WaveformViewport::new(2.0, 500.0);
        let geometry = SurfaceGeometry::new(1_000.0, viewport);
        let ticks = grid_ticks(10.0, 1.0, &geometry);
        assert_eq!(ticks.first().unwrap().seconds, 3.0);
        assert_eq!(ticks.last().unwrap().seconds, 7.0);
    }

    #[test]
    fn degenerate_inputs_produce_no_ticks() {
        let geometry = SurfaceGeometry::new(1_000.0, WaveformViewport::default());
        assert!(grid_ticks(0.0, 1.0, &geometry).is_empty());
        assert!(grid_ticks(10.0, 0.0, &geometry).is_empty());
        let flat = SurfaceGeometry::new(0.0, WaveformViewport::default());
        assert!(grid_ticks(10.0, 1.0, &flat).is_empty());
    }
}
