use crate::waveform::SurfaceGeometry;

use super::TrimSelectionModel;

/// Pointer distance, in pixels, within which a trim handle is grabbed.
pub const DEFAULT_HANDLE_TOLERANCE_PX: f64 = 15.0;

/// What a pointer drag on the waveform is currently moving.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    DraggingStart,
    DraggingEnd,
    /// Moving the whole region; `anchor` is the percent of the last applied move.
    DraggingRegion { anchor: f64 },
}

/// Pointer input from the waveform surface, positions in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down { x_px: f64 },
    Move { x_px: f64 },
    Up,
    Leave,
}

/// Turns pointer events into [`TrimSelectionModel`] edits.
///
/// At most one drag is active at a time; release or leaving the surface
/// always returns to [`DragState::Idle`].
#[derive(Clone, Debug, PartialEq)]
pub struct TrimInteraction {
    state: DragState,
    tolerance_px: f64,
}

impl Default for TrimInteraction {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_TOLERANCE_PX)
    }
}

impl TrimInteraction {
    pub fn new(tolerance_px: f64) -> Self {
        let tolerance_px = if tolerance_px.is_finite() && tolerance_px > 0.0 {
            tolerance_px
        } else {
            DEFAULT_HANDLE_TOLERANCE_PX
        };
        Self {
            state: DragState::Idle,
            tolerance_px,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        self.state != DragState::Idle
    }

    /// Drop any drag without touching the selection.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Route one event; returns true when the selection changed.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        geometry: &SurfaceGeometry,
        model: &mut TrimSelectionModel,
    ) -> bool {
        match event {
            PointerEvent::Down { x_px } => {
                self.pointer_down(x_px, geometry, model);
                false
            }
            PointerEvent::Move { x_px } => self.pointer_move(x_px, geometry, model),
            PointerEvent::Up | PointerEvent::Leave => {
                self.cancel();
                false
            }
        }
    }

    /// Pick what to drag. The start handle wins when both handles are in reach.
    pub fn pointer_down(
        &mut self,
        x_px: f64,
        geometry: &SurfaceGeometry,
        model: &TrimSelectionModel,
    ) {
        let Some(percent) = geometry.percent_at(x_px) else {
            return;
        };
        let start_x = geometry.x_at(model.start());
        let end_x = geometry.x_at(model.end());
        self.state = if (x_px - start_x).abs() < self.tolerance_px {
            DragState::DraggingStart
        } else if (x_px - end_x).abs() < self.tolerance_px {
            DragState::DraggingEnd
        } else if model.selection().contains(percent) {
            DragState::DraggingRegion { anchor: percent }
        } else {
            DragState::Idle
        };
    }

    /// Apply the active drag at `x_px`; returns true when the selection changed.
    pub fn pointer_move(
        &mut self,
        x_px: f64,
        geometry: &SurfaceGeometry,
        model: &mut TrimSelectionModel,
    ) -> bool {
        let Some(percent) = geometry.percent_at(x_px) else {
            return false;
        };
        let before = model.selection();
        match self.state {
            DragState::Idle => return false,
            DragState::DraggingStart => model.set_start(percent),
            DragState::DraggingEnd => model.set_end(percent),
            DragState::DraggingRegion { anchor } => {
                model.drag_region(percent - anchor);
                // Snapped moves advance the anchor only by what was applied so
                // slow drags accumulate until they cross a grid step.
                let anchor = if model.snap_active() {
                    anchor + (model.start() - before.start())
                } else {
                    percent
                };
                self.state = DragState::DraggingRegion { anchor };
            }
        }
        model.selection() != before
    }

    pub fn pointer_up(&mut self) {
        self.cancel();
    }

    pub fn pointer_leave(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SnapGrid;
    use crate::waveform::WaveformViewport;

    fn surface() -> SurfaceGeometry {
        SurfaceGeometry::new(1_000.0, WaveformViewport::default())
    }

    fn model(start: f64, end: f64) -> TrimSelectionModel {
        let mut model = TrimSelectionModel::default();
        model.set_end(end);
        model.set_start(start);
        model
    }

    #[test]
    fn grabs_start_handle_within_tolerance() {
        let mut interaction = TrimInteraction::default();
        let model = model(20.0, 60.0);
        interaction.pointer_down(210.0, &surface(), &model);
        assert_eq!(interaction.state(), DragState::DraggingStart);
    }

    #[test]
    fn tolerance_is_strict() {
        let mut interaction = TrimInteraction::default();
        let model = model(20.0, 60.0);
        interaction.pointer_down(615.0, &surface(), &model);
        assert_eq!(interaction.state(), DragState::Idle);
        interaction.pointer_down(614.0, &surface(), &model);
        assert_eq!(interaction.state(), DragState::DraggingEnd);
    }

    #[test]
    fn start_handle_wins_when_handles_overlap() {
        let mut interaction = TrimInteraction::default();
        let model = model(50.0, 51.0);
        interaction.pointer_down(505.0, &surface(), &model);
        assert_eq!(interaction.state(), DragState::DraggingStart);
    }

    #[test]
    fn press_inside_region_anchors_region_drag() {
        let mut interaction = TrimInteraction::default();
        let mut model = model(20.0, 60.0);
        interaction.pointer_down(400.0, &surface(), &model);
        assert_eq!(interaction.state(), DragState::DraggingRegion { anchor: 40.0 });
        assert!(interaction.pointer_move(450.0, &surface(), &mut model));
        assert!((model.start() - 25.0).abs() < 1e-9);
        assert!((model.end() - 65.0).abs() < 1e-9);
        assert_eq!(interaction.state(), DragState::DraggingRegion { anchor: 45.0 });
    }

    #[test]
    fn press_outside_region_stays_idle() {
        let mut interaction = TrimInteraction::default();
        let mut model = model(20.0, 60.0);
        interaction.pointer_down(800.0, &surface(), &model);
        assert_eq!(interaction.state(), DragState::Idle);
        assert!(!interaction.pointer_move(900.0, &surface(), &mut model));
        assert_eq!(model.start(), 20.0);
        assert_eq!(model.end(), 60.0);
    }

    #[test]
    fn end_drag_clamps_against_start() {
        let mut interaction = TrimInteraction::default();
        let mut model = model(20.0, 60.0);
        interaction.pointer_down(600.0, &surface(), &model);
        interaction.pointer_move(100.0, &surface(), &mut model);
        assert!((model.end() - 21.0).abs() < 1e-9);
    }

    #[test]
    fn release_and_leave_return_to_idle() {
        let surface = surface();
        let mut model = model(20.0, 60.0);
        for release in [PointerEvent::Up, PointerEvent::Leave] {
            let mut interaction = TrimInteraction::default();
            interaction.handle(PointerEvent::Down { x_px: 200.0 }, &surface, &mut model);
            assert!(interaction.is_dragging());
            interaction.handle(release, &surface, &mut model);
            assert_eq!(interaction.state(), DragState::Idle);
        }
    }

    #[test]
    fn degenerate_surface_ignores_events() {
        let mut interaction = TrimInteraction::default();
        let mut model = model(20.0, 60.0);
        let flat = SurfaceGeometry::new(0.0, WaveformViewport::default());
        interaction.handle(PointerEvent::Down { x_px: 0.0 }, &flat, &mut model);
        assert_eq!(interaction.state(), DragState::Idle);
        interaction.pointer_down(200.0, &surface(), &model);
        assert!(!interaction.pointer_move(f64::NAN, &surface(), &mut model));
        assert_eq!(interaction.state(), DragState::DraggingStart);
    }

    #[test]
    fn zoomed_surface_maps_handles_through_viewport() {
        let mut interaction = TrimInteraction::default();
        let model = model(50.0, 80.0);
        let zoomed = SurfaceGeometry::new(1_000.0, WaveformViewport::new(2.0, 500.0));
        interaction.pointer_down(500.0, &zoomed, &model);
        assert_eq!(interaction.state(), DragState::DraggingStart);
    }

    #[test]
    fn slow_snapped_region_drag_accumulates() {
        let mut interaction = TrimInteraction::default();
        let mut model = model(20.0, 40.0);
        model.set_total_duration(10.0);
        model.set_snap_grid(SnapGrid {
            enabled: true,
            grid_size_seconds: 1.0,
        });
        interaction.pointer_down(300.0, &surface(), &model);
        for x in [320.0, 340.0, 360.0] {
            interaction.pointer_move(x, &surface(), &mut model);
        }
        assert!((model.start() - 30.0).abs() < 1e-9);
        assert!((model.end() - 50.0).abs() < 1e-9);
    }
}
