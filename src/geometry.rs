//! Grid sizing and splat radius correction for non-square canvases.

/// Width over height, treating a zero height as one.
pub fn aspect_ratio(canvas_width: u32, canvas_height: u32) -> f32 {
    canvas_width as f32 / canvas_height.max(1) as f32
}

/// Grid dimensions for a target resolution on the short axis.
///
/// The long grid axis follows the long canvas axis, so the grid keeps the
/// canvas aspect ratio. Returns `(width, height)`.
pub fn derive_grid_size(target_resolution: f32, canvas_width: u32, canvas_height: u32) -> (usize, usize) {
    let mut aspect = aspect_ratio(canvas_width, canvas_height);
    if aspect < 1.0 && aspect > 0.0 {
        aspect = 1.0 / aspect;
    }
    // A zero-width canvas has aspect 0; treat it as square.
    if aspect == 0.0 {
        aspect = 1.0;
    }

    let min = target_resolution.round().max(1.0) as usize;
    let max = (target_resolution * aspect).round().max(1.0) as usize;

    if canvas_width > canvas_height {
        (max, min)
    } else {
        (min, max)
    }
}

/// Stretches a splat radius on wide canvases so splats stay round on screen.
pub fn correct_radius(radius: f32, canvas_aspect: f32) -> f32 {
    if canvas_aspect > 1.0 {
        radius * canvas_aspect
    } else {
        radius
    }
}
