use super::RenderError;
use crate::viewport::Pan;
use image::{GrayImage, Rgba, RgbaImage};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Place `raster` on a `surface_width` x `surface_height` surface.
///
/// At zoom 1 the raster is fitted to the surface and centred; `zoom`
/// scales about the surface centre and `pan` shifts in surface pixels.
/// Sampling is nearest neighbour; uncovered surface pixels are black.
///
/// # Errors
///
/// Returns [`RenderError::EmptySurface`] if either surface dimension is zero.
pub fn compose(
    raster: &GrayImage,
    zoom: f64,
    pan: Pan,
    surface_width: u32,
    surface_height: u32,
) -> Result<RgbaImage, RenderError> {
    if surface_width == 0 || surface_height == 0 {
        return Err(RenderError::EmptySurface {
            width: surface_width,
            height: surface_height,
        });
    }

    let (raster_width, raster_height) = raster.dimensions();
    let mut surface = RgbaImage::from_pixel(surface_width, surface_height, BACKGROUND);
    if raster_width == 0 || raster_height == 0 {
        return Ok(surface);
    }

    let fit = (f64::from(surface_width) / f64::from(raster_width))
        .min(f64::from(surface_height) / f64::from(raster_height));
    let scale = fit * zoom;
    let half_surface = (f64::from(surface_width) / 2.0, f64::from(surface_height) / 2.0);
    let half_raster = (f64::from(raster_width) / 2.0, f64::from(raster_height) / 2.0);

    for (x, y, pixel) in surface.enumerate_pixels_mut() {
        let src_x = (f64::from(x) + 0.5 - half_surface.0 - pan.x) / scale + half_raster.0;
        let src_y = (f64::from(y) + 0.5 - half_surface.1 - pan.y) / scale + half_raster.1;
        if src_x < 0.0 || src_y < 0.0 {
            continue;
        }

        let (sx, sy) = (src_x.floor() as u32, src_y.floor() as u32);
        if sx < raster_width && sy < raster_height {
            let gray = raster.get_pixel(sx, sy)[0];
            *pixel = Rgba([gray, gray, gray, 255]);
        }
    }

    Ok(surface)
}
