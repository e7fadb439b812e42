//! Grayscale filters the `image`/`imageproc` crates don't ship:
//! CLAHE, Gaussian adaptive threshold and non-local-means denoising.

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

// ── CLAHE ─────────────────────────────────────────────────────────────────────

/// Contrast-limited adaptive histogram equalization over a `grid`×`grid`
/// tile layout. Tiles overhanging the image edge replicate the border pixels.
pub fn clahe(img: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let grid = grid.max(1);
    let tile_w = w.div_ceil(grid);
    let tile_h = h.div_ceil(grid);
    let tile_area = (tile_w * tile_h) as f32;
    let clip = ((clip_limit * tile_area / 256.0) as u32).max(1);
    let lut_scale = 255.0 / tile_area;

    let mut luts = vec![[0u8; 256]; (grid * grid) as usize];
    for ty in 0..grid {
        for tx in 0..grid {
            let mut hist = [0u32; 256];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let sy = y.min(h - 1);
                for x in tx * tile_w..(tx + 1) * tile_w {
                    hist[img.get_pixel(x.min(w - 1), sy)[0] as usize] += 1;
                }
            }
            clip_histogram(&mut hist, clip);

            let lut = &mut luts[(ty * grid + tx) as usize];
            let mut sum = 0u32;
            for (bin, count) in hist.iter().enumerate() {
                sum += count;
                lut[bin] = (sum as f32 * lut_scale).round().min(255.0) as u8;
            }
        }
    }

    // Bilinear blend of the four surrounding tile mappings.
    let last = grid as i64 - 1;
    let neighbours = |pos: u32, tile: u32| -> (usize, usize, f32) {
        let f = pos as f32 / tile as f32 - 0.5;
        let lo = f.floor() as i64;
        let frac = f - lo as f32;
        (lo.clamp(0, last) as usize, (lo + 1).clamp(0, last) as usize, frac)
    };

    GrayImage::from_fn(w, h, |x, y| {
        let v = img.get_pixel(x, y)[0] as usize;
        let (tx1, tx2, xa) = neighbours(x, tile_w);
        let (ty1, ty2, ya) = neighbours(y, tile_h);
        let at = |tx: usize, ty: usize| luts[ty * grid as usize + tx][v] as f32;

        let top = at(tx1, ty1) * (1.0 - xa) + at(tx2, ty1) * xa;
        let bottom = at(tx1, ty2) * (1.0 - xa) + at(tx2, ty2) * xa;
        Luma([(top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8])
    })
}

/// Cap every bin at `clip` and spread the excess back evenly.
fn clip_histogram(hist: &mut [u32; 256], clip: u32) {
    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > clip {
            excess += *count - clip;
            *count = clip;
        }
    }

    let batch = excess / 256;
    let mut residual = excess - batch * 256;
    for count in hist.iter_mut() {
        *count += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        for count in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *count += 1;
            residual -= 1;
        }
    }
}

// ── Adaptive threshold ────────────────────────────────────────────────────────

/// Binarize against a Gaussian-weighted local mean: a pixel is white when it
/// is brighter than `mean - offset`, black otherwise.
///
/// `block_size` is the nominal window; the Gaussian sigma is derived from it
/// the same way OpenCV derives it for an unspecified sigma.
pub fn adaptive_gaussian_threshold(img: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let mean = gaussian_blur_f32(img, sigma.max(0.1));
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y)[0] as f32;
        let m = mean.get_pixel(x, y)[0] as f32;
        if p > m - offset {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

// ── Non-local means ───────────────────────────────────────────────────────────

/// Weights below this are dropped.
const NLM_WEIGHT_THRESHOLD: f32 = 0.001;

/// Non-local-means denoising.
///
/// Every pixel becomes a weighted average of the pixels in its
/// `search_window` neighbourhood, weighted by how similar their
/// `template_window` patches are: `w = exp(-d² / strength²)` where `d²` is
/// the mean squared patch difference. Patch distances are computed one
/// displacement at a time with a summed-area table, so the cost is
/// `O(pixels × search_window²)` rather than also scaling with the patch size.
pub fn nl_means_denoise(
    img: &GrayImage,
    strength: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return img.clone();
    }
    let tr = (template_window / 2) as usize;
    let sr = (search_window / 2) as usize;
    let pad = tr + sr;
    let pw = w + 2 * pad;
    let ph = h + 2 * pad;

    let mut padded = vec![0u8; pw * ph];
    for py in 0..ph {
        let sy = py.saturating_sub(pad).min(h - 1) as u32;
        for px in 0..pw {
            let sx = px.saturating_sub(pad).min(w - 1) as u32;
            padded[py * pw + px] = img.get_pixel(sx, sy)[0];
        }
    }

    let template_area = ((2 * tr + 1) * (2 * tr + 1)) as u64;
    let weights = nlm_weight_table(strength);

    // The region holds every template of every output pixel; region (0, 0)
    // sits at padded (sr, sr).
    let rw = w + 2 * tr;
    let rh = h + 2 * tr;
    let stride = rw + 1;
    let mut sat = vec![0u64; stride * (rh + 1)];
    let mut num = vec![0f32; w * h];
    let mut den = vec![0f32; w * h];
    let sr_i = sr as isize;

    for dy in -sr_i..=sr_i {
        for dx in -sr_i..=sr_i {
            for ry in 0..rh {
                let row_a = (ry + sr) * pw + sr;
                let row_b = ((ry + sr) as isize + dy) as usize * pw;
                let col_b = sr as isize + dx;
                let mut row_sum = 0u64;
                for rx in 0..rw {
                    let a = padded[row_a + rx] as i64;
                    let b = padded[row_b + (rx as isize + col_b) as usize] as i64;
                    row_sum += ((a - b) * (a - b)) as u64;
                    sat[(ry + 1) * stride + rx + 1] = sat[ry * stride + rx + 1] + row_sum;
                }
            }

            let span = 2 * tr + 1;
            for y in 0..h {
                let src_row = ((y + pad) as isize + dy) as usize * pw;
                for x in 0..w {
                    let (x1, y1) = (x + span, y + span);
                    let ssd = sat[y1 * stride + x1] + sat[y * stride + x]
                        - sat[y * stride + x1]
                        - sat[y1 * stride + x];
                    let weight = weights[(ssd / template_area) as usize];
                    if weight > 0.0 {
                        let v = padded[src_row + ((x + pad) as isize + dx) as usize] as f32;
                        num[y * w + x] += weight * v;
                        den[y * w + x] += weight;
                    }
                }
            }
        }
    }

    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        let i = y as usize * w + x as usize;
        Luma([(num[i] / den[i]).round().clamp(0.0, 255.0) as u8])
    })
}

/// Weight per mean squared patch distance (0..=255²).
fn nlm_weight_table(strength: f32) -> Vec<f32> {
    let h2 = strength * strength;
    (0..=255u32 * 255)
        .map(|d2| {
            let w = (-(d2 as f32) / h2).exp();
            if w < NLM_WEIGHT_THRESHOLD {
                0.0
            } else {
                w
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    fn solid(w: u32, h: u32, v: u8) -> GrayImage {
        ImageBuffer::from_pixel(w, h, Luma([v]))
    }

    #[test]
    fn clip_histogram_preserves_mass() {
        let mut hist = [0u32; 256];
        hist[10] = 1000;
        hist[200] = 24;
        clip_histogram(&mut hist, 40);
        assert_eq!(hist.iter().sum::<u32>(), 1024);
        assert!(hist[10] <= 40 + 4);
    }

    #[test]
    fn clahe_keeps_dimensions() {
        let img = GrayImage::from_fn(37, 23, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.dimensions(), (37, 23));
    }

    #[test]
    fn clahe_handles_image_smaller_than_grid() {
        let img = solid(3, 2, 90);
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn clahe_stretches_low_contrast_gradient() {
        // Values squeezed into 100..=131.
        let img = GrayImage::from_fn(64, 64, |x, _| Luma([100 + (x / 2) as u8]));
        let out = clahe(&img, 2.0, 8);
        let span = |g: &GrayImage| {
            let min = g.pixels().map(|p| p[0]).min().unwrap();
            let max = g.pixels().map(|p| p[0]).max().unwrap();
            max - min
        };
        assert!(span(&out) > span(&img), "contrast should increase");
    }

    #[test]
    fn threshold_is_strictly_binary() {
        let img = GrayImage::from_fn(40, 40, |x, y| Luma([((x * 13 + y * 29) % 256) as u8]));
        let out = adaptive_gaussian_threshold(&img, 31, 10.0);
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn threshold_flat_page_is_white() {
        // Flat regions sit above mean - C everywhere.
        let out = adaptive_gaussian_threshold(&solid(20, 20, 180), 31, 10.0);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn threshold_dark_stroke_on_light_page_is_black() {
        let img = GrayImage::from_fn(41, 41, |x, _| Luma([if x == 20 { 20 } else { 220 }]));
        let out = adaptive_gaussian_threshold(&img, 31, 10.0);
        assert_eq!(out.get_pixel(20, 20)[0], 0);
        assert_eq!(out.get_pixel(5, 20)[0], 255);
    }

    #[test]
    fn nl_means_keeps_flat_image() {
        let img = solid(12, 9, 255);
        let out = nl_means_denoise(&img, 30.0, 7, 21);
        assert_eq!(out.dimensions(), (12, 9));
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn nl_means_removes_isolated_speck() {
        let mut img = solid(24, 24, 255);
        img.put_pixel(12, 12, Luma([0]));
        let out = nl_means_denoise(&img, 30.0, 7, 21);
        assert!(out.get_pixel(12, 12)[0] > 128, "speck should be washed out");
    }

    #[test]
    fn nl_means_weight_table_bounds() {
        let table = nlm_weight_table(30.0);
        assert_eq!(table.len(), 65026);
        assert_eq!(table[0], 1.0);
        assert_eq!(*table.last().unwrap(), 0.0);
    }
}
