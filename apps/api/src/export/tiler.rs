//! Splits one tall bitmap into per-page source slices.
//!
//! # Tiling rules
//! - `scale = min(1, printable_width / natural_width)`; content is never upscaled.
//! - `rows_per_page = floor(printable_height / (mm_per_px × scale))`, at least 1.
//! - Slice *i* covers source rows `[i × rows, min((i + 1) × rows, H))`.
//! - Slice count is `ceil(H / rows)`; offsets are integer multiples of `rows`, so
//!   consecutive slices can never leave a gap or repeat a row.
//!
//! Every slice is placed at `(margin, margin)` on its own page. Advancing through
//! the source happens by choosing different rows, never by offsetting the image.

use serde::{Deserialize, Serialize};

/// Millimetres per CSS px. 96 DPI is the single DPI assumption used everywhere.
pub const MM_PER_CSS_PX: f32 = 25.4 / 96.0;

/// Absorbs float noise so a bitmap that exactly fills a page stays on one page.
const ROWS_EPSILON: f32 = 1e-3;

/// Physical page size and margin, in millimetres. Same for every page of a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
}

impl PageGeometry {
    /// A4 portrait with a 10 mm margin.
    pub const A4: PageGeometry = PageGeometry {
        width_mm: 210.0,
        height_mm: 297.0,
        margin_mm: 10.0,
    };

    pub fn printable_width(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }

    pub fn printable_height(&self) -> f32 {
        self.height_mm - 2.0 * self.margin_mm
    }

    /// Rejects geometries that leave no printable area.
    pub fn validate(&self) -> Result<(), String> {
        let finite = [self.width_mm, self.height_mm, self.margin_mm]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.margin_mm < 0.0 {
            return Err(format!("invalid page geometry {self:?}"));
        }
        if self.printable_width() <= 0.0 || self.printable_height() <= 0.0 {
            return Err(format!(
                "margin {} mm leaves no printable area on a {}x{} mm page",
                self.margin_mm, self.width_mm, self.height_mm
            ));
        }
        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// Millimetres covered by one bitmap pixel captured at `pixel_density`.
pub fn mm_per_bitmap_px(pixel_density: f32) -> f32 {
    MM_PER_CSS_PX / pixel_density
}

/// One page's worth of source rows and where they land on the page (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSlice {
    pub source_y_offset: u32,
    pub slice_height_px: u32,
    pub placement_x: f32,
    pub placement_y: f32,
    pub rendered_width: f32,
    pub rendered_height: f32,
}

impl PageSlice {
    pub fn source_end(&self) -> u32 {
        self.source_y_offset + self.slice_height_px
    }
}

/// Output of the tiler for one bitmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilePlan {
    /// Uniform bitmap → page scale, never above 1.0.
    pub scale: f32,
    /// Source rows that fit one page's printable height.
    pub rows_per_page: u32,
    pub slices: Vec<PageSlice>,
}

impl TilePlan {
    pub fn page_count(&self) -> usize {
        self.slices.len()
    }
}

/// Partitions `[0, total_height)` into `(offset, height)` runs of `rows_per_page`.
///
/// The last run may be shorter. `rows_per_page` of zero is treated as one.
pub fn row_ranges(total_height: u32, rows_per_page: u32) -> Vec<(u32, u32)> {
    let rows = rows_per_page.max(1);
    let count = total_height.div_ceil(rows);
    (0..count)
        .map(|i| {
            let offset = i * rows;
            (offset, rows.min(total_height - offset))
        })
        .collect()
}

/// Computes the page slices for a `width_px × height_px` bitmap.
pub fn plan_pages(
    width_px: u32,
    height_px: u32,
    geometry: &PageGeometry,
    mm_per_px: f32,
) -> TilePlan {
    let natural_width_mm = width_px.max(1) as f32 * mm_per_px;
    let scale = (geometry.printable_width() / natural_width_mm).min(1.0);
    let mm_per_source_row = mm_per_px * scale;

    let rows_per_page = ((geometry.printable_height() / mm_per_source_row) + ROWS_EPSILON)
        .floor()
        .max(1.0) as u32;

    let rendered_width = width_px as f32 * mm_per_source_row;
    let slices = row_ranges(height_px, rows_per_page)
        .into_iter()
        .map(|(offset, height)| PageSlice {
            source_y_offset: offset,
            slice_height_px: height,
            placement_x: geometry.margin_mm,
            placement_y: geometry.margin_mm,
            rendered_width,
            rendered_height: height as f32 * mm_per_source_row,
        })
        .collect();

    TilePlan {
        scale,
        rows_per_page,
        slices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(ranges: &[(u32, u32)], total: u32) {
        assert_eq!(ranges.first().map(|r| r.0), Some(0));
        for pair in ranges.windows(2) {
            assert_eq!(pair[1].0, pair[0].0 + pair[0].1, "gap or overlap at {pair:?}");
        }
        let last = ranges.last().unwrap();
        assert_eq!(last.0 + last.1, total);
    }

    #[test]
    fn test_three_slices_for_3000_rows_at_1200() {
        assert_eq!(
            row_ranges(3000, 1200),
            vec![(0, 1200), (1200, 1200), (2400, 600)]
        );
    }

    #[test]
    fn test_single_slice_when_content_fits() {
        assert_eq!(row_ranges(900, 1200), vec![(0, 900)]);
        assert_eq!(row_ranges(1200, 1200), vec![(0, 1200)]);
    }

    #[test]
    fn test_ranges_partition_exactly() {
        for total in [1_u32, 2, 7, 999, 1000, 1001, 2477, 2478, 2479, 12_345] {
            for rows in [1_u32, 3, 100, 1000, 2478, 5000] {
                let ranges = row_ranges(total, rows);
                assert_partition(&ranges, total);
                assert_eq!(ranges.len() as u32, total.div_ceil(rows));
                assert!(ranges.iter().all(|r| r.1 >= 1 && r.1 <= rows));
            }
        }
    }

    #[test]
    fn test_page_count_monotonic_under_doubling() {
        for total in [1_u32, 500, 1199, 1200, 1201, 3000, 7777] {
            let once = row_ranges(total, 1200).len();
            let twice = row_ranges(total * 2, 1200).len();
            assert!(twice >= once);
            assert!(twice <= once * 2);
        }
    }

    #[test]
    fn test_plan_is_pure() {
        let geometry = PageGeometry::A4;
        let a = plan_pages(1700, 5000, &geometry, mm_per_bitmap_px(2.0));
        let b = plan_pages(1700, 5000, &geometry, mm_per_bitmap_px(2.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_scale_never_exceeds_one() {
        let geometry = PageGeometry::A4;
        // 100 px at 2x density is ~13 mm wide, far narrower than the page.
        let narrow = plan_pages(100, 100, &geometry, mm_per_bitmap_px(2.0));
        assert_eq!(narrow.scale, 1.0);

        let wide = plan_pages(1700, 100, &geometry, mm_per_bitmap_px(2.0));
        assert!(wide.scale < 1.0);
        assert!((wide.slices[0].rendered_width - geometry.printable_width()).abs() < 1e-2);
    }

    #[test]
    fn test_slices_fit_printable_height() {
        let geometry = PageGeometry::A4;
        let plan = plan_pages(1700, 9000, &geometry, mm_per_bitmap_px(2.0));
        for slice in &plan.slices {
            assert!(slice.rendered_height <= geometry.printable_height() + 1e-3);
            assert_eq!(slice.placement_x, geometry.margin_mm);
            assert_eq!(slice.placement_y, geometry.margin_mm);
        }
        let ranges: Vec<(u32, u32)> = plan
            .slices
            .iter()
            .map(|s| (s.source_y_offset, s.slice_height_px))
            .collect();
        assert_partition(&ranges, 9000);
    }

    #[test]
    fn test_rows_per_page_for_default_export() {
        // 850 px at 2x → 1700 px wide; 190 mm printable across.
        let plan = plan_pages(1700, 100, &PageGeometry::A4, mm_per_bitmap_px(2.0));
        let expected = (277.0 / (190.0 / 1700.0)) as u32;
        assert!(plan.rows_per_page.abs_diff(expected) <= 1);
    }

    #[test]
    fn test_exact_fit_stays_on_one_page() {
        let geometry = PageGeometry::A4;
        let plan = plan_pages(1700, 100, &geometry, mm_per_bitmap_px(2.0));
        let exact = plan_pages(1700, plan.rows_per_page, &geometry, mm_per_bitmap_px(2.0));
        assert_eq!(exact.page_count(), 1);
        let over = plan_pages(1700, plan.rows_per_page + 1, &geometry, mm_per_bitmap_px(2.0));
        assert_eq!(over.page_count(), 2);
        assert_eq!(over.slices[1].slice_height_px, 1);
    }

    #[test]
    fn test_geometry_validation() {
        assert!(PageGeometry::A4.validate().is_ok());
        let no_room = PageGeometry {
            width_mm: 100.0,
            height_mm: 100.0,
            margin_mm: 50.0,
        };
        assert!(no_room.validate().is_err());
        let negative = PageGeometry {
            margin_mm: -1.0,
            ..PageGeometry::A4
        };
        assert!(negative.validate().is_err());
    }
}
