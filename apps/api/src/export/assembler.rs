//! Page slices → multi-page PDF.
//!
//! Each page gets its own image XObject cut from the slice's source rows and
//! drawn at the top-left margin. Nothing is written anywhere here; the caller
//! persists the bytes only once the whole document has been built.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::export::capture::Bitmap;
use crate::export::tiler::{PageGeometry, PageSlice, TilePlan};
use crate::export::ExportError;

const PT_PER_MM: f32 = 72.0 / 25.4;
const IMAGE_NAME: &str = "Im0";

/// A finished PDF held in memory until it is persisted.
#[derive(Debug)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

fn assembly_err(context: &str, e: impl std::fmt::Display) -> ExportError {
    ExportError::Assembly(format!("{context}: {e}"))
}

/// RGB bytes of source rows `[offset, offset + height)`, zlib-compressed.
fn slice_pixels(bitmap: &Bitmap, slice: &PageSlice) -> Result<Vec<u8>, ExportError> {
    let image = bitmap.image();
    if slice.slice_height_px == 0 || slice.source_end() > image.height() {
        return Err(ExportError::Assembly(format!(
            "slice rows {}..{} outside bitmap of height {}",
            slice.source_y_offset,
            slice.source_end(),
            image.height()
        )));
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let mut row = Vec::with_capacity(image.width() as usize * 3);
    for y in slice.source_y_offset..slice.source_end() {
        row.clear();
        for x in 0..image.width() {
            let px = image.get_pixel(x, y);
            row.extend_from_slice(&px.0[..3]);
        }
        encoder
            .write_all(&row)
            .map_err(|e| assembly_err("compressing page image", e))?;
    }
    encoder
        .finish()
        .map_err(|e| assembly_err("compressing page image", e))
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    bitmap: &Bitmap,
    slice: &PageSlice,
    geometry: &PageGeometry,
) -> Result<ObjectId, ExportError> {
    let pixels = slice_pixels(bitmap, slice)?;
    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => bitmap.width() as i64,
            "Height" => slice.slice_height_px as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        pixels,
    )
    .with_compression(false);
    let image_id = doc.add_object(image);

    // PDF origin is bottom-left; placement is measured from the top-left.
    let page_height_pt = geometry.height_mm * PT_PER_MM;
    let width_pt = slice.rendered_width * PT_PER_MM;
    let height_pt = slice.rendered_height * PT_PER_MM;
    let x_pt = slice.placement_x * PT_PER_MM;
    let y_pt = page_height_pt - (slice.placement_y * PT_PER_MM) - height_pt;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width_pt.into(),
                    0.into(),
                    0.into(),
                    height_pt.into(),
                    x_pt.into(),
                    y_pt.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| assembly_err("encoding page content", e))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (geometry.width_mm * PT_PER_MM).into(),
            page_height_pt.into(),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    });
    Ok(page_id)
}

/// Builds the PDF for `plan` over `bitmap`. `title` goes into the document info.
pub fn assemble_pdf(
    bitmap: &Bitmap,
    plan: &TilePlan,
    geometry: &PageGeometry,
    title: &str,
) -> Result<AssembledDocument, ExportError> {
    if plan.slices.is_empty() {
        return Err(ExportError::Assembly("no pages to assemble".to_string()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(plan.slices.len());
    for slice in &plan.slices {
        let page_id = add_page(&mut doc, pages_id, bitmap, slice, geometry)?;
        kids.push(page_id.into());
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal(concat!("vitae-api ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| assembly_err("serializing PDF", e))?;

    Ok(AssembledDocument { bytes, page_count })
}
