use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::AppError;
use crate::services::charts::ChartArtifact;
use super::raster::{Raster, Rasterizer};

/// Page size in points: 10 x 6 inches.
const PAGE_WIDTH: f32 = 720.0;
const PAGE_HEIGHT: f32 = 432.0;
const PAGE_MARGIN: f32 = 18.0;

const REPORT_TITLE: &str = "Data Insights Report";

/// A finished multi-page PDF, one chart per page.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

#[derive(Clone)]
pub struct ReportAssembler {
    rasterizer: Arc<dyn Rasterizer>,
}

impl ReportAssembler {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self { rasterizer }
    }

    /// Builds the report or fails as a whole; a single chart that cannot be
    /// rasterized means no document at all.
    pub fn assemble(&self, artifacts: &[ChartArtifact]) -> Result<ReportDocument, AppError> {
        if artifacts.is_empty() {
            return Err(AppError::NoContent);
        }

        let start = std::time::Instant::now();
        let mut images = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let raster = self.rasterizer.rasterize(artifact).map_err(|e| {
                tracing::error!("Failed to rasterize {}: {:#}", artifact.title, e);
                AppError::RenderingUnavailable(e.to_string())
            })?;
            images.push(PageImage::encode(raster)?);
        }

        let bytes = build_pdf(&images)?;
        tracing::info!(
            "Assembled report with {} pages ({}KB) in {:?}",
            images.len(),
            bytes.len() / 1024,
            start.elapsed()
        );
        Ok(ReportDocument { bytes, pages: images.len() })
    }
}

struct PageImage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

impl PageImage {
    fn encode(raster: Raster) -> Result<Self, AppError> {
        let Raster { width, height, pixels } = raster;
        let buffer = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| AppError::Internal("Raster buffer does not match its dimensions".to_string()))?;

        let mut jpeg = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut jpeg, ImageFormat::Jpeg)
            .map_err(|e| AppError::Internal(format!("JPEG encoding failed: {}", e)))?;

        Ok(Self { width, height, jpeg: jpeg.into_inner() })
    }

    /// Largest centred placement inside the page margins, as (x, y, w, h).
    fn placement(&self) -> (f32, f32, f32, f32) {
        let avail_w = PAGE_WIDTH - 2.0 * PAGE_MARGIN;
        let avail_h = PAGE_HEIGHT - 2.0 * PAGE_MARGIN;
        let scale = f32::min(avail_w / self.width as f32, avail_h / self.height as f32);
        let (w, h) = (self.width as f32 * scale, self.height as f32 * scale);
        ((PAGE_WIDTH - w) / 2.0, (PAGE_HEIGHT - h) / 2.0, w, h)
    }
}

fn build_pdf(images: &[PageImage]) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(images.len());
    for image in images {
        let page_id = add_page(&mut doc, pages_id, image)?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let created = chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string();
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(REPORT_TITLE),
        "Producer" => Object::string_literal(env!("CARGO_PKG_NAME")),
        "CreationDate" => Object::string_literal(created),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::Internal(format!("Failed to write PDF: {}", e)))?;
    Ok(bytes)
}

fn add_page(doc: &mut Document, pages_id: ObjectId, image: &PageImage) -> Result<ObjectId, AppError> {
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        image.jpeg.clone(),
    ));

    let (x, y, w, h) = image.placement();
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w.into()),
                    0.into(),
                    0.into(),
                    Object::Real(h.into()),
                    Object::Real(x.into()),
                    Object::Real(y.into()),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| AppError::Internal(format!("Failed to encode page content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(PAGE_WIDTH.into()), Object::Real(PAGE_HEIGHT.into())],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    }))
}
