use crate::tools::ExtractionError;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// 預留框的灰色 (#404040)
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([0x40, 0x40, 0x40, 0xff]);

/// 解碼後、可直接顯示的縮圖
///
/// 內部以 `Arc` 共用像素資料，複製成本很低。
#[derive(Clone)]
pub struct ThumbnailHandle {
    image: Arc<RgbaImage>,
}

impl ThumbnailHandle {
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// 尚未載入時顯示的純色圖
    #[must_use]
    pub fn placeholder(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, PLACEHOLDER_COLOR))
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 是否共用同一份像素資料
    #[must_use]
    pub fn same_image(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl fmt::Debug for ThumbnailHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailHandle")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// 讀取縮圖檔並縮放到顯示尺寸
pub fn decode_thumbnail(
    path: &Path,
    width: u32,
    height: u32,
) -> Result<ThumbnailHandle, ExtractionError> {
    let decoded = image::open(path).map_err(|e| ExtractionError::DecodeFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let resized = decoded.resize_exact(width, height, FilterType::Lanczos3);
    Ok(ThumbnailHandle::new(resized.to_rgba8()))
}
