// 该文件是 Kanmao （看猫） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::{Path, PathBuf};

use image::{
  ImageReader, Rgb, RgbImage,
  imageops::{self, FilterType},
};
use thiserror::Error;
use tracing::debug;

use crate::frame::{Letterbox, RgbNhwcFrame};

/// Letterbox 填充使用的灰度值
pub const LETTERBOX_FILL: u8 = 114;

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

pub struct ImageFileInput {
  path: PathBuf,
  image: RgbImage,
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    debug!("读取图像文件: {}", path.display());
    let image = ImageReader::open(path)?
      .with_guessed_format()?
      .decode()?
      .into_rgb8();
    debug!("图像尺寸: {}x{}", image.width(), image.height());

    Ok(ImageFileInput {
      path: path.to_path_buf(),
      image,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }

  /// 等比缩放到 `width`x`height` 并居中，其余区域以 [`LETTERBOX_FILL`] 填充
  pub fn letterbox(&self, width: u32, height: u32) -> (RgbNhwcFrame, Letterbox) {
    let (orig_width, orig_height) = self.dimensions();
    let geometry = Letterbox::fit(orig_width, orig_height, width, height);

    let resized = imageops::resize(
      &self.image,
      geometry.resized_width,
      geometry.resized_height,
      FilterType::Triangle,
    );
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([LETTERBOX_FILL; 3]));
    imageops::replace(
      &mut canvas,
      &resized,
      geometry.pad_x as i64,
      geometry.pad_y as i64,
    );

    (RgbNhwcFrame::from(canvas), geometry)
  }
}
