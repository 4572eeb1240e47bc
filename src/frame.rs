// 该文件是 Kanmao （看猫） 项目的一部分。
// src/frame.rs - NHWC 帧与 Letterbox 几何定义
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

use crate::input::AsNhwcFrame;

const RGB_CHANNELS: usize = 3;

#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  data: Box<[u8]>,
  height: usize,
  width: usize,
}

/// 一次推理的输入批次，每张图像一帧
pub type FrameBatch = Box<[RgbNhwcFrame]>;

impl RgbNhwcFrame {
  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}

impl AsNhwcFrame for RgbNhwcFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

// RgbImage 的内存布局本身就是 HWC
#[cfg(feature = "read_image_file")]
impl From<image::RgbImage> for RgbNhwcFrame {
  fn from(image: image::RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      data: image.into_raw().into_boxed_slice(),
      height: height as usize,
      width: width as usize,
    }
  }
}

/// 等比缩放并居中填充到模型输入尺寸时的几何参数。
///
/// 预处理时生成，后处理时用于把模型坐标映射回原图像素坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub scale: f32,
  pub pad_x: u32,
  pub pad_y: u32,
  pub resized_width: u32,
  pub resized_height: u32,
  pub orig_width: u32,
  pub orig_height: u32,
}

impl Letterbox {
  pub fn fit(orig_width: u32, orig_height: u32, target_width: u32, target_height: u32) -> Self {
    let scale = f32::min(
      target_width as f32 / orig_width.max(1) as f32,
      target_height as f32 / orig_height.max(1) as f32,
    );
    let resized_width = ((orig_width as f32 * scale).round() as u32).clamp(1, target_width);
    let resized_height = ((orig_height as f32 * scale).round() as u32).clamp(1, target_height);

    Self {
      scale,
      pad_x: (target_width - resized_width) / 2,
      pad_y: (target_height - resized_height) / 2,
      resized_width,
      resized_height,
      orig_width,
      orig_height,
    }
  }

  /// 将模型输入坐标系下的 [x_min, y_min, x_max, y_max] 映射回原图
  pub fn to_original(self, bbox: [f32; 4]) -> [f32; 4] {
    let map_x = |x: f32| ((x - self.pad_x as f32) / self.scale).clamp(0.0, self.orig_width as f32);
    let map_y =
      |y: f32| ((y - self.pad_y as f32) / self.scale).clamp(0.0, self.orig_height as f32);
    [map_x(bbox[0]), map_y(bbox[1]), map_x(bbox[2]), map_y(bbox[3])]
  }
}
