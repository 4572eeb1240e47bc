// 该文件是 Kanmao （看猫） 项目的一部分。
// src/model.rs - 模型
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

use std::path::PathBuf;

/// 构建检测模型，构建失败时不应占用任何推理会话
pub trait ModelBuilder {
  type Model: DetectionModel;
  type Error: std::error::Error + Send + Sync + 'static;

  fn build(self) -> Result<Self::Model, Self::Error>;
}

/// 检测模型抽象：只负责前处理与后处理，执行交给 [`crate::runtime::Runner`]。
pub trait DetectionModel {
  /// 可加载进推理会话的模型描述
  type Source;
  /// 前处理得到的输入批次
  type Input;
  /// 每张图像的前处理上下文，仅供后处理使用
  type Context;
  /// 推理会话的原始输出
  type RawOutput;
  type Label: std::fmt::Display;
  type Error: std::error::Error + Send + Sync + 'static;

  fn model_source(&self) -> &Self::Source;

  fn preprocess(
    &self,
    image_paths: &[PathBuf],
  ) -> Result<(Self::Input, Vec<Self::Context>), Self::Error>;

  /// 返回值外层与输入图像一一对应
  fn postprocess(
    &self,
    outputs: Self::RawOutput,
    contexts: &[Self::Context],
  ) -> Result<Vec<DetectResult<Self::Label>>, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem<T> {
  pub label: T,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectResult<T> {
  pub items: Box<[DetectItem<T>]>,
}

impl<T> DetectResult<T> {
  pub fn empty() -> Self {
    Self {
      items: Box::new([]),
    }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl<T> From<Vec<DetectItem<T>>> for DetectResult<T> {
  fn from(items: Vec<DetectItem<T>>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

pub trait WithLabel: Sized + std::fmt::Debug + std::fmt::Display {
  fn from_label_id(id: u32) -> Self;
}

mod coco;
pub use self::coco::CocoLabel;

#[cfg(feature = "model_yolo26")]
mod yolo26;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{YOLO26_NUM_OUTPUTS, Yolo26, Yolo26Builder, Yolo26Error};
