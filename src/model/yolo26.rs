// 该文件是 Kanmao （看猫） 项目的一部分。
// src/model/yolo26.rs - YOLO26 检测模型
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

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{FrameBatch, Letterbox},
  input::{ImageFileInput, ImageFileInputError},
  model::{
    CocoLabel, DetectItem, DetectResult, DetectionModel, ModelBuilder, WithLabel,
    coco::COCO_CLASS_NUM,
  },
  runtime::{RknnModelSource, TensorOutputs},
};

pub const YOLO26_NUM_OUTPUTS: u32 = 6;
const YOLO26_CLASS_NUM: usize = COCO_CLASS_NUM;
const YOLO26_INPUT_W: u32 = 640;
const YOLO26_INPUT_H: u32 = 640;
const YOLO26_HEAD_SIZES: [(usize, usize); 3] = [(80, 80), (40, 40), (20, 20)];
const YOLO26_STRIDES: [f32; 3] = [8.0, 16.0, 32.0];
const YOLO26_OBJECT_THRESH: f32 = 0.5;

#[derive(Error, Debug)]
pub enum Yolo26Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输入错误: {0}")]
  InputError(#[from] ImageFileInputError),
  #[error("输出数量 {outputs} 与上下文数量 {contexts} 不一致")]
  BatchMismatch { outputs: usize, contexts: usize },
}

pub struct Yolo26Builder {
  model_path: PathBuf,
  object_thresh: f32,
}

impl FromUrlWithScheme for Yolo26Builder {
  const SCHEME: &'static str = "yolo26";
}

impl FromUrl for Yolo26Builder {
  type Error = Yolo26Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolo26Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(Yolo26Builder::new(url.path()))
  }
}

impl Yolo26Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Yolo26Builder {
      model_path: model_path.into(),
      object_thresh: YOLO26_OBJECT_THRESH,
    }
  }

  pub fn object_thresh(mut self, thresh: f32) -> Self {
    self.object_thresh = thresh;
    self
  }
}

impl ModelBuilder for Yolo26Builder {
  type Model = Yolo26;
  type Error = Yolo26Error;

  fn build(self) -> Result<Self::Model, Self::Error> {
    info!("加载模型文件: {}", self.model_path.display());
    let source = RknnModelSource::load(&self.model_path)?;
    info!("模型加载完成");

    Ok(Yolo26 {
      source,
      object_thresh: self.object_thresh,
    })
  }
}

pub struct Yolo26 {
  source: RknnModelSource,
  object_thresh: f32,
}

/// 根据张量大小匹配回归和分类输出
/// 返回 (reg, cls) 元组，如果大小不匹配则返回 None
fn match_reg_cls_tensors<'a>(
  tensor1: &'a [f32],
  tensor2: &'a [f32],
  reg_expected: usize,
  cls_expected: usize,
  head_idx: usize,
) -> Option<(&'a [f32], &'a [f32])> {
  if tensor1.len() == reg_expected && tensor2.len() == cls_expected {
    Some((tensor1, tensor2))
  } else if tensor1.len() == cls_expected && tensor2.len() == reg_expected {
    debug!("检测头 {}: 输出顺序交换", head_idx);
    Some((tensor2, tensor1))
  } else {
    error!(
      "检测头 {}: 输出大小不匹配 - 张量1: {}, 张量2: {}, 期望回归: {}, 期望分类: {}",
      head_idx,
      tensor1.len(),
      tensor2.len(),
      reg_expected,
      cls_expected
    );
    None
  }
}

/// 解码一张图像的三个检测头，坐标映射回原图像素
fn decode(
  output: &TensorOutputs,
  letterbox: &Letterbox,
  object_thresh: f32,
) -> DetectResult<CocoLabel> {
  let input_w = YOLO26_INPUT_W as f32;
  let input_h = YOLO26_INPUT_H as f32;
  let mut items = Vec::new();

  for (head_idx, (&(map_h, map_w), stride)) in
    YOLO26_HEAD_SIZES.iter().zip(YOLO26_STRIDES).enumerate()
  {
    let spatial = map_h * map_w;
    let reg_expected = 4 * spatial;
    let cls_expected = YOLO26_CLASS_NUM * spatial;

    // RKNN 输出顺序不固定，按张量大小区分回归与分类
    let (Some(tensor1), Some(tensor2)) =
      (output.get_f32(head_idx * 2), output.get_f32(head_idx * 2 + 1))
    else {
      error!("检测头 {}: 缺少输出张量", head_idx);
      continue;
    };

    let Some((reg, cls)) =
      match_reg_cls_tensors(tensor1, tensor2, reg_expected, cls_expected, head_idx)
    else {
      continue;
    };

    for h in 0..map_h {
      for w in 0..map_w {
        let idx = h * map_w + w;

        let (score, class_id) = {
          let mut max_logit = f32::MIN;
          let mut cls_idx = 0usize;
          for c in 0..YOLO26_CLASS_NUM {
            let logit = cls[c * spatial + idx];
            if logit > max_logit {
              max_logit = logit;
              cls_idx = c;
            }
          }
          (sigmoid(max_logit), cls_idx as u32)
        };

        if score <= object_thresh {
          continue;
        }

        let l = reg[idx];
        let t = reg[spatial + idx];
        let r = reg[2 * spatial + idx];
        let b = reg[3 * spatial + idx];

        let grid_x = (w as f32) + 0.5;
        let grid_y = (h as f32) + 0.5;

        let xmin = ((grid_x - l) * stride).clamp(0.0, input_w);
        let ymin = ((grid_y - t) * stride).clamp(0.0, input_h);
        let xmax = ((grid_x + r) * stride).clamp(0.0, input_w);
        let ymax = ((grid_y + b) * stride).clamp(0.0, input_h);

        if xmax <= xmin || ymax <= ymin {
          continue;
        }

        items.push(DetectItem {
          label: CocoLabel::from_label_id(class_id),
          score,
          bbox: letterbox.to_original([xmin, ymin, xmax, ymax]),
        });
      }
    }
  }

  debug!("检测到 {} 个物体", items.len());
  DetectResult::from(items)
}

impl DetectionModel for Yolo26 {
  type Source = RknnModelSource;
  type Input = FrameBatch;
  type Context = Letterbox;
  type RawOutput = Vec<TensorOutputs>;
  type Label = CocoLabel;
  type Error = Yolo26Error;

  fn model_source(&self) -> &Self::Source {
    &self.source
  }

  fn preprocess(
    &self,
    image_paths: &[PathBuf],
  ) -> Result<(Self::Input, Vec<Self::Context>), Self::Error> {
    let mut frames = Vec::with_capacity(image_paths.len());
    let mut contexts = Vec::with_capacity(image_paths.len());

    for path in image_paths {
      let input = ImageFileInput::open(path)?;
      let (frame, letterbox) = input.letterbox(YOLO26_INPUT_W, YOLO26_INPUT_H);
      debug!(
        "前处理 {}: 缩放 {:.3}, 填充 ({}, {})",
        input.path().display(),
        letterbox.scale,
        letterbox.pad_x,
        letterbox.pad_y
      );
      frames.push(frame);
      contexts.push(letterbox);
    }

    Ok((frames.into_boxed_slice(), contexts))
  }

  fn postprocess(
    &self,
    outputs: Self::RawOutput,
    contexts: &[Self::Context],
  ) -> Result<Vec<DetectResult<Self::Label>>, Self::Error> {
    if outputs.len() != contexts.len() {
      return Err(Yolo26Error::BatchMismatch {
        outputs: outputs.len(),
        contexts: contexts.len(),
      });
    }

    Ok(
      outputs
        .iter()
        .zip(contexts)
        .map(|(output, letterbox)| decode(output, letterbox, self.object_thresh))
        .collect(),
    )
  }
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}
