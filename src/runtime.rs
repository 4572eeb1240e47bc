// 该文件是 Kanmao （看猫） 项目的一部分。
// src/runtime.rs - 推理运行时
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

/// 根据模型描述创建推理会话
pub trait Runtime<Source> {
  type Runner: Runner;
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_runner(&self, source: &Source) -> Result<Self::Runner, Self::Error>;
}

/// 推理会话。
///
/// 会话持有的资源在值被 drop 时释放，实现者应在 `Drop` 中完成清理，
/// 这样无论调用方正常返回、提前返回错误还是 panic，会话都只释放一次。
pub trait Runner {
  type Input;
  type Output;
  type Error: std::error::Error + Send + Sync + 'static;

  fn run(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 一张图像推理得到的全部输出张量
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorOutputs {
  tensors: Box<[Box<[f32]>]>,
}

impl TensorOutputs {
  pub fn len(&self) -> usize {
    self.tensors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tensors.is_empty()
  }

  pub fn get_f32(&self, index: usize) -> Option<&[f32]> {
    self.tensors.get(index).map(|t| &t[..])
  }
}

impl From<Vec<Box<[f32]>>> for TensorOutputs {
  fn from(tensors: Vec<Box<[f32]>>) -> Self {
    Self {
      tensors: tensors.into_boxed_slice(),
    }
  }
}

impl From<Vec<Vec<f32>>> for TensorOutputs {
  fn from(tensors: Vec<Vec<f32>>) -> Self {
    tensors
      .into_iter()
      .map(Vec::into_boxed_slice)
      .collect::<Vec<_>>()
      .into()
  }
}

/// RKNN 模型文件及其内容
#[derive(Debug, Clone)]
pub struct RknnModelSource {
  path: PathBuf,
  data: Box<[u8]>,
}

impl RknnModelSource {
  pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    Ok(Self {
      path: path.to_path_buf(),
      data: data.into_boxed_slice(),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }
}

#[cfg(feature = "rknpu_runtime")]
mod rknpu_runtime;
#[cfg(feature = "rknpu_runtime")]
pub use self::rknpu_runtime::{RknpuRunner, RknpuRuntime, RknpuRuntimeError};
