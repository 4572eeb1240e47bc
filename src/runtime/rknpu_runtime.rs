// 该文件是 Kanmao （看猫） 项目的一部分。
// src/runtime/rknpu_runtime.rs - RKNPU 推理会话
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

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::FrameBatch,
  input::AsNhwcFrame,
  runtime::{RknnModelSource, Runner, Runtime, TensorOutputs},
};

const RKNPU_NUM_INPUTS: u32 = 1;

#[derive(Error, Debug)]
pub enum RknpuRuntimeError {
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("获取第 {0} 个输出失败: {1}")]
  OutputError(usize, String),
}

impl From<rknpu::Error> for RknpuRuntimeError {
  fn from(err: rknpu::Error) -> Self {
    RknpuRuntimeError::RknnError(err)
  }
}

impl RknpuRuntimeError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    RknpuRuntimeError::ModelInvalid(msg.to_string(), e)
  }
}

#[derive(Debug, Default)]
pub struct RknpuRuntime {
  expected_outputs: Option<u32>,
}

impl RknpuRuntime {
  /// 创建会话时校验模型输出数量
  pub fn expect_outputs(mut self, num_outputs: u32) -> Self {
    self.expected_outputs = Some(num_outputs);
    self
  }
}

pub struct RknpuRunner {
  context: Context,
  num_outputs: u32,
}

impl Runtime<RknnModelSource> for RknpuRuntime {
  type Runner = RknpuRunner;
  type Error = RknpuRuntimeError;

  fn create_runner(&self, source: &RknnModelSource) -> Result<Self::Runner, Self::Error> {
    debug!(
      "模型文件大小: {:.2} MB",
      source.data().len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文: {}", source.path().display());
    let context = Context::new(source.data(), InitFlags::default())?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(RknpuRuntimeError::invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| RknpuRuntimeError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| RknpuRuntimeError::invalid("无法获取输出数量", e))?;
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != RKNPU_NUM_INPUTS {
      let msg = format!(
        "预期模型输入数量为 {}, 实际为 {}",
        RKNPU_NUM_INPUTS, num_inputs
      );
      error!("{}", msg);
      return Err(RknpuRuntimeError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    if let Some(expected) = self.expected_outputs
      && expected != num_outputs
    {
      let msg = format!("预期模型输出数量为 {}, 实际为 {}", expected, num_outputs);
      error!("{}", msg);
      return Err(RknpuRuntimeError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!("推理会话已创建");
    Ok(RknpuRunner {
      context,
      num_outputs,
    })
  }
}

impl Runner for RknpuRunner {
  type Input = FrameBatch;
  type Output = Vec<TensorOutputs>;
  type Error = RknpuRuntimeError;

  fn run(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let mut results = Vec::with_capacity(input.len());

    for (frame_idx, frame) in input.iter().enumerate() {
      debug!("设置第 {} 帧模型输入", frame_idx);
      self
        .context
        .set_input(0, frame.as_nhwc(), TensorFormat::NHWC, TensorType::UInt8)?;

      debug!("执行模型推理");
      self.context.run()?;

      debug!("获取模型输出");
      let output = self.context.get_outputs()?;
      let mut tensors = Vec::with_capacity(self.num_outputs as usize);
      for idx in 0..self.num_outputs as usize {
        let tensor = output
          .get_f32(idx)
          .map_err(|e| RknpuRuntimeError::OutputError(idx, e.to_string()))?;
        tensors.push(tensor.to_vec().into_boxed_slice());
      }
      results.push(TensorOutputs::from(tensors));
    }

    Ok(results)
  }
}

impl Drop for RknpuRunner {
  fn drop(&mut self) {
    info!("释放 RKNN 推理会话");
  }
}
