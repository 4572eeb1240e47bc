// 该文件是 Kanmao （看猫） 项目的一部分。
// src/driver.rs - 单次检测示例流程
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

use tracing::info;

use crate::{
  model::{DetectResult, DetectionModel, ModelBuilder},
  output::Render,
  runtime::{Runner, Runtime},
};

/// 默认输入图像，需预先放在工作目录下
pub const DEFAULT_IMAGE: &str = "license_free_cat.jpg";

type ModelOf<B> = <B as ModelBuilder>::Model;
type LabelOf<B> = <ModelOf<B> as DetectionModel>::Label;

/// 构建模型、打开推理会话、前处理、推理、后处理并输出，只执行一次。
///
/// 任一环节失败都原样向上返回，不重试也不输出部分结果。
/// 推理会话在 `run` 返回前释放，包括出错返回的情况。
pub struct ExampleDriver<B, R, O> {
  image_paths: Vec<PathBuf>,
  builder: B,
  runtime: R,
  output: O,
}

impl<B, R, O> ExampleDriver<B, R, O>
where
  B: ModelBuilder,
  R: Runtime<<ModelOf<B> as DetectionModel>::Source>,
  R::Runner: Runner<
      Input = <ModelOf<B> as DetectionModel>::Input,
      Output = <ModelOf<B> as DetectionModel>::RawOutput,
    >,
  O: Render<[DetectResult<LabelOf<B>>]>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(image_paths: Vec<PathBuf>, builder: B, runtime: R, output: O) -> Self {
    Self {
      image_paths,
      builder,
      runtime,
      output,
    }
  }

  pub fn run(self) -> anyhow::Result<()> {
    let ExampleDriver {
      image_paths,
      builder,
      runtime,
      mut output,
    } = self;

    info!("构建检测模型...");
    let model = builder.build()?;

    info!("创建推理会话...");
    let mut runner = runtime.create_runner(model.model_source())?;

    let now = std::time::Instant::now();
    let (inputs, contexts) = model.preprocess(&image_paths)?;
    info!("前处理完成，共 {} 张图像，耗时: {:.2?}", contexts.len(), now.elapsed());

    let now = std::time::Instant::now();
    let outputs = runner.run(&inputs)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let now = std::time::Instant::now();
    let converted = model.postprocess(outputs, &contexts)?;
    info!("后处理完成，耗时: {:.2?}", now.elapsed());

    output.render_result(&converted[..])?;

    Ok(())
  }
}
