// 该文件是 Kanmao （看猫） 项目的一部分。
// src/bin/detect_oneshot.rs - 单张图像检测示例
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use kanmao::{
  FromUrl,
  driver::{DEFAULT_IMAGE, ExampleDriver},
  model::Yolo26Builder,
  output::PrintOutput,
  runtime::RknpuRuntime,
};

/// Kanmao 单张图像检测示例
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// RKNN 模型文件路径，例如 yolo26:///opt/models/yolo26n.rknn
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像路径，可重复指定
  #[arg(long, value_name = "IMAGE", default_value = DEFAULT_IMAGE)]
  pub image: Vec<PathBuf>,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,
}

fn main() -> Result<()> {
  // 标准输出只留给检测结果
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入图像: {:?}", args.image);
  info!("置信度阈值: {}", args.confidence);

  let builder = Yolo26Builder::from_url(&args.model)?.object_thresh(args.confidence);
  let runtime = RknpuRuntime::default().expect_outputs(kanmao::model::YOLO26_NUM_OUTPUTS);

  ExampleDriver::new(args.image, builder, runtime, PrintOutput::stdout()).run()?;

  info!("处理完成");
  Ok(())
}
