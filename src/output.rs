// 该文件是 Kanmao （看猫） 项目的一部分。
// src/output.rs - 输出定义
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

use std::{fmt::Display, io::Write};

use tracing::debug;

use crate::model::DetectResult;

pub trait Render<Output: ?Sized> {
  type Error;
  fn render_result(&mut self, result: &Output) -> Result<(), Self::Error>;
}

/// 按图像、再按检测顺序逐行打印 `Label: <label>, Score: <score>`
pub struct PrintOutput<W> {
  writer: W,
}

impl<W: Write> PrintOutput<W> {
  pub fn new(writer: W) -> Self {
    Self { writer }
  }

  pub fn into_inner(self) -> W {
    self.writer
  }
}

impl PrintOutput<std::io::Stdout> {
  pub fn stdout() -> Self {
    Self::new(std::io::stdout())
  }
}

impl<W: Write, T: Display> Render<[DetectResult<T>]> for PrintOutput<W> {
  type Error = std::io::Error;

  fn render_result(&mut self, result: &[DetectResult<T>]) -> Result<(), Self::Error> {
    let mut lines = 0usize;
    for detections in result {
      for item in detections.items.iter() {
        writeln!(self.writer, "Label: {}, Score: {}", item.label, item.score)?;
        lines += 1;
      }
    }
    self.writer.flush()?;
    debug!("输出 {} 条检测结果", lines);
    Ok(())
  }
}
