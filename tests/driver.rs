// 该文件是 Kanmao （看猫） 项目的一部分。
// tests/driver.rs - 单次检测流程测试
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

use std::{
  cell::{Cell, RefCell},
  io,
  path::PathBuf,
  rc::Rc,
};

use kanmao::{
  driver::{DEFAULT_IMAGE, ExampleDriver},
  model::{DetectItem, DetectResult, DetectionModel, ModelBuilder},
  output::PrintOutput,
  runtime::{Runner, Runtime},
};

#[derive(Default)]
struct Counters {
  acquired: Cell<usize>,
  released: Cell<usize>,
  runs: Cell<usize>,
  calls: RefCell<Vec<&'static str>>,
}

type Nested = Vec<Vec<(&'static str, f32)>>;

struct StubBuilder {
  counters: Rc<Counters>,
  detections: Nested,
  fail_build: bool,
  fail_postprocess: bool,
}

impl StubBuilder {
  fn new(counters: &Rc<Counters>, detections: Nested) -> Self {
    Self {
      counters: counters.clone(),
      detections,
      fail_build: false,
      fail_postprocess: false,
    }
  }
}

struct StubModel {
  counters: Rc<Counters>,
  detections: Nested,
  fail_postprocess: bool,
}

impl ModelBuilder for StubBuilder {
  type Model = StubModel;
  type Error = io::Error;

  fn build(self) -> Result<Self::Model, Self::Error> {
    self.counters.calls.borrow_mut().push("build");
    if self.fail_build {
      return Err(io::Error::other("model weights unavailable"));
    }
    Ok(StubModel {
      counters: self.counters,
      detections: self.detections,
      fail_postprocess: self.fail_postprocess,
    })
  }
}

impl DetectionModel for StubModel {
  type Source = &'static str;
  type Input = Vec<PathBuf>;
  type Context = usize;
  type RawOutput = usize;
  type Label = &'static str;
  type Error = io::Error;

  fn model_source(&self) -> &Self::Source {
    &"stub-model"
  }

  fn preprocess(
    &self,
    image_paths: &[PathBuf],
  ) -> Result<(Self::Input, Vec<Self::Context>), Self::Error> {
    self.counters.calls.borrow_mut().push("preprocess");
    for path in image_paths {
      std::fs::metadata(path)?;
    }
    Ok((image_paths.to_vec(), (0..image_paths.len()).collect()))
  }

  fn postprocess(
    &self,
    outputs: Self::RawOutput,
    contexts: &[Self::Context],
  ) -> Result<Vec<DetectResult<Self::Label>>, Self::Error> {
    self.counters.calls.borrow_mut().push("postprocess");
    assert_eq!(outputs, contexts.len());
    if self.fail_postprocess {
      return Err(io::Error::new(io::ErrorKind::InvalidData, "bad tensor"));
    }
    Ok(
      self
        .detections
        .iter()
        .map(|inner| {
          inner
            .iter()
            .map(|&(label, score)| DetectItem {
              label,
              score,
              bbox: [0.0; 4],
            })
            .collect::<Vec<_>>()
            .into()
        })
        .collect(),
    )
  }
}

struct StubRuntime {
  counters: Rc<Counters>,
  fail_run: bool,
}

struct StubRunner {
  counters: Rc<Counters>,
  fail_run: bool,
}

impl Runtime<&'static str> for StubRuntime {
  type Runner = StubRunner;
  type Error = io::Error;

  fn create_runner(&self, source: &&'static str) -> Result<Self::Runner, Self::Error> {
    assert_eq!(*source, "stub-model");
    self.counters.calls.borrow_mut().push("create_runner");
    self.counters.acquired.set(self.counters.acquired.get() + 1);
    Ok(StubRunner {
      counters: self.counters.clone(),
      fail_run: self.fail_run,
    })
  }
}

impl Runner for StubRunner {
  type Input = Vec<PathBuf>;
  type Output = usize;
  type Error = io::Error;

  fn run(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.counters.calls.borrow_mut().push("run");
    self.counters.runs.set(self.counters.runs.get() + 1);
    if self.fail_run {
      return Err(io::Error::other("npu timeout"));
    }
    Ok(input.len())
  }
}

impl Drop for StubRunner {
  fn drop(&mut self) {
    self.counters.calls.borrow_mut().push("release");
    self.counters.released.set(self.counters.released.get() + 1);
  }
}

fn runtime(counters: &Rc<Counters>, fail_run: bool) -> StubRuntime {
  StubRuntime {
    counters: counters.clone(),
    fail_run,
  }
}

/// 在临时目录下创建一个存在的图像路径
fn existing_image(name: &str) -> PathBuf {
  let path = std::env::temp_dir().join(format!("kanmao-driver-{}-{}.jpg", name, std::process::id()));
  std::fs::write(&path, b"jpeg").unwrap();
  path
}

fn run_driver(
  images: Vec<PathBuf>,
  builder: StubBuilder,
  runtime: StubRuntime,
) -> (anyhow::Result<()>, String) {
  let mut stdout = Vec::new();
  let result = ExampleDriver::new(images, builder, runtime, PrintOutput::new(&mut stdout)).run();
  (result, String::from_utf8(stdout).unwrap())
}

#[test]
fn prints_one_line_per_detection() {
  let counters = Rc::new(Counters::default());
  let image = existing_image("lines");
  let builder = StubBuilder::new(&counters, vec![vec![("cat", 0.92), ("sofa", 0.31)]]);

  let (result, stdout) = run_driver(vec![image.clone()], builder, runtime(&counters, false));
  std::fs::remove_file(image).unwrap();

  result.unwrap();
  assert_eq!(stdout, "Label: cat, Score: 0.92\nLabel: sofa, Score: 0.31\n");
  assert_eq!(counters.acquired.get(), 1);
  assert_eq!(counters.released.get(), 1);
  assert_eq!(
    *counters.calls.borrow(),
    [
      "build",
      "create_runner",
      "preprocess",
      "run",
      "postprocess",
      "release"
    ]
  );
}

#[test]
fn prints_outer_then_inner_order() {
  let counters = Rc::new(Counters::default());
  let first = existing_image("order-a");
  let second = existing_image("order-b");
  let builder = StubBuilder::new(
    &counters,
    vec![vec![("cat", 0.9), ("cup", 0.6)], vec![("dog", 0.8)]],
  );

  let (result, stdout) = run_driver(
    vec![first.clone(), second.clone()],
    builder,
    runtime(&counters, false),
  );
  std::fs::remove_file(first).unwrap();
  std::fs::remove_file(second).unwrap();

  result.unwrap();
  assert_eq!(
    stdout.lines().collect::<Vec<_>>(),
    [
      "Label: cat, Score: 0.9",
      "Label: cup, Score: 0.6",
      "Label: dog, Score: 0.8"
    ]
  );
  assert_eq!(counters.runs.get(), 1);
}

#[test]
fn empty_result_prints_nothing() {
  let counters = Rc::new(Counters::default());
  let image = existing_image("empty");
  let builder = StubBuilder::new(&counters, Vec::new());

  let (result, stdout) = run_driver(vec![image.clone()], builder, runtime(&counters, false));
  std::fs::remove_file(image).unwrap();

  result.unwrap();
  assert!(stdout.is_empty());
  assert_eq!(counters.released.get(), 1);
}

#[test]
fn inference_failure_releases_runner_once() {
  let counters = Rc::new(Counters::default());
  let image = existing_image("infer-fail");
  let builder = StubBuilder::new(&counters, vec![vec![("cat", 0.92)]]);

  let (result, stdout) = run_driver(vec![image.clone()], builder, runtime(&counters, true));
  std::fs::remove_file(image).unwrap();

  let err = result.unwrap_err();
  assert_eq!(err.to_string(), "npu timeout");
  assert!(stdout.is_empty());
  assert_eq!(counters.acquired.get(), 1);
  assert_eq!(counters.released.get(), 1);
  assert!(!counters.calls.borrow().contains(&"postprocess"));
}

#[test]
fn postprocess_failure_prints_nothing() {
  let counters = Rc::new(Counters::default());
  let image = existing_image("post-fail");
  let mut builder = StubBuilder::new(&counters, vec![vec![("cat", 0.92)]]);
  builder.fail_postprocess = true;

  let (result, stdout) = run_driver(vec![image.clone()], builder, runtime(&counters, false));
  std::fs::remove_file(image).unwrap();

  let err = result.unwrap_err();
  let io_err = err.downcast_ref::<io::Error>().unwrap();
  assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
  assert!(stdout.is_empty());
  assert_eq!(counters.released.get(), 1);
}

#[test]
fn missing_image_error_passes_through() {
  let counters = Rc::new(Counters::default());
  let missing = PathBuf::from(DEFAULT_IMAGE).with_file_name("kanmao_missing_cat.jpg");
  let expected = std::fs::metadata(&missing).unwrap_err();
  let builder = StubBuilder::new(&counters, vec![vec![("cat", 0.92)]]);

  let (result, stdout) = run_driver(vec![missing], builder, runtime(&counters, false));

  let err = result.unwrap_err();
  let io_err = err.downcast_ref::<io::Error>().unwrap();
  assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
  assert_eq!(err.to_string(), expected.to_string());
  assert!(stdout.is_empty());
  assert_eq!(counters.runs.get(), 0);
  assert_eq!(counters.released.get(), 1);
}

#[test]
fn build_failure_acquires_no_runner() {
  let counters = Rc::new(Counters::default());
  let mut builder = StubBuilder::new(&counters, Vec::new());
  builder.fail_build = true;

  let (result, stdout) = run_driver(
    vec![PathBuf::from(DEFAULT_IMAGE)],
    builder,
    runtime(&counters, false),
  );

  assert_eq!(result.unwrap_err().to_string(), "model weights unavailable");
  assert!(stdout.is_empty());
  assert_eq!(counters.acquired.get(), 0);
  assert_eq!(counters.released.get(), 0);
  assert_eq!(*counters.calls.borrow(), ["build"]);
}
