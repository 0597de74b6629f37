// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/model/yolov4.rs - YOLOv4 检测器
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

use ort::{
  execution_providers::{CUDAExecutionProvider, ExecutionProvider},
  session::{Session, builder::GraphOptimizationLevel},
  value::TensorRef,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Bitmap,
  model::{
    BoxInfo, DetectOptions, Model,
    decode::{self, DecodeError},
    preprocess,
  },
  query_param, url_file_path,
};

const YOLOV4_INPUT_SIZE: u32 = 416;
const YOLOV4_CLASS_NUM: usize = 80;
const YOLOV4_OUTPUT_NAME: &str = "output";

#[derive(Error, Debug)]
pub enum Yolov4Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("权重加载错误: {0}, 错误: {1}")]
  WeightsLoadError(String, std::io::Error),
  #[error("模型解析错误: {0}, 错误: {1}")]
  GraphLoadError(String, ort::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(ort::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输出解码错误: {0}")]
  DecodeError(#[from] DecodeError),
}

impl From<std::io::Error> for Yolov4Error {
  fn from(err: std::io::Error) -> Self {
    Yolov4Error::ModelLoadError(err)
  }
}

impl From<ort::Error> for Yolov4Error {
  fn from(err: ort::Error) -> Self {
    Yolov4Error::OrtError(err)
  }
}

/// 仅当设备存在可用 GPU 且调用方要求时才启用 GPU
fn select_gpu(has_gpu: bool, requested: bool) -> bool {
  has_gpu && requested
}

fn probe_gpu() -> bool {
  match CUDAExecutionProvider::default().is_available() {
    Ok(available) => available,
    Err(e) => {
      warn!("查询 CUDA 可用性失败: {}", e);
      false
    }
  }
}

fn build_session(model_path: &Path, use_gpu: bool, threads: usize) -> Result<Session, Yolov4Error> {
  let mut builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

  if use_gpu {
    builder = builder.with_execution_providers([CUDAExecutionProvider::default()
      .build()
      .error_on_failure()])?;
  } else if threads > 0 {
    builder = builder.with_intra_threads(threads)?;
  }

  builder
    .commit_from_file(model_path)
    .map_err(|e| Yolov4Error::GraphLoadError(model_path.display().to_string(), e))
}

pub struct YoloV4Builder {
  model_path: PathBuf,
  weights_path: Option<PathBuf>,
  use_gpu: bool,
  input_size: u32,
  num_class: usize,
  threads: usize,
}

impl FromUrlWithScheme for YoloV4Builder {
  const SCHEME: &'static str = "yolov4";
}

impl FromUrl for YoloV4Builder {
  type Error = Yolov4Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolov4Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }
    let model_path = url_file_path(url)
      .ok_or_else(|| Yolov4Error::ModelPathError(format!("无法解码的路径: {}", url.path())))?;
    if model_path.as_os_str().is_empty() {
      return Err(Yolov4Error::ModelPathError("模型路径为空".to_string()));
    }

    let mut builder = YoloV4Builder::new(model_path);
    if let Some(weights) = query_param::<String>(url, "weights") {
      builder = builder.weights(weights);
    }
    if let Some(gpu) = query_param(url, "gpu") {
      builder = builder.use_gpu(gpu);
    }
    if let Some(input_size) = query_param(url, "input_size") {
      builder = builder.input_size(input_size);
    }
    if let Some(num_class) = query_param(url, "num_class") {
      builder = builder.num_class(num_class);
    }
    if let Some(threads) = query_param(url, "threads") {
      builder = builder.threads(threads);
    }
    Ok(builder)
  }
}

impl YoloV4Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      weights_path: None,
      use_gpu: true,
      input_size: YOLOV4_INPUT_SIZE,
      num_class: YOLOV4_CLASS_NUM,
      threads: 0,
    }
  }

  /// 外部权重文件；相对路径以模型所在目录为基准
  pub fn weights(mut self, weights_path: impl Into<PathBuf>) -> Self {
    let weights_path = weights_path.into();
    self.weights_path = Some(if weights_path.is_relative() {
      self
        .model_path
        .parent()
        .map(|dir| dir.join(&weights_path))
        .unwrap_or(weights_path)
    } else {
      weights_path
    });
    self
  }

  pub fn use_gpu(mut self, use_gpu: bool) -> Self {
    self.use_gpu = use_gpu;
    self
  }

  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn num_class(mut self, num_class: usize) -> Self {
    self.num_class = num_class;
    self
  }

  /// 初始 CPU 线程数，0 表示引擎默认
  pub fn threads(mut self, threads: usize) -> Self {
    self.threads = threads;
    self
  }

  pub fn build(self) -> Result<YoloV4, Yolov4Error> {
    if self.input_size == 0 {
      return Err(Yolov4Error::ModelInvalid("输入尺寸不能为 0".to_string()));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let model_meta = std::fs::metadata(&self.model_path)?;
    if !model_meta.is_file() {
      return Err(Yolov4Error::ModelPathError(format!(
        "{} 不是文件",
        self.model_path.display()
      )));
    }
    debug!(
      "模型文件大小: {:.2} MB",
      model_meta.len() as f64 / (1024.0 * 1024.0)
    );

    // 外部权重由 ONNX Runtime 按模型中记录的位置读取，这里先确认其可读
    if let Some(weights_path) = &self.weights_path {
      info!("检查权重文件: {}", weights_path.display());
      let weights_meta = std::fs::File::open(weights_path)
        .and_then(|file| file.metadata())
        .map_err(|e| Yolov4Error::WeightsLoadError(weights_path.display().to_string(), e))?;
      debug!(
        "权重文件大小: {:.2} MB",
        weights_meta.len() as f64 / (1024.0 * 1024.0)
      );
    }

    if let Err(e) = ort::init().with_name("qianliyan").commit() {
      warn!("ONNX Runtime 环境初始化失败，使用默认环境: {}", e);
    }

    let has_gpu = probe_gpu();
    let use_gpu = select_gpu(has_gpu, self.use_gpu);
    if self.use_gpu && !has_gpu {
      warn!("未检测到可用 GPU，回退到 CPU 推理");
    }
    info!(
      "创建推理会话: {}",
      if use_gpu { "CUDA" } else { "CPU" }
    );

    let session = build_session(&self.model_path, use_gpu, self.threads)?;

    if session.inputs.is_empty() {
      error!("模型没有输入");
      return Err(Yolov4Error::ModelInvalid("模型没有输入".to_string()));
    }
    if !session.outputs.iter().any(|o| o.name == YOLOV4_OUTPUT_NAME) {
      let names: Vec<_> = session.outputs.iter().map(|o| o.name.as_str()).collect();
      error!("模型缺少输出 {}, 实际输出: {:?}", YOLOV4_OUTPUT_NAME, names);
      return Err(Yolov4Error::ModelInvalid(format!(
        "缺少名为 {} 的输出",
        YOLOV4_OUTPUT_NAME
      )));
    }

    debug!("模型输入数量: {}", session.inputs.len());
    debug!("模型输出数量: {}", session.outputs.len());
    info!(
      "模型加载完成: 输入 {}x{}, 类别数 {}",
      self.input_size, self.input_size, self.num_class
    );

    Ok(YoloV4 {
      session,
      model_path: self.model_path,
      has_gpu,
      use_gpu,
      input_size: self.input_size,
      num_class: self.num_class,
      threads: self.threads,
    })
  }
}

pub struct YoloV4 {
  session: Session,
  model_path: PathBuf,
  has_gpu: bool,
  use_gpu: bool,
  input_size: u32,
  num_class: usize,
  // 当前会话使用的 CPU 线程数
  threads: usize,
}

impl YoloV4 {
  pub fn has_gpu(&self) -> bool {
    self.has_gpu
  }

  pub fn use_gpu(&self) -> bool {
    self.use_gpu
  }

  pub fn input_size(&self) -> u32 {
    self.input_size
  }

  pub fn num_class(&self) -> usize {
    self.num_class
  }

  /// ONNX Runtime 的线程池随会话固定，线程数变化时重建 CPU 会话
  fn configure_threads(&mut self, threads: usize) -> Result<(), Yolov4Error> {
    if self.use_gpu || threads == 0 || threads == self.threads {
      return Ok(());
    }
    info!("线程数 {} -> {}, 重建推理会话", self.threads, threads);
    self.session = build_session(&self.model_path, false, threads)?;
    self.threads = threads;
    Ok(())
  }

  /// 单帧检测；置信度与 NMS 阈值只透传，结果不做过滤
  pub fn detect(
    &mut self,
    bitmap: &Bitmap,
    options: &DetectOptions,
  ) -> Result<Vec<BoxInfo>, Yolov4Error> {
    self.configure_threads(options.threads)?;

    let input = preprocess::to_input_tensor(bitmap, self.input_size);

    debug!("执行模型推理");
    let outputs = self
      .session
      .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

    let output = outputs
      .get(YOLOV4_OUTPUT_NAME)
      .ok_or_else(|| Yolov4Error::ModelInvalid(format!("缺少输出 {}", YOLOV4_OUTPUT_NAME)))?
      .try_extract_array::<f32>()?;
    debug!("输出张量形状: {:?}", output.shape());

    let boxes = decode::decode_tensor(output, bitmap.size())?;
    debug!(
      "检测到 {} 个物体 (score_threshold={}, nms_threshold={})",
      boxes.len(),
      options.score_threshold,
      options.nms_threshold
    );
    Ok(boxes)
  }
}

impl Model for YoloV4 {
  type Input = Bitmap;
  type Output = Vec<BoxInfo>;
  type Error = Yolov4Error;

  fn infer(
    &mut self,
    input: &Self::Input,
    options: &DetectOptions,
  ) -> Result<Self::Output, Self::Error> {
    self.detect(input, options)
  }
}
