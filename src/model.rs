// 该文件是 Qianliyan （千里眼） 项目的一部分。
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

pub mod decode;
pub mod labels;
pub mod postprocess;
pub mod preprocess;

mod yolov4;
pub use self::yolov4::{YoloV4, YoloV4Builder, Yolov4Error};

pub trait Model {
  type Input;
  type Output;
  type Error;

  /// 对单帧执行一次推理；同一实例不支持并发调用
  fn infer(&mut self, input: &Self::Input, options: &DetectOptions)
  -> Result<Self::Output, Self::Error>;
}

/// 单个检测结果，坐标为原图像素单位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxInfo {
  pub label: i32,
  pub score: f32,
  pub x: f32,
  pub y: f32,
  pub w: f32,
  pub h: f32,
}

impl BoxInfo {
  pub fn x2(&self) -> f32 {
    self.x + self.w
  }

  pub fn y2(&self) -> f32 {
    self.y + self.h
  }

  pub fn area(&self) -> f32 {
    self.w.max(0.0) * self.h.max(0.0)
  }

  /// 两个框的交并比
  pub fn iou(&self, other: &BoxInfo) -> f32 {
    let x1 = self.x.max(other.x);
    let y1 = self.y.max(other.y);
    let x2 = self.x2().min(other.x2());
    let y2 = self.y2().min(other.y2());

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

/// 每次检测调用的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
  /// 置信度阈值，检测阶段只透传不过滤
  pub score_threshold: f32,
  /// NMS IOU 阈值，检测阶段不执行 NMS
  pub nms_threshold: f32,
  /// CPU 线程数，0 表示沿用推理引擎默认值
  pub threads: usize,
}

impl Default for DetectOptions {
  fn default() -> Self {
    Self {
      score_threshold: 0.3,
      nms_threshold: 0.7,
      threads: 0,
    }
  }
}
