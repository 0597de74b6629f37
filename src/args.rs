// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Args;
use tracing::info;
use url::Url;

use crate::{model::DetectOptions, task::TaskOptions};

/// 各个可执行程序共用的参数
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
  /// 模型路径，例如 yolov4:///models/yolov4.onnx?gpu=true&input_size=416
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///data/a.jpg 或 folder:///data/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 image:///out/a.png、json:///out/a.json 或 folder:///out
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.3, value_name = "THRESHOLD")]
  pub score_threshold: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.7, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// CPU 推理线程数，0 表示引擎默认
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub threads: usize,

  /// 检测后按阈值过滤并执行 NMS（默认输出原始检测结果）
  #[arg(long)]
  pub suppress: bool,
}

impl CommonArgs {
  pub fn task_options(&self) -> TaskOptions {
    TaskOptions {
      detect: DetectOptions {
        score_threshold: self.score_threshold,
        nms_threshold: self.nms_threshold,
        threads: self.threads,
      },
      suppress: self.suppress,
    }
  }

  pub fn log(&self) {
    info!("模型文件路径: {}", self.model);
    info!("输入来源: {}", self.input);
    info!("输出路径: {}", self.output);
    info!("置信度阈值: {}", self.score_threshold);
    info!("NMS 阈值: {}", self.nms_threshold);
    info!("线程数: {}", self.threads);
  }
}
