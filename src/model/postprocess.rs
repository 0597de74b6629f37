// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/model/postprocess.rs - 可选后处理
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

//! 检测阶段既不按阈值过滤也不做 NMS，需要时由调用方显式使用这里的函数。

use tracing::debug;

use crate::model::{BoxInfo, DetectOptions};

/// 丢弃置信度低于阈值的框
pub fn filter_by_score(mut boxes: Vec<BoxInfo>, threshold: f32) -> Vec<BoxInfo> {
  boxes.retain(|b| b.score >= threshold);
  boxes
}

/// 非极大值抑制，仅在同类别之间比较
pub fn non_maximum_suppression(mut boxes: Vec<BoxInfo>, iou_threshold: f32) -> Vec<BoxInfo> {
  // 按置信度降序排序
  boxes.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result: Vec<BoxInfo> = Vec::with_capacity(boxes.len());
  for candidate in boxes {
    let suppressed = result
      .iter()
      .any(|kept| kept.label == candidate.label && kept.iou(&candidate) > iou_threshold);
    if !suppressed {
      result.push(candidate);
    }
  }
  result
}

/// 依次执行置信度过滤与 NMS
pub fn suppress(boxes: Vec<BoxInfo>, options: &DetectOptions) -> Vec<BoxInfo> {
  let before = boxes.len();
  let boxes = filter_by_score(boxes, options.score_threshold);
  let boxes = non_maximum_suppression(boxes, options.nms_threshold);
  debug!("后处理: {} -> {} 个框", before, boxes.len());
  boxes
}
