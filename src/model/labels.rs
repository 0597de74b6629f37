// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/model/labels.rs - 类别名称
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

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 按类别编号查询名称，越界（含负数）时返回 `None`
pub fn label_name(label: i32) -> Option<&'static str> {
  usize::try_from(label)
    .ok()
    .and_then(|idx| COCO_CLASSES.get(idx).copied())
}

/// 用于绘制和记录的标签文本
pub fn label_text(label: i32) -> String {
  label_name(label)
    .map(str::to_string)
    .unwrap_or_else(|| label.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_labels_resolve() {
    assert_eq!(label_name(0), Some("person"));
    assert_eq!(label_name(2), Some("car"));
    assert_eq!(label_name(79), Some("toothbrush"));
  }

  #[test]
  fn out_of_range_labels_fall_back_to_id() {
    assert_eq!(label_name(-1), None);
    assert_eq!(label_name(80), None);
    assert_eq!(label_text(-1), "-1");
    assert_eq!(label_text(80), "80");
    assert_eq!(label_text(16), "dog");
  }
}
