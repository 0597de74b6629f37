// 该文件是 Qianliyan （千里眼） 项目的一部分。
// tests/yolov4_model.rs - 使用最小 ONNX 模型的检测测试
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

use image::{Rgba, RgbaImage};

use qianliyan::{
  frame::Bitmap,
  model::{DetectOptions, Model, YoloV4Builder, Yolov4Error},
};

/// ONNX protobuf 的最小编码器，只覆盖这里用到的字段
mod onnx {
  const VARINT: u64 = 0;
  const LEN: u64 = 2;

  const FLOAT: u64 = 1;
  const INT64: u64 = 7;

  fn varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
      out.push((value as u8) | 0x80);
      value >>= 7;
    }
    out.push(value as u8);
  }

  fn int_field(out: &mut Vec<u8>, field: u64, value: u64) {
    varint(out, (field << 3) | VARINT);
    varint(out, value);
  }

  fn bytes_field(out: &mut Vec<u8>, field: u64, value: &[u8]) {
    varint(out, (field << 3) | LEN);
    varint(out, value.len() as u64);
    out.extend_from_slice(value);
  }

  fn float_value_info(name: &str, dims: &[u64]) -> Vec<u8> {
    let mut shape = Vec::new();
    for &dim in dims {
      let mut dimension = Vec::new();
      int_field(&mut dimension, 1, dim);
      bytes_field(&mut shape, 1, &dimension);
    }
    let mut tensor_type = Vec::new();
    int_field(&mut tensor_type, 1, FLOAT);
    bytes_field(&mut tensor_type, 2, &shape);
    let mut type_proto = Vec::new();
    bytes_field(&mut type_proto, 1, &tensor_type);

    let mut info = Vec::new();
    bytes_field(&mut info, 1, name.as_bytes());
    bytes_field(&mut info, 2, &type_proto);
    info
  }

  /// `output_name = Reshape(input[1, 3, side, side], [1, rows, 6])`
  pub fn reshape_model(side: u64, output_name: &str) -> Vec<u8> {
    let rows = 3 * side * side / 6;
    let target: [i64; 3] = [1, rows as i64, 6];

    let mut shape_tensor = Vec::new();
    int_field(&mut shape_tensor, 1, 3);
    int_field(&mut shape_tensor, 2, INT64);
    bytes_field(&mut shape_tensor, 8, b"shape");
    let raw: Vec<u8> = target.iter().flat_map(|v| v.to_le_bytes()).collect();
    bytes_field(&mut shape_tensor, 9, &raw);

    let mut node = Vec::new();
    bytes_field(&mut node, 1, b"input");
    bytes_field(&mut node, 1, b"shape");
    bytes_field(&mut node, 2, output_name.as_bytes());
    bytes_field(&mut node, 3, b"reshape");
    bytes_field(&mut node, 4, b"Reshape");

    let mut graph = Vec::new();
    bytes_field(&mut graph, 1, &node);
    bytes_field(&mut graph, 2, b"yolov4-fixture");
    bytes_field(&mut graph, 5, &shape_tensor);
    bytes_field(&mut graph, 11, &float_value_info("input", &[1, 3, side, side]));
    bytes_field(&mut graph, 12, &float_value_info(output_name, &[1, rows, 6]));

    let mut opset = Vec::new();
    int_field(&mut opset, 2, 13);

    let mut model = Vec::new();
    int_field(&mut model, 1, 8);
    bytes_field(&mut model, 2, b"qianliyan-tests");
    bytes_field(&mut model, 7, &graph);
    bytes_field(&mut model, 8, &opset);
    model
  }
}

fn write_model(dir: &Path, name: &str, output_name: &str) -> PathBuf {
  let path = dir.join(name);
  std::fs::write(&path, onnx::reshape_model(2, output_name)).unwrap();
  path
}

/// 2x2 图像，归一化后 R 通道为 [1.0, 0.8, 0.2, 0.2]，G 通道为 [0.4, 1.0, 0, 0]，
/// 经 Reshape 后第一行即 `[1, 0.8, 0.2, 0.2, 0.4, 1.0]`，第二行全为 0
fn fixture_frame() -> Bitmap {
  let mut image = RgbaImage::new(2, 2);
  image.put_pixel(0, 0, Rgba([255, 102, 0, 255]));
  image.put_pixel(1, 0, Rgba([204, 255, 0, 255]));
  image.put_pixel(0, 1, Rgba([51, 0, 0, 255]));
  image.put_pixel(1, 1, Rgba([51, 0, 0, 255]));
  Bitmap::from(image)
}

fn close(a: f32, b: f32) -> bool {
  (a - b).abs() < 1e-3
}

#[test]
fn detect_decodes_every_output_row() {
  let dir = tempfile::tempdir().unwrap();
  let model_path = write_model(dir.path(), "tiny model.onnx", "output");

  let mut model = YoloV4Builder::new(&model_path)
    .use_gpu(false)
    .input_size(2)
    .build()
    .unwrap();
  assert!(!model.use_gpu());
  assert_eq!(model.input_size(), 2);

  let boxes = model
    .detect(&fixture_frame(), &DetectOptions::default())
    .unwrap();

  // 阈值不参与过滤，全零的第二行同样返回
  assert_eq!(boxes.len(), 2);
  let first = boxes[0];
  assert_eq!(first.label, 0);
  assert!(close(first.score, 0.8));
  assert!(close(first.x, 0.4));
  assert!(close(first.y, 0.4));
  assert!(close(first.w, 0.4));
  assert!(close(first.h, 1.6));
  assert_eq!(boxes[1].label, -1);
  assert_eq!(boxes[1].score, 0.0);
}

#[test]
fn thread_count_change_keeps_results() {
  let dir = tempfile::tempdir().unwrap();
  let model_path = write_model(dir.path(), "model.onnx", "output");

  let mut model = YoloV4Builder::new(&model_path)
    .use_gpu(false)
    .input_size(2)
    .build()
    .unwrap();
  let frame = fixture_frame();

  let default_threads = model.infer(&frame, &DetectOptions::default()).unwrap();
  let two_threads = model
    .infer(
      &frame,
      &DetectOptions {
        threads: 2,
        ..DetectOptions::default()
      },
    )
    .unwrap();
  assert_eq!(default_threads, two_threads);
}

#[test]
fn model_without_named_output_is_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let model_path = write_model(dir.path(), "model.onnx", "boxes");

  let result = YoloV4Builder::new(&model_path)
    .use_gpu(false)
    .input_size(2)
    .build();
  assert!(matches!(result, Err(Yolov4Error::ModelInvalid(_))));
}
