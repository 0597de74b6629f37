// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/model/decode.rs - 输出张量解码
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

use ndarray::{ArrayView2, ArrayViewD};
use thiserror::Error;

use crate::{frame::FrameSize, model::BoxInfo};

/// 每行至少包含 [label+1, score, x1, y1, x2, y2]
pub const ROW_WIDTH: usize = 6;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("输出张量行宽不足: 期望至少 6, 实际 {0}")]
  RowTooShort(usize),
  #[error("输出张量形状无效: {0:?}")]
  InvalidShape(Vec<usize>),
}

/// 把任意维度的输出张量视为 `行 x 列`，最后一维为行宽
pub fn as_rows<'a>(tensor: ArrayViewD<'a, f32>) -> Result<ArrayView2<'a, f32>, DecodeError> {
  let shape = tensor.shape().to_vec();
  if tensor.is_empty() {
    return ArrayView2::from_shape((0, ROW_WIDTH), &[])
      .map_err(|_| DecodeError::InvalidShape(shape));
  }

  let cols = match shape.last() {
    Some(&cols) => cols,
    None => return Err(DecodeError::InvalidShape(shape)),
  };
  if cols < ROW_WIDTH {
    return Err(DecodeError::RowTooShort(cols));
  }

  let rows = tensor.len() / cols;
  tensor
    .into_shape_with_order((rows, cols))
    .map_err(|_| DecodeError::InvalidShape(shape))
}

/// 每行生成一个 `BoxInfo`，不做阈值过滤
pub fn decode_infer(rows: ArrayView2<'_, f32>, frame_size: FrameSize) -> Vec<BoxInfo> {
  let width = frame_size.width as f32;
  let height = frame_size.height as f32;

  rows
    .outer_iter()
    .map(|row| {
      let x1 = row[2] * width;
      let y1 = row[3] * height;
      BoxInfo {
        label: (row[0] - 1.0) as i32,
        score: row[1],
        x: x1,
        y: y1,
        w: row[4] * width - x1,
        h: row[5] * height - y1,
      }
    })
    .collect()
}

/// 解码引擎输出的原始张量
pub fn decode_tensor(
  tensor: ArrayViewD<'_, f32>,
  frame_size: FrameSize,
) -> Result<Vec<BoxInfo>, DecodeError> {
  Ok(decode_infer(as_rows(tensor)?, frame_size))
}
