// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/output/json_record.rs - 检测结果 JSON 记录
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

use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Bitmap, FrameSize},
  model::{BoxInfo, labels::label_name},
  output::Render,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum JsonRecordError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无法解码的路径: {0}")]
  PathDecodeError(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 将一帧的检测结果转为 JSON
pub fn record_value(size: FrameSize, boxes: &[BoxInfo]) -> Value {
  let boxes: Vec<Value> = boxes
    .iter()
    .map(|b| {
      json!({
        "label": b.label,
        "name": label_name(b.label),
        "score": b.score,
        "x": b.x,
        "y": b.y,
        "w": b.w,
        "h": b.h,
      })
    })
    .collect();

  json!({
    "width": size.width,
    "height": size.height,
    "boxes": boxes,
  })
}

pub(crate) fn write_record(
  path: &Path,
  size: FrameSize,
  boxes: &[BoxInfo],
) -> Result<(), JsonRecordError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  let text = serde_json::to_string_pretty(&record_value(size, boxes))?;
  std::fs::write(path, text)?;
  Ok(())
}

pub struct JsonRecordOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordError::SchemeMismatch);
    }
    let path = url_file_path(uri)
      .ok_or_else(|| JsonRecordError::PathDecodeError(uri.path().to_string()))?;
    Ok(JsonRecordOutput { path })
  }
}

impl Render<Bitmap, Vec<BoxInfo>> for JsonRecordOutput {
  type Error = JsonRecordError;

  fn render_result(&self, frame: &Bitmap, result: &Vec<BoxInfo>) -> Result<(), Self::Error> {
    write_record(&self.path, frame.size(), result)?;
    info!("保存检测记录到文件: {}", self.path.display());
    Ok(())
  }
}
