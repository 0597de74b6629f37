// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Bitmap,
  model::BoxInfo,
  output::{
    Render,
    draw::{Draw, DrawError},
    json_record::{JsonRecordError, write_record},
  },
  query_param, url_file_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无法解码的路径: {0}")]
  PathDecodeError(String),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("记录错误: {0}")]
  RecordError(#[from] JsonRecordError),
}

pub enum DrawWrapper {
  /// 保存绘制了检测框的图像
  Draw(Box<Draw>),
  /// 保存原图，并在同名 .json 文件中记录检测结果
  Record,
}

impl DrawWrapper {
  pub fn save_result(
    &self,
    path: &Path,
    frame: &Bitmap,
    result: &[BoxInfo],
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      DrawWrapper::Draw(draw) => {
        draw.draw_detection(frame, result).save(path)?;
      }
      DrawWrapper::Record => {
        frame.to_rgb_image().save(path)?;
        write_record(&path.with_extension("json"), frame.size(), result)?;
      }
    };

    Ok(())
  }
}

/// 按 年/月/日 目录保存每一帧，默认只保存有检测结果的帧
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: DrawWrapper,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let draw = if uri.query_pairs().any(|(k, _)| k == "record") {
      DrawWrapper::Record
    } else {
      let draw = match query_param::<String>(uri, "font") {
        Some(font) => Draw::with_font_file(font)?,
        None => Draw::default(),
      };
      DrawWrapper::Draw(Box::new(draw))
    };

    let always = uri.query_pairs().any(|(k, _)| k == "always");
    let directory = url_file_path(uri)
      .ok_or_else(|| DirectoryRecordOutputError::PathDecodeError(uri.path().to_string()))?;

    Ok(DirectoryRecordOutput {
      directory,
      draw,
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<Bitmap, Vec<BoxInfo>> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Bitmap, result: &Vec<BoxInfo>) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      debug!("无检测结果，跳过保存");
      return Ok(());
    }
    let path = self.frame_path(Utc::now())?;
    self.draw.save_result(&path, frame, result)?;
    debug!("保存帧到: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbaImage;

  fn collect_files(dir: &std::path::Path, out: &mut Vec<PathBuf>) {
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        collect_files(&path, out);
      } else {
        out.push(path);
      }
    }
  }

  fn one_box() -> Vec<BoxInfo> {
    vec![BoxInfo {
      label: 0,
      score: 0.7,
      x: 1.0,
      y: 1.0,
      w: 4.0,
      h: 4.0,
    }]
  }

  #[test]
  fn skips_empty_results_unless_always() {
    let dir = tempfile::tempdir().unwrap();
    let frame = Bitmap::from(RgbaImage::new(8, 8));

    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &Vec::new()).unwrap();
    let mut files = Vec::new();
    collect_files(dir.path(), &mut files);
    assert!(files.is_empty());

    let url = url::Url::parse(&format!("folder://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &Vec::new()).unwrap();
    collect_files(dir.path(), &mut files);
    assert_eq!(files.len(), 1);
  }

  #[test]
  fn record_mode_writes_image_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?record", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    output
      .render_result(&Bitmap::from(RgbaImage::new(8, 8)), &one_box())
      .unwrap();

    let mut files = Vec::new();
    collect_files(dir.path(), &mut files);
    files.sort();
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|p| p.extension().is_some_and(|e| e == "json")));
    assert!(files.iter().any(|p| p.extension().is_some_and(|e| e == "png")));
  }

  #[test]
  fn frame_paths_are_dated_and_numbered() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    let now = DateTime::parse_from_rfc3339("2026-03-04T05:06:07Z")
      .unwrap()
      .with_timezone(&Utc);
    let first = output.frame_path(now).unwrap();
    let second = output.frame_path(now).unwrap();

    assert_eq!(first, dir.path().join("2026/03/04/05-06-07-0001.png"));
    assert_eq!(second, dir.path().join("2026/03/04/05-06-07-0002.png"));
  }
}
