// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod args;
pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 读取 URL 查询参数并解析为指定类型，缺省或解析失败时返回 `None`
pub(crate) fn query_param<T: std::str::FromStr>(url: &url::Url, key: &str) -> Option<T> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .and_then(|(_, v)| v.parse().ok())
}

/// 解码 URL 路径中的百分号转义，得到文件系统路径
pub(crate) fn url_file_path(url: &url::Url) -> Option<std::path::PathBuf> {
  urlencoding::decode(url.path())
    .ok()
    .map(|path| std::path::PathBuf::from(path.into_owned()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_param_parses_present_keys() {
    let url = url::Url::parse("yolov4:///m.onnx?gpu=false&input_size=320").unwrap();
    assert_eq!(query_param::<bool>(&url, "gpu"), Some(false));
    assert_eq!(query_param::<u32>(&url, "input_size"), Some(320));
    assert_eq!(query_param::<u32>(&url, "num_class"), None);
  }

  #[test]
  fn file_path_is_percent_decoded() {
    let url = url::Url::parse("image:///tmp/my frame 数据/a.png").unwrap();
    assert_eq!(url.path(), "/tmp/my%20frame%20%E6%95%B0%E6%8D%AE/a.png");
    assert_eq!(
      url_file_path(&url),
      Some(std::path::PathBuf::from("/tmp/my frame 数据/a.png"))
    );
  }

  #[test]
  fn undecodable_file_path_is_rejected() {
    let url = url::Url::parse("image:///tmp/%FF.png").unwrap();
    assert_eq!(url_file_path(&url), None);
  }

  #[test]
  fn query_param_ignores_unparsable_values() {
    let url = url::Url::parse("yolov4:///m.onnx?input_size=big").unwrap();
    assert_eq!(query_param::<u32>(&url, "input_size"), None);
  }
}
