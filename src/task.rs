// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/task.rs - 推理任务
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

use std::{thread, time::Duration};
use tracing::{info, warn};

use crate::{
  model::{BoxInfo, DetectOptions, Model, postprocess},
  output::Render,
};

const REPEAT_TIMES: usize = 1000;
const REPEAT_WARMUP: usize = 2;
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 所有任务共用的检测参数
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskOptions {
  pub detect: DetectOptions,
  /// 检测后执行置信度过滤和 NMS
  pub suppress: bool,
}

fn detect_frame<F, M>(
  model: &mut M,
  frame: &F,
  options: &TaskOptions,
) -> anyhow::Result<Vec<BoxInfo>>
where
  M: Model<Input = F, Output = Vec<BoxInfo>>,
  M::Error: std::error::Error + Sync + Send + 'static,
{
  let boxes = model.infer(frame, &options.detect)?;
  if options.suppress {
    Ok(postprocess::suppress(boxes, &options.detect))
  } else {
    Ok(boxes)
  }
}

/// 跳过预热后的平均耗时
fn average_time(times: &[Duration], warmup: usize) -> Option<Duration> {
  let measured = times.get(warmup..)?;
  if measured.is_empty() {
    return None;
  }
  Some(measured.iter().sum::<Duration>() / measured.len() as u32)
}

#[derive(Default, Debug)]
pub struct OneShotTask {
  options: TaskOptions,
}

impl OneShotTask {
  pub fn new(options: TaskOptions) -> Self {
    Self { options }
  }
}

impl<F, RE, I, M, O> Task<I, M, O> for OneShotTask
where
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = Vec<BoxInfo>>,
  M::Error: std::error::Error + Sync + Send + 'static,
  O: Render<F, Vec<BoxInfo>, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = std::time::Instant::now();
    let result = detect_frame(&mut model, &frame, &self.options)?;
    let elapsed = now.elapsed();
    info!("推理完成，检测到 {} 个物体，耗时: {:.2?}", result.len(), elapsed);
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

#[derive(Debug)]
pub struct RepeatShotTask {
  options: TaskOptions,
  repeat: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      options: TaskOptions::default(),
      repeat: REPEAT_TIMES,
    }
  }
}

impl RepeatShotTask {
  pub fn new(options: TaskOptions) -> Self {
    Self {
      options,
      ..Self::default()
    }
  }

  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat;
    self
  }
}

impl<F, RE, I, M, O> Task<I, M, O> for RepeatShotTask
where
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = Vec<BoxInfo>>,
  M::Error: std::error::Error + Sync + Send + 'static,
  O: Render<F, Vec<BoxInfo>, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat);
    for i in 0..self.repeat {
      let now = std::time::Instant::now();
      let result = detect_frame(&mut model, &frame, &self.options)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      info!("({})渲染完成，耗时: {:.2?}", i, now.elapsed());
      times.push(elapsed);
    }

    match average_time(&times, REPEAT_WARMUP) {
      Some(average) => warn!("平均推理时间: {:.2?}", average),
      None => warn!("重复次数不足 {}，不统计平均推理时间", REPEAT_WARMUP + 1),
    }

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  options: TaskOptions,
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn new(options: TaskOptions) -> Self {
    Self {
      options,
      frame_number: None,
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<F, RE, I, M, O> Task<I, M, O> for ContinuousTask
where
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = Vec<BoxInfo>>,
  M::Error: std::error::Error + Sync + Send + 'static,
  O: Render<F, Vec<BoxInfo>, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(FORCE_EXIT_AFTER);
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    let mut frame_index = 0usize;
    let mut now = std::time::Instant::now();
    for frame in input {
      frame_index = frame_index.wrapping_add(1);
      info!("处理第 {} 帧图像", frame_index);
      let result = detect_frame(&mut model, &frame, &self.options)?;
      let elapsed_a = now.elapsed();
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = std::time::Instant::now();
      info!(
        "推理完成，检测到 {} 个物体，耗时: {:.2?} / {:.2?}",
        result.len(),
        elapsed_a,
        elapsed_b
      );
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", frame_index);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  /// 每次返回固定结果的模型
  struct FakeModel {
    boxes: Vec<BoxInfo>,
  }

  impl Model for FakeModel {
    type Input = u32;
    type Output = Vec<BoxInfo>;
    type Error = std::io::Error;

    fn infer(
      &mut self,
      _input: &u32,
      _options: &DetectOptions,
    ) -> Result<Vec<BoxInfo>, Self::Error> {
      Ok(self.boxes.clone())
    }
  }

  #[derive(Default)]
  struct Collect {
    frames: RefCell<Vec<(u32, usize)>>,
  }

  impl Render<u32, Vec<BoxInfo>> for &Collect {
    type Error = std::io::Error;

    fn render_result(&self, frame: &u32, result: &Vec<BoxInfo>) -> Result<(), Self::Error> {
      self.frames.borrow_mut().push((*frame, result.len()));
      Ok(())
    }
  }

  fn overlapping() -> Vec<BoxInfo> {
    let b = BoxInfo {
      label: 0,
      score: 0.9,
      x: 0.0,
      y: 0.0,
      w: 10.0,
      h: 10.0,
    };
    vec![b, BoxInfo { score: 0.8, ..b }, BoxInfo { score: 0.05, x: 50.0, ..b }]
  }

  #[test]
  fn oneshot_renders_unfiltered_first_frame() {
    let collect = Collect::default();
    let model = FakeModel {
      boxes: overlapping(),
    };
    OneShotTask::default()
      .run_task([7u32, 8].into_iter(), model, &collect)
      .unwrap();
    assert_eq!(*collect.frames.borrow(), vec![(7, 3)]);
  }

  #[test]
  fn oneshot_can_suppress() {
    let collect = Collect::default();
    let model = FakeModel {
      boxes: overlapping(),
    };
    let options = TaskOptions {
      detect: DetectOptions {
        score_threshold: 0.3,
        nms_threshold: 0.5,
        threads: 0,
      },
      suppress: true,
    };
    OneShotTask::new(options)
      .run_task([1u32].into_iter(), model, &collect)
      .unwrap();
    assert_eq!(*collect.frames.borrow(), vec![(1, 1)]);
  }

  #[test]
  fn oneshot_without_input_fails() {
    let collect = Collect::default();
    let model = FakeModel {
      boxes: Vec::new(),
    };
    let result = OneShotTask::default().run_task(std::iter::empty::<u32>(), model, &collect);
    assert!(result.is_err());
  }

  #[test]
  fn repeatshot_runs_requested_times() {
    let collect = Collect::default();
    let model = FakeModel {
      boxes: Vec::new(),
    };
    RepeatShotTask::default()
      .with_repeat(5)
      .run_task([3u32].into_iter(), model, &collect)
      .unwrap();
    assert_eq!(collect.frames.borrow().len(), 5);
  }

  #[test]
  fn average_skips_warmup() {
    let times = [
      Duration::from_millis(100),
      Duration::from_millis(100),
      Duration::from_millis(10),
      Duration::from_millis(20),
    ];
    assert_eq!(average_time(&times, 2), Some(Duration::from_millis(15)));
    assert_eq!(average_time(&times[..2], 2), None);
    assert_eq!(average_time(&[], 2), None);
  }
}
