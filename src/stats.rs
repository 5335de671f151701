//! 전송 통계

use std::time::{Duration, Instant};

/// 한 번의 전송 시도에 대한 통계
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// 전송 단계 시작 시간
    start_time: Option<Instant>,

    /// 측정된 전송 시간 (정지 시 고정)
    elapsed: Option<Duration>,

    /// 수신/송신한 블록 수
    pub blocks: u64,

    /// 블록 데이터 바이트
    pub bytes: u64,

    /// 발행한 블록 요청 수 (재요청 포함)
    pub requests: u64,

    /// 재요청으로 다시 큐에 넣은 블록 수
    pub requeued: u64,

    /// 중복 수신 블록 수
    pub duplicates: u64,

    /// 범위 밖 블록/요청 수
    pub out_of_range: u64,

    /// 버린 프레임 수 (잘못된 형식/알 수 없는 태그)
    pub discarded_frames: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 타이머 시작
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.elapsed = None;
    }

    /// 타이머 정지
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed = Some(start.elapsed());
        }
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        match (self.elapsed, self.start_time) {
            (Some(elapsed), _) => elapsed,
            (None, Some(start)) => start.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / elapsed
    }

    /// 통계 리셋
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.3}s | Blocks: {} | Bytes: {} | Throughput: {:.2} MB/s | Requests: {} | Requeued: {} | Duplicates: {} | Discarded: {}",
            self.elapsed().as_secs_f64(),
            self.blocks,
            self.bytes,
            self.throughput() / 1_000_000.0,
            self.requests,
            self.requeued,
            self.duplicates,
            self.discarded_frames,
        )
    }
}
