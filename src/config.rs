//! 프로토콜 설정

use crate::block::BLOCK_HEADER_LEN;
use crate::packet::TAG_LEN;
use crate::{Error, Result, DEFAULT_MAX_BLOCK_SIZE};

/// 단일 UDP 데이터그램 최대 페이로드 (IPv4)
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// UFT 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 블록 최대 크기 (바이트, 압축 스트림 기준)
    pub max_block_size: usize,

    /// 폴링 주기 (밀리초)
    /// 한 번의 루프에서 수신을 기다리는 최대 시간
    pub poll_interval_ms: u64,

    /// 수신 버퍼 크기
    pub recv_buffer_size: usize,

    /// 파일 요청 최대 시도 횟수 (수신측)
    pub max_request_attempts: u32,

    /// 무응답 타임아웃 (밀리초, 수신측)
    /// 0이면 비활성화
    pub idle_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_block_size: DEFAULT_MAX_BLOCK_SIZE, // 8KB
            poll_interval_ms: 1,
            recv_buffer_size: 65_535,
            max_request_attempts: 5,
            idle_timeout_ms: 30_000, // 30초
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 블록 크기 지정
    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    /// 무응답 타임아웃 지정
    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: u64) -> Self {
        self.idle_timeout_ms = idle_timeout_ms;
        self
    }

    /// SEND 패킷 하나의 최대 크기
    pub fn max_send_frame_size(&self) -> usize {
        TAG_LEN + BLOCK_HEADER_LEN + self.max_block_size
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.max_block_size == 0 {
            return Err(Error::InvalidConfig("max_block_size는 0일 수 없음".into()));
        }
        if self.max_send_frame_size() > MAX_DATAGRAM_SIZE {
            return Err(Error::InvalidConfig(format!(
                "max_block_size {}는 데이터그램 하나에 담을 수 없음 (최대 {})",
                self.max_block_size,
                MAX_DATAGRAM_SIZE - TAG_LEN - BLOCK_HEADER_LEN
            )));
        }
        if self.max_send_frame_size() > self.recv_buffer_size {
            return Err(Error::InvalidConfig(format!(
                "recv_buffer_size {}가 SEND 프레임 {} bytes보다 작음",
                self.recv_buffer_size,
                self.max_send_frame_size()
            )));
        }
        Ok(())
    }

    /// 저지연 설정 (작은 블록)
    pub fn low_latency() -> Self {
        Self {
            max_block_size: 1200, // MTU 이하
            poll_interval_ms: 1,
            recv_buffer_size: 65_535,
            max_request_attempts: 5,
            idle_timeout_ms: 10_000,
        }
    }

    /// 대용량 전송용 설정 (큰 블록)
    pub fn bulk() -> Self {
        Self {
            max_block_size: 60 * 1024, // 데이터그램 하나에 들어가는 최대치 근처
            poll_interval_ms: 1,
            recv_buffer_size: 65_535,
            max_request_attempts: 10,
            idle_timeout_ms: 60_000,
        }
    }
}
